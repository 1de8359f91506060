//! PDF engine abstraction layer.
//!
//! The document facade talks to the PDF library only through the traits in
//! this module. [`Engine`] is the per-document context that opens files and
//! documents; [`PdfBackend`] is one opened document. The default
//! implementation is backed by lopdf.

mod lopdf_backend;
mod object;
mod security;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::Result;

pub use lopdf_backend::{LopdfBackend, LopdfEngine};
pub use object::{ObjectId, PdfDict, PdfObject};

/// Format identifier the facade passes to [`Engine::open_document`].
pub const PDF_MAGIC: &str = "pdf";

/// Well-known metadata key for the document format string, e.g. `PDF 1.7`.
pub const META_FORMAT: &str = "format";

/// Well-known metadata key describing the encryption method.
pub const META_ENCRYPTION: &str = "encryption";

/// Prefix for info dictionary lookups, e.g. `info:Title`.
pub const META_INFO_PREFIX: &str = "info:";

/// Bytes of an input file, shared between the stream and the document that
/// was opened from it.
#[derive(Debug, Clone)]
pub struct FileStream {
    path: PathBuf,
    data: Arc<[u8]>,
}

impl FileStream {
    /// Read a whole file.
    pub fn open(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            data: data.into(),
        })
    }

    /// Wrap bytes that did not come from disk.
    pub fn from_bytes(name: impl Into<PathBuf>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            path: name.into(),
            data: data.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Cheap shared handle to the bytes.
    pub fn shared_data(&self) -> Arc<[u8]> {
        Arc::clone(&self.data)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A page rectangle in PDF user space units.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    /// Build a normalized rectangle from two corners.
    pub fn from_corners(ax: f32, ay: f32, bx: f32, by: f32) -> Self {
        Self {
            x0: ax.min(bx),
            y0: ay.min(by),
            x1: ax.max(bx),
            y1: ay.max(by),
        }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }
}

/// One entry of an engine outline graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutlineEntry {
    /// Title, already decoded to UTF-8.
    pub title: Option<String>,
    /// Link target as a URI. Internal targets use `#page=N` (1-based) or
    /// `#nameddest=NAME`.
    pub uri: Option<String>,
    /// Whether the entry is shown expanded.
    pub is_open: bool,
    /// Index of the next sibling in [`OutlineGraph::entries`].
    pub next: Option<usize>,
    /// Index of the first child in [`OutlineGraph::entries`].
    pub down: Option<usize>,
}

/// An outline as produced by an engine: sibling and child links expressed as
/// indices into a flat entry list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutlineGraph {
    pub entries: Vec<OutlineEntry>,
    pub first: Option<usize>,
}

impl OutlineGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and return its index.
    pub fn push(&mut self, entry: OutlineEntry) -> usize {
        self.entries.push(entry);
        self.entries.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&OutlineEntry> {
        self.entries.get(index)
    }

    pub fn is_empty(&self) -> bool {
        self.first.is_none()
    }

    /// Iterate a sibling chain starting at `start`.
    pub fn siblings(&self, start: Option<usize>) -> Siblings<'_> {
        Siblings {
            graph: self,
            next: start,
            remaining: self.entries.len(),
        }
    }
}

/// Iterator over a sibling chain of an [`OutlineGraph`].
///
/// Never yields more items than the graph holds, so a malformed `next` cycle
/// terminates.
pub struct Siblings<'a> {
    graph: &'a OutlineGraph,
    next: Option<usize>,
    remaining: usize,
}

impl<'a> Iterator for Siblings<'a> {
    type Item = (usize, &'a OutlineEntry);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let index = self.next?;
        let entry = self.graph.entries.get(index)?;
        self.remaining -= 1;
        self.next = entry.next;
        Some((index, entry))
    }
}

/// Per-document engine context.
///
/// A [`Document`](crate::Document) owns exactly one engine for its whole
/// lifetime and routes every library call through it.
pub trait Engine {
    /// Handle to an opened document.
    type Document: PdfBackend;

    /// Open a file as a byte stream.
    fn open_file(&mut self, path: &Path) -> Result<FileStream> {
        FileStream::open(path)
    }

    /// Interpret a stream as a document of the given format.
    fn open_document(&mut self, stream: &FileStream, magic: &str) -> Result<Self::Document>;
}

/// Abstract interface to one opened document.
pub trait PdfBackend {
    /// Whether a password must be supplied before content can be read.
    fn needs_password(&self) -> bool;

    /// Try a password. Returns `true` once the document is readable.
    fn authenticate_password(&mut self, password: &str) -> bool;

    /// Number of pages.
    fn count_pages(&self) -> usize;

    /// The trailer dictionary.
    fn trailer(&self) -> PdfDict;

    /// Follow indirect references until a direct object is reached.
    /// Dangling references resolve to [`PdfObject::Null`].
    fn resolve_indirect(&self, obj: &PdfObject) -> PdfObject;

    /// Load the outline graph, or `None` if the document has none.
    /// Nesting deeper than `max_depth` is cut off.
    fn load_outline(&self, max_depth: usize) -> Option<OutlineGraph>;

    /// Look up document metadata by well-known key (see `META_*`).
    fn lookup_metadata(&self, key: &str) -> Option<String>;

    /// Media box of a zero-based page.
    fn page_bounds(&self, index: usize) -> Option<Rect>;
}
