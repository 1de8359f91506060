//! Engine implementation backed by lopdf.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use lopdf::{Dictionary, Document as LopdfDocument, Object};

use super::object::{PdfDict, PdfObject};
use super::security::StandardSecurity;
use super::{
    Engine, FileStream, OutlineEntry, OutlineGraph, PdfBackend, Rect, META_ENCRYPTION,
    META_FORMAT, META_INFO_PREFIX, PDF_MAGIC,
};
use crate::detect::{sniff_header, HeaderVersion};
use crate::error::{Error, Result};
use crate::text::decode_pdf_string;

/// Longest chain of references followed before giving up.
const MAX_REFERENCE_CHAIN: usize = 32;

/// Depth limit for page-tree and name-tree walks.
const MAX_TREE_DEPTH: usize = 64;

/// Engine context for lopdf-backed documents.
#[derive(Debug, Clone, Default)]
pub struct LopdfEngine {
    opened: usize,
}

impl LopdfEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents this context has opened.
    pub fn documents_opened(&self) -> usize {
        self.opened
    }
}

impl Engine for LopdfEngine {
    type Document = LopdfBackend;

    fn open_document(&mut self, stream: &FileStream, magic: &str) -> Result<LopdfBackend> {
        if !magic.eq_ignore_ascii_case(PDF_MAGIC) && !magic.eq_ignore_ascii_case("application/pdf")
        {
            return Err(Error::UnsupportedFormat(magic.to_string()));
        }

        let backend = LopdfBackend::load(stream.shared_data())?;
        self.opened += 1;
        log::debug!(
            "opened {} (PDF {}, {} bytes)",
            stream.path().display(),
            backend.header,
            stream.len()
        );
        Ok(backend)
    }
}

/// An opened document backed by `lopdf::Document`.
pub struct LopdfBackend {
    doc: LopdfDocument,
    header: HeaderVersion,
    encryption: Option<String>,
    security: Option<StandardSecurity>,
    needs_password: bool,
}

impl LopdfBackend {
    /// Parse a document from shared bytes.
    pub fn load(data: Arc<[u8]>) -> Result<Self> {
        let header = sniff_header(&data)?;
        let doc = LopdfDocument::load_mem(&data)?;
        let encrypted = doc.trailer.get(b"Encrypt").is_ok();

        let security = if encrypted {
            match StandardSecurity::from_document(&doc) {
                Ok(security) => Some(security),
                Err(e) => {
                    log::warn!("document cannot be decrypted: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let mut backend = Self {
            encryption: describe_encryption(&doc),
            doc,
            header,
            security,
            needs_password: encrypted,
        };

        if encrypted {
            // Documents protected only by an owner password open with the
            // empty user password.
            backend.needs_password = !backend.try_decrypt("");
        }

        Ok(backend)
    }

    /// Direct access to the underlying `lopdf::Document`.
    pub fn raw_doc(&self) -> &LopdfDocument {
        &self.doc
    }

    /// Version from the file header.
    pub fn header_version(&self) -> HeaderVersion {
        self.header
    }

    /// Decrypt the document in place if `password` is its user or owner
    /// password.
    fn try_decrypt(&mut self, password: &str) -> bool {
        let Some(security) = &self.security else {
            return false;
        };
        let Some(key) = security.authenticate(password.as_bytes()) else {
            log::debug!("password rejected by security handler R{}", security.revision());
            return false;
        };

        security.decrypt_document(&mut self.doc, &key);
        self.doc.trailer.remove(b"Encrypt");
        log::debug!(
            "decrypted document (R{}, strings {:?})",
            security.revision(),
            security.string_method()
        );
        true
    }

    fn catalog(&self) -> Option<&Dictionary> {
        deref_dict(&self.doc, self.doc.trailer.get(b"Root").ok()?)
    }

    fn info(&self) -> Option<&Dictionary> {
        deref_dict(&self.doc, self.doc.trailer.get(b"Info").ok()?)
    }

    /// Page object id to 1-based page number.
    fn page_numbers(&self) -> HashMap<lopdf::ObjectId, u32> {
        self.doc
            .get_pages()
            .into_iter()
            .map(|(number, id)| (id, number))
            .collect()
    }

    /// Look up a page attribute, following `/Parent` for inherited values.
    fn inherited_attribute(&self, page_id: lopdf::ObjectId, key: &[u8]) -> Option<&Object> {
        let mut current = Some(page_id);
        let mut depth = 0;

        while let Some(id) = current {
            if depth > MAX_TREE_DEPTH {
                return None;
            }
            depth += 1;

            let dict = self.doc.get_dictionary(id).ok()?;
            if let Ok(value) = dict.get(key) {
                return Some(value);
            }
            current = dict.get(b"Parent").ok().and_then(|p| p.as_reference().ok());
        }

        None
    }

    fn outline_entry(&self, item: &Dictionary, pages: &HashMap<lopdf::ObjectId, u32>) -> OutlineEntry {
        let title = item
            .get(b"Title")
            .ok()
            .and_then(|t| deref(&self.doc, t))
            .and_then(|t| match t {
                Object::String(bytes, _) => Some(decode_pdf_string(bytes)),
                _ => None,
            });

        let is_open = item
            .get(b"Count")
            .ok()
            .and_then(|c| deref(&self.doc, c))
            .and_then(|c| c.as_i64().ok())
            .is_some_and(|count| count > 0);

        OutlineEntry {
            title,
            uri: self.link_target(item, pages),
            is_open,
            next: None,
            down: None,
        }
    }

    /// Link target of an outline item as a URI.
    fn link_target(&self, item: &Dictionary, pages: &HashMap<lopdf::ObjectId, u32>) -> Option<String> {
        if let Ok(dest) = item.get(b"Dest") {
            return self.destination_uri(dest, pages);
        }

        let action = deref_dict(&self.doc, item.get(b"A").ok()?)?;
        let kind = action.get(b"S").ok().and_then(|s| deref(&self.doc, s));
        match kind {
            Some(Object::Name(kind)) if kind.as_slice() == b"URI" => {
                match deref(&self.doc, action.get(b"URI").ok()?)? {
                    Object::String(bytes, _) => Some(String::from_utf8_lossy(bytes).into_owned()),
                    _ => None,
                }
            }
            Some(Object::Name(kind)) if kind.as_slice() == b"GoTo" => {
                self.destination_uri(action.get(b"D").ok()?, pages)
            }
            _ => None,
        }
    }

    fn destination_uri(&self, dest: &Object, pages: &HashMap<lopdf::ObjectId, u32>) -> Option<String> {
        match deref(&self.doc, dest)? {
            Object::Array(items) => explicit_destination(items, pages),
            Object::Name(name) | Object::String(name, _) => match self.named_destination(name) {
                Some(items) => explicit_destination(items, pages),
                None => Some(format!("#nameddest={}", String::from_utf8_lossy(name))),
            },
            Object::Dictionary(dict) => self.destination_uri(dict.get(b"D").ok()?, pages),
            _ => None,
        }
    }

    /// Resolve a named destination through `/Dests` or the `/Names` tree.
    fn named_destination(&self, name: &[u8]) -> Option<&[Object]> {
        let catalog = self.catalog()?;

        if let Some(dests) = catalog
            .get(b"Dests")
            .ok()
            .and_then(|d| deref_dict(&self.doc, d))
        {
            if let Ok(value) = dests.get(name) {
                return destination_array(&self.doc, value);
            }
        }

        let names = deref_dict(&self.doc, catalog.get(b"Names").ok()?)?;
        let tree = deref_dict(&self.doc, names.get(b"Dests").ok()?)?;
        let value = name_tree_lookup(&self.doc, tree, name, 0)?;
        destination_array(&self.doc, value)
    }
}

impl PdfBackend for LopdfBackend {
    fn needs_password(&self) -> bool {
        self.needs_password
    }

    fn authenticate_password(&mut self, password: &str) -> bool {
        if !self.needs_password {
            return true;
        }
        if self.try_decrypt(password) {
            self.needs_password = false;
        }
        !self.needs_password
    }

    fn count_pages(&self) -> usize {
        self.doc.get_pages().len()
    }

    fn trailer(&self) -> PdfDict {
        convert_dict(&self.doc.trailer)
    }

    fn resolve_indirect(&self, obj: &PdfObject) -> PdfObject {
        let mut current = obj.clone();
        let mut hops = 0;

        while let Some(id) = current.as_reference() {
            if hops == MAX_REFERENCE_CHAIN {
                log::warn!("reference chain starting at {:?} is too long", obj);
                return PdfObject::Null;
            }
            hops += 1;
            current = match self.doc.get_object(id) {
                Ok(target) => convert_object(target),
                Err(_) => return PdfObject::Null,
            };
        }

        current
    }

    fn load_outline(&self, max_depth: usize) -> Option<OutlineGraph> {
        let catalog = self.catalog()?;
        let outlines = deref_dict(&self.doc, catalog.get(b"Outlines").ok()?)?;
        let first = outlines.get(b"First").ok()?;

        let mut walker = OutlineWalker {
            backend: self,
            graph: OutlineGraph::new(),
            visited: HashSet::new(),
            pages: self.page_numbers(),
            max_depth,
        };
        let head = walker.walk_siblings(first, 0);
        let mut graph = walker.graph;
        graph.first = head;

        if graph.is_empty() {
            None
        } else {
            Some(graph)
        }
    }

    fn lookup_metadata(&self, key: &str) -> Option<String> {
        if key == META_FORMAT {
            return Some(format!("PDF {}", self.header));
        }
        if key == META_ENCRYPTION {
            return self.encryption.clone();
        }

        let name = key.strip_prefix(META_INFO_PREFIX)?;
        if self.needs_password {
            return None;
        }
        match deref(&self.doc, self.info()?.get(name.as_bytes()).ok()?)? {
            Object::String(bytes, _) => Some(decode_pdf_string(bytes)),
            _ => None,
        }
    }

    fn page_bounds(&self, index: usize) -> Option<Rect> {
        let page_id = *self.doc.get_pages().values().nth(index)?;
        let media_box = deref(&self.doc, self.inherited_attribute(page_id, b"MediaBox")?)?;
        let items = match media_box {
            Object::Array(items) if items.len() >= 4 => items,
            _ => return None,
        };

        let mut coords = [0.0f32; 4];
        for (slot, item) in coords.iter_mut().zip(items) {
            *slot = deref(&self.doc, item).and_then(number)?;
        }
        Some(Rect::from_corners(coords[0], coords[1], coords[2], coords[3]))
    }
}

/// Depth-first walk of the `/First` / `/Next` outline links.
struct OutlineWalker<'a> {
    backend: &'a LopdfBackend,
    graph: OutlineGraph,
    visited: HashSet<lopdf::ObjectId>,
    pages: HashMap<lopdf::ObjectId, u32>,
    max_depth: usize,
}

impl<'a> OutlineWalker<'a> {
    /// Convert one sibling chain, returning the index of its first entry.
    fn walk_siblings(&mut self, start: &'a Object, depth: usize) -> Option<usize> {
        if depth >= self.max_depth {
            log::warn!("outline nested deeper than {} levels, truncating", self.max_depth);
            return None;
        }

        let backend = self.backend;
        let doc = &backend.doc;
        let mut head = None;
        let mut prev: Option<usize> = None;
        let mut current = Some(start);

        while let Some(obj) = current {
            if let Object::Reference(id) = obj {
                if !self.visited.insert(*id) {
                    log::warn!("outline item {:?} visited twice, stopping", id);
                    break;
                }
            }

            let Some(item) = deref_dict(doc, obj) else {
                break;
            };

            let entry = backend.outline_entry(item, &self.pages);
            let index = self.graph.push(entry);
            match prev {
                Some(p) => self.graph.entries[p].next = Some(index),
                None => head = Some(index),
            }

            if let Ok(child) = item.get(b"First") {
                let down = self.walk_siblings(child, depth + 1);
                self.graph.entries[index].down = down;
            }

            prev = Some(index);
            current = item.get(b"Next").ok();
        }

        head
    }
}

/// Follow references until a direct object is reached.
pub(super) fn deref<'a>(doc: &'a LopdfDocument, obj: &'a Object) -> Option<&'a Object> {
    let mut current = obj;
    for _ in 0..MAX_REFERENCE_CHAIN {
        match current {
            Object::Reference(id) => current = doc.get_object(*id).ok()?,
            direct => return Some(direct),
        }
    }
    None
}

pub(super) fn deref_dict<'a>(doc: &'a LopdfDocument, obj: &'a Object) -> Option<&'a Dictionary> {
    match deref(doc, obj)? {
        Object::Dictionary(dict) => Some(dict),
        Object::Stream(stream) => Some(&stream.dict),
        _ => None,
    }
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// `#page=N` for an explicit destination array `[page /XYZ ...]`.
fn explicit_destination(items: &[Object], pages: &HashMap<lopdf::ObjectId, u32>) -> Option<String> {
    match items.first()? {
        Object::Reference(id) => pages.get(id).map(|n| format!("#page={}", n)),
        // Remote destinations address pages by zero-based number.
        Object::Integer(i) if *i >= 0 => Some(format!("#page={}", i + 1)),
        _ => None,
    }
}

fn destination_array<'a>(doc: &'a LopdfDocument, value: &'a Object) -> Option<&'a [Object]> {
    match deref(doc, value)? {
        Object::Array(items) => Some(items),
        Object::Dictionary(dict) => match deref(doc, dict.get(b"D").ok()?)? {
            Object::Array(items) => Some(items),
            _ => None,
        },
        _ => None,
    }
}

fn name_tree_lookup<'a>(
    doc: &'a LopdfDocument,
    node: &'a Dictionary,
    key: &[u8],
    depth: usize,
) -> Option<&'a Object> {
    if depth > MAX_TREE_DEPTH {
        return None;
    }

    if let Some(Object::Array(pairs)) = node.get(b"Names").ok().and_then(|n| deref(doc, n)) {
        for pair in pairs.chunks_exact(2) {
            if let Some(Object::String(name, _)) = deref(doc, &pair[0]) {
                if name.as_slice() == key {
                    return Some(&pair[1]);
                }
            }
        }
    }

    if let Some(Object::Array(kids)) = node.get(b"Kids").ok().and_then(|k| deref(doc, k)) {
        for kid in kids {
            if let Some(found) =
                deref_dict(doc, kid).and_then(|kid| name_tree_lookup(doc, kid, key, depth + 1))
            {
                return Some(found);
            }
        }
    }

    None
}

/// Human readable encryption method, e.g. `Standard V2 R3 128-bit RC4`.
fn describe_encryption(doc: &LopdfDocument) -> Option<String> {
    let dict = deref_dict(doc, doc.trailer.get(b"Encrypt").ok()?)?;
    let int = |key: &[u8]| {
        dict.get(key)
            .ok()
            .and_then(|o| deref(doc, o))
            .and_then(|o| o.as_i64().ok())
    };

    let filter = dict
        .get(b"Filter")
        .ok()
        .and_then(|o| deref(doc, o))
        .and_then(|o| o.as_name().ok())
        .map(|n| String::from_utf8_lossy(n).into_owned())
        .unwrap_or_else(|| "Unknown".to_string());
    let v = int(b"V").unwrap_or(0);
    let r = int(b"R").unwrap_or(0);

    let crypt_method = dict
        .get(b"CF")
        .ok()
        .and_then(|o| deref_dict(doc, o))
        .and_then(|cf| cf.get(b"StdCF").ok())
        .and_then(|o| deref_dict(doc, o))
        .and_then(|std_cf| std_cf.get(b"CFM").ok())
        .and_then(|o| deref(doc, o))
        .and_then(|o| o.as_name().ok())
        .map(|n| n.to_vec());

    let (bits, method) = match crypt_method.as_deref() {
        Some(b"AESV3") => (256, "AES"),
        Some(b"AESV2") => (128, "AES"),
        _ if v == 5 => (256, "AES"),
        _ => (int(b"Length").unwrap_or(40), "RC4"),
    };

    Some(format!("{} V{} R{} {}-bit {}", filter, v, r, bits, method))
}

fn convert_dict(dict: &Dictionary) -> PdfDict {
    let mut out = PdfDict::new();
    for (key, value) in dict.iter() {
        out.push_raw(PdfObject::Name(key.clone()), convert_object(value));
    }
    out
}

/// Convert a `lopdf::Object` to [`PdfObject`].
fn convert_object(obj: &Object) -> PdfObject {
    match obj {
        Object::Null => PdfObject::Null,
        Object::Boolean(b) => PdfObject::Boolean(*b),
        Object::Integer(i) => PdfObject::Integer(*i),
        Object::Real(r) => PdfObject::Real(*r),
        Object::Name(n) => PdfObject::Name(n.clone()),
        Object::String(bytes, _) => PdfObject::String(bytes.clone()),
        Object::Array(items) => PdfObject::Array(items.iter().map(convert_object).collect()),
        Object::Dictionary(dict) => PdfObject::Dictionary(convert_dict(dict)),
        Object::Stream(stream) => PdfObject::Stream(convert_dict(&stream.dict)),
        Object::Reference(id) => PdfObject::Reference(*id),
    }
}
