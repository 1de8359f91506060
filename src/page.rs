//! Per-page accessor.

use crate::engine::{PdfBackend, Rect};

/// A page of a [`Document`](crate::Document), addressed by zero-based index.
///
/// The index is not checked when the accessor is created; queries on a page
/// that does not exist, or on a document that is not open, return `None`.
pub struct Page<'a, D: PdfBackend> {
    backend: Option<&'a D>,
    index: usize,
}

impl<'a, D: PdfBackend> Page<'a, D> {
    pub(crate) fn new(backend: Option<&'a D>, index: usize) -> Self {
        Self { backend, index }
    }

    /// Zero-based page index.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Page media box.
    pub fn bounds(&self) -> Option<Rect> {
        self.backend?.page_bounds(self.index)
    }

    /// Width and height in points.
    pub fn size(&self) -> Option<(f32, f32)> {
        self.bounds().map(|r| (r.width(), r.height()))
    }
}

impl<D: PdfBackend> std::fmt::Debug for Page<'_, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("index", &self.index)
            .field("attached", &self.backend.is_some())
            .finish()
    }
}
