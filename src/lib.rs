//! # pdfdoc
//!
//! A small document facade over a PDF engine.
//!
//! `pdfdoc` opens PDF files, handles password protection and exposes the
//! document-level information a viewer needs: page count and page access,
//! the info dictionary, the outline tree, the PDF version and the initial
//! page mode. The default engine is built on `lopdf`; other engines plug in
//! through the [`engine::Engine`] and [`engine::PdfBackend`] traits.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdfdoc::Document;
//!
//! fn main() -> pdfdoc::Result<()> {
//!     let mut doc = Document::new();
//!     doc.load("document.pdf")?;
//!
//!     println!("PDF {:.1}, {} pages", doc.pdf_version(), doc.page_count());
//!     if let Some(outline) = doc.outline() {
//!         for (level, entry) in outline.iter() {
//!             println!("{}{}", "  ".repeat(level), entry.title());
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Password handling**: locked documents can be unlocked later
//! - **Info dictionary**: raw keys and decoded text values
//! - **Outline**: owned table-of-contents tree with `#page=N` links
//! - **C ABI**: optional `ffi` feature for use from other languages

pub mod detect;
pub mod document;
pub mod engine;
pub mod error;
pub mod locale;
pub mod metadata;
pub mod options;
pub mod outline;
pub mod page;
pub mod text;

#[cfg(feature = "ffi")]
pub mod ffi;

// Re-export commonly used types
pub use detect::{is_pdf_bytes, sniff_header, HeaderVersion};
pub use document::Document;
pub use engine::{Engine, LopdfBackend, LopdfEngine, PdfBackend, Rect};
pub use error::{Error, Result};
pub use metadata::{Metadata, PageMode};
pub use options::LoadOptions;
pub use outline::Outline;
pub use page::Page;

use std::path::Path;

/// Open a PDF file with the default engine.
///
/// A locked document is returned as is; call [`Document::unlock`] on it.
///
/// # Example
///
/// ```no_run
/// let doc = pdfdoc::open("document.pdf").unwrap();
/// println!("Pages: {}", doc.page_count());
/// ```
pub fn open<P: AsRef<Path>>(path: P) -> Result<Document> {
    open_with_options(path, LoadOptions::default())
}

/// Open a PDF file with custom options.
///
/// # Example
///
/// ```no_run
/// use pdfdoc::{open_with_options, LoadOptions};
///
/// let options = LoadOptions::new().with_password("secret");
/// let doc = open_with_options("encrypted.pdf", options).unwrap();
/// assert!(!doc.is_locked());
/// ```
pub fn open_with_options<P: AsRef<Path>>(path: P, options: LoadOptions) -> Result<Document> {
    let mut doc = Document::new().with_options(options);
    doc.load(path)?;
    Ok(doc)
}

/// Read the outline of a PDF file.
///
/// Returns `Ok(None)` when the file has no outline or is locked.
pub fn read_outline<P: AsRef<Path>>(path: P) -> Result<Option<Outline>> {
    Ok(open(path)?.outline())
}
