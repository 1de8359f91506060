//! The document facade.

use std::cell::OnceCell;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::engine::{
    Engine, FileStream, LopdfEngine, PdfBackend, PdfDict, PdfObject, META_ENCRYPTION,
    META_FORMAT, PDF_MAGIC,
};
use crate::error::{Error, Result};
use crate::locale::NumericLocaleGuard;
use crate::metadata::{parse_pdf_date, Metadata, PageMode};
use crate::options::LoadOptions;
use crate::outline::Outline;
use crate::page::Page;
use crate::text::decode_pdf_string;

/// A PDF document opened through an engine.
///
/// The document owns its engine context from construction to drop. Every
/// call into the PDF library goes through that context.
///
/// ```no_run
/// use pdfdoc::Document;
///
/// let mut doc = Document::new();
/// doc.load("report.pdf")?;
/// if doc.is_locked() {
///     doc.unlock("secret")?;
/// }
/// println!("{} pages, title {:?}", doc.page_count(), doc.info_key(b"Title"));
/// # Ok::<(), pdfdoc::Error>(())
/// ```
pub struct Document<E: Engine = LopdfEngine> {
    engine: E,
    options: LoadOptions,
    stream: Option<FileStream>,
    handle: Option<E::Document>,
    page_count: usize,
    info: OnceCell<Option<PdfDict>>,
    page_mode: PageMode,
    locked: bool,
}

impl Document<LopdfEngine> {
    /// Create an empty document with the lopdf engine.
    pub fn new() -> Self {
        Self::with_engine(LopdfEngine::new())
    }
}

impl Default for Document<LopdfEngine> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Engine> Document<E> {
    /// Create an empty document around an engine context.
    pub fn with_engine(engine: E) -> Self {
        Self {
            engine,
            options: LoadOptions::default(),
            stream: None,
            handle: None,
            page_count: 0,
            info: OnceCell::new(),
            page_mode: PageMode::UseNone,
            locked: false,
        }
    }

    /// Replace the load options.
    pub fn with_options(mut self, options: LoadOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// The engine context.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The opened engine document, if any.
    pub fn backend(&self) -> Option<&E::Document> {
        self.handle.as_ref()
    }

    /// Open a PDF file.
    ///
    /// A document that is already open is closed first. When the file is not
    /// encrypted, page count and page mode are read right away. On error the
    /// document is left closed.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.close();

        let stream = self.engine.open_file(path)?;
        let handle = {
            let _locale = self.options.locale_guard.then(NumericLocaleGuard::c_locale);
            self.engine.open_document(&stream, PDF_MAGIC)
        };
        let handle = match handle {
            Ok(handle) => handle,
            Err(e) => {
                log::warn!("Error when trying to load document {}: {}", path.display(), e);
                return Err(e);
            }
        };

        self.locked = handle.needs_password();
        self.stream = Some(stream);
        self.handle = Some(handle);

        if !self.locked {
            if let Err(e) = self.load_catalog() {
                self.close();
                return Err(e);
            }
        } else if let Some(password) = self.options.password.clone() {
            match self.unlock(&password) {
                Ok(()) => {}
                Err(Error::InvalidPassword) => {
                    log::debug!("configured password did not unlock {}", path.display());
                }
                Err(e) => {
                    self.close();
                    return Err(e);
                }
            }
        }

        log::debug!(
            "loaded {} (locked: {}, pages: {})",
            path.display(),
            self.locked,
            self.page_count
        );
        Ok(())
    }

    /// Release the engine document and stream and reset all cached state.
    /// Does nothing if no document is open.
    pub fn close(&mut self) {
        if self.handle.is_none() && self.stream.is_none() {
            return;
        }

        self.handle = None;
        self.stream = None;
        self.page_count = 0;
        self.info = OnceCell::new();
        self.page_mode = PageMode::UseNone;
        self.locked = false;
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// True while the document is encrypted and no valid password was given.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Supply a password for a locked document.
    ///
    /// Fails with `Error::NotLocked` if there is nothing to unlock and with
    /// `Error::InvalidPassword` if the password is rejected, leaving the lock
    /// in place. After a successful authentication the catalog is loaded; if
    /// that fails the document stays unlocked but the error is returned.
    pub fn unlock(&mut self, password: &str) -> Result<()> {
        if !self.locked {
            return Err(Error::NotLocked);
        }

        let authenticated = {
            let handle = self.handle.as_mut().ok_or(Error::NotOpen)?;
            let _locale = self.options.locale_guard.then(NumericLocaleGuard::c_locale);
            handle.authenticate_password(password)
        };
        if !authenticated {
            return Err(Error::InvalidPassword);
        }

        self.locked = false;
        self.info = OnceCell::new();
        self.load_catalog()
    }

    /// Number of pages; 0 unless a load or unlock has completed.
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Accessor for the page at a zero-based index. The index is not checked.
    pub fn page(&self, index: usize) -> Page<'_, E::Document> {
        Page::new(self.handle.as_ref(), index)
    }

    /// Initial page mode declared by the catalog.
    pub fn page_mode(&self) -> PageMode {
        self.page_mode
    }

    /// Names of the entries in the info dictionary.
    pub fn info_keys(&self) -> Vec<Vec<u8>> {
        let Some(info) = self.info_dict() else {
            return Vec::new();
        };

        (0..info.len())
            .filter_map(|i| info.key_at(i))
            .filter_map(PdfObject::as_name)
            .map(<[u8]>::to_vec)
            .collect()
    }

    /// Text of one info dictionary entry.
    ///
    /// Returns an empty string if the entry is missing. An entry that is not
    /// a string is reported with a warning and also yields an empty string.
    pub fn info_key(&self, key: &[u8]) -> String {
        let (Some(handle), Some(info)) = (self.handle.as_ref(), self.info_dict()) else {
            return String::new();
        };
        let Some(value) = info.get(key) else {
            return String::new();
        };

        let value = handle.resolve_indirect(value);
        match value.as_string_bytes() {
            Some(bytes) => decode_pdf_string(bytes),
            None => {
                log::warn!(
                    "info object {} is not a string but {}",
                    String::from_utf8_lossy(key),
                    value.type_name()
                );
                String::new()
            }
        }
    }

    /// Typed view of the standard info entries plus document state.
    pub fn metadata(&self) -> Metadata {
        let text = |key: &[u8]| {
            let value = self.info_key(key);
            (!value.is_empty()).then_some(value)
        };
        let date = |key: &[u8]| text(key).and_then(|d| parse_pdf_date(&d));

        Metadata {
            title: text(b"Title"),
            author: text(b"Author"),
            subject: text(b"Subject"),
            keywords: text(b"Keywords"),
            creator: text(b"Creator"),
            producer: text(b"Producer"),
            created: date(b"CreationDate"),
            modified: date(b"ModDate"),
            pdf_version: self.pdf_version(),
            page_count: self.page_count,
            locked: self.locked,
            encryption: self.lookup_metadata(META_ENCRYPTION),
            page_mode: self.page_mode,
        }
    }

    /// The table of contents under a synthetic empty root, or `None` if the
    /// document has no outline.
    pub fn outline(&self) -> Option<Outline> {
        if self.locked {
            return None;
        }
        let handle = self.handle.as_ref()?;
        let graph = handle.load_outline(self.options.max_outline_depth)?;
        Some(Outline::from_graph(&graph))
    }

    /// PDF version as `major + minor / 10`, or 0.0 when unknown.
    pub fn pdf_version(&self) -> f32 {
        self.lookup_metadata(META_FORMAT)
            .and_then(|format| parse_format_version(&format))
            .unwrap_or(0.0)
    }

    /// Engine metadata by key: `format`, `encryption` or `info:<Key>`.
    pub fn lookup_metadata(&self, key: &str) -> Option<String> {
        self.handle.as_ref()?.lookup_metadata(key)
    }

    /// Read the catalog, page count and page mode.
    fn load_catalog(&mut self) -> Result<()> {
        let handle = self.handle.as_ref().ok_or(Error::NotOpen)?;

        let root = handle
            .trailer()
            .get(b"Root")
            .map(|root| handle.resolve_indirect(root))
            .unwrap_or_default();
        let Some(catalog) = root.as_dict() else {
            return Err(Error::MissingObject("Root".to_string()));
        };

        self.page_count = handle.count_pages();
        self.page_mode = catalog
            .get(b"PageMode")
            .map(|mode| handle.resolve_indirect(mode))
            .and_then(|mode| mode.as_name().and_then(PageMode::from_name))
            .unwrap_or_default();
        Ok(())
    }

    /// The info dictionary, loaded on first use.
    fn info_dict(&self) -> Option<&PdfDict> {
        if self.locked {
            return None;
        }
        let handle = self.handle.as_ref()?;
        self.info
            .get_or_init(|| {
                let info = handle.trailer().get(b"Info").cloned()?;
                match handle.resolve_indirect(&info) {
                    PdfObject::Dictionary(dict) => Some(dict),
                    _ => None,
                }
            })
            .as_ref()
    }
}

impl<E: Engine> Drop for Document<E> {
    fn drop(&mut self) {
        // Engine documents go before the engine context itself.
        self.close();
    }
}

impl<E: Engine> std::fmt::Debug for Document<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("open", &self.is_open())
            .field("locked", &self.locked)
            .field("page_count", &self.page_count)
            .field("page_mode", &self.page_mode)
            .finish()
    }
}

/// Parse a `PDF <major>.<minor>` format string.
fn parse_format_version(format: &str) -> Option<f32> {
    static FORMAT: OnceLock<Regex> = OnceLock::new();
    let re = FORMAT.get_or_init(|| Regex::new(r"^PDF (\d+)\.(\d+)").expect("valid regex"));

    let caps = re.captures(format)?;
    let major: u32 = caps[1].parse().ok()?;
    let minor: u32 = caps[2].parse().ok()?;
    Some((major as f64 + minor as f64 / 10.0) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format_version() {
        assert_eq!(parse_format_version("PDF 1.7"), Some(1.7));
        assert_eq!(parse_format_version("PDF 2.0"), Some(2.0));
        assert_eq!(parse_format_version("PDF 1.4 (linearized)"), Some(1.4));
        assert_eq!(parse_format_version("XPS"), None);
        assert_eq!(parse_format_version("PDF one.two"), None);
    }

    #[test]
    fn test_new_document_is_empty() {
        let doc = Document::new();
        assert!(!doc.is_open());
        assert!(!doc.is_locked());
        assert_eq!(doc.page_count(), 0);
        assert_eq!(doc.page_mode(), PageMode::UseNone);
        assert!(doc.info_keys().is_empty());
        assert_eq!(doc.info_key(b"Title"), "");
        assert!(doc.outline().is_none());
        assert_eq!(doc.pdf_version(), 0.0);
        assert!(doc.page(0).bounds().is_none());
    }

    #[test]
    fn test_unlock_without_document() {
        let mut doc = Document::new();
        assert!(matches!(doc.unlock("pw"), Err(Error::NotLocked)));
    }

    #[test]
    fn test_close_twice() {
        let mut doc = Document::new();
        doc.close();
        doc.close();
        assert!(!doc.is_open());
    }

    #[test]
    fn test_load_missing_file() {
        let mut doc = Document::new();
        let result = doc.load("/nonexistent/path/to/file.pdf");
        assert!(matches!(result, Err(Error::Io(_))));
        assert!(!doc.is_open());
    }
}
