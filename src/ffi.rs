//! C-ABI FFI bindings for cross-language integration.
//!
//! This module exposes [`Document`] to host applications written in other
//! languages through an opaque handle. Strings returned to the caller are
//! owned by this library and must be released with `pdfdoc_free_string` or
//! `pdfdoc_free_result`.

use std::ffi::{c_char, CStr, CString};
use std::ptr;

use crate::Document;

/// Opaque document handle.
pub struct PdfdocDocument {
    inner: Document,
}

/// Result structure returned by FFI functions.
#[repr(C)]
pub struct PdfdocResult {
    /// Whether the operation succeeded.
    pub success: bool,
    /// The result data (null if failed or empty). Must be freed with `pdfdoc_free_string`.
    pub data: *mut c_char,
    /// Error message (null if succeeded). Must be freed with `pdfdoc_free_string`.
    pub error: *mut c_char,
}

impl PdfdocResult {
    fn success(data: Option<String>) -> Self {
        Self {
            success: true,
            data: data.map_or(ptr::null_mut(), into_c_string),
            error: ptr::null_mut(),
        }
    }

    fn error(message: String) -> Self {
        Self {
            success: false,
            data: ptr::null_mut(),
            error: into_c_string(message),
        }
    }
}

fn into_c_string(s: String) -> *mut c_char {
    CString::new(s).unwrap_or_default().into_raw()
}

/// Borrow a C string argument as UTF-8.
unsafe fn str_arg<'a>(ptr: *const c_char, what: &str) -> Result<&'a str, String> {
    if ptr.is_null() {
        return Err(format!("{} cannot be null", what));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| format!("Invalid UTF-8 {}", what.to_lowercase()))
}

/// Create an empty document.
///
/// The returned handle must be freed with `pdfdoc_document_free`.
#[no_mangle]
pub extern "C" fn pdfdoc_document_new() -> *mut PdfdocDocument {
    Box::into_raw(Box::new(PdfdocDocument {
        inner: Document::new(),
    }))
}

/// Free a document handle, closing the document.
///
/// # Safety
///
/// The `doc` must be null or have been returned by `pdfdoc_document_new`.
/// This function should only be called once per handle.
#[no_mangle]
pub unsafe extern "C" fn pdfdoc_document_free(doc: *mut PdfdocDocument) {
    if !doc.is_null() {
        drop(Box::from_raw(doc));
    }
}

/// Load a PDF file into the document.
///
/// # Safety
///
/// The `doc` must be a valid handle. The `path` must be a valid
/// null-terminated UTF-8 string. The returned result must be freed with
/// `pdfdoc_free_result`.
#[no_mangle]
pub unsafe extern "C" fn pdfdoc_document_load(
    doc: *mut PdfdocDocument,
    path: *const c_char,
) -> PdfdocResult {
    let Some(doc) = doc.as_mut() else {
        return PdfdocResult::error("Document cannot be null".to_string());
    };
    let path = match str_arg(path, "Path") {
        Ok(s) => s,
        Err(e) => return PdfdocResult::error(e),
    };

    match doc.inner.load(path) {
        Ok(()) => PdfdocResult::success(None),
        Err(e) => PdfdocResult::error(e.to_string()),
    }
}

/// Close the document. Does nothing if it is not open.
///
/// # Safety
///
/// The `doc` must be null or a valid handle.
#[no_mangle]
pub unsafe extern "C" fn pdfdoc_document_close(doc: *mut PdfdocDocument) {
    if let Some(doc) = doc.as_mut() {
        doc.inner.close();
    }
}

/// Whether the document still needs a password.
///
/// # Safety
///
/// The `doc` must be null or a valid handle.
#[no_mangle]
pub unsafe extern "C" fn pdfdoc_document_is_locked(doc: *const PdfdocDocument) -> bool {
    doc.as_ref().is_some_and(|doc| doc.inner.is_locked())
}

/// Try to unlock the document. Returns true on success.
///
/// # Safety
///
/// The `doc` must be null or a valid handle. The `password` must be a valid
/// null-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn pdfdoc_document_unlock(
    doc: *mut PdfdocDocument,
    password: *const c_char,
) -> bool {
    let Some(doc) = doc.as_mut() else {
        return false;
    };
    let Ok(password) = str_arg(password, "Password") else {
        return false;
    };
    doc.inner.unlock(password).is_ok()
}

/// Number of pages. Returns -1 if `doc` is null.
///
/// # Safety
///
/// The `doc` must be null or a valid handle.
#[no_mangle]
pub unsafe extern "C" fn pdfdoc_document_page_count(doc: *const PdfdocDocument) -> i32 {
    match doc.as_ref() {
        Some(doc) => i32::try_from(doc.inner.page_count()).unwrap_or(i32::MAX),
        None => -1,
    }
}

/// Initial page mode as a PDF name such as `UseOutlines`.
///
/// # Safety
///
/// The `doc` must be null or a valid handle. A non-null return value must be
/// freed with `pdfdoc_free_string`.
#[no_mangle]
pub unsafe extern "C" fn pdfdoc_document_page_mode(doc: *const PdfdocDocument) -> *mut c_char {
    match doc.as_ref() {
        Some(doc) => into_c_string(doc.inner.page_mode().as_name().to_string()),
        None => ptr::null_mut(),
    }
}

/// PDF version, 0.0 when unknown or `doc` is null.
///
/// # Safety
///
/// The `doc` must be null or a valid handle.
#[no_mangle]
pub unsafe extern "C" fn pdfdoc_document_pdf_version(doc: *const PdfdocDocument) -> f32 {
    doc.as_ref().map_or(0.0, |doc| doc.inner.pdf_version())
}

/// Text of an info dictionary entry; empty if missing.
///
/// # Safety
///
/// The `doc` must be null or a valid handle. The `key` must be a valid
/// null-terminated string. A non-null return value must be freed with
/// `pdfdoc_free_string`.
#[no_mangle]
pub unsafe extern "C" fn pdfdoc_document_info_key(
    doc: *const PdfdocDocument,
    key: *const c_char,
) -> *mut c_char {
    let Some(doc) = doc.as_ref() else {
        return ptr::null_mut();
    };
    if key.is_null() {
        return ptr::null_mut();
    }
    let key = CStr::from_ptr(key).to_bytes();
    into_c_string(doc.inner.info_key(key))
}

/// Info dictionary keys as a JSON array of strings.
///
/// # Safety
///
/// The `doc` must be a valid handle. The returned result must be freed with
/// `pdfdoc_free_result`.
#[no_mangle]
pub unsafe extern "C" fn pdfdoc_document_info_keys_json(
    doc: *const PdfdocDocument,
) -> PdfdocResult {
    let Some(doc) = doc.as_ref() else {
        return PdfdocResult::error("Document cannot be null".to_string());
    };

    let keys: Vec<String> = doc
        .inner
        .info_keys()
        .iter()
        .map(|k| String::from_utf8_lossy(k).into_owned())
        .collect();
    match serde_json::to_string(&keys) {
        Ok(json) => PdfdocResult::success(Some(json)),
        Err(e) => PdfdocResult::error(e.to_string()),
    }
}

/// Outline tree as JSON. `data` is null when the document has no outline.
///
/// # Safety
///
/// The `doc` must be a valid handle. The returned result must be freed with
/// `pdfdoc_free_result`.
#[no_mangle]
pub unsafe extern "C" fn pdfdoc_document_outline_json(
    doc: *const PdfdocDocument,
    pretty: bool,
) -> PdfdocResult {
    let Some(doc) = doc.as_ref() else {
        return PdfdocResult::error("Document cannot be null".to_string());
    };
    let Some(outline) = doc.inner.outline() else {
        return PdfdocResult::success(None);
    };

    let json = if pretty {
        serde_json::to_string_pretty(&outline)
    } else {
        serde_json::to_string(&outline)
    };
    match json {
        Ok(json) => PdfdocResult::success(Some(json)),
        Err(e) => PdfdocResult::error(e.to_string()),
    }
}

/// Free a result returned by any pdfdoc function.
///
/// # Safety
///
/// The `result` must have been returned by a pdfdoc function.
/// This function should only be called once per result.
#[no_mangle]
pub unsafe extern "C" fn pdfdoc_free_result(result: PdfdocResult) {
    if !result.data.is_null() {
        drop(CString::from_raw(result.data));
    }
    if !result.error.is_null() {
        drop(CString::from_raw(result.error));
    }
}

/// Free a string allocated by pdfdoc.
///
/// # Safety
///
/// The `ptr` must have been allocated by pdfdoc.
/// This function should only be called once per pointer.
#[no_mangle]
pub unsafe extern "C" fn pdfdoc_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

/// Get the version of the pdfdoc library.
///
/// The returned string is statically allocated and should not be freed.
#[no_mangle]
pub extern "C" fn pdfdoc_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
