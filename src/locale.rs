//! Scoped numeric locale switching.
//!
//! Number parsing in some PDF engines follows `LC_NUMERIC`. While a document
//! is being opened the numeric locale is forced to "C" and put back when the
//! guard goes out of scope, on success and failure alike.
//!
//! The locale is process-wide state. Guards in different threads are
//! serialized through one mutex so they cannot interleave their switch and
//! restore, but `setlocale` calls made outside a guard are not covered.
//! Guards must not be nested on one thread.

#[cfg(unix)]
use std::sync::{Mutex, MutexGuard, PoisonError};

#[cfg(unix)]
static LOCALE_SWITCH: Mutex<()> = Mutex::new(());

/// Holds `LC_NUMERIC` at "C" until dropped.
pub struct NumericLocaleGuard {
    #[cfg(unix)]
    saved: Option<std::ffi::CString>,
    #[cfg(unix)]
    _switch: MutexGuard<'static, ()>,
}

impl NumericLocaleGuard {
    /// Switch `LC_NUMERIC` to "C", remembering the previous value.
    #[cfg(unix)]
    pub fn c_locale() -> Self {
        use std::ffi::CStr;

        let switch = LOCALE_SWITCH.lock().unwrap_or_else(PoisonError::into_inner);

        // SAFETY: a null locale argument only queries; the returned pointer is
        // copied before the next setlocale call can invalidate it.
        let saved = unsafe {
            let current = libc::setlocale(libc::LC_NUMERIC, std::ptr::null());
            if current.is_null() {
                None
            } else {
                Some(CStr::from_ptr(current).to_owned())
            }
        };

        // SAFETY: the argument is a valid NUL-terminated string.
        unsafe {
            libc::setlocale(libc::LC_NUMERIC, b"C\0".as_ptr().cast());
        }

        log::trace!("LC_NUMERIC switched to C (was {:?})", saved);
        Self {
            saved,
            _switch: switch,
        }
    }

    #[cfg(not(unix))]
    pub fn c_locale() -> Self {
        Self {}
    }

    /// The locale that will be restored, if one was recorded.
    #[cfg(unix)]
    pub fn saved(&self) -> Option<&str> {
        self.saved.as_deref().and_then(|s| s.to_str().ok())
    }

    #[cfg(not(unix))]
    pub fn saved(&self) -> Option<&str> {
        None
    }
}

impl NumericLocaleGuard {
    #[cfg(unix)]
    fn restore(&mut self) {
        if let Some(saved) = self.saved.take() {
            // SAFETY: `saved` is a NUL-terminated copy of a locale name
            // previously returned by setlocale.
            unsafe {
                libc::setlocale(libc::LC_NUMERIC, saved.as_ptr());
            }
        }
    }

    #[cfg(not(unix))]
    fn restore(&mut self) {}
}

impl Drop for NumericLocaleGuard {
    fn drop(&mut self) {
        self.restore();
    }
}

/// Current `LC_NUMERIC` name.
#[cfg(unix)]
pub fn current_numeric_locale() -> Option<String> {
    // SAFETY: query only, copied immediately.
    unsafe {
        let current = libc::setlocale(libc::LC_NUMERIC, std::ptr::null());
        if current.is_null() {
            None
        } else {
            Some(std::ffi::CStr::from_ptr(current).to_string_lossy().into_owned())
        }
    }
}
