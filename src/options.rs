//! Options for loading documents.

/// Default limit on outline nesting.
pub const DEFAULT_MAX_OUTLINE_DEPTH: usize = 64;

/// Options applied by [`Document::load`](crate::Document::load) and
/// [`Document::outline`](crate::Document::outline).
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Password tried right after loading when the document is locked
    pub password: Option<String>,

    /// Outline levels deeper than this are dropped
    pub max_outline_depth: usize,

    /// Hold `LC_NUMERIC` at "C" while the engine opens the file
    pub locale_guard: bool,
}

impl LoadOptions {
    /// Create new load options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the password to try after loading.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the outline depth limit. Zero is treated as one.
    pub fn with_max_outline_depth(mut self, depth: usize) -> Self {
        self.max_outline_depth = depth.max(1);
        self
    }

    /// Enable or disable the numeric locale guard.
    pub fn with_locale_guard(mut self, enabled: bool) -> Self {
        self.locale_guard = enabled;
        self
    }
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            password: None,
            max_outline_depth: DEFAULT_MAX_OUTLINE_DEPTH,
            locale_guard: true,
        }
    }
}
