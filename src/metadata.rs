//! Document-level metadata types.

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// How a viewer should initially present the document, from the catalog's
/// `/PageMode` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PageMode {
    /// Neither outline nor thumbnails visible
    #[default]
    UseNone,
    /// Outline panel visible
    UseOutlines,
    /// Thumbnail panel visible
    UseThumbs,
    /// Full-screen mode
    FullScreen,
    /// Optional content panel visible
    UseOC,
    /// Attachments panel visible
    UseAttachments,
}

impl PageMode {
    /// Map a `/PageMode` name. Unknown names give `None`.
    pub fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"UseNone" => Some(PageMode::UseNone),
            b"UseOutlines" => Some(PageMode::UseOutlines),
            b"UseThumbs" => Some(PageMode::UseThumbs),
            b"FullScreen" => Some(PageMode::FullScreen),
            b"UseOC" => Some(PageMode::UseOC),
            b"UseAttachments" => Some(PageMode::UseAttachments),
            _ => None,
        }
    }

    /// The PDF name of this mode.
    pub fn as_name(&self) -> &'static str {
        match self {
            PageMode::UseNone => "UseNone",
            PageMode::UseOutlines => "UseOutlines",
            PageMode::UseThumbs => "UseThumbs",
            PageMode::FullScreen => "FullScreen",
            PageMode::UseOC => "UseOC",
            PageMode::UseAttachments => "UseAttachments",
        }
    }
}

impl std::fmt::Display for PageMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_name())
    }
}

/// Document metadata collected from the info dictionary and the catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    /// Document title
    pub title: Option<String>,

    /// Document author
    pub author: Option<String>,

    /// Document subject
    pub subject: Option<String>,

    /// Keywords
    pub keywords: Option<String>,

    /// Creator application
    pub creator: Option<String>,

    /// PDF producer
    pub producer: Option<String>,

    /// Creation date
    pub created: Option<DateTime<Utc>>,

    /// Last modification date
    pub modified: Option<DateTime<Utc>>,

    /// PDF version, 0.0 if unknown
    pub pdf_version: f32,

    /// Total number of pages
    pub page_count: usize,

    /// Whether the document still needs a password
    pub locked: bool,

    /// Encryption method, if any
    pub encryption: Option<String>,

    /// Initial page mode
    pub page_mode: PageMode,
}

/// Parse a PDF date string (`D:YYYYMMDDHHmmSSOHH'mm'`).
///
/// Every field after the year is optional. A missing offset means UTC.
pub fn parse_pdf_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    let s = s.strip_prefix("D:").unwrap_or(s);

    // At minimum we need YYYY
    let year: i32 = s.get(0..4)?.parse().ok()?;
    let field = |range: std::ops::Range<usize>, default: u32| -> Option<u32> {
        match s.get(range) {
            Some(digits) if digits.bytes().all(|b| b.is_ascii_digit()) => digits.parse().ok(),
            _ => Some(default),
        }
    };
    let month = field(4..6, 1)?;
    let day = field(6..8, 1)?;
    let hour = field(8..10, 0)?;
    let minute = field(10..12, 0)?;
    let second = field(12..14, 0)?;

    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)?;
    let offset = parse_offset(s.get(14..).unwrap_or(""))?;
    let local = offset.from_local_datetime(&naive).single()?;
    Some(local.with_timezone(&Utc))
}

/// Parse the `OHH'mm'` suffix of a PDF date.
fn parse_offset(s: &str) -> Option<FixedOffset> {
    let mut chars = s.chars();
    let sign = match chars.next() {
        None | Some('Z') => return FixedOffset::east_opt(0),
        Some('+') => 1,
        Some('-') => -1,
        Some(_) => return FixedOffset::east_opt(0),
    };

    let rest: String = chars.filter(|c| c.is_ascii_digit()).collect();
    let hours: i32 = rest.get(0..2).and_then(|h| h.parse().ok()).unwrap_or(0);
    let minutes: i32 = rest.get(2..4).and_then(|m| m.parse().ok()).unwrap_or(0);
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
