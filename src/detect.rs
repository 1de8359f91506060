//! PDF header sniffing.
//!
//! The engine only accepts PDF content. Before handing bytes to the parser we
//! look for the `%PDF-x.y` marker, which may be preceded by a little junk.

use crate::error::{Error, Result};

/// Header marker that starts every PDF file.
const PDF_MAGIC: &[u8] = b"%PDF-";

/// How far into the file the marker may appear.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// Version information read from the file header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeaderVersion {
    pub major: u8,
    pub minor: u8,
}

impl std::fmt::Display for HeaderVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Locate the PDF header and parse its version.
///
/// Returns `Error::UnknownFormat` when no marker is found. A marker followed
/// by something other than `major.minor` still counts as PDF; its version is
/// reported as `0.0`.
pub fn sniff_header(data: &[u8]) -> Result<HeaderVersion> {
    let window = &data[..data.len().min(HEADER_SEARCH_WINDOW)];
    let start = window
        .windows(PDF_MAGIC.len())
        .position(|w| w == PDF_MAGIC)
        .ok_or(Error::UnknownFormat)?;

    let rest = &data[start + PDF_MAGIC.len()..];
    match parse_version(rest) {
        Some(version) => Ok(version),
        None => {
            let shown: String = rest
                .iter()
                .take(4)
                .map(|&b| if b.is_ascii_graphic() { b as char } else { '?' })
                .collect();
            log::warn!("unreadable PDF header version {:?}, using 0.0", shown);
            Ok(HeaderVersion::default())
        }
    }
}

/// `major.minor`, each one or more ASCII digits.
fn parse_version(rest: &[u8]) -> Option<HeaderVersion> {
    let digits = |bytes: &[u8]| -> Option<(u8, usize)> {
        let len = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
        let value = std::str::from_utf8(&bytes[..len]).ok()?.parse().ok()?;
        Some((value, len))
    };

    let (major, len) = digits(rest)?;
    let rest = rest[len..].strip_prefix(b".")?;
    let (minor, _) = digits(rest)?;
    Some(HeaderVersion { major, minor })
}

/// Check if bytes start like a PDF file.
pub fn is_pdf_bytes(data: &[u8]) -> bool {
    sniff_header(data).is_ok()
}
