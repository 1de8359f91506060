//! Decoding of PDF text strings.
//!
//! Text strings in a PDF (info entries, outline titles) are stored either as
//! UTF-16 with a byte order mark, as UTF-8 with a BOM (PDF 2.0), or in
//! PDFDocEncoding. Everything leaving this crate is UTF-8.

/// PDFDocEncoding code points for 0x18..=0x1F.
const PDFDOC_18_1F: [char; 8] = [
    '\u{02D8}', '\u{02C7}', '\u{02C6}', '\u{02D9}', '\u{02DD}', '\u{02DB}', '\u{02DA}', '\u{02DC}',
];

/// PDFDocEncoding code points for 0x80..=0xA0. 0x9F is undefined.
const PDFDOC_80_A0: [char; 33] = [
    '\u{2022}', '\u{2020}', '\u{2021}', '\u{2026}', '\u{2014}', '\u{2013}', '\u{0192}', '\u{2044}',
    '\u{2039}', '\u{203A}', '\u{2212}', '\u{2030}', '\u{201E}', '\u{201C}', '\u{201D}', '\u{2018}',
    '\u{2019}', '\u{201A}', '\u{2122}', '\u{FB01}', '\u{FB02}', '\u{0141}', '\u{0152}', '\u{0160}',
    '\u{0178}', '\u{017D}', '\u{0131}', '\u{0142}', '\u{0153}', '\u{0161}', '\u{017E}', '\u{FFFD}',
    '\u{20AC}',
];

/// Decode a PDF text string into UTF-8.
pub fn decode_pdf_string(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, u16::from_be_bytes),
        [0xFF, 0xFE, rest @ ..] => decode_utf16(rest, u16::from_le_bytes),
        [0xEF, 0xBB, 0xBF, rest @ ..] => String::from_utf8_lossy(rest).into_owned(),
        _ => bytes.iter().map(|&b| pdfdoc_char(b)).collect(),
    }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> String {
    // A trailing odd byte is dropped.
    let units = bytes.chunks_exact(2).map(|c| unit([c[0], c[1]]));
    char::decode_utf16(units)
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

/// Map one PDFDocEncoding byte to its character.
pub fn pdfdoc_char(byte: u8) -> char {
    match byte {
        0x18..=0x1F => PDFDOC_18_1F[(byte - 0x18) as usize],
        0x80..=0xA0 => PDFDOC_80_A0[(byte - 0x80) as usize],
        0xAD => char::REPLACEMENT_CHARACTER,
        _ => byte as char,
    }
}
