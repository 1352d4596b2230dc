//! Tolerant decoding of legacy project files.
//!
//! Files are nominally UTF-8, but the iOS writer produced UTF-16 behind an
//! unchanged declaration, and some third-party exporters used single-byte
//! encodings that only the declaration names. Strategies are tried in that
//! order; the first that yields text wins.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::error::{Error, Result};

static DECLARED_ENCODING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"encoding\s*=\s*["']([A-Za-z0-9._-]+)["']"#).unwrap());

/// Decode raw project file bytes to text.
pub fn decode_document(raw: &[u8]) -> Result<String> {
    match std::str::from_utf8(raw) {
        Ok(text) => return Ok(text.trim_start_matches('\u{feff}').to_string()),
        Err(err) => debug!(error = %err, "project file is not UTF-8, trying UTF-16"),
    }

    if let Some(text) = decode_utf16(raw) {
        return Ok(text);
    }
    debug!("project file is not UTF-16, checking the XML declaration");

    decode_declared(raw)
}

fn decode_utf16(raw: &[u8]) -> Option<String> {
    let (payload, big_endian) = match raw {
        [0xff, 0xfe, rest @ ..] => (rest, false),
        [0xfe, 0xff, rest @ ..] => (rest, true),
        _ => (raw, false),
    };
    if payload.len() % 2 != 0 {
        return None;
    }
    let units: Vec<u16> = payload
        .chunks_exact(2)
        .map(|pair| {
            if big_endian {
                u16::from_be_bytes([pair[0], pair[1]])
            } else {
                u16::from_le_bytes([pair[0], pair[1]])
            }
        })
        .collect();
    String::from_utf16(&units).ok()
}

/// Last resort: honor a single-byte encoding named in the XML declaration.
fn decode_declared(raw: &[u8]) -> Result<String> {
    let head: String = raw
        .iter()
        .take(256)
        .map(|&byte| char::from(byte))
        .collect();
    let declared = DECLARED_ENCODING
        .captures(&head)
        .map(|caps| caps[1].to_ascii_lowercase());

    match declared.as_deref() {
        Some("iso-8859-1" | "latin1" | "latin-1" | "windows-1252" | "cp1252") => {
            debug!(encoding = declared.as_deref().unwrap_or_default(), "decoding as Latin-1");
            Ok(raw.iter().map(|&byte| char::from(byte)).collect())
        }
        Some(other) => Err(Error::parse(format!(
            "file is neither UTF-8 nor UTF-16 and declares unsupported encoding '{other}'"
        ))),
        None => Err(Error::parse(
            "file is neither UTF-8 nor UTF-16 and declares no encoding",
        )),
    }
}

/// Drop code points that XML 1.0 forbids in character data.
pub fn strip_illegal_characters(text: &str) -> String {
    text.chars().filter(|&c| is_xml_char(c)).collect()
}

fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\t' | '\n' | '\r'
        | '\u{20}'..='\u{d7ff}'
        | '\u{e000}'..='\u{fffd}'
        | '\u{10000}'..='\u{10ffff}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_passes_through() {
        assert_eq!(decode_document("<a>ä</a>".as_bytes()).unwrap(), "<a>ä</a>");
    }

    #[test]
    fn utf16_le_with_bom_is_decoded() {
        let text = "<a>ok</a>";
        let mut raw = vec![0xff, 0xfe];
        for unit in text.encode_utf16() {
            raw.extend_from_slice(&unit.to_le_bytes());
        }
        // A lone 0xff prefix keeps the bytes out of the UTF-8 path.
        assert_eq!(decode_document(&raw).unwrap(), text);
    }

    #[test]
    fn declared_latin1_is_decoded() {
        let mut raw = b"<?xml version=\"1.0\" encoding=\"iso-8859-1\"?><a>".to_vec();
        raw.push(0xe4); // "ä" in Latin-1; invalid UTF-8, odd length for UTF-16
        raw.extend_from_slice(b"</a>");
        assert_eq!(
            decode_document(&raw).unwrap(),
            "<?xml version=\"1.0\" encoding=\"iso-8859-1\"?><a>\u{e4}</a>"
        );
    }

    #[test]
    fn undeclared_binary_is_rejected() {
        let raw = [0x00u8, 0xff, 0x00, 0xfe, 0x01];
        assert!(decode_document(&raw).is_err());
    }

    #[test]
    fn illegal_characters_are_stripped() {
        assert_eq!(
            strip_illegal_characters("a\u{0}b\tc\u{b}d\u{fffe}e"),
            "ab\tcde"
        );
    }
}
