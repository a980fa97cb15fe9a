//! Parser for the XML dump produced by `nvidia-smi -q -x`.
//!
//! Parsing happens in two passes over the same text:
//! 1. a streaming structural check (well-formed, single `<nvidia_smi_log>`
//!    root, nothing truncated);
//! 2. serde deserialization into [`SystemSnapshot`], ignoring every element
//!    the model does not name.
//!
//! The second pass alone would accept a truncated document or a foreign
//! root element, hence the first.

use quick_xml::Reader;
use quick_xml::events::Event;

use super::{ParseError, ensure_complete};
use crate::model::SystemSnapshot;

/// Root element of the tool's XML dump.
pub const ROOT_ELEMENT: &str = "nvidia_smi_log";

/// Parses raw XML output into a snapshot.
///
/// Fails with [`ParseError::Malformed`] for anything that is not a complete
/// `<nvidia_smi_log>` document, and with [`ParseError::Incomplete`] when the
/// document carries no driver version.
pub fn parse_xml(raw: &[u8]) -> Result<SystemSnapshot, ParseError> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| ParseError::Malformed(format!("output is not UTF-8: {}", e)))?;

    check_document(text)?;

    let snapshot: SystemSnapshot = quick_xml::de::from_str(text)
        .map_err(|e| ParseError::Malformed(format!("unexpected document shape: {}", e)))?;

    ensure_complete(snapshot)
}

/// Walks the whole document once, verifying structure without building anything.
fn check_document(text: &str) -> Result<(), ParseError> {
    let mut reader = Reader::from_str(text);
    let mut depth: usize = 0;
    let mut root_seen = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if depth == 0 {
                    check_root(&mut root_seen, e.name().as_ref())?;
                }
                depth += 1;
            }
            Ok(Event::Empty(e)) => {
                if depth == 0 {
                    check_root(&mut root_seen, e.name().as_ref())?;
                }
            }
            Ok(Event::End(_)) => {
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Text(t)) => {
                if depth == 0 && !t.iter().all(u8::is_ascii_whitespace) {
                    return Err(ParseError::Malformed(
                        "text outside of the root element".to_string(),
                    ));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ParseError::Malformed(format!(
                    "invalid XML at byte {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
        }
    }

    if !root_seen {
        return Err(ParseError::Malformed("no root element".to_string()));
    }
    if depth != 0 {
        return Err(ParseError::Malformed(format!(
            "document truncated with {} unclosed element(s)",
            depth
        )));
    }

    Ok(())
}

fn check_root(root_seen: &mut bool, name: &[u8]) -> Result<(), ParseError> {
    if *root_seen {
        return Err(ParseError::Malformed("multiple root elements".to_string()));
    }
    *root_seen = true;

    if name != ROOT_ELEMENT.as_bytes() {
        return Err(ParseError::Malformed(format!(
            "unexpected root element <{}>, expected <{}>",
            String::from_utf8_lossy(name),
            ROOT_ELEMENT
        )));
    }
    Ok(())
}
