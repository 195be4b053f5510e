//! XML Parser Module
//!
//! Turns the bytes of a `<feedback>` document into an [`Aggregate`] through
//! quick-xml's serde deserializer. Before deserializing, the prolog is scanned
//! so that a wrong root element is reported as such, and DOCTYPE blocks that
//! declare entities are refused outright (XXE, Billion Laughs). This is
//! stricter than XML itself: a declaration is refused even when no element
//! references it.

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use quick_xml::DeError;

use crate::error::{DmarcError, Result};
use crate::models::Aggregate;

const ROOT: &[u8] = b"feedback";

/// Parses a complete DMARC aggregate report document.
///
/// # Errors
///
/// `Parse` for malformed XML, a root other than `<feedback>`, entity
/// declarations or a field of the wrong type; `MalformedField` for a date
/// range bound that is not a unix timestamp.
pub fn parse_aggregate(xml: &[u8]) -> Result<Aggregate> {
    check_prolog(xml)?;
    let aggregate: Aggregate = quick_xml::de::from_reader(xml)?;
    Ok(aggregate)
}

/// Reads events up to the root element and checks its name.
fn check_prolog(xml: &[u8]) -> Result<()> {
    let mut reader = Reader::from_reader(xml);
    loop {
        match reader.read_event() {
            Ok(Event::DocType(doctype)) => {
                if doctype.windows(8).any(|w| w == b"<!ENTITY") {
                    return Err(parse_error("DOCTYPE entity declarations are not supported"));
                }
            }
            Ok(Event::Start(root)) | Ok(Event::Empty(root)) => {
                let name = root.local_name();
                if name.as_ref() != ROOT {
                    return Err(parse_error(&format!(
                        "expected root element <feedback>, found <{}>",
                        String::from_utf8_lossy(name.as_ref())
                    )));
                }
                return Ok(());
            }
            Ok(Event::Eof) => return Err(parse_error("document has no root element")),
            Err(e) => return Err(DmarcError::Parse(DeError::from(e))),
            _ => {}
        }
    }
}

fn parse_error(message: &str) -> DmarcError {
    DmarcError::Parse(DeError::Custom(message.to_string()))
}
