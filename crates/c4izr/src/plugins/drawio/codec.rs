//! Compressed `<diagram>` payloads
//!
//! draw.io stores a compressed page as
//! `base64(deflate_raw(encodeURIComponent(xml)))`.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::io::{Read, Write};
use tracing::trace;

use crate::core::{C4Error, Result};

/// Characters left alone by JavaScript's `encodeURIComponent`
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Decode the text content of a `<diagram>` element into graph-model XML
///
/// Payloads that already are XML are returned as-is.
pub fn decode_diagram_data(data: &str) -> Result<String> {
    let trimmed = data.trim();
    if trimmed.starts_with('<') {
        return Ok(trimmed.to_string());
    }

    let compact: String = trimmed.split_whitespace().collect();
    let deflated = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| C4Error::parse_error(format!("diagram payload is not base64: {}", e)))?;

    let mut inflated = Vec::new();
    DeflateDecoder::new(deflated.as_slice())
        .read_to_end(&mut inflated)
        .map_err(|e| C4Error::parse_error(format!("diagram payload does not inflate: {}", e)))?;

    let encoded = String::from_utf8(inflated)
        .map_err(|_| C4Error::parse_error("inflated diagram payload is not UTF-8"))?;
    let xml = percent_decode_str(&encoded)
        .decode_utf8()
        .map_err(|_| C4Error::parse_error("diagram payload is not valid percent-encoded UTF-8"))?;

    trace!(
        payload_len = trimmed.len(),
        xml_len = xml.len(),
        "Decoded compressed diagram"
    );
    Ok(xml.into_owned())
}

/// Encode graph-model XML the way draw.io compresses pages
pub fn encode_diagram_data(xml: &str) -> Result<String> {
    let encoded = utf8_percent_encode(xml, URI_COMPONENT).to_string();
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(encoded.as_bytes())?;
    let deflated = encoder.finish()?;
    Ok(STANDARD.encode(deflated))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_xml_passes_through() {
        let xml = "  <mxGraphModel><root/></mxGraphModel>\n";
        assert_eq!(
            decode_diagram_data(xml).unwrap(),
            "<mxGraphModel><root/></mxGraphModel>"
        );
    }

    #[test]
    fn test_encode_then_decode() {
        let xml = r#"<mxGraphModel><root><mxCell id="0"/><mxCell id="a" value="Café &amp; Bar"/></root></mxGraphModel>"#;
        let payload = encode_diagram_data(xml).unwrap();
        assert!(!payload.contains('<'));
        assert_eq!(decode_diagram_data(&payload).unwrap(), xml);
    }

    #[test]
    fn test_uri_component_set_matches_javascript() {
        let encoded = utf8_percent_encode("a b/c?(x)!*'~-_.", URI_COMPONENT).to_string();
        assert_eq!(encoded, "a%20b%2Fc%3F(x)!*'~-_.");
    }

    #[test]
    fn test_garbage_payload_is_parse_error() {
        let result = decode_diagram_data("%%% not base64 %%%");
        assert!(matches!(result, Err(C4Error::Parse { .. })));
    }
}
