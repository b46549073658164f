//! Stylesheet loading checks.
//!
//! External engines compile the stylesheet on every invocation, so a broken
//! stylesheet would otherwise surface once per input file. Checking it up front
//! turns that into a single fatal error before any output is written.

use super::backend::TransformError;
use encoding_rs::{Encoding, UTF_8};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::borrow::Cow;
use std::fs;
use std::path::Path;

/// The document element of a parsed XML file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RootElement {
    pub name: String,
    local_name: String,
    has_xsl_version: bool,
}

impl RootElement {
    fn from_start(e: &BytesStart) -> Self {
        let has_xsl_version = e.attributes().flatten().any(|attr| {
            attr.key.local_name().as_ref() == b"version"
                && attr.key.prefix().is_some_and(|p| p.as_ref() == b"xsl")
        });
        Self {
            name: String::from_utf8_lossy(e.name().as_ref()).to_string(),
            local_name: String::from_utf8_lossy(e.local_name().as_ref()).to_string(),
            has_xsl_version,
        }
    }

    /// `xsl:stylesheet`, `xsl:transform`, or a simplified stylesheet
    /// (literal result element carrying `xsl:version`).
    pub fn is_stylesheet(&self) -> bool {
        self.local_name == "stylesheet" || self.local_name == "transform" || self.has_xsl_version
    }
}

/// Parse `xml` completely and return its document element.
///
/// Fails on syntax errors, mismatched or unclosed tags, a missing root,
/// or more than one root element.
pub(crate) fn root_element(xml: &str) -> Result<RootElement, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut root: Option<RootElement> = None;
    let mut depth = 0usize;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| format!("{e} (at byte {})", reader.buffer_position()))?;

        match event {
            Event::Start(e) | Event::Empty(e) if depth == 0 && root.is_some() => {
                return Err(format!(
                    "more than one root element (second is <{}>)",
                    String::from_utf8_lossy(e.name().as_ref())
                ));
            }
            Event::Start(e) => {
                if depth == 0 {
                    root = Some(RootElement::from_start(&e));
                }
                depth += 1;
            }
            Event::Empty(e) => {
                if depth == 0 {
                    root = Some(RootElement::from_start(&e));
                }
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if depth != 0 {
        return Err("unexpected end of document: unclosed element".to_string());
    }
    root.ok_or_else(|| "document has no root element".to_string())
}

/// Decode raw XML bytes to text.
///
/// A byte order mark wins, then the `encoding` of the XML declaration.
/// Documents declaring neither must be UTF-8.
pub(crate) fn decode_xml(bytes: &[u8]) -> Result<Cow<'_, str>, String> {
    let encoding = match declared_encoding(bytes) {
        Some(label) => Encoding::for_label(&label).ok_or_else(|| {
            format!(
                "unsupported encoding \"{}\"",
                String::from_utf8_lossy(&label)
            )
        })?,
        None => UTF_8,
    };
    let (text, used, malformed) = encoding.decode(bytes);
    if malformed {
        return Err(format!("document is not valid {}", used.name()));
    }
    Ok(text)
}

/// The `encoding` pseudo-attribute of a leading XML declaration.
fn declared_encoding(bytes: &[u8]) -> Option<Vec<u8>> {
    match Reader::from_reader(bytes).read_event() {
        Ok(Event::Decl(decl)) => decl.encoding()?.ok().map(|label| label.into_owned()),
        _ => None,
    }
}

/// Decode `bytes` and return the document element.
pub(crate) fn document_root(bytes: &[u8]) -> Result<RootElement, String> {
    root_element(&decode_xml(bytes)?)
}

/// Verify that `path` holds a loadable XSLT stylesheet.
pub fn check_stylesheet(path: &Path) -> Result<(), TransformError> {
    if !path.is_file() {
        return Err(TransformError::StylesheetNotFound(path.to_path_buf()));
    }

    let bytes = fs::read(path)?;
    let invalid = |reason: String| TransformError::InvalidStylesheet {
        path: path.to_path_buf(),
        reason,
    };

    let root = document_root(&bytes).map_err(invalid)?;
    if !root.is_stylesheet() {
        return Err(invalid(format!(
            "root element <{}> is not an XSLT stylesheet",
            root.name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const XSL: &str = r#"<?xml version="1.0"?>
<xsl:stylesheet version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform">
  <xsl:template match="/"><html><xsl:value-of select="/node/name"/></html></xsl:template>
</xsl:stylesheet>"#;

    #[test]
    fn root_element_of_simple_document() {
        let root = root_element("<?xml version=\"1.0\"?><node><name>Tick</name></node>").unwrap();
        assert_eq!(root.name, "node");
        assert!(!root.is_stylesheet());
    }

    #[test]
    fn root_element_empty_root() {
        assert_eq!(root_element("<index/>").unwrap().name, "index");
    }

    #[test]
    fn root_element_rejects_mismatched_tags() {
        assert!(root_element("<node><a></b></node>").is_err());
    }

    #[test]
    fn root_element_rejects_unclosed_root() {
        assert!(root_element("<node><a></a>").is_err());
    }

    #[test]
    fn root_element_rejects_empty_document() {
        let err = root_element("   ").unwrap_err();
        assert!(err.contains("no root"));
    }

    #[test]
    fn root_element_rejects_two_roots() {
        let err = root_element("<a/><b/>").unwrap_err();
        assert!(err.contains("more than one root"));
    }

    #[test]
    fn stylesheet_and_transform_roots_accepted() {
        assert!(root_element(XSL).unwrap().is_stylesheet());
        assert!(
            root_element(r#"<xsl:transform version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform"/>"#)
                .unwrap()
                .is_stylesheet()
        );
    }

    #[test]
    fn simplified_stylesheet_accepted() {
        let xml = r#"<html xsl:version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform"><body/></html>"#;
        assert!(root_element(xml).unwrap().is_stylesheet());
    }

    #[test]
    fn check_stylesheet_valid_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("node.xsl");
        fs::write(&path, XSL).unwrap();
        check_stylesheet(&path).unwrap();
    }

    #[test]
    fn decode_xml_defaults_to_utf8() {
        let text = decode_xml("<name>Café</name>".as_bytes()).unwrap();
        assert_eq!(text, "<name>Café</name>");
    }

    #[test]
    fn decode_xml_rejects_undeclared_latin1() {
        let err = decode_xml(b"<name>Caf\xe9</name>").unwrap_err();
        assert!(err.contains("UTF-8"));
    }

    #[test]
    fn decode_xml_rejects_unknown_encoding() {
        let err = decode_xml(b"<?xml version=\"1.0\" encoding=\"klingon\"?><a/>").unwrap_err();
        assert!(err.contains("klingon"));
    }

    #[test]
    fn check_stylesheet_latin1_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("node.xsl");
        let mut bytes = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\n".to_vec();
        bytes.extend_from_slice(
            b"<xsl:stylesheet version=\"1.0\" xmlns:xsl=\"http://www.w3.org/1999/XSL/Transform\">\n\
              <!-- R\xe9sum\xe9 des n\x9cuds -->\n\
              <xsl:template match=\"/\"><h1>Caf\xe9</h1></xsl:template>\n\
              </xsl:stylesheet>\n",
        );
        fs::write(&path, bytes).unwrap();

        check_stylesheet(&path).unwrap();
    }

    #[test]
    fn check_stylesheet_utf16_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("node.xsl");
        let bytes: Vec<u8> = std::iter::once(0xFEFF_u16)
            .chain(XSL.replace("<?xml version=\"1.0\"?>", "").encode_utf16())
            .flat_map(u16::to_le_bytes)
            .collect();
        fs::write(&path, bytes).unwrap();

        check_stylesheet(&path).unwrap();
    }

    #[test]
    fn check_stylesheet_missing_file() {
        let tmp = TempDir::new().unwrap();
        let result = check_stylesheet(&tmp.path().join("missing.xsl"));
        assert!(matches!(result, Err(TransformError::StylesheetNotFound(_))));
    }

    #[test]
    fn check_stylesheet_malformed_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.xsl");
        fs::write(&path, "<xsl:stylesheet><xsl:template></xsl:stylesheet>").unwrap();

        let result = check_stylesheet(&path);
        assert!(matches!(result, Err(TransformError::InvalidStylesheet { .. })));
    }

    #[test]
    fn check_stylesheet_plain_xml_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data.xsl");
        fs::write(&path, "<node/>").unwrap();

        match check_stylesheet(&path) {
            Err(TransformError::InvalidStylesheet { reason, .. }) => {
                assert!(reason.contains("<node>"));
            }
            other => panic!("expected InvalidStylesheet, got {other:?}"),
        }
    }
}
