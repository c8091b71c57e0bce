//! DASH `ContentProtection` element parsing.
//!
//! Each DRM flavour publishes a rule table mapping `(namespace, local
//! name)` to a configure identifier and a text encoding; the walker below
//! extracts the matching child payloads and skips everything else.

use crate::{DrmError, Result, keys::KeyId};
use base64::Engine;
use quick_xml::{
    NsReader,
    events::{BytesStart, Event},
    name::{Namespace, ResolveResult},
};

pub const CENC_NAMESPACE: &str = "urn:mpeg:cenc:2013";

/// How a matched element's text content is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementHandling {
    /// Text as UTF-8 bytes.
    Raw,
    /// Standard base64 text.
    Base64,
    /// Hex text.
    Hex,
    /// No payload of its own; descend into child elements.
    Children,
}

/// One `(namespace, local name)` classification rule.
#[derive(Debug, Clone, Copy)]
pub struct ElementRule {
    pub namespace: &'static str,
    pub local_name: &'static str,
    /// Identifier handed to the DRM flavour's configure step together
    /// with the decoded payload.
    pub identifier: u32,
    pub handling: ElementHandling,
}

/// Extracted `ContentProtection` contents.
#[derive(Debug, Default)]
pub struct ContentProtection {
    /// `urn:uuid:` system ID from the `schemeIdUri` attribute, when it
    /// names one.
    pub system_id: Option<[u8; 16]>,
    /// `cenc:default_KID` attribute.
    pub default_kid: Option<KeyId>,
    /// `(identifier, decoded payload)` per matched child, in document
    /// order.
    pub payloads: Vec<(u32, Vec<u8>)>,
}

enum TextEncoding {
    Raw,
    Base64,
    Hex,
}

enum Frame {
    Descend,
    Capture { identifier: u32, encoding: TextEncoding, text: String },
}

/// Parse one `ContentProtection` element against `rules`.
///
/// The root element must be `ContentProtection` in any namespace;
/// anything else is [`DrmError::InvalidProtectionXml`]. Child subtrees
/// with no matching rule are skipped whole, so vendor extensions never
/// break parsing; a rule with [`ElementHandling::Children`] descends one
/// level and classifies the children by the same table.
pub fn parse_content_protection(xml: &str, rules: &[ElementRule]) -> Result<ContentProtection> {
    let mut reader = NsReader::from_str(xml);
    let mut out = ContentProtection::default();
    let mut stack: Vec<Frame> = Vec::new();
    let mut skip_depth = 0u32;
    let mut seen_root = false;

    let xml_err = |e: quick_xml::Error| DrmError::InvalidProtectionXml(e.to_string());

    loop {
        match reader.read_resolved_event() {
            Err(e) => return Err(DrmError::InvalidProtectionXml(e.to_string())),
            Ok((ns, Event::Start(e))) => {
                if skip_depth > 0 {
                    skip_depth += 1;
                    continue;
                }
                if !seen_root {
                    read_root(&reader, &e, &mut out)?;
                    seen_root = true;
                    stack.push(Frame::Descend);
                    continue;
                }
                match match_rule(rules, &ns, e.local_name().as_ref()) {
                    Some(rule) => stack.push(frame_for(rule)),
                    None => skip_depth = 1,
                }
            }
            Ok((ns, Event::Empty(e))) => {
                if skip_depth > 0 {
                    continue;
                }
                if !seen_root {
                    // <ContentProtection .../> with no children.
                    read_root(&reader, &e, &mut out)?;
                    return Ok(out);
                }
                if let Some(rule) = match_rule(rules, &ns, e.local_name().as_ref())
                    && rule.handling != ElementHandling::Children
                {
                    out.payloads.push((rule.identifier, Vec::new()));
                }
            }
            Ok((_, Event::End(_))) => {
                if skip_depth > 0 {
                    skip_depth -= 1;
                    continue;
                }
                match stack.pop() {
                    Some(Frame::Capture {
                        identifier,
                        encoding,
                        text,
                    }) => {
                        out.payloads.push((identifier, decode_text(&encoding, text.trim())?));
                    }
                    Some(Frame::Descend) if stack.is_empty() => return Ok(out),
                    _ => {}
                }
            }
            Ok((_, Event::Text(e))) => {
                if skip_depth > 0 {
                    continue;
                }
                if let Some(Frame::Capture { text, .. }) = stack.last_mut() {
                    text.push_str(&e.unescape().map_err(xml_err)?);
                }
            }
            Ok((_, Event::CData(e))) => {
                if skip_depth > 0 {
                    continue;
                }
                if let Some(Frame::Capture { text, .. }) = stack.last_mut() {
                    text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok((_, Event::Eof)) => {
                if !seen_root {
                    return Err(DrmError::InvalidProtectionXml(
                        "no ContentProtection element found".to_owned(),
                    ));
                }
                return Ok(out);
            }
            Ok(_) => {}
        }
    }
}

fn read_root(reader: &NsReader<&[u8]>, e: &BytesStart, out: &mut ContentProtection) -> Result<()> {
    if e.local_name().as_ref() != b"ContentProtection" {
        return Err(DrmError::InvalidProtectionXml(format!(
            "expected ContentProtection root, found {}",
            String::from_utf8_lossy(e.local_name().as_ref())
        )));
    }

    for attr in e.attributes() {
        let attr = attr.map_err(|e| DrmError::InvalidProtectionXml(e.to_string()))?;
        let (ns, local) = reader.resolve_attribute(attr.key);
        let value = attr
            .unescape_value()
            .map_err(|e| DrmError::InvalidProtectionXml(e.to_string()))?;

        if local.as_ref() == b"default_KID"
            && matches!(ns, ResolveResult::Bound(Namespace(n)) if n == CENC_NAMESPACE.as_bytes())
        {
            out.default_kid = Some(KeyId::from_hex(&value).map_err(|_| {
                DrmError::InvalidProtectionXml(format!("bad default_KID value '{value}'"))
            })?);
        } else if local.as_ref() == b"schemeIdUri"
            && matches!(ns, ResolveResult::Unbound)
        {
            out.system_id = system_id_from_urn(&value);
        }
    }

    Ok(())
}

/// Parse a `urn:uuid:<hex, dashed or not>` scheme URI into a system ID.
pub fn system_id_from_urn(urn: &str) -> Option<[u8; 16]> {
    let uuid = urn
        .strip_prefix("urn:uuid:")
        .or_else(|| urn.strip_prefix("urn:UUID:"))?;
    let cleaned: String = uuid.chars().filter(|c| *c != '-').collect();
    hex::decode(cleaned).ok()?.try_into().ok()
}

fn match_rule<'r>(
    rules: &'r [ElementRule],
    ns: &ResolveResult,
    local: &[u8],
) -> Option<&'r ElementRule> {
    let ns_bytes: &[u8] = match ns {
        ResolveResult::Bound(Namespace(n)) => n,
        _ => b"",
    };
    rules
        .iter()
        .find(|rule| rule.namespace.as_bytes() == ns_bytes && rule.local_name.as_bytes() == local)
}

fn frame_for(rule: &ElementRule) -> Frame {
    let encoding = match rule.handling {
        ElementHandling::Children => return Frame::Descend,
        ElementHandling::Raw => TextEncoding::Raw,
        ElementHandling::Base64 => TextEncoding::Base64,
        ElementHandling::Hex => TextEncoding::Hex,
    };
    Frame::Capture {
        identifier: rule.identifier,
        encoding,
        text: String::new(),
    }
}

fn decode_text(encoding: &TextEncoding, text: &str) -> Result<Vec<u8>> {
    match encoding {
        TextEncoding::Raw => Ok(text.as_bytes().to_vec()),
        TextEncoding::Base64 => base64::engine::general_purpose::STANDARD
            .decode(text)
            .map_err(|e| DrmError::InvalidProtectionXml(format!("bad base64 payload: {e}"))),
        TextEncoding::Hex => hex::decode(text)
            .map_err(|e| DrmError::InvalidProtectionXml(format!("bad hex payload: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAURL: u32 = 0x200;
    const PSSH: u32 = 0x101;
    const CONTENT_ID: u32 = 0x201;

    const RULES: &[ElementRule] = &[
        ElementRule {
            namespace: "http://dashif.org/guidelines/clearKey",
            local_name: "Laurl",
            identifier: LAURL,
            handling: ElementHandling::Raw,
        },
        ElementRule {
            namespace: CENC_NAMESPACE,
            local_name: "pssh",
            identifier: PSSH,
            handling: ElementHandling::Base64,
        },
        ElementRule {
            namespace: "urn:marlin:mas:1-0:services:schemas:mpd",
            local_name: "MarlinContentIds",
            identifier: 0,
            handling: ElementHandling::Children,
        },
        ElementRule {
            namespace: "urn:marlin:mas:1-0:services:schemas:mpd",
            local_name: "MarlinContentId",
            identifier: CONTENT_ID,
            handling: ElementHandling::Raw,
        },
    ];

    #[test]
    fn test_default_kid_and_scheme_attributes() {
        let xml = r#"<ContentProtection
            xmlns:cenc="urn:mpeg:cenc:2013"
            schemeIdUri="urn:uuid:e2719d58-a985-b3c9-781a-b030af78d30e"
            cenc:default_KID="1077efec-c0b2-4d02-ace3-3c1e52e2fb4b"/>"#;
        let parsed = parse_content_protection(xml, RULES).unwrap();
        assert_eq!(
            parsed.default_kid,
            Some(KeyId::from_hex("1077efecc0b24d02ace33c1e52e2fb4b").unwrap())
        );
        assert_eq!(
            parsed.system_id.map(hex::encode).as_deref(),
            Some("e2719d58a985b3c9781ab030af78d30e")
        );
        assert!(parsed.payloads.is_empty());
    }

    #[test]
    fn test_laurl_and_pssh_children() {
        let xml = r#"<ContentProtection xmlns:ck="http://dashif.org/guidelines/clearKey"
                                        xmlns:cenc="urn:mpeg:cenc:2013"
                                        schemeIdUri="urn:uuid:e2719d58-a985-b3c9-781a-b030af78d30e">
            <ck:Laurl>https://license.example/clearkey</ck:Laurl>
            <cenc:pssh>cGF5bG9hZA==</cenc:pssh>
        </ContentProtection>"#;
        let parsed = parse_content_protection(xml, RULES).unwrap();
        assert_eq!(
            parsed.payloads,
            vec![
                (LAURL, b"https://license.example/clearkey".to_vec()),
                (PSSH, b"payload".to_vec()),
            ]
        );
    }

    #[test]
    fn test_children_rule_recurses() {
        let xml = r#"<ContentProtection xmlns:mas="urn:marlin:mas:1-0:services:schemas:mpd"
                                        schemeIdUri="urn:uuid:5e629af5-38da-4063-8977-97ffbd9902d4">
            <mas:MarlinContentIds>
                <mas:MarlinContentId>urn:marlin:kid:00112233445566778899aabbccddeeff</mas:MarlinContentId>
            </mas:MarlinContentIds>
        </ContentProtection>"#;
        let parsed = parse_content_protection(xml, RULES).unwrap();
        assert_eq!(
            parsed.payloads,
            vec![(
                CONTENT_ID,
                b"urn:marlin:kid:00112233445566778899aabbccddeeff".to_vec()
            )]
        );
    }

    #[test]
    fn test_unmatched_subtrees_skipped() {
        let xml = r#"<ContentProtection xmlns:ck="http://dashif.org/guidelines/clearKey"
                                        xmlns:v="urn:vendor:extras">
            <v:Extra><v:Nested>ignored</v:Nested></v:Extra>
            <ck:Laurl>https://license.example</ck:Laurl>
        </ContentProtection>"#;
        let parsed = parse_content_protection(xml, RULES).unwrap();
        assert_eq!(
            parsed.payloads,
            vec![(LAURL, b"https://license.example".to_vec())]
        );
    }

    #[test]
    fn test_wrong_root_rejected() {
        assert!(matches!(
            parse_content_protection("<AdaptationSet/>", RULES),
            Err(DrmError::InvalidProtectionXml(_))
        ));
        assert!(parse_content_protection("", RULES).is_err());
    }

    #[test]
    fn test_bad_base64_payload_rejected() {
        let xml = r#"<ContentProtection xmlns:cenc="urn:mpeg:cenc:2013">
            <cenc:pssh>!!not base64!!</cenc:pssh>
        </ContentProtection>"#;
        assert!(matches!(
            parse_content_protection(xml, RULES),
            Err(DrmError::InvalidProtectionXml(_))
        ));
    }

    #[test]
    fn test_system_id_from_urn() {
        assert_eq!(
            system_id_from_urn("urn:uuid:9a04f079-9840-4286-ab92-e65be0885f95").map(hex::encode),
            Some("9a04f07998404286ab92e65be0885f95".to_owned())
        );
        assert!(system_id_from_urn("urn:mpeg:dash:mp4protection:2011").is_none());
        assert!(system_id_from_urn("urn:uuid:zz").is_none());
    }
}
