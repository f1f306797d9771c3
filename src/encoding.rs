use encoding_rs::{Encoding, UTF_8};
use once_cell::sync::Lazy;
use regex::bytes::Regex;
use tracing::{debug, warn};

const SNIFF_LEN: usize = 1024;

static XML_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*<\?xml[^>]*\bencoding\s*=\s*["']([A-Za-z0-9._:-]+)["']"#)
        .expect("valid xml declaration pattern")
});
static META_CHARSET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?([A-Za-z0-9._:-]+)"#)
        .expect("valid meta charset pattern")
});

/// Picks the encoding of a content document from its BOM, XML declaration or
/// `<meta charset>`, defaulting to UTF-8.
pub fn sniff(bytes: &[u8]) -> &'static Encoding {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return encoding;
    }
    let head = &bytes[..bytes.len().min(SNIFF_LEN)];
    XML_DECL
        .captures(head)
        .or_else(|| META_CHARSET.captures(head))
        .and_then(|caps| Encoding::for_label(&caps[1]))
        .unwrap_or(UTF_8)
}

pub fn decode_document(bytes: &[u8]) -> String {
    let encoding = sniff(bytes);
    debug!("detected encoding: {}", encoding.name());
    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        warn!("{} decoding produced replacement characters", used.name());
    }
    text.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_utf8() {
        assert_eq!(sniff(b"<html><body>hi</body></html>"), UTF_8);
        assert_eq!(decode_document("第1章".as_bytes()), "第1章");
    }

    #[test]
    fn honours_xml_declaration() {
        let mut bytes = br#"<?xml version="1.0" encoding="Shift_JIS"?><p>"#.to_vec();
        let (encoded, _, _) = encoding_rs::SHIFT_JIS.encode("目次");
        bytes.extend_from_slice(&encoded);
        bytes.extend_from_slice(b"</p>");
        assert_eq!(sniff(&bytes), encoding_rs::SHIFT_JIS);
        assert!(decode_document(&bytes).contains("目次"));
    }

    #[test]
    fn honours_meta_charset() {
        let bytes = br#"<html><head><meta charset="euc-jp"></head></html>"#;
        assert_eq!(sniff(bytes), encoding_rs::EUC_JP);
    }

    #[test]
    fn bom_wins_over_declaration() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(br#"<?xml version="1.0" encoding="Shift_JIS"?>"#);
        assert_eq!(sniff(&bytes), UTF_8);
    }
}
