use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::book::resolve_href;
use crate::error::{EpubError, Result};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Metadata {
    pub title: Option<String>,
    pub creators: Vec<String>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ManifestItem {
    pub id: String,
    /// Archive path, resolved against the package document.
    pub href: String,
    pub media_type: String,
    pub properties: String,
}

impl ManifestItem {
    pub fn is_html(&self) -> bool {
        matches!(
            self.media_type.as_str(),
            "application/xhtml+xml" | "text/html" | "application/xml"
        ) || self.href.ends_with(".xhtml")
            || self.href.ends_with(".html")
            || self.href.ends_with(".htm")
    }
}

/// The parts of an OPF package document the TOC extraction needs.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Package {
    pub metadata: Metadata,
    pub manifest: Vec<ManifestItem>,
    pub spine: Vec<String>,
    pub spine_toc: Option<String>,
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    Other,
    Metadata,
    Manifest,
    Spine,
}

#[derive(Clone, Copy, PartialEq)]
enum Field {
    Title,
    Creator,
    Language,
}

impl Package {
    pub fn parse(xml: &str, opf_path: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut package = Package::default();
        let mut section = Section::Other;
        let mut field: Option<Field> = None;
        let mut text = String::new();
        let mut saw_package = false;

        loop {
            match reader.read_event()? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"package" => saw_package = true,
                    b"metadata" => section = Section::Metadata,
                    b"manifest" => section = Section::Manifest,
                    b"spine" => {
                        section = Section::Spine;
                        package.spine_toc = attr(&e, b"toc")?;
                    }
                    b"title" if section == Section::Metadata => field = Some(Field::Title),
                    b"creator" if section == Section::Metadata => field = Some(Field::Creator),
                    b"language" if section == Section::Metadata => field = Some(Field::Language),
                    _ => package.handle_item(&e, section, opf_path)?,
                },
                Event::Empty(e) => match e.local_name().as_ref() {
                    b"spine" => package.spine_toc = attr(&e, b"toc")?,
                    _ => package.handle_item(&e, section, opf_path)?,
                },
                Event::Text(t) if field.is_some() => text.push_str(&t.unescape()?),
                Event::CData(t) if field.is_some() => {
                    text.push_str(&String::from_utf8_lossy(&t.into_inner()))
                }
                Event::End(e) => match e.local_name().as_ref() {
                    b"metadata" | b"manifest" | b"spine" => section = Section::Other,
                    b"title" | b"creator" | b"language" => {
                        if let Some(f) = field.take() {
                            package.metadata.set(f, text.trim());
                        }
                        text.clear();
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
        }

        if !saw_package {
            return Err(EpubError::InvalidPackage {
                path: opf_path.to_string(),
                reason: "no <package> element".to_string(),
            });
        }
        Ok(package)
    }

    pub fn item(&self, id: &str) -> Option<&ManifestItem> {
        self.manifest.iter().find(|item| item.id == id)
    }

    fn handle_item(&mut self, e: &BytesStart, section: Section, opf_path: &str) -> Result<()> {
        match (section, e.local_name().as_ref()) {
            (Section::Manifest, b"item") => {
                let (Some(id), Some(href)) = (attr(e, b"id")?, attr(e, b"href")?) else {
                    return Ok(());
                };
                let (href, _) = resolve_href(opf_path, &href);
                self.manifest.push(ManifestItem {
                    id,
                    href,
                    media_type: attr(e, b"media-type")?.unwrap_or_default(),
                    properties: attr(e, b"properties")?.unwrap_or_default(),
                });
            }
            (Section::Spine, b"itemref") => {
                if let Some(idref) = attr(e, b"idref")? {
                    self.spine.push(idref);
                }
            }
            _ => {}
        }
        Ok(())
    }
}

impl Metadata {
    fn set(&mut self, field: Field, value: &str) {
        if value.is_empty() {
            return;
        }
        match field {
            Field::Title if self.title.is_none() => self.title = Some(value.to_string()),
            Field::Creator => self.creators.push(value.to_string()),
            Field::Language if self.language.is_none() => {
                self.language = Some(value.to_string())
            }
            _ => {}
        }
    }
}

pub(crate) fn attr(e: &BytesStart, name: &[u8]) -> Result<Option<String>> {
    for attribute in e.attributes().with_checks(false) {
        let attribute = attribute.map_err(quick_xml::Error::from)?;
        if attribute.key.local_name().as_ref() == name {
            return Ok(Some(attribute.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::*;

    const OPF: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<opf:package xmlns:opf="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="uid">
  <opf:metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>吾輩は猫である</dc:title>
    <dc:title>Subtitle</dc:title>
    <dc:creator opf:role="aut">夏目漱石</dc:creator>
    <dc:language>ja</dc:language>
  </opf:metadata>
  <opf:manifest>
    <opf:item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    <opf:item id="c1" href="Text/chapter%201.xhtml" media-type="application/xhtml+xml"/>
    <opf:item id="img" href="../Images/cover.jpg" media-type="image/jpeg"/>
  </opf:manifest>
  <opf:spine toc="ncx">
    <opf:itemref idref="c1"/>
  </opf:spine>
</opf:package>"#;

    #[test]
    fn parses_prefixed_package() -> Result<()> {
        let package = Package::parse(OPF, "OEBPS/content.opf")?;
        assert_eq!(package.metadata.title.as_deref(), Some("吾輩は猫である"));
        assert_eq!(package.metadata.creators, vec!["夏目漱石"]);
        assert_eq!(package.metadata.language.as_deref(), Some("ja"));
        assert_eq!(package.spine, vec!["c1"]);
        assert_eq!(package.spine_toc.as_deref(), Some("ncx"));
        assert_eq!(
            package.item("c1").map(|i| i.href.as_str()),
            Some("OEBPS/Text/chapter 1.xhtml")
        );
        assert_eq!(
            package.item("img").map(|i| i.href.as_str()),
            Some("Images/cover.jpg")
        );
        assert!(!package.item("img").is_some_and(ManifestItem::is_html));
        Ok(())
    }

    #[test]
    fn rejects_non_package_documents() {
        let err = Package::parse("<html><body/></html>", "content.opf");
        assert!(matches!(err, Err(EpubError::InvalidPackage { .. })));
    }
}
