//! Minimal WordprocessingML writer for the TOC report.
//!
//! Parts are modelled as serde structs and serialized with `quick_xml`, then
//! packed into the OPC zip container.
use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, SecondsFormat};
use quick_xml::se::to_string;
use serde::Serialize;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::analysis::Analysis;
use crate::config::Template;
use crate::extractor::BookToc;
use crate::outline::MAX_LEVEL;

const XML_PREFIX: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n";
const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const CONTENT_TYPES: &str = r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/></Relationships>"#;

const DOCUMENT_RELS: &str = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const STYLES: &str = r#"<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="Calibri" w:hAnsi="Calibri" w:eastAsia="MS Mincho"/><w:sz w:val="22"/><w:lang w:val="en-US" w:eastAsia="ja-JP"/></w:rPr></w:rPrDefault></w:docDefaults><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:pPr><w:spacing w:after="120"/></w:pPr></w:style><w:style w:type="paragraph" w:styleId="Title"><w:name w:val="Title"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:pPr><w:spacing w:after="240"/></w:pPr><w:rPr><w:b/><w:sz w:val="48"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:pPr><w:keepNext/><w:spacing w:before="360" w:after="120"/><w:outlineLvl w:val="0"/></w:pPr><w:rPr><w:b/><w:sz w:val="32"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="ListNumber"><w:name w:val="List Number"/><w:basedOn w:val="Normal"/><w:pPr><w:ind w:left="360"/></w:pPr></w:style><w:style w:type="paragraph" w:styleId="ListBullet2"><w:name w:val="List Bullet 2"/><w:basedOn w:val="Normal"/><w:pPr><w:ind w:left="720"/></w:pPr><w:rPr><w:color w:val="595959"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="ListBullet3"><w:name w:val="List Bullet 3"/><w:basedOn w:val="Normal"/><w:pPr><w:ind w:left="1080"/></w:pPr><w:rPr><w:color w:val="7F7F7F"/><w:sz w:val="18"/></w:rPr></w:style></w:styles>"#;

#[derive(Serialize)]
#[serde(rename = "w:document")]
struct Document {
    #[serde(rename = "@xmlns:w")]
    xmlns_w: &'static str,
    #[serde(rename = "w:body")]
    body: Body,
}

#[derive(Serialize)]
struct Body {
    #[serde(rename = "w:p")]
    paragraphs: Vec<Paragraph>,
}

#[derive(Serialize, Default)]
struct Paragraph {
    #[serde(rename = "w:pPr", skip_serializing_if = "Option::is_none")]
    properties: Option<ParagraphProperties>,
    #[serde(rename = "w:r")]
    runs: Vec<Run>,
}

#[derive(Serialize)]
struct ParagraphProperties {
    #[serde(rename = "w:pStyle", skip_serializing_if = "Option::is_none")]
    style: Option<Val>,
    #[serde(rename = "w:jc", skip_serializing_if = "Option::is_none")]
    justification: Option<Val>,
}

#[derive(Serialize)]
struct Val {
    #[serde(rename = "@w:val")]
    val: String,
}

#[derive(Serialize, Default)]
struct Run {
    #[serde(rename = "w:rPr", skip_serializing_if = "Option::is_none")]
    properties: Option<RunProperties>,
    #[serde(rename = "w:br", skip_serializing_if = "Option::is_none")]
    r#break: Option<Break>,
    #[serde(rename = "w:t", skip_serializing_if = "Option::is_none")]
    text: Option<Text>,
}

#[derive(Serialize)]
struct RunProperties {
    #[serde(rename = "w:b")]
    bold: Flag,
}

#[derive(Serialize)]
struct Flag {}

#[derive(Serialize)]
struct Break {
    #[serde(rename = "@w:type", skip_serializing_if = "Option::is_none")]
    kind: Option<&'static str>,
}

#[derive(Serialize)]
struct Text {
    #[serde(rename = "@xml:space")]
    space: &'static str,
    #[serde(rename = "$text")]
    value: String,
}

#[derive(Serialize)]
#[serde(rename = "cp:coreProperties")]
struct CoreProperties {
    #[serde(rename = "@xmlns:cp")]
    xmlns_cp: &'static str,
    #[serde(rename = "@xmlns:dc")]
    xmlns_dc: &'static str,
    #[serde(rename = "@xmlns:dcterms")]
    xmlns_dcterms: &'static str,
    #[serde(rename = "@xmlns:xsi")]
    xmlns_xsi: &'static str,
    #[serde(rename = "dc:title")]
    dc_title: String,
    #[serde(rename = "dc:creator")]
    dc_creator: String,
    #[serde(rename = "dcterms:created")]
    created: W3cDate,
}

#[derive(Serialize)]
struct W3cDate {
    #[serde(rename = "@xsi:type")]
    kind: &'static str,
    #[serde(rename = "$text")]
    value: String,
}

impl Paragraph {
    fn styled(style: &str) -> Self {
        Paragraph {
            properties: Some(ParagraphProperties {
                style: Some(Val {
                    val: style.to_string(),
                }),
                justification: None,
            }),
            runs: vec![],
        }
    }

    fn centered(mut self) -> Self {
        if let Some(properties) = self.properties.as_mut() {
            properties.justification = Some(Val {
                val: "center".to_string(),
            });
        }
        self
    }

    fn page_break() -> Self {
        Paragraph {
            properties: None,
            runs: vec![Run {
                r#break: Some(Break { kind: Some("page") }),
                ..Default::default()
            }],
        }
    }

    fn text(mut self, text: &str) -> Self {
        self.runs.push(Run::text(text, false));
        self
    }

    fn bold(mut self, text: &str) -> Self {
        self.runs.push(Run::text(text, true));
        self
    }

    fn line_break(mut self) -> Self {
        self.runs.push(Run {
            r#break: Some(Break { kind: None }),
            ..Default::default()
        });
        self
    }
}

impl Run {
    fn text(text: &str, bold: bool) -> Self {
        Run {
            properties: bold.then(|| RunProperties { bold: Flag {} }),
            r#break: None,
            text: Some(Text {
                space: "preserve",
                value: text.to_string(),
            }),
        }
    }
}

/// Builds the paragraphs of the report body.
fn build_body(book: &BookToc, template: &Template, generated_at: DateTime<Local>) -> Body {
    let outline = &book.outline;
    let analysis = Analysis::of(outline);
    let mut paragraphs = vec![
        Paragraph::styled("Title").centered().text(&template.report_title),
        Paragraph::default()
            .bold(&format!("{}: ", template.book_title))
            .text(&book.display_title())
            .line_break()
            .bold(&format!("{}: ", template.authors))
            .text(&book.authors.join(", "))
            .line_break()
            .bold(&format!("{}: ", template.generated_at))
            .text(&template.format_date(&generated_at))
            .line_break()
            .bold(&format!("{}: ", template.engine))
            .text(&template.engine_name),
        Paragraph::styled("Heading1").text(&template.statistics),
    ];

    let mut stats = Paragraph::default();
    for level in 1..=MAX_LEVEL {
        if level > 1 {
            stats = stats.line_break();
        }
        stats = stats
            .bold(&format!("{}: ", template.level_entries(level)))
            .text(&outline.level_count(level).to_string());
    }
    stats = stats
        .line_break()
        .bold(&format!("{}: ", template.max_depth))
        .text(&analysis.max_depth.to_string())
        .line_break()
        .bold(&format!("{}: ", template.recommended_split_level))
        .text(&analysis.recommended_split_level.to_string());
    paragraphs.push(stats);
    paragraphs.push(Paragraph::page_break());

    for level in 1..=MAX_LEVEL {
        if outline.level_count(level) == 0 {
            continue;
        }
        paragraphs.push(Paragraph::styled("Heading1").text(&template.level_name(level)));
        for (i, entry) in outline.level(level).enumerate() {
            paragraphs.push(
                Paragraph::styled("ListNumber")
                    .text(&format!("{}. ", i + 1))
                    .bold(&entry.text),
            );

            if level >= 2 {
                let mut parents = Paragraph::styled("ListBullet2");
                if let Some(parent) = &entry.parent_level_1 {
                    parents = parents.text(&format!("└ {}: {}", template.parent_level_1, parent));
                }
                if let Some(parent) = &entry.parent_level_2 {
                    parents = parents
                        .line_break()
                        .text(&format!("  └ {}: {}", template.parent_level_2, parent));
                }
                paragraphs.push(parents);
            }

            let mut details = vec![];
            if !entry.href.is_empty() {
                details.push(format!("{}: {}", template.file, entry.href));
            }
            if let Some(anchor) = &entry.anchor {
                details.push(format!("{}: #{}", template.anchor, anchor));
            }
            if !entry.method.is_standard() {
                details.push(format!("{}: {}", template.method, entry.method));
            }
            if !details.is_empty() {
                paragraphs.push(Paragraph::styled("ListBullet3").text(&details.join("   ")));
            }
        }
    }
    Body { paragraphs }
}

pub fn document_xml(book: &BookToc, template: &Template, generated_at: DateTime<Local>) -> Result<String> {
    let document = Document {
        xmlns_w: W_NS,
        body: build_body(book, template, generated_at),
    };
    Ok(format!("{}{}", XML_PREFIX, to_string(&document)?))
}

fn core_xml(book: &BookToc, generated_at: DateTime<Local>) -> Result<String> {
    let core = CoreProperties {
        xmlns_cp: "http://schemas.openxmlformats.org/package/2006/metadata/core-properties",
        xmlns_dc: "http://purl.org/dc/elements/1.1/",
        xmlns_dcterms: "http://purl.org/dc/terms/",
        xmlns_xsi: "http://www.w3.org/2001/XMLSchema-instance",
        dc_title: book.display_title(),
        dc_creator: book.authors.join(", "),
        created: W3cDate {
            kind: "dcterms:W3CDTF",
            value: generated_at
                .with_timezone(&chrono::Utc)
                .to_rfc3339_opts(SecondsFormat::Secs, true),
        },
    };
    Ok(format!("{}{}", XML_PREFIX, to_string(&core)?))
}

pub fn write_docx<W: Write + Seek>(
    writer: W,
    book: &BookToc,
    template: &Template,
    generated_at: DateTime<Local>,
) -> Result<W> {
    let parts = [
        ("[Content_Types].xml", format!("{}{}", XML_PREFIX, CONTENT_TYPES)),
        ("_rels/.rels", format!("{}{}", XML_PREFIX, PACKAGE_RELS)),
        ("docProps/core.xml", core_xml(book, generated_at)?),
        ("word/document.xml", document_xml(book, template, generated_at)?),
        ("word/styles.xml", format!("{}{}", XML_PREFIX, STYLES)),
        ("word/_rels/document.xml.rels", format!("{}{}", XML_PREFIX, DOCUMENT_RELS)),
    ];

    let mut docx_writer = ZipWriter::new(writer);
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, content) in parts {
        docx_writer.start_file(name, options)?;
        docx_writer.write_all(content.as_bytes())?;
    }
    Ok(docx_writer.finish()?)
}

pub fn save(path: &Path, book: &BookToc, template: &Template, generated_at: DateTime<Local>) -> Result<()> {
    let file = File::create(path).with_context(|| format!("unable to create {}", path.display()))?;
    write_docx(file, book, template, generated_at)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use anyhow::Result;
    use chrono::TimeZone;
    use zip::ZipArchive;

    use super::*;
    use crate::book::TocSource;
    use crate::outline::{DetectionMethod, Outline};

    fn book() -> BookToc {
        let mut outline = Outline::new();
        outline.add("第1章 <序>", 1, "OEBPS/ch1.xhtml", None, DetectionMethod::Ncx);
        outline.add("1.1 & more", 2, "OEBPS/ch1.xhtml", Some("s1".into()), DetectionMethod::Ncx);
        outline.add("(1)", 3, "OEBPS/ch1.xhtml", None, DetectionMethod::Heuristic(3));
        BookToc {
            title: Some("猫".to_string()),
            authors: vec!["漱石".to_string()],
            source: TocSource::Ncx,
            outline,
        }
    }

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap()
    }

    #[test]
    fn document_xml_has_styles_and_escaped_text() -> Result<()> {
        let xml = document_xml(&book(), &Template::default(), at())?;
        assert!(xml.starts_with(XML_PREFIX));
        assert!(xml.contains(r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#));
        assert!(xml.contains(r#"<w:pStyle w:val="Title"/>"#));
        assert!(xml.contains(r#"<w:jc w:val="center"/>"#));
        assert!(xml.contains(r#"<w:br w:type="page"/>"#));
        assert!(xml.contains(r#"<w:pStyle w:val="ListBullet3"/>"#));
        assert!(xml.contains("第1章 &lt;序&gt;"));
        assert!(xml.contains("1.1 &amp; more"));
        assert!(xml.contains("<w:b/>"));
        assert!(xml.contains("検出方法: heuristic_h3"));
        Ok(())
    }

    #[test]
    fn writes_complete_package() -> Result<()> {
        let bytes = write_docx(Cursor::new(Vec::new()), &book(), &Template::default(), at())?
            .into_inner();
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let names: Vec<String> = archive.file_names().map(str::to_string).collect();
        for part in [
            "[Content_Types].xml",
            "_rels/.rels",
            "docProps/core.xml",
            "word/document.xml",
            "word/styles.xml",
            "word/_rels/document.xml.rels",
        ] {
            assert!(names.iter().any(|n| n == part), "missing {}", part);
        }
        let mut core = String::new();
        archive.by_name("docProps/core.xml")?.read_to_string(&mut core)?;
        assert!(core.contains("<dc:title>猫</dc:title>"));
        assert!(core.contains("<dc:creator>漱石</dc:creator>"));
        Ok(())
    }
}
