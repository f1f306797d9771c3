//! In-memory EPUB archives for tests.
use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;

pub fn build_epub(files: &[(&str, &str)]) -> Vec<u8> {
    let mut epub_writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in files {
        let method = if *name == "mimetype" {
            zip::CompressionMethod::Stored
        } else {
            zip::CompressionMethod::Deflated
        };
        let options = SimpleFileOptions::default().compression_method(method);
        epub_writer.start_file(*name, options).unwrap();
        epub_writer.write_all(content.as_bytes()).unwrap();
    }
    epub_writer.finish().unwrap().into_inner()
}

pub const CONTAINER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

pub const OPF: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="uuid_id">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>テスト書籍</dc:title>
    <dc:creator>山田太郎</dc:creator>
    <dc:creator>Jane Doe</dc:creator>
    <dc:language>ja</dc:language>
  </metadata>
  <manifest>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    <item id="ch1" href="Text/ch1.xhtml" media-type="application/xhtml+xml"/>
    <item id="ch2" href="Text/ch2.xhtml" media-type="application/xhtml+xml"/>
    <item id="cover" href="Images/cover.jpg" media-type="image/jpeg"/>
  </manifest>
  <spine toc="ncx">
    <itemref idref="ch1"/>
    <itemref idref="ch2"/>
  </spine>
</package>"#;

pub const NCX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <navMap>
    <navPoint id="n1" playOrder="1">
      <navLabel><text>第1章 始まり</text></navLabel>
      <content src="Text/ch1.xhtml"/>
      <navPoint id="n2" playOrder="2">
        <navLabel><text>1.1 出会い</text></navLabel>
        <content src="Text/ch1.xhtml#s1"/>
        <navPoint id="n3" playOrder="3">
          <navLabel><text>1.1.1 駅にて</text></navLabel>
          <content src="Text/ch1.xhtml#s1-1"/>
          <navPoint id="n4" playOrder="4">
            <navLabel><text>too deep</text></navLabel>
            <content src="Text/ch1.xhtml#deep"/>
          </navPoint>
        </navPoint>
      </navPoint>
    </navPoint>
    <navPoint id="n5" playOrder="5">
      <navLabel><text>第2章 別れ</text></navLabel>
      <content src="Text/ch2.xhtml"/>
    </navPoint>
  </navMap>
</ncx>"#;

pub const CHAPTER_1: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml"><head><title>ch1</title></head><body>
  <h1 id="c1">第1章   始まり</h1>
  <p>本文です。</p>
  <h2 id="s1">1.1 出会い</h2>
  <p>(1) 駅にて</p>
  <p>A long paragraph that mentions Chapter 3 in passing and should never become a heading.</p>
</body></html>"#;

pub const CHAPTER_2: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml"><head><title>ch2</title></head><body>
  <div class="chapter"><h1>第2章 別れ</h1></div>
  <div class="section">2.1 最後の日</div>
  <h3>x</h3>
</body></html>"#;

pub fn sample_epub() -> Vec<u8> {
    sample_with(str::to_string, Some(NCX))
}

/// The sample book with its package document rewritten by `edit_opf`, and
/// `toc.ncx` replaced or left out of the archive.
pub fn sample_with(edit_opf: impl Fn(&str) -> String, ncx: Option<&str>) -> Vec<u8> {
    let opf = edit_opf(OPF);
    let mut files = vec![
        ("mimetype", "application/epub+zip"),
        ("META-INF/container.xml", CONTAINER),
        ("OEBPS/content.opf", opf.as_str()),
        ("OEBPS/Text/ch1.xhtml", CHAPTER_1),
        ("OEBPS/Text/ch2.xhtml", CHAPTER_2),
    ];
    if let Some(ncx) = ncx {
        files.push(("OEBPS/toc.ncx", ncx));
    }
    build_epub(&files)
}

/// Same book without any navigation file, so headings must be scanned.
pub fn no_navigation() -> Vec<u8> {
    sample_with(
        |opf| {
            opf.replace(
                r#"<item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>"#,
                "",
            )
            .replace(r#"<spine toc="ncx">"#, "<spine>")
        },
        None,
    )
}

pub fn epub3_nav_only() -> Vec<u8> {
    epub3_with(str::to_string)
}

/// EPUB 3 book whose manifest also lists an NCX that is not in the archive.
pub fn epub3_with_missing_ncx() -> Vec<u8> {
    epub3_with(|opf| {
        opf.replace(
            "<manifest>",
            r#"<manifest><item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>"#,
        )
        .replace("<spine>", r#"<spine toc="ncx">"#)
    })
}

fn epub3_with(edit_opf: impl Fn(&str) -> String) -> Vec<u8> {
    let container = CONTAINER.replace("OEBPS/content.opf", "EPUB/package.opf");
    let opf = r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="uid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:title>Nav Book</dc:title></metadata>
  <manifest>
    <item id="nav" href="xhtml/nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
    <item id="intro" href="xhtml/intro.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine><itemref idref="intro"/></spine>
</package>"#;
    let nav = r#"<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<body><nav epub:type="toc"><ol><li><a href="intro.xhtml">はじめに</a></li></ol></nav></body></html>"#;
    build_epub(&[
        ("mimetype", "application/epub+zip"),
        ("META-INF/container.xml", &container),
        ("EPUB/package.opf", &edit_opf(opf)),
        ("EPUB/xhtml/nav.xhtml", nav),
        ("EPUB/xhtml/intro.xhtml", "<html><body><h1>はじめに</h1></body></html>"),
    ])
}
