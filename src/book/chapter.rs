use std::io::{Read, Seek};

use once_cell::sync::Lazy;
use scraper::{Html, Selector};

use super::toc::collapse_whitespace;
use super::EpubBook;
use crate::detect::{DetectedHeading, HeadingDetector};
use crate::error::Result;

static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("title").expect("Failed to parse title selector"));

/// A spine content document.
pub struct Chapter {
    pub path: String,
    pub content: String,
    pub order: usize,
}

impl Chapter {
    pub fn read<R: Read + Seek>(book: &mut EpubBook<R>, path: &str, order: usize) -> Result<Self> {
        Ok(Chapter {
            path: path.to_string(),
            content: book.read_text(path)?,
            order,
        })
    }

    /// The document's `<title>`, if any.
    pub fn title(&self) -> Option<String> {
        let doc = Html::parse_document(&self.content);
        doc.select(&TITLE_SELECTOR)
            .map(|title| collapse_whitespace(&title.text().collect::<String>()))
            .find(|title| !title.is_empty())
    }

    pub fn headings(&self, detector: &HeadingDetector) -> Vec<DetectedHeading> {
        detector.detect(&self.content)
    }
}
