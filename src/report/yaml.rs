use anyhow::Result;
use chrono::{DateTime, Local};
use serde::Serialize;

use crate::analysis::Analysis;
use crate::book::TocSource;
use crate::extractor::BookToc;
use crate::outline::OutlineEntry;

#[derive(Serialize)]
struct YamlReport<'a> {
    title: String,
    authors: &'a [String],
    generated_at: String,
    source: TocSource,
    outline: &'a [OutlineEntry],
    analysis: Analysis,
}

pub fn render(book: &BookToc, generated_at: DateTime<Local>) -> Result<String> {
    let report = YamlReport {
        title: book.display_title(),
        authors: &book.authors,
        generated_at: generated_at.to_rfc3339(),
        source: book.source,
        outline: book.outline.entries(),
        analysis: Analysis::of(&book.outline),
    };
    Ok(serde_yaml::to_string(&report)?)
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::TimeZone;

    use super::*;
    use crate::outline::{DetectionMethod, Outline};

    #[test]
    fn renders_outline_and_analysis() -> Result<()> {
        let mut outline = Outline::new();
        outline.add("Part 1", 1, "a.xhtml", None, DetectionMethod::Ncx);
        outline.add("1.1", 2, "a.xhtml", Some("x".into()), DetectionMethod::Selector("h2".into()));
        let book = BookToc {
            title: None,
            authors: vec![],
            source: TocSource::NavDocument,
            outline,
        };
        let at = Local.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let yaml = render(&book, at)?;
        let value: serde_yaml::Value = serde_yaml::from_str(&yaml)?;
        assert_eq!(value["title"].as_str(), Some("unknown_book"));
        assert_eq!(value["source"].as_str(), Some("nav_document"));
        assert_eq!(value["outline"][1]["method"].as_str(), Some("h2"));
        assert_eq!(value["outline"][1]["hierarchy_path"].as_str(), Some("Part 1"));
        assert_eq!(value["analysis"]["entries"][1]["full_path"].as_str(), Some("Part 1/1.1"));
        assert_eq!(value["analysis"]["recommended_split_level"].as_u64(), Some(1));
        Ok(())
    }
}
