use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::book::collapse_whitespace;
use crate::config::DetectionConfig;
use crate::outline::DetectionMethod;

static CANDIDATES: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("h1, h2, h3, div, p, span").expect("Failed to parse candidate selector")
});
static HEADINGS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h1, h2, h3").expect("Failed to parse heading selector"));

static CHAPTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(第\d+章|chapter\s+\d+)").expect("valid chapter pattern"));
static SECTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+\.\d+|\d+－\d+|§\d+)").expect("valid section pattern"));
static SUBSECTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+\.\d+\.\d+|\(\d+\))").expect("valid subsection pattern"));

static CLEAN_CHAPTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^第(\d+)章\s*").expect("valid chapter cleanup pattern"));
static CLEAN_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)\.\s*([^\d\s])").expect("valid number cleanup pattern"));

const BLOCK_TAGS: [&str; 12] = [
    "p", "div", "h1", "h2", "h3", "h4", "h5", "h6", "li", "section", "blockquote", "table",
];

/// `div` classes that mark a heading block, with their level.
const LEVEL_CLASSES: [(&str, u8); 6] = [
    ("chapter", 1),
    ("section1", 1),
    ("section", 2),
    ("section2", 2),
    ("subsection", 3),
    ("section3", 3),
];

#[derive(Debug, Clone, PartialEq)]
pub struct DetectedHeading {
    pub text: String,
    pub level: u8,
    pub method: DetectionMethod,
    pub anchor: Option<String>,
    /// Ordinal of the element among heading candidates, in document order.
    pub position: usize,
}

pub struct HeadingDetector {
    heuristics: bool,
    chapter_max_chars: usize,
    section_max_chars: usize,
    subsection_max_chars: usize,
}

impl HeadingDetector {
    pub fn new(config: &DetectionConfig) -> Self {
        HeadingDetector {
            heuristics: config.heuristics,
            chapter_max_chars: config.chapter_max_chars,
            section_max_chars: config.section_max_chars,
            subsection_max_chars: config.subsection_max_chars,
        }
    }

    pub fn detect(&self, html: &str) -> Vec<DetectedHeading> {
        let doc = Html::parse_document(html);
        let mut claimed = HashSet::new();
        let mut headings = vec![];

        for (position, elem) in doc.select(&CANDIDATES).enumerate() {
            if elem.ancestors().any(|a| claimed.contains(&a.id())) {
                continue;
            }
            let found = match selector_level(&elem) {
                Some(level) => {
                    let text = collapse_whitespace(&elem.text().collect::<String>());
                    Some((text, level, DetectionMethod::Selector(elem.value().name().to_string())))
                }
                None if self.heuristics && !has_block_descendant(&elem) => {
                    let text = collapse_whitespace(&elem.text().collect::<String>());
                    self.heuristic_level(&text)
                        .map(|level| (text, level, DetectionMethod::Heuristic(level)))
                }
                None => None,
            };
            let Some((text, level, method)) = found else {
                continue;
            };
            if text.chars().count() <= 1 {
                continue;
            }
            claimed.insert(elem.id());
            headings.push(DetectedHeading {
                text: clean_heading_text(&text),
                level,
                method,
                anchor: elem.value().id().map(str::to_string),
                position,
            });
        }
        headings
    }

    fn heuristic_level(&self, text: &str) -> Option<u8> {
        let len = text.chars().count();
        if SUBSECTION.is_match(text) {
            (len < self.subsection_max_chars).then_some(3)
        } else if SECTION.is_match(text) {
            (len < self.section_max_chars).then_some(2)
        } else if CHAPTER.is_match(text) {
            (len < self.chapter_max_chars).then_some(1)
        } else {
            None
        }
    }
}

fn selector_level(elem: &ElementRef) -> Option<u8> {
    match elem.value().name() {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "div" if !has_heading(elem) => elem.value().classes().find_map(|class| {
            LEVEL_CLASSES
                .iter()
                .find(|(name, _)| *name == class)
                .map(|(_, level)| *level)
        }),
        _ => None,
    }
}

fn has_heading(elem: &ElementRef) -> bool {
    elem.select(&HEADINGS).next().is_some()
}

/// Wrappers around block content are left to their children, whose text is
/// not glued to its siblings.
fn has_block_descendant(elem: &ElementRef) -> bool {
    elem.descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .any(|child| BLOCK_TAGS.contains(&child.value().name()))
}

pub fn clean_heading_text(text: &str) -> String {
    let text = collapse_whitespace(text);
    let text = CLEAN_CHAPTER.replace(&text, "第${1}章\u{3000}");
    CLEAN_NUMBER.replace(&text, "${1}. ${2}").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::fixtures::{CHAPTER_1, CHAPTER_2};

    fn detector() -> HeadingDetector {
        HeadingDetector::new(&DetectionConfig::default())
    }

    fn summary(headings: &[DetectedHeading]) -> Vec<(u8, String, String)> {
        headings
            .iter()
            .map(|h| (h.level, h.text.clone(), h.method.to_string()))
            .collect()
    }

    #[test]
    fn cleans_heading_text() {
        assert_eq!(clean_heading_text("第3章  旅立ち"), "第3章\u{3000}旅立ち");
        assert_eq!(clean_heading_text("2.Overview"), "2. Overview");
        assert_eq!(clean_heading_text("2.1 Overview"), "2.1 Overview");
        assert_eq!(clean_heading_text("  a \n b  "), "a b");
    }

    #[test]
    fn detects_headings_in_document_order() {
        let headings = detector().detect(CHAPTER_1);
        assert_eq!(
            summary(&headings),
            vec![
                (1, "第1章\u{3000}始まり".to_string(), "h1".to_string()),
                (2, "1.1 出会い".to_string(), "h2".to_string()),
                (3, "(1) 駅にて".to_string(), "heuristic_h3".to_string()),
            ]
        );
        assert_eq!(headings[0].anchor.as_deref(), Some("c1"));
        assert!(headings[0].position < headings[1].position);
    }

    #[test]
    fn wrapped_headings_are_not_duplicated() {
        let headings = detector().detect(CHAPTER_2);
        assert_eq!(
            summary(&headings),
            vec![
                (1, "第2章\u{3000}別れ".to_string(), "h1".to_string()),
                (2, "2.1 最後の日".to_string(), "div".to_string()),
            ]
        );
    }

    #[test]
    fn heuristics_respect_length_limits() {
        let long = format!("<p>第1章 {}</p>", "あ".repeat(120));
        assert!(detector().detect(&long).is_empty());
        let short = "<p>Chapter 12 The Return</p><span>§3 Notes</span>";
        assert_eq!(
            summary(&detector().detect(short)),
            vec![
                (1, "Chapter 12 The Return".to_string(), "heuristic_h1".to_string()),
                (2, "§3 Notes".to_string(), "heuristic_h2".to_string()),
            ]
        );
    }

    #[test]
    fn wrapper_blocks_leave_headings_to_children() {
        let html = "<div><p>1.1 Intro</p><p>short body.</p></div>\
                    <div><section><p>(2) Notes</p></section></div>";
        assert_eq!(
            summary(&detector().detect(html)),
            vec![
                (2, "1.1 Intro".to_string(), "heuristic_h2".to_string()),
                (3, "(2) Notes".to_string(), "heuristic_h3".to_string()),
            ]
        );
    }

    #[test]
    fn heuristics_can_be_disabled() {
        let config = DetectionConfig {
            heuristics: false,
            ..Default::default()
        };
        let headings = HeadingDetector::new(&config).detect(CHAPTER_1);
        assert!(headings
            .iter()
            .all(|h| !matches!(h.method, DetectionMethod::Heuristic(_))));
        assert_eq!(headings.len(), 2);
    }
}
