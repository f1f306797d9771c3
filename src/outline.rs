use std::fmt;

use serde::{Serialize, Serializer};

pub const MAX_LEVEL: u8 = 3;

/// How a TOC entry was found.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DetectionMethod {
    /// NCX navigation map.
    Ncx,
    /// EPUB 3 navigation document.
    Nav,
    /// Matched a heading selector; holds the tag name.
    Selector(String),
    /// Matched a numbering pattern at the given level.
    Heuristic(u8),
}

impl DetectionMethod {
    pub fn is_standard(&self) -> bool {
        matches!(self, DetectionMethod::Ncx)
    }
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionMethod::Ncx => f.write_str("standard"),
            DetectionMethod::Nav => f.write_str("nav"),
            DetectionMethod::Selector(tag) => f.write_str(tag),
            DetectionMethod::Heuristic(level) => write!(f, "heuristic_h{}", level),
        }
    }
}

impl Serialize for DetectionMethod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlineEntry {
    pub text: String,
    pub level: u8,
    pub href: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,
    pub hierarchy_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_level_1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_level_2: Option<String>,
    pub method: DetectionMethod,
}

/// Three-level TOC in insertion order, tracking the current level 1 and 2
/// parents as entries arrive.
#[derive(Debug, Default)]
pub struct Outline {
    entries: Vec<OutlineEntry>,
    current_level_1: Option<String>,
    current_level_2: Option<String>,
}

impl Outline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry; levels outside `1..=3` are ignored.
    pub fn add(
        &mut self,
        text: &str,
        level: u8,
        href: &str,
        anchor: Option<String>,
        method: DetectionMethod,
    ) -> bool {
        let (parent_level_1, parent_level_2) = match level {
            1 => {
                self.current_level_1 = Some(text.to_string());
                self.current_level_2 = None;
                (None, None)
            }
            2 => {
                let parent = self.current_level_1.clone();
                self.current_level_2 = Some(text.to_string());
                (parent, None)
            }
            3 => (self.current_level_1.clone(), self.current_level_2.clone()),
            _ => return false,
        };
        let hierarchy_path = [parent_level_1.as_deref(), parent_level_2.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join("/");
        self.entries.push(OutlineEntry {
            text: text.to_string(),
            level,
            href: href.to_string(),
            anchor,
            hierarchy_path,
            parent_level_1,
            parent_level_2,
            method,
        });
        true
    }

    pub fn entries(&self) -> &[OutlineEntry] {
        &self.entries
    }

    pub fn level(&self, level: u8) -> impl Iterator<Item = &OutlineEntry> {
        self.entries.iter().filter(move |e| e.level == level)
    }

    pub fn level_count(&self, level: u8) -> usize {
        self.level(level).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry count per detection method, in first-seen order.
    pub fn method_counts(&self) -> Vec<(DetectionMethod, usize)> {
        let mut counts: Vec<(DetectionMethod, usize)> = vec![];
        for entry in &self.entries {
            match counts.iter_mut().find(|(method, _)| *method == entry.method) {
                Some((_, count)) => *count += 1,
                None => counts.push((entry.method.clone(), 1)),
            }
        }
        counts
    }
}
