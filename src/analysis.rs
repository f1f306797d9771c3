use std::collections::BTreeMap;

use serde::Serialize;

use crate::outline::Outline;

const PREVIEW_TITLES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyzedEntry {
    pub text: String,
    pub level: u8,
    pub full_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitSection {
    pub title: String,
    pub subsections: usize,
    pub subsection_list: Vec<String>,
}

/// Structural summary of an outline: full paths, per-level counts and a
/// suggested level to split the book at.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub total_entries: usize,
    pub max_depth: u8,
    pub level_stats: BTreeMap<u8, usize>,
    pub recommended_split_level: u8,
    pub entries: Vec<AnalyzedEntry>,
    pub split_preview: Vec<SplitSection>,
}

impl Analysis {
    pub fn of(outline: &Outline) -> Self {
        let mut level_stats = BTreeMap::new();
        for entry in outline.entries() {
            *level_stats.entry(entry.level).or_insert(0) += 1;
        }
        let entries = build_paths(outline);
        let recommended_split_level = recommend_split_level(&level_stats);
        let split_preview = split_preview(&entries, recommended_split_level);
        Analysis {
            total_entries: entries.len(),
            max_depth: level_stats.keys().next_back().copied().unwrap_or(0),
            level_stats,
            recommended_split_level,
            entries,
            split_preview,
        }
    }
}

fn build_paths(outline: &Outline) -> Vec<AnalyzedEntry> {
    let mut stack: Vec<(u8, String)> = vec![];
    outline
        .entries()
        .iter()
        .map(|entry| {
            while stack.last().is_some_and(|(level, _)| *level >= entry.level) {
                stack.pop();
            }
            let full_path = match stack.last() {
                Some((_, parent)) => format!("{}/{}", parent, entry.text),
                None => entry.text.clone(),
            };
            stack.push((entry.level, full_path.clone()));
            AnalyzedEntry {
                text: entry.text.clone(),
                level: entry.level,
                full_path,
            }
        })
        .collect()
}

fn recommend_split_level(level_stats: &BTreeMap<u8, usize>) -> u8 {
    let level1 = level_stats.get(&1).copied().unwrap_or(0);
    let level2 = level_stats.get(&2).copied().unwrap_or(0);
    match level1 {
        3..=20 => 1,
        0..=2 if level2 > 5 => 2,
        21.. => 2,
        _ => 1,
    }
}

fn split_preview(entries: &[AnalyzedEntry], split_level: u8) -> Vec<SplitSection> {
    let mut preview: Vec<SplitSection> = vec![];
    for entry in entries {
        if entry.level == split_level {
            preview.push(SplitSection {
                title: entry.text.clone(),
                subsections: 0,
                subsection_list: vec![],
            });
        } else if entry.level > split_level {
            if let Some(section) = preview.last_mut() {
                section.subsections += 1;
                if section.subsection_list.len() < PREVIEW_TITLES {
                    section.subsection_list.push(entry.text.clone());
                }
            }
        }
    }
    preview
}
