use std::fs;
use std::path::Path;

use anyhow::Result;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_TEMPLATE_PATH: &str = "config/template.yaml";

/// Report wording. Every label can be overridden from `config/template.yaml`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Template {
    pub report_title: String,
    pub book_title: String,
    pub authors: String,
    pub generated_at: String,
    pub engine: String,
    pub engine_name: String,
    pub statistics: String,
    pub total_entries: String,
    pub level_entries: String,
    pub entries_suffix: String,
    pub max_depth: String,
    pub recommended_split_level: String,
    pub level_names: [String; 3],
    pub parent_level_1: String,
    pub parent_level_2: String,
    pub file: String,
    pub anchor: String,
    pub method: String,
    pub file_infix: String,
    pub date_format: String,
}

impl Default for Template {
    fn default() -> Self {
        Template {
            report_title: "書籍目次構造分析レポート".to_string(),
            book_title: "書籍名".to_string(),
            authors: "著者".to_string(),
            generated_at: "生成日時".to_string(),
            engine: "解析エンジン".to_string(),
            engine_name: "NCX/ナビゲーション + 見出し検出".to_string(),
            statistics: "検出統計".to_string(),
            total_entries: "総エントリ数".to_string(),
            level_entries: "レベル{level}エントリ数".to_string(),
            entries_suffix: "件".to_string(),
            max_depth: "最大深度".to_string(),
            recommended_split_level: "推奨分割レベル".to_string(),
            level_names: [
                "目次レベル1（大見出し）".to_string(),
                "目次レベル2（中見出し）".to_string(),
                "目次レベル3（小見出し）".to_string(),
            ],
            parent_level_1: "親レベル1".to_string(),
            parent_level_2: "親レベル2".to_string(),
            file: "ファイル".to_string(),
            anchor: "アンカー".to_string(),
            method: "検出方法".to_string(),
            file_infix: "_目次分析_".to_string(),
            date_format: "%Y年%m月%d日 %H:%M:%S".to_string(),
        }
    }
}

impl Template {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Falls back to the built-in labels when the file is absent or invalid.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.is_file() {
            return Template::default();
        }
        let mut template = Template::load(path).unwrap_or_else(|e| {
            warn!("ignoring template {}: {}", path.display(), e);
            Template::default()
        });
        if !is_valid_date_format(&template.date_format) {
            warn!(
                "ignoring invalid date_format {:?} in {}",
                template.date_format,
                path.display()
            );
            template.date_format = Template::default().date_format;
        }
        template
    }

    /// Name of a TOC level (1-based); out of range levels get a generic name.
    pub fn level_name(&self, level: u8) -> String {
        match level {
            1..=3 => self.level_names[usize::from(level) - 1].clone(),
            _ => format!("Level {}", level),
        }
    }

    /// `at` rendered with `date_format`, or with the default format when
    /// `date_format` is not a valid strftime string.
    pub fn format_date(&self, at: &DateTime<Local>) -> String {
        if is_valid_date_format(&self.date_format) {
            at.format(&self.date_format).to_string()
        } else {
            at.format(&Template::default().date_format).to_string()
        }
    }

    pub fn level_entries(&self, level: u8) -> String {
        self.level_entries.replace("{level}", &level.to_string())
    }
}

/// Unknown specifiers make chrono's formatter fail when displayed.
fn is_valid_date_format(format: &str) -> bool {
    !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}
