use chrono::{DateTime, Local};

use crate::analysis::Analysis;
use crate::config::Template;
use crate::extractor::BookToc;
use crate::outline::MAX_LEVEL;

pub fn render(book: &BookToc, template: &Template, generated_at: DateTime<Local>) -> String {
    let analysis = Analysis::of(&book.outline);
    let banner = "=".repeat(80);
    let rule = "-".repeat(60);
    let mut lines = vec![
        banner.clone(),
        template.report_title.clone(),
        format!("{}: {}", template.book_title, book.display_title()),
        format!("{}: {}", template.authors, book.authors.join(", ")),
        format!(
            "{}: {}",
            template.generated_at,
            template.format_date(&generated_at)
        ),
        banner,
        String::new(),
        template.statistics.clone(),
        rule.clone(),
        format!("{}: {}", template.total_entries, book.outline.len()),
    ];
    for (method, count) in book.outline.method_counts() {
        lines.push(format!("  - {}: {}{}", method, count, template.entries_suffix));
    }
    lines.push(format!("{}: {}", template.max_depth, analysis.max_depth));
    lines.push(format!(
        "{}: {}",
        template.recommended_split_level, analysis.recommended_split_level
    ));
    lines.push(String::new());

    for level in 1..=MAX_LEVEL {
        if book.outline.level_count(level) == 0 {
            continue;
        }
        lines.push(template.level_name(level));
        lines.push(rule.clone());
        for (i, entry) in book.outline.level(level).enumerate() {
            lines.push(format!("{:2}. {}", i + 1, entry.text));
            if let Some(parent) = &entry.parent_level_1 {
                lines.push(format!("     └ {}: {}", template.parent_level_1, parent));
            }
            if let Some(parent) = &entry.parent_level_2 {
                lines.push(format!("       └ {}: {}", template.parent_level_2, parent));
            }
            if !entry.href.is_empty() {
                lines.push(format!("     {}: {}", template.file, entry.href));
            }
            if let Some(anchor) = &entry.anchor {
                lines.push(format!("     {}: #{}", template.anchor, anchor));
            }
            if !entry.method.is_standard() {
                lines.push(format!("     {}: {}", template.method, entry.method));
            }
        }
        lines.push(String::new());
    }
    lines.join("\n")
}
