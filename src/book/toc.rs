use once_cell::sync::Lazy;
use quick_xml::events::Event;
use quick_xml::Reader;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use tracing::debug;

use super::book::resolve_href;
use super::opf::attr;
use crate::error::Result;

static NAV_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("nav").expect("Failed to parse nav selector"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TocSource {
    Ncx,
    NavDocument,
    None,
}

/// A navigation entry with its archive target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavPoint {
    pub label: String,
    pub src: String,
    pub anchor: Option<String>,
    pub children: Vec<NavPoint>,
}

impl NavPoint {
    /// Depth-first walk yielding `(depth, point)` with depth starting at 1.
    /// Unlabelled points are skipped but their children keep the parent depth.
    pub fn flatten(points: &[NavPoint]) -> Vec<(usize, &NavPoint)> {
        fn walk<'a>(points: &'a [NavPoint], depth: usize, out: &mut Vec<(usize, &'a NavPoint)>) {
            for point in points {
                if point.label.is_empty() {
                    walk(&point.children, depth, out);
                } else {
                    out.push((depth, point));
                    walk(&point.children, depth + 1, out);
                }
            }
        }
        let mut out = vec![];
        walk(points, 1, &mut out);
        out
    }
}

pub fn parse_ncx(xml: &str, ncx_path: &str) -> Result<Vec<NavPoint>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<NavPoint> = vec![];
    let mut roots = vec![];
    let mut in_label = false;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"navPoint" => stack.push(NavPoint::default()),
                b"navLabel" => in_label = true,
                b"text" if in_label => in_text = true,
                b"content" => set_src(&mut stack, attr(&e, b"src")?, ncx_path),
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"content" => {
                set_src(&mut stack, attr(&e, b"src")?, ncx_path)
            }
            Event::Text(t) if in_text => {
                if let Some(point) = stack.last_mut() {
                    point.label.push_str(&t.unescape()?);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"navPoint" => {
                    if let Some(mut point) = stack.pop() {
                        point.label = collapse_whitespace(&point.label);
                        match stack.last_mut() {
                            Some(parent) => parent.children.push(point),
                            None => roots.push(point),
                        }
                    }
                }
                b"navLabel" => in_label = false,
                b"text" => in_text = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    debug!("{}: {} top-level nav points", ncx_path, roots.len());
    Ok(roots)
}

fn set_src(stack: &mut [NavPoint], src: Option<String>, ncx_path: &str) {
    if let (Some(point), Some(src)) = (stack.last_mut(), src) {
        if point.src.is_empty() {
            let (target, anchor) = resolve_href(ncx_path, &src);
            point.src = target;
            point.anchor = anchor;
        }
    }
}

/// Parses the `toc` nav of an EPUB 3 navigation document.
pub fn parse_nav(html: &str, nav_path: &str) -> Vec<NavPoint> {
    let doc = Html::parse_document(html);
    let navs: Vec<ElementRef> = doc.select(&NAV_SELECTOR).collect();
    let Some(toc_nav) = navs
        .iter()
        .find(|nav| {
            nav.value()
                .attr("epub:type")
                .is_some_and(|t| t.split_whitespace().any(|t| t == "toc"))
                || nav.value().attr("role") == Some("doc-toc")
        })
        .or_else(|| navs.first())
    else {
        return vec![];
    };
    let points = child_elements(*toc_nav, "ol")
        .next()
        .map(|ol| walk_list(ol, nav_path))
        .unwrap_or_default();
    points
}

fn walk_list(ol: ElementRef, nav_path: &str) -> Vec<NavPoint> {
    child_elements(ol, "li")
        .map(|li| {
            let mut point = NavPoint::default();
            if let Some(label) = child_elements(li, "a")
                .next()
                .or_else(|| child_elements(li, "span").next())
            {
                point.label = collapse_whitespace(&label.text().collect::<String>());
                if let Some(href) = label.value().attr("href") {
                    let (target, anchor) = resolve_href(nav_path, href);
                    point.src = target;
                    point.anchor = anchor;
                }
            }
            if let Some(nested) = child_elements(li, "ol").next() {
                point.children = walk_list(nested, nav_path);
            }
            point
        })
        .collect()
}

/// Direct element children named `name`.
fn child_elements<'a>(
    parent: ElementRef<'a>,
    name: &'static str,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    parent
        .children()
        .filter_map(ElementRef::wrap)
        .filter(move |child| child.value().name() == name)
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
