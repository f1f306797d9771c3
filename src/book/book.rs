use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info, warn};
use zip::ZipArchive;

use super::opf::Package;
use super::toc::{self, NavPoint, TocSource};
use crate::encoding::decode_document;
use crate::error::{EpubError, Result};

const CONTAINER_PATH: &str = "META-INF/container.xml";
const OPF_MEDIA_TYPE: &str = "application/oebps-package+xml";
const NCX_MEDIA_TYPE: &str = "application/x-dtbncx+xml";
const MAX_PREALLOCATION: u64 = 1 << 20;

#[derive(Deserialize)]
#[serde(rename = "container")]
struct Container {
    rootfiles: RootFiles,
}

#[derive(Deserialize)]
struct RootFiles {
    #[serde(rename = "rootfile", default)]
    rootfile: Vec<RootFile>,
}

#[derive(Deserialize)]
struct RootFile {
    #[serde(rename = "@full-path")]
    full_path: String,
    #[serde(rename = "@media-type", default)]
    media_type: Option<String>,
}

pub struct EpubBook<R> {
    archive: ZipArchive<R>,
    pub package: Package,
}

impl EpubBook<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }
}

impl<R: Read + Seek> EpubBook<R> {
    pub fn from_reader(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;
        let container = read_entry(&mut archive, CONTAINER_PATH)?;
        let opf_path = rootfile_path(&decode_document(&container))?;
        debug!("package document at {}", opf_path);
        let opf = read_entry(&mut archive, &opf_path)?;
        let package = Package::parse(&decode_document(&opf), &opf_path)?;
        info!(
            "opened 《{}》: {} manifest items, {} spine items",
            package.metadata.title.as_deref().unwrap_or("?"),
            package.manifest.len(),
            package.spine.len()
        );
        Ok(EpubBook { archive, package })
    }

    pub fn title(&self) -> Option<&str> {
        self.package.metadata.title.as_deref()
    }

    pub fn authors(&self) -> &[String] {
        &self.package.metadata.creators
    }

    pub fn language(&self) -> Option<&str> {
        self.package.metadata.language.as_deref()
    }

    pub fn read_bytes(&mut self, path: &str) -> Result<Vec<u8>> {
        read_entry(&mut self.archive, path)
    }

    pub fn read_text(&mut self, path: &str) -> Result<String> {
        Ok(decode_document(&self.read_bytes(path)?))
    }

    /// Archive paths of the (X)HTML spine documents in reading order.
    pub fn spine_documents(&self) -> Vec<String> {
        self.package
            .spine
            .iter()
            .filter_map(|idref| match self.package.item(idref) {
                Some(item) if item.is_html() => Some(item.href.clone()),
                Some(item) => {
                    debug!("spine item {} is {}, skipped", idref, item.media_type);
                    None
                }
                None => {
                    warn!("spine references unknown manifest id {}", idref);
                    None
                }
            })
            .collect()
    }

    /// Navigation tree from the NCX, or from the EPUB 3 nav document when
    /// there is no NCX. Unreadable navigation yields an empty tree.
    pub fn navigation(&mut self) -> (Vec<NavPoint>, TocSource) {
        if let Some(ncx_path) = self.ncx_path() {
            match self.read_text(&ncx_path).and_then(|xml| toc::parse_ncx(&xml, &ncx_path)) {
                Ok(points) => return (points, TocSource::Ncx),
                Err(e) => warn!("unable to read NCX {}: {}", ncx_path, e),
            }
        }
        if let Some(nav_path) = self.nav_path() {
            match self.read_text(&nav_path) {
                Ok(html) => return (toc::parse_nav(&html, &nav_path), TocSource::NavDocument),
                Err(e) => warn!("unable to read nav document {}: {}", nav_path, e),
            }
        }
        (vec![], TocSource::None)
    }

    fn ncx_path(&self) -> Option<String> {
        let package = &self.package;
        package
            .spine_toc
            .as_deref()
            .and_then(|id| package.item(id))
            .or_else(|| {
                package
                    .manifest
                    .iter()
                    .find(|item| item.media_type == NCX_MEDIA_TYPE)
            })
            .map(|item| item.href.clone())
    }

    fn nav_path(&self) -> Option<String> {
        self.package
            .manifest
            .iter()
            .find(|item| item.properties.split_whitespace().any(|p| p == "nav"))
            .map(|item| item.href.clone())
    }
}

fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<Vec<u8>> {
    let mut entry = match archive.by_name(path) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => {
            return Err(EpubError::MissingEntry(path.to_string()))
        }
        Err(e) => return Err(e.into()),
    };
    // the declared size comes from the archive and is only a hint
    let capacity = entry.size().min(MAX_PREALLOCATION) as usize;
    let mut buffer = Vec::with_capacity(capacity);
    entry.read_to_end(&mut buffer)?;
    Ok(buffer)
}

fn rootfile_path(container_xml: &str) -> Result<String> {
    let container: Container = quick_xml::de::from_str(container_xml)?;
    let rootfiles = container.rootfiles.rootfile;
    rootfiles
        .iter()
        .find(|r| r.media_type.as_deref() == Some(OPF_MEDIA_TYPE))
        .or_else(|| rootfiles.first())
        .map(|r| r.full_path.trim_start_matches('/').to_string())
        .filter(|p| !p.is_empty())
        .ok_or(EpubError::MissingRootfile)
}

/// Directory part of an archive path, with a trailing slash when non-empty.
pub(crate) fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..=idx],
        None => "",
    }
}

/// Resolves `href` against the document at `base`, returning the archive path
/// and the fragment, if any.
pub(crate) fn resolve_href(base: &str, href: &str) -> (String, Option<String>) {
    let (target, anchor) = match href.split_once('#') {
        Some((target, anchor)) => (target, Some(anchor)),
        None => (href, None),
    };
    let anchor = anchor
        .filter(|a| !a.is_empty())
        .map(|a| percent_decode(a));
    if target.is_empty() {
        return (base.to_string(), anchor);
    }
    let target = percent_decode(target);
    let joined = format!("{}{}", parent_dir(base), target);
    let mut segments: Vec<&str> = vec![];
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    (segments.join("/"), anchor)
}

fn percent_decode(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}
