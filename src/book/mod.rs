mod book;
mod chapter;
#[cfg(test)]
pub(crate) mod fixtures;
mod opf;
mod toc;

pub use crate::book::book::EpubBook;
pub use crate::book::chapter::Chapter;
pub use crate::book::toc::{NavPoint, TocSource};
pub(crate) use crate::book::toc::collapse_whitespace;
