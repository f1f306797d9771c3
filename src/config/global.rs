use once_cell::sync::Lazy;

use super::template::DEFAULT_TEMPLATE_PATH;
use super::Template;

pub static TEMPLATE: Lazy<Template> = Lazy::new(|| Template::load_or_default(DEFAULT_TEMPLATE_PATH));
