mod config;
mod global;
mod template;

pub use crate::config::config::{
    BatchConfig, Config, DetectionConfig, HeadingScan, OutputConfig, OutputFormat,
    DEFAULT_CONFIG_PATH,
};
pub use crate::config::global::TEMPLATE;
pub use crate::config::template::Template;
