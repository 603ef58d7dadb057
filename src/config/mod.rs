//! Crawler configuration: types, accessors, and the fluent builder.

pub mod builder;
pub mod getters;
pub mod types;

pub use builder::CrawlerBuilder;
pub use types::{CrawlConfig, CssOptions, DomOptions, ScreenshotOptions};
