//! The crawling control plane: frontier, fetch, context, and the main loop.

pub mod context;
pub mod crawler;
pub mod fetch;
pub mod frontier;

pub use context::CrawlContext;
pub use crawler::{CrawlSummary, Crawler, ShutdownHandle};
pub use fetch::PageResult;
pub use frontier::{Frontier, FrontierEntry};
