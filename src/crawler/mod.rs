//! Citation crawling
//!
//! - [`Frontier`]: priority queue of rows to visit plus the visited set
//! - [`CrawlEngine`]: the visit loop, wave accounting and final cleanup pass
//! - [`CrawlState`] / [`CrawlReport`]: lifecycle and summary

mod engine;
mod frontier;
mod state;

pub use engine::{CrawlEngine, CrawlSettings};
pub use frontier::{Frontier, FrontierEntry, SEED_PRIORITY};
pub use state::{CrawlReport, CrawlState};
