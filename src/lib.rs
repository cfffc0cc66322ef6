//! # webhelp2pdf
//!
//! A CLI utility that prints a JetBrains-style web help site into a single
//! PDF whose bookmarks mirror the site's navigation menu.
//!
//! ## Pipeline
//!
//! - Crawl the collapsible menu for the ordered page list and nesting levels
//! - Print each page with Chrome and number it in crawl order
//! - Print again any page whose PDF came out empty
//! - Merge everything into one bookmarked document
//!
//! ## Usage
//!
//! ```bash
//! webhelp2pdf --download-dir ~/Downloads
//! ```

mod browser;
mod collector;
mod config;
mod context;
mod crawler;
mod error;
mod integrity;
mod outline;
mod pdf_merger;
mod pipeline;
mod session;

pub use browser::{download_name, ChromeSession};
pub use collector::{sequenced_name, Collector, SequencedFile};
pub use config::{BuildConfig, PrintOptions, SiteConfig};
pub use context::BuildContext;
pub use crawler::{scrape_version, select_help_links, Crawler, DepthMap};
pub use error::{Error, Result};
pub use integrity::IntegrityChecker;
pub use outline::{BookmarkEntry, OutlineBuilder};
pub use pdf_merger::{MergeReport, PdfMerger};
pub use pipeline::{build_documentation, BuildOutcome, Pipeline};
pub use session::{Navigator, PagePrinter};
