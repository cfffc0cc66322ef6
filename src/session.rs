//! Capabilities the pipeline needs from a browser.
//!
//! [`crate::ChromeSession`] implements both traits over the Chrome DevTools
//! Protocol; tests drive the pipeline through in-memory fakes.

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait Navigator: Send + Sync {
    /// Loads `url` in the current tab and waits for it to settle.
    async fn open(&self, url: &str) -> Result<()>;

    /// Serialized DOM of the current tab.
    async fn html(&self) -> Result<String>;

    /// Clicks every expanded menu icon. Failures on single elements are ignored.
    async fn collapse_open_menus(&self) -> Result<()>;

    /// Clicks every collapsed menu icon, revealing one more menu level.
    async fn expand_closed_menus(&self) -> Result<()>;
}

#[async_trait]
pub trait PagePrinter: Send + Sync {
    /// Loads `url` and prints it into the download directory.
    async fn print_page(&self, url: &str) -> Result<()>;
}
