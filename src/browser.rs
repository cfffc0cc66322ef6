use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use colored::*;
use futures_util::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::{BuildConfig, PrintOptions};
use crate::error::{Error, Result};
use crate::session::{Navigator, PagePrinter};

/// Characters Chrome replaces with `_` when it turns a page title into a file name.
const ILLEGAL_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*', '~'];

/// One Chrome instance with a single tab reused for every page.
pub struct ChromeSession {
    browser: Browser,
    handler: JoinHandle<()>,
    page: Page,
    download_dir: PathBuf,
    product: String,
    print: PrintOptions,
    settle_delay: Duration,
    menu_click_delay: Duration,
    menu_icon_class: String,
    menu_icon_open_class: String,
}

impl ChromeSession {
    pub async fn launch(config: &BuildConfig) -> Result<Self> {
        let mut builder = BrowserConfig::builder().window_size(config.window_width, config.window_height);
        if !config.headless {
            builder = builder.with_head();
        }
        let browser_config = builder
            .build()
            .map_err(|e| Error::Browser(format!("Failed to create browser config: {}", e)))?;

        let (mut browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| Error::Browser(format!("Failed to launch browser: {}", e)))?;

        let handler = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if let Err(err) = h {
                    // Chrome emits protocol messages chromiumoxide cannot decode
                    let err_str = err.to_string();
                    if !err_str.contains("data did not match any variant")
                        && !err_str.contains("untagged enum Message")
                    {
                        error!("Browser handler error: {}", err);
                    } else {
                        debug!("Chrome protocol message ignored: {}", err);
                    }
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                browser.close().await.ok();
                handler.abort();
                return Err(Error::Browser(format!("Failed to create new page: {}", e)));
            }
        };

        Ok(Self {
            browser,
            handler,
            page,
            download_dir: config.download_dir.clone(),
            product: config.site.product.clone(),
            print: config.print.clone(),
            settle_delay: config.settle_delay(),
            menu_click_delay: config.menu_click_delay(),
            menu_icon_class: config.site.menu_icon_class.clone(),
            menu_icon_open_class: config.site.menu_icon_open_class.clone(),
        })
    }

    pub async fn close(mut self) {
        self.browser.close().await.ok();
        self.handler.abort();
    }

    /// Clicks every menu icon whose open state equals `opened`; returns the click count.
    async fn click_menu_icons(&self, opened: bool) -> Result<u64> {
        let script = menu_click_script(&self.menu_icon_class, &self.menu_icon_open_class, opened);
        let clicked = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| Error::Browser(format!("Failed to toggle menu icons: {}", e)))?
            .into_value::<u64>()
            .unwrap_or(0);
        tokio::time::sleep(self.menu_click_delay).await;
        Ok(clicked)
    }

    fn print_params(&self) -> PrintToPdfParams {
        PrintToPdfParams {
            scale: Some(self.print.scale),
            display_header_footer: Some(false),
            print_background: Some(self.print.print_background),
            margin_top: Some(self.print.margin_top),
            margin_right: Some(self.print.margin_right),
            margin_bottom: Some(self.print.margin_bottom),
            margin_left: Some(self.print.margin_left),
            ..Default::default()
        }
    }
}

#[async_trait]
impl Navigator for ChromeSession {
    async fn open(&self, url: &str) -> Result<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| Error::Browser(format!("Failed to navigate to {}: {}", url, e)))?;

        self.page
            .wait_for_navigation()
            .await
            .map_err(|e| Error::Browser(format!("Failed to wait for navigation: {}", e)))?;

        // Page content keeps rendering after the load event
        tokio::time::sleep(self.settle_delay).await;
        Ok(())
    }

    async fn html(&self) -> Result<String> {
        self.page
            .content()
            .await
            .map_err(|e| Error::Browser(format!("Failed to get page content: {}", e)))
    }

    async fn collapse_open_menus(&self) -> Result<()> {
        let clicked = self.click_menu_icons(true).await?;
        debug!("Collapsed {} menu nodes", clicked);
        Ok(())
    }

    async fn expand_closed_menus(&self) -> Result<()> {
        let clicked = self.click_menu_icons(false).await?;
        debug!("Expanded {} menu nodes", clicked);
        Ok(())
    }
}

#[async_trait]
impl PagePrinter for ChromeSession {
    async fn print_page(&self, url: &str) -> Result<()> {
        self.open(url).await?;

        let pdf_data = self
            .page
            .pdf(self.print_params())
            .await
            .map_err(|e| Error::Browser(format!("Failed to generate PDF for {}: {}", url, e)))?;

        let title = self.page.get_title().await.ok().flatten().unwrap_or_default();
        let path = self.download_dir.join(download_name(&title, &self.product));
        fs::write(&path, pdf_data).await?;

        info!("Printed \"{}\" into \"{}\"", url.green(), path.display().to_string().blue());
        Ok(())
    }
}

/// File name Chrome gives a printed page: the sanitized title, always ending
/// in ` _ <product>` so the collector recognizes it.
pub fn download_name(title: &str, product: &str) -> String {
    let mut stem: String = title
        .chars()
        .map(|c| {
            if c.is_control() || ILLEGAL_FILENAME_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect::<String>()
        .trim()
        .trim_end_matches('.')
        .to_string();

    if stem.is_empty() {
        stem = "Untitled".to_string();
    }
    let marker = format!(" _ {}", product);
    if !stem.ends_with(&marker) {
        stem.push_str(&marker);
    }
    format!("{}.pdf", stem)
}

fn menu_click_script(icon_class: &str, open_class: &str, opened: bool) -> String {
    let icon_selector = serde_json::to_string(&format!("svg.{}", icon_class)).unwrap_or_default();
    let open_class = serde_json::to_string(open_class).unwrap_or_default();
    format!(
        r#"
        (() => {{
            let clicked = 0;
            for (const icon of document.querySelectorAll({icon_selector})) {{
                if (icon.classList.contains({open_class}) !== {opened}) {{
                    continue;
                }}
                try {{
                    icon.dispatchEvent(new MouseEvent('click', {{ bubbles: true, cancelable: true, view: window }}));
                    clicked += 1;
                }} catch (e) {{
                    // Menu nodes re-render while being toggled
                }}
            }}
            return clicked;
        }})()
        "#
    )
}
