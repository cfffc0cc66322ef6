use scraper::{Html, Selector};
use std::collections::HashMap;
use tracing::{debug, info};
use url::Url;

use crate::config::SiteConfig;
use crate::error::{Error, Result};
use crate::session::Navigator;

/// Menu nesting level per page URL, 1 being the top level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepthMap {
    levels: HashMap<String, u32>,
}

impl DepthMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `level` for `url` unless an earlier pass already revealed it.
    pub fn record(&mut self, url: &str, level: u32) -> bool {
        if self.levels.contains_key(url) {
            return false;
        }
        self.levels.insert(url.to_string(), level);
        true
    }

    /// Pages the menu scan never surfaced sit at the top level.
    pub fn level_of(&self, url: &str) -> u32 {
        self.levels.get(url).copied().unwrap_or(1)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

impl FromIterator<(String, u32)> for DepthMap {
    fn from_iter<I: IntoIterator<Item = (String, u32)>>(iter: I) -> Self {
        let mut map = DepthMap::new();
        for (url, level) in iter {
            map.record(&url, level);
        }
        map
    }
}

pub struct Crawler<'a> {
    site: &'a SiteConfig,
}

impl<'a> Crawler<'a> {
    pub fn new(site: &'a SiteConfig) -> Self {
        Self { site }
    }

    /// Reads the current documentation version from the version probe page.
    pub async fn fetch_version(&self, navigator: &dyn Navigator) -> Result<String> {
        let probe_url = self.site.version_probe_url()?;
        info!("Getting version number of latest {} help", self.site.product);
        navigator.open(&probe_url).await?;
        let html = navigator.html().await?;
        scrape_version(&html, &self.site.version_selector)
            .ok_or(Error::MissingVersion(probe_url))
    }

    /// Collapses the whole menu, then reveals it one level per pass.
    ///
    /// A link is assigned the index of the first pass on which it was visible.
    pub async fn build_depth_map(&self, navigator: &dyn Navigator, base: &Url) -> Result<DepthMap> {
        let selector = parse_selector(&self.site.menu_link_selector)?;

        info!("Closing menus to determine tree hierarchy for bookmarks");
        for _ in 0..self.site.menu_depth {
            navigator.collapse_open_menus().await?;
        }

        info!("Opening menus to determine tree hierarchy for bookmarks");
        let mut depths = DepthMap::new();
        for pass in 0..self.site.menu_depth {
            let html = navigator.html().await?;
            let revealed = visible_menu_links(&html, &selector, base)
                .into_iter()
                .filter(|url| depths.record(url, pass as u32 + 1))
                .count();
            debug!("Menu pass {} revealed {} new links", pass + 1, revealed);
            navigator.expand_closed_menus().await?;
        }

        Ok(depths)
    }

    /// Collects the ordered help page URLs from the fully expanded menu.
    pub async fn collect_page_urls(&self, navigator: &dyn Navigator, base: &Url) -> Result<Vec<String>> {
        info!("Building a list of urls required to build PDF...");
        let html = navigator.html().await?;
        let urls = select_help_links(&html, self.site, base)?;
        info!("Found {} help pages", urls.len());
        Ok(urls)
    }
}

/// Picks the in-help page links under the content root in document order.
///
/// Collection stops at the first link after the list has started that leaves
/// the help path or points at the end-of-document feedback page. The feedback
/// page itself is kept when it is an in-help link.
pub fn select_help_links(html: &str, site: &SiteConfig, base: &Url) -> Result<Vec<String>> {
    let document = Html::parse_document(html);
    let root_selector = parse_selector(&site.content_root_selector)?;
    let link_selector = parse_selector("a[href]")?;

    let mut urls = Vec::new();
    let Some(root) = document.select(&root_selector).next() else {
        return Ok(urls);
    };

    for element in root.select(&link_selector) {
        let Some(href) = element.value().attr("href").and_then(|h| resolve(base, h)) else {
            continue;
        };

        let in_help = href.contains(&site.help_path_marker);
        if in_help && !href.contains('#') {
            urls.push(href.clone());
        }
        if !urls.is_empty() && (!in_help || href.contains(&site.end_marker)) {
            break;
        }
    }

    Ok(urls)
}

pub fn scrape_version(html: &str, version_selector: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(version_selector).ok()?;
    document
        .select(&selector)
        .next()
        .map(|label| label.text().collect::<String>().trim().to_string())
        .filter(|version| !version.is_empty())
}

fn visible_menu_links(html: &str, selector: &Selector, base: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(selector)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| resolve(base, href))
        .collect()
}

fn resolve(base: &Url, href: &str) -> Option<String> {
    base.join(href.trim()).ok().map(String::from)
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| Error::Selector(format!("{}: {}", selector, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://www.jetbrains.com/help/pycharm/2024.3/quick-start-guide.html").unwrap()
    }

    #[test]
    fn keeps_help_links_in_document_order() {
        let html = r##"
            <a href="/outside-root.html">not under root</a>
            <div id="webhelp-root">
              <a href="https://www.jetbrains.com/pycharm/">product page</a>
              <a href="quick-start-guide.html">Quick start</a>
              <a href="quick-start-guide.html#install">anchor</a>
              <a href="/help/pycharm/2024.3/installation-guide.html">Install</a>
              <a href="sending-feedback.html">Feedback</a>
              <a href="after-feedback.html">never reached</a>
            </div>
        "##;
        let urls = select_help_links(html, &SiteConfig::default(), &base()).unwrap();
        assert_eq!(
            urls,
            vec![
                "https://www.jetbrains.com/help/pycharm/2024.3/quick-start-guide.html",
                "https://www.jetbrains.com/help/pycharm/2024.3/installation-guide.html",
                "https://www.jetbrains.com/help/pycharm/2024.3/sending-feedback.html",
            ]
        );
    }

    #[test]
    fn stops_at_first_link_leaving_help() {
        let html = r#"
            <div id="webhelp-root">
              <a href="a.html">A</a>
              <a href="https://blog.jetbrains.com/">blog</a>
              <a href="b.html">B</a>
            </div>
        "#;
        let urls = select_help_links(html, &SiteConfig::default(), &base()).unwrap();
        assert_eq!(urls, vec!["https://www.jetbrains.com/help/pycharm/2024.3/a.html"]);
    }

    #[test]
    fn missing_root_yields_nothing() {
        let urls = select_help_links("<p>empty</p>", &SiteConfig::default(), &base()).unwrap();
        assert!(urls.is_empty());
    }

    #[test]
    fn version_label_is_trimmed() {
        let html = r#"<div class="dropdown__label"> 2024.3 </div><div class="dropdown__label">2024.2</div>"#;
        assert_eq!(scrape_version(html, "div.dropdown__label").as_deref(), Some("2024.3"));
        assert_eq!(scrape_version("<div></div>", "div.dropdown__label"), None);
    }

    #[test]
    fn first_recorded_level_wins_and_unknown_defaults_to_top() {
        let mut depths = DepthMap::new();
        assert!(depths.record("a", 1));
        assert!(!depths.record("a", 3));
        assert_eq!(depths.level_of("a"), 1);
        assert_eq!(depths.level_of("never-seen"), 1);
    }
}
