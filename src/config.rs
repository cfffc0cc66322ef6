use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Where the help site lives and how its navigation markup looks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub base_url: String,
    pub product: String,
    pub version_probe_page: String,
    pub start_page: String,
    pub content_root_selector: String,
    pub menu_link_selector: String,
    pub version_selector: String,
    pub help_path_marker: String,
    pub end_marker: String,
    pub menu_icon_class: String,
    pub menu_icon_open_class: String,
    /// Deepest menu nesting observed on the site.
    pub menu_depth: usize,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.jetbrains.com/help/pycharm/".to_string(),
            product: "PyCharm".to_string(),
            version_probe_page: "installation-guide.html".to_string(),
            start_page: "quick-start-guide.html".to_string(),
            content_root_selector: "#webhelp-root".to_string(),
            menu_link_selector: "#webhelp-root > div > div > nav > div > div > ul > li > a[href]"
                .to_string(),
            version_selector: "div.dropdown__label".to_string(),
            help_path_marker: "/help".to_string(),
            end_marker: "sending-feedback".to_string(),
            menu_icon_class: "toc-icon".to_string(),
            menu_icon_open_class: "toc-icon--opened".to_string(),
            menu_depth: 7,
        }
    }
}

impl SiteConfig {
    pub fn version_probe_url(&self) -> Result<String> {
        Ok(self.base()?.join(&self.version_probe_page)?.to_string())
    }

    pub fn start_url(&self, version: &str) -> Result<String> {
        Ok(self
            .base()?
            .join(&format!("{}/{}", version, self.start_page))?
            .to_string())
    }

    /// Suffix shared by every page the browser prints for this product.
    pub fn download_suffix(&self) -> String {
        format!("_ {}.pdf", self.product)
    }

    /// Trailing part of a download name that is not part of the page title.
    pub fn title_suffix(&self) -> String {
        format!(" _ {}.pdf", self.product)
    }

    pub fn output_file_name(&self, version: &str) -> String {
        format!("{}_{}_Documentation.pdf", self.product, version)
    }

    fn base(&self) -> Result<url::Url> {
        let mut base = self.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        Ok(url::Url::parse(&base)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintOptions {
    pub scale: f64,
    pub print_background: bool,
    pub margin_top: f64,
    pub margin_right: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            scale: 0.85,
            print_background: false,
            margin_top: 0.4,
            margin_right: 0.4,
            margin_bottom: 0.4,
            margin_left: 0.4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub site: SiteConfig,
    pub print: PrintOptions,
    pub download_dir: PathBuf,
    pub work_dir_name: String,
    /// Printed pages smaller than this are treated as failed renders.
    pub min_pdf_bytes: u64,
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    pub settle_delay_ms: u64,
    pub menu_click_delay_ms: u64,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            site: SiteConfig::default(),
            print: PrintOptions::default(),
            download_dir: default_download_dir(),
            work_dir_name: "PyCharmPDFs".to_string(),
            min_pdf_bytes: 5000,
            headless: true,
            // The site hides its menu when the window is too small
            window_width: 1920,
            window_height: 1080,
            settle_delay_ms: 1500,
            menu_click_delay_ms: 300,
        }
    }
}

impl BuildConfig {
    /// Loads a JSON config file; fields it omits keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.site.product.trim().is_empty() {
            return Err(Error::Config("site.product must not be empty".to_string()));
        }
        if self.site.menu_depth == 0 {
            return Err(Error::Config("site.menu_depth must be at least 1".to_string()));
        }
        if !(0.1..=2.0).contains(&self.print.scale) {
            return Err(Error::Config(format!(
                "print.scale must be between 0.1 and 2.0, got {}",
                self.print.scale
            )));
        }
        Ok(())
    }

    pub fn work_dir(&self) -> PathBuf {
        self.download_dir.join(&self.work_dir_name)
    }

    pub fn output_path(&self, version: &str) -> PathBuf {
        self.download_dir.join(self.site.output_file_name(version))
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn menu_click_delay(&self) -> Duration {
        Duration::from_millis(self.menu_click_delay_ms)
    }
}

fn default_download_dir() -> PathBuf {
    std::env::var_os("USERPROFILE")
        .or_else(|| std::env::var_os("HOME"))
        .map(|home| PathBuf::from(home).join("Downloads"))
        .unwrap_or_else(|| PathBuf::from("Downloads"))
}
