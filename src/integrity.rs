use colored::*;
use lopdf::Document;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::collector::{Collector, SequencedFile};
use crate::context::BuildContext;
use crate::error::Result;
use crate::session::PagePrinter;

/// Finds printed pages that did not render and prints them once more.
pub struct IntegrityChecker {
    min_bytes: u64,
}

impl IntegrityChecker {
    pub fn new(min_bytes: u64) -> Self {
        Self { min_bytes }
    }

    /// A render failed when the file is tiny or is not a PDF with pages.
    pub async fn is_failed_render(&self, path: &Path) -> Result<bool> {
        let size = fs::metadata(path).await?.len();
        if size < self.min_bytes {
            debug!("{} is only {} bytes", path.display(), size);
            return Ok(true);
        }

        let data = fs::read(path).await?;
        match Document::load_mem(&data) {
            Ok(document) => Ok(document.get_pages().is_empty()),
            Err(e) => {
                debug!("{} does not parse: {}", path.display(), e);
                Ok(true)
            }
        }
    }

    pub async fn failed_renders(&self, collector: &Collector) -> Result<Vec<SequencedFile>> {
        let mut failed = Vec::new();
        for file in collector.sequenced_files()? {
            if self.is_failed_render(&file.path).await? {
                failed.push(file);
            }
        }
        Ok(failed)
    }

    /// Single retry sweep over failed renders; retried pages are not checked again.
    ///
    /// Returns how many pages were printed again.
    pub async fn retry_failed(
        &self,
        ctx: &BuildContext,
        printer: &dyn PagePrinter,
        collector: &Collector,
    ) -> Result<usize> {
        let failed = self.failed_renders(collector).await?;
        if failed.is_empty() {
            info!("All {} printed pages look complete", ctx.counter);
            return Ok(0);
        }

        info!("Retrying {} page(s) that failed to render", failed.len());
        let mut retried = 0;
        for (index, file) in failed.iter().enumerate() {
            let Some(url) = ctx.url_for(file.sequence) else {
                warn!("No page URL for {}, skipping retry", file.file_name());
                continue;
            };

            info!("Building PDF {}/{} for {}", index + 1, failed.len(), url.green());
            if let Err(e) = printer.print_page(url).await {
                warn!("Retry of {} failed: {}", url, e);
                continue;
            }
            collector.collect_into_slot(file.sequence).await?;
            retried += 1;
        }

        Ok(retried)
    }
}
