use colored::*;
use std::path::PathBuf;
use tracing::info;
use url::Url;

use crate::browser::ChromeSession;
use crate::collector::Collector;
use crate::config::BuildConfig;
use crate::context::BuildContext;
use crate::crawler::Crawler;
use crate::error::{Error, Result};
use crate::integrity::IntegrityChecker;
use crate::pdf_merger::{MergeReport, PdfMerger};
use crate::session::{Navigator, PagePrinter};

/// What a completed build produced.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub output_path: PathBuf,
    pub version: String,
    pub printed: usize,
    pub retried: usize,
    pub report: MergeReport,
}

/// Crawl, print, verify and merge, one stage after the other.
pub struct Pipeline {
    config: BuildConfig,
    collector: Collector,
    checker: IntegrityChecker,
}

impl Pipeline {
    pub fn new(config: BuildConfig) -> Self {
        let collector = Collector::new(
            config.download_dir.clone(),
            config.work_dir(),
            config.site.download_suffix(),
        );
        let checker = IntegrityChecker::new(config.min_pdf_bytes);
        Self {
            config,
            collector,
            checker,
        }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn collector(&self) -> &Collector {
        &self.collector
    }

    /// Checks preconditions before any browser work starts.
    pub async fn prepare(&self) -> Result<()> {
        self.collector.ensure_no_stale_downloads()?;
        self.collector.prepare().await
    }

    /// Scrapes the version, then the menu hierarchy, then the page list.
    pub async fn crawl(&self, navigator: &dyn Navigator) -> Result<BuildContext> {
        let crawler = Crawler::new(&self.config.site);
        let version = crawler.fetch_version(navigator).await?;
        info!("Documentation version {}", version.green());

        let start_url = self.config.site.start_url(&version)?;
        navigator.open(&start_url).await?;
        let base = Url::parse(&start_url)?;

        let depths = crawler.build_depth_map(navigator, &base).await?;
        let urls = crawler.collect_page_urls(navigator, &base).await?;
        Ok(BuildContext::new(version, urls, depths))
    }

    /// Prints every page not collected yet, collecting each one right away so
    /// sequence numbers follow crawl order. Returns how many pages were printed.
    pub async fn fetch_pages(&self, ctx: &mut BuildContext, printer: &dyn PagePrinter) -> Result<usize> {
        ctx.counter = self.collector.sequenced_files()?.len();
        if ctx.counter > 0 {
            info!(
                "Resuming after {} page(s) already in {}",
                ctx.counter,
                self.collector.work_dir().display().to_string().blue()
            );
        }

        let remaining = ctx.remaining_urls().to_vec();
        let total = remaining.len();
        info!("Retrieving {} URLs to build manual. Please wait...", total);

        for (index, url) in remaining.iter().enumerate() {
            info!("Building PDF {}/{} for {}", index + 1, total, url.green());
            printer.print_page(url).await?;

            let found = self.collector.pending_downloads()?.len();
            if found != 1 {
                return Err(Error::DownloadCount {
                    url: url.clone(),
                    found,
                });
            }
            self.collector.collect_downloads(&mut ctx.counter).await?;
        }
        Ok(total)
    }

    pub async fn verify(&self, ctx: &BuildContext, printer: &dyn PagePrinter) -> Result<usize> {
        self.checker.retry_failed(ctx, printer, &self.collector).await
    }

    /// Merges the collected pages into the master document.
    ///
    /// Nothing is written unless the files are numbered exactly `1..=expected`.
    pub async fn compile(&self, ctx: &BuildContext) -> Result<(PathBuf, MergeReport)> {
        let files = self.collector.sequenced_files()?;
        if files.len() != ctx.expected_pages() {
            return Err(Error::CountMismatch {
                found: files.len(),
                expected: ctx.expected_pages(),
                dir: self.collector.work_dir().to_path_buf(),
            });
        }
        if let Some((index, file)) = files.iter().enumerate().find(|&(i, f)| f.sequence != i + 1) {
            return Err(Error::SequenceGap {
                position: index + 1,
                found: file.sequence,
                expected: ctx.expected_pages(),
                dir: self.collector.work_dir().to_path_buf(),
            });
        }

        let title_suffix = self.config.site.title_suffix();
        let mut merger = PdfMerger::new();
        for file in &files {
            merger
                .add_pdf(&file.path, ctx.level_for(file.sequence), &file.title(&title_suffix))
                .await?;
        }

        let output_path = self.config.output_path(&ctx.version);
        let report = merger.save(&output_path).await?;
        Ok((output_path, report))
    }

    pub async fn run<S>(&self, session: &S) -> Result<BuildOutcome>
    where
        S: Navigator + PagePrinter,
    {
        let mut ctx = self.crawl(session).await?;
        let printed = self.fetch_pages(&mut ctx, session).await?;
        let retried = self.verify(&ctx, session).await?;
        let (output_path, report) = self.compile(&ctx).await?;

        info!("Process complete: {}", output_path.display().to_string().green());
        Ok(BuildOutcome {
            output_path,
            version: ctx.version,
            printed,
            retried,
            report,
        })
    }
}

/// Runs the whole build against a freshly launched Chrome.
pub async fn build_documentation(config: BuildConfig) -> Result<BuildOutcome> {
    let pipeline = Pipeline::new(config);
    pipeline.prepare().await?;

    let session = ChromeSession::launch(pipeline.config()).await?;
    let result = pipeline.run(&session).await;
    session.close().await;

    result
}
