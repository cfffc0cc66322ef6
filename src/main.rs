use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::path::{Path, PathBuf};
use std::process::{self, Command};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use webhelp2pdf::{build_documentation, BuildConfig};

/// Running without arguments builds the PyCharm help into ~/Downloads.
#[derive(Parser)]
#[command(name = "webhelp2pdf")]
#[command(about = "Print a JetBrains web help site into one PDF with bookmarks that follow its menu")]
#[command(version)]
struct Args {
    /// JSON file overriding the built-in site, print and timing settings
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Folder that receives printed pages and the final PDF
    #[arg(short = 'd', long = "download-dir")]
    download_dir: Option<PathBuf>,

    /// Show the browser window while crawling
    #[arg(long)]
    headed: bool,

    /// Don't open the finished PDF
    #[arg(long = "no-open")]
    no_open: bool,
}

fn load_config(args: &Args) -> Result<BuildConfig> {
    let mut config = match &args.config {
        Some(path) => BuildConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => BuildConfig::default(),
    };
    if let Some(dir) = &args.download_dir {
        config.download_dir = dir.clone();
    }
    if args.headed {
        config.headless = false;
    }
    Ok(config)
}

async fn run(args: Args) -> Result<()> {
    let config = load_config(&args)?;
    info!(
        "Building {} help into {}",
        config.site.product.green(),
        config.download_dir.display().to_string().blue()
    );

    let outcome = build_documentation(config).await?;
    info!(
        "{} v{}: {} pages, {} sections ({} printed, {} retried)",
        outcome.output_path.display().to_string().green(),
        outcome.version,
        outcome.report.total_pages,
        outcome.report.bookmarks.len(),
        outcome.printed,
        outcome.retried
    );

    if !args.no_open {
        if let Err(e) = open_in_viewer(&outcome.output_path) {
            warn!("Could not open {}: {}", outcome.output_path.display(), e);
        }
    }
    Ok(())
}

fn open_in_viewer(path: &Path) -> std::io::Result<()> {
    #[cfg(target_os = "windows")]
    let mut command = {
        let mut command = Command::new("cmd");
        command.args(["/C", "start", ""]);
        command
    };
    #[cfg(target_os = "macos")]
    let mut command = Command::new("open");
    #[cfg(all(unix, not(target_os = "macos")))]
    let mut command = Command::new("xdg-open");

    command.arg(path).spawn().map(|_| ())
}

#[tokio::main]
async fn main() {
    // chromiumoxide logs every CDP message it cannot decode
    let filter = EnvFilter::from_default_env()
        .add_directive("chromiumoxide::conn=off".parse().unwrap())
        .add_directive("chromiumoxide::handler=off".parse().unwrap())
        .add_directive("webhelp2pdf=info".parse().unwrap());

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args).await {
        error!("{}", format!("Error: {:#}", e).red());
        process::exit(1);
    }
}
