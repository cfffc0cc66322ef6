use colored::*;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Width of the zero-padded sequence prefix on collected files.
pub const SEQUENCE_WIDTH: usize = 4;

/// A printed page moved into the working directory under its sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencedFile {
    pub path: PathBuf,
    pub sequence: usize,
}

impl SequencedFile {
    /// Parses `NNNN_<name>`; anything else is not a sequenced file.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let prefix = name.get(..SEQUENCE_WIDTH)?;
        if !prefix.bytes().all(|b| b.is_ascii_digit()) || !name[SEQUENCE_WIDTH..].starts_with('_') {
            return None;
        }
        let sequence = prefix.parse::<usize>().ok().filter(|&n| n > 0)?;
        Some(Self {
            path: path.to_path_buf(),
            sequence,
        })
    }

    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }

    /// Bookmark title: the name without its sequence prefix and download suffix.
    pub fn title(&self, title_suffix: &str) -> String {
        let name = self.file_name().get(SEQUENCE_WIDTH + 1..).unwrap_or_default();
        let name = name
            .strip_suffix(title_suffix)
            .or_else(|| name.strip_suffix(title_suffix.trim_start()))
            .or_else(|| name.strip_suffix(".pdf"))
            .unwrap_or(name);
        name.trim().to_string()
    }
}

pub fn sequenced_name(sequence: usize, original: &str) -> String {
    format!("{:0width$}_{}", sequence, original, width = SEQUENCE_WIDTH)
}

/// Moves printed pages from the download directory into the working directory.
pub struct Collector {
    download_dir: PathBuf,
    work_dir: PathBuf,
    suffix: String,
}

impl Collector {
    pub fn new(download_dir: impl Into<PathBuf>, work_dir: impl Into<PathBuf>, suffix: impl Into<String>) -> Self {
        Self {
            download_dir: download_dir.into(),
            work_dir: work_dir.into(),
            suffix: suffix.into(),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub async fn prepare(&self) -> Result<()> {
        fs::create_dir_all(&self.work_dir).await?;
        Ok(())
    }

    /// Fails when printed pages from an earlier run are still waiting in the
    /// download directory, since they would be numbered as part of this run.
    pub fn ensure_no_stale_downloads(&self) -> Result<()> {
        let stale = self.pending_downloads()?;
        if stale.is_empty() {
            return Ok(());
        }
        for path in &stale {
            warn!("Leftover download: {}", path.display().to_string().blue());
        }
        Err(Error::StaleDownloads {
            dir: self.download_dir.clone(),
            count: stale.len(),
        })
    }

    /// Printed pages currently sitting in the download directory, by name.
    pub fn pending_downloads(&self) -> Result<Vec<PathBuf>> {
        let pattern = format!("*{}", glob::Pattern::escape(&self.suffix));
        glob_files(&self.download_dir, &pattern)
    }

    /// Moves every pending download into the working directory, numbering each
    /// one after `counter` and advancing it.
    pub async fn collect_downloads(&self, counter: &mut usize) -> Result<Vec<PathBuf>> {
        let mut moved = Vec::new();
        for download in self.pending_downloads()? {
            let target = self.work_dir.join(sequenced_name(*counter + 1, &file_name(&download)));
            move_file(&download, &target).await?;
            debug!("Collected {}", target.display());
            *counter += 1;
            moved.push(target);
        }
        if moved.is_empty() {
            warn!("No printed page found in {}", self.download_dir.display());
        }
        Ok(moved)
    }

    /// Collects a retried page into an existing slot.
    ///
    /// Earlier files holding `sequence` are removed first, so a retry whose page
    /// title changed still leaves exactly one file per sequence number.
    pub async fn collect_into_slot(&self, sequence: usize) -> Result<Option<PathBuf>> {
        let downloads = self.pending_downloads()?;
        let Some((download, extra)) = downloads.split_first() else {
            warn!("Retry of page {} produced no file", sequence);
            return Ok(None);
        };
        if !extra.is_empty() {
            warn!("{} extra download(s) left in {}", extra.len(), self.download_dir.display());
        }

        for existing in self.sequenced_files()?.into_iter().filter(|f| f.sequence == sequence) {
            fs::remove_file(&existing.path).await?;
        }

        let target = self.work_dir.join(sequenced_name(sequence, &file_name(download)));
        move_file(download, &target).await?;
        info!("Replaced page {} with {}", sequence, target.display().to_string().blue());
        Ok(Some(target))
    }

    /// Collected files sorted by name, which sorts them by sequence number.
    pub fn sequenced_files(&self) -> Result<Vec<SequencedFile>> {
        let mut files = Vec::new();
        for path in glob_files(&self.work_dir, "*.pdf")? {
            match SequencedFile::from_path(&path) {
                Some(file) => files.push(file),
                None => warn!("Ignoring unnumbered file {}", path.display()),
            }
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }
}

fn glob_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let dir_pattern = glob::Pattern::escape(&dir.to_string_lossy());
    let full = format!("{}/{}", dir_pattern, pattern);
    let paths = glob::glob(&full).map_err(|e| Error::Config(format!("bad file pattern {}: {}", full, e)))?;

    let mut files = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => warn!("Unreadable entry while scanning {}: {}", dir.display(), e),
        }
    }
    files.sort();
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Rename, falling back to copy and delete across filesystems.
async fn move_file(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    fs::copy(from, to).await?;
    fs::remove_file(from).await?;
    Ok(())
}
