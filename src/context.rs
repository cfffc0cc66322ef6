use crate::crawler::DepthMap;

/// State of one build, handed from stage to stage.
///
/// The page list and depth map are fixed once the crawl finishes; only the
/// sequence counter moves afterwards.
#[derive(Debug, Clone, Default)]
pub struct BuildContext {
    pub version: String,
    pub urls: Vec<String>,
    pub depths: DepthMap,
    /// Sequence number of the last collected page.
    pub counter: usize,
}

impl BuildContext {
    pub fn new(version: impl Into<String>, urls: Vec<String>, depths: DepthMap) -> Self {
        Self {
            version: version.into(),
            urls,
            depths,
            counter: 0,
        }
    }

    pub fn expected_pages(&self) -> usize {
        self.urls.len()
    }

    /// URL that produced the file with this 1-based sequence number.
    pub fn url_for(&self, sequence: usize) -> Option<&str> {
        sequence
            .checked_sub(1)
            .and_then(|index| self.urls.get(index))
            .map(String::as_str)
    }

    /// Bookmark level for a sequence number; top level when unknown.
    pub fn level_for(&self, sequence: usize) -> u32 {
        self.url_for(sequence)
            .map(|url| self.depths.level_of(url))
            .unwrap_or(1)
    }

    /// URLs not yet collected, in crawl order.
    pub fn remaining_urls(&self) -> &[String] {
        self.urls.get(self.counter..).unwrap_or_default()
    }
}
