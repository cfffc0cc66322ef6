/// One table-of-contents entry of the merged document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmarkEntry {
    pub level: u32,
    pub title: String,
    /// 1-based page where the section starts in the merged document.
    pub start_page: usize,
}

impl BookmarkEntry {
    pub fn new(level: u32, title: impl Into<String>, start_page: usize) -> Self {
        Self {
            level,
            title: title.into(),
            start_page,
        }
    }
}

/// Accumulates bookmarks while sections are appended in order.
#[derive(Debug, Clone)]
pub struct OutlineBuilder {
    entries: Vec<BookmarkEntry>,
    next_page: usize,
}

impl OutlineBuilder {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_page: 1,
        }
    }

    /// Adds a section of `page_count` pages at the current offset.
    pub fn push_section(&mut self, level: u32, title: impl Into<String>, page_count: usize) -> &BookmarkEntry {
        let entry = BookmarkEntry::new(level.max(1), title, self.next_page);
        self.next_page += page_count;
        self.entries.push(entry);
        &self.entries[self.entries.len() - 1]
    }

    /// Page the next section would start on; one past the last page so far.
    pub fn next_page(&self) -> usize {
        self.next_page
    }

    pub fn entries(&self) -> &[BookmarkEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<BookmarkEntry> {
        self.entries
    }
}

impl Default for OutlineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Parent of each entry: the nearest earlier entry with a lower level.
///
/// Level jumps (1 straight to 3) attach to the closest shallower ancestor.
pub fn parent_indices(entries: &[BookmarkEntry]) -> Vec<Option<usize>> {
    let mut stack: Vec<(u32, usize)> = Vec::new();
    let mut parents = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        while stack.last().is_some_and(|&(level, _)| level >= entry.level) {
            stack.pop();
        }
        parents.push(stack.last().map(|&(_, parent)| parent));
        stack.push((entry.level, index));
    }
    parents
}
