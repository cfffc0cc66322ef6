use lopdf::{Bookmark, Dictionary, Document, Object, ObjectId};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::outline::{parent_indices, BookmarkEntry, OutlineBuilder};

/// Attributes a page may inherit from its page tree node.
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Guards against cyclic Parent chains in damaged files.
const MAX_TREE_DEPTH: usize = 64;

/// Summary of a written master document.
#[derive(Debug, Clone)]
pub struct MergeReport {
    pub bookmarks: Vec<BookmarkEntry>,
    pub total_pages: usize,
}

/// Concatenates section PDFs and attaches one bookmark per section.
pub struct PdfMerger {
    documents: Vec<Document>,
    outline: OutlineBuilder,
}

impl PdfMerger {
    pub fn new() -> Self {
        Self {
            documents: Vec::new(),
            outline: OutlineBuilder::new(),
        }
    }

    /// Loads a section and books its bookmark at the current page offset.
    pub async fn add_pdf(&mut self, path: &Path, level: u32, title: &str) -> Result<&BookmarkEntry> {
        let data = fs::read(path).await?;
        let document = Document::load_mem(&data)?;

        let page_count = document.get_pages().len();
        debug!("Loaded PDF with {} pages from {}", page_count, path.display());

        self.documents.push(document);
        Ok(self.outline.push_section(level, title, page_count))
    }

    pub fn bookmarks(&self) -> &[BookmarkEntry] {
        self.outline.entries()
    }

    /// Number of pages added so far.
    pub fn page_count(&self) -> usize {
        self.outline.next_page() - 1
    }

    pub async fn save(self, output_path: &Path) -> Result<MergeReport> {
        if self.documents.is_empty() {
            return Err(Error::Config("no PDFs added to merge".to_string()));
        }

        info!("Starting PDF merge process with {} documents", self.documents.len());

        let mut max_id = 1;
        let mut page_ids: Vec<ObjectId> = Vec::new();
        let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

        for mut document in self.documents {
            document.renumber_objects_with(max_id);
            max_id = document.max_id + 1;

            for (_, page_id) in document.get_pages() {
                inherit_page_attributes(&mut document, page_id);
                page_ids.push(page_id);
            }
            // Source trees are replaced by the fresh catalog and page tree below
            objects.extend(
                document
                    .objects
                    .into_iter()
                    .filter(|(_, object)| !is_tree_node(object)),
            );
        }

        let mut merged = Document::with_version("1.5");
        merged.objects.extend(objects);
        merged.max_id = max_id - 1;

        let pages_id = merged.new_object_id();
        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Count", Object::Integer(page_ids.len() as i64));
        pages.set(
            "Kids",
            Object::Array(page_ids.iter().copied().map(Object::Reference).collect()),
        );
        merged.objects.insert(pages_id, Object::Dictionary(pages));

        for &page_id in &page_ids {
            if let Ok(Object::Dictionary(page)) = merged.get_object_mut(page_id) {
                page.set("Parent", Object::Reference(pages_id));
            }
        }

        let catalog_id = merged.new_object_id();
        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));
        merged.objects.insert(catalog_id, Object::Dictionary(catalog));
        merged.trailer.set("Root", Object::Reference(catalog_id));

        let bookmarks = self.outline.into_entries();
        attach_outline(&mut merged, catalog_id, &bookmarks, &page_ids);

        info!("Finalizing merged PDF with {} total pages", page_ids.len());

        merged.compress();
        let mut data = Vec::new();
        merged.save_to(&mut data)?;
        fs::write(output_path, data).await?;

        info!("Successfully merged {} sections into {}", bookmarks.len(), output_path.display());
        Ok(MergeReport {
            bookmarks,
            total_pages: page_ids.len(),
        })
    }
}

impl Default for PdfMerger {
    fn default() -> Self {
        Self::new()
    }
}

fn attach_outline(
    merged: &mut Document,
    catalog_id: ObjectId,
    bookmarks: &[BookmarkEntry],
    page_ids: &[ObjectId],
) {
    let parents = parent_indices(bookmarks);
    let mut handles: Vec<Option<u32>> = Vec::with_capacity(bookmarks.len());

    for (entry, parent) in bookmarks.iter().zip(parents) {
        // A section without pages has nothing to point at
        let Some(&page_id) = page_ids.get(entry.start_page - 1) else {
            handles.push(None);
            continue;
        };
        let parent = parent.and_then(|index| handles[index]);
        let bookmark = Bookmark::new(entry.title.clone(), [0.0, 0.0, 0.0], 0, page_id);
        handles.push(Some(merged.add_bookmark(bookmark, parent)));
    }

    if let Some(outline_id) = merged.build_outline() {
        if let Ok(Object::Dictionary(catalog)) = merged.get_object_mut(catalog_id) {
            catalog.set("Outlines", Object::Reference(outline_id));
            catalog.set("PageMode", Object::Name(b"UseOutlines".to_vec()));
        }
    }
}

fn is_tree_node(object: &Object) -> bool {
    matches!(
        object.type_name().unwrap_or(""),
        "Catalog" | "Pages" | "Outlines"
    )
}

/// Copies attributes a page inherits from its tree node onto the page, since
/// the page is about to be re-parented under a fresh node.
fn inherit_page_attributes(document: &mut Document, page_id: ObjectId) {
    let mut inherited: Vec<(&[u8], Object)> = Vec::new();
    let mut node = match document.get_dictionary(page_id) {
        Ok(page) => page.get(b"Parent").and_then(Object::as_reference).ok(),
        Err(_) => return,
    };

    for _ in 0..MAX_TREE_DEPTH {
        let Some(node_id) = node else {
            break;
        };
        let Ok(parent) = document.get_dictionary(node_id) else {
            break;
        };
        for key in INHERITABLE {
            if inherited.iter().all(|(k, _)| *k != key) {
                if let Ok(value) = parent.get(key) {
                    inherited.push((key, value.clone()));
                }
            }
        }
        node = parent.get(b"Parent").and_then(Object::as_reference).ok();
    }

    if let Ok(page) = document.get_dictionary_mut(page_id) {
        for (key, value) in inherited {
            if !page.has(key) {
                page.set(key.to_vec(), value);
            }
        }
    }
}
