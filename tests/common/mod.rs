#![allow(dead_code)]

use async_trait::async_trait;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use webhelp2pdf::{BuildConfig, Navigator, PagePrinter, Result};

pub const BASE_URL: &str = "https://docs.example.test/help/pycharm/";
pub const VERSION: &str = "2024.3";

/// A PDF with `pages` blank pages, padded well past the failed-render threshold.
pub fn padded_pdf(pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids: Vec<Object> = Vec::new();
    for index in 0..pages {
        let padding = format!("% page {} {}\n", index + 1, "x".repeat(6000));
        let content_id = doc.add_object(Stream::new(dictionary! {}, padding.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut data = Vec::new();
    doc.save_to(&mut data).expect("serialize test PDF");
    data
}

pub fn write_pdf(path: &Path, pages: usize) {
    std::fs::write(path, padded_pdf(pages)).expect("write test PDF");
}

pub fn test_config(download_dir: &Path) -> BuildConfig {
    let mut config = BuildConfig::default();
    config.download_dir = download_dir.to_path_buf();
    config.site.base_url = BASE_URL.to_string();
    config
}

pub fn page_url(slug: &str) -> String {
    format!("{}{}/{}.html", BASE_URL, VERSION, slug)
}

/// Nesting, title and destination page (1-based) of each outline item, in
/// reading order.
pub fn read_outline(path: &Path) -> Vec<(u32, String, u32)> {
    let doc = Document::load(path).expect("load merged PDF");
    let outlines_id = doc
        .catalog()
        .and_then(|catalog| catalog.get(b"Outlines"))
        .and_then(Object::as_reference)
        .expect("catalog has an outline");
    let outlines = doc.get_dictionary(outlines_id).expect("outline root");

    let mut entries = Vec::new();
    if let Ok(first) = outlines.get(b"First").and_then(Object::as_reference) {
        walk_outline(&doc, first, 1, &mut entries);
    }
    entries
}

fn walk_outline(doc: &Document, first: ObjectId, level: u32, out: &mut Vec<(u32, String, u32)>) {
    let mut next = Some(first);
    while let Some(id) = next {
        let item = doc.get_dictionary(id).expect("outline item");
        let title = match item.get(b"Title") {
            Ok(Object::String(bytes, _)) => decode_text(bytes),
            _ => String::new(),
        };
        out.push((level, title, destination_page(doc, item)));
        if let Ok(child) = item.get(b"First").and_then(Object::as_reference) {
            walk_outline(doc, child, level + 1, out);
        }
        next = item.get(b"Next").and_then(Object::as_reference).ok();
    }
}

/// Page number an outline item jumps to, from `/Dest` or a GoTo action's `/D`.
fn destination_page(doc: &Document, item: &Dictionary) -> u32 {
    let dest = match item.get(b"Dest") {
        Ok(dest) => dest,
        Err(_) => {
            let action = match item.get(b"A").expect("outline item has a destination") {
                Object::Reference(id) => doc.get_dictionary(*id).expect("action dictionary"),
                Object::Dictionary(action) => action,
                other => panic!("unexpected action {:?}", other),
            };
            action.get(b"D").expect("GoTo action has a destination")
        }
    };
    let dest = match dest {
        Object::Reference(id) => doc.get_object(*id).expect("destination array"),
        inline => inline,
    };
    let page_id = dest
        .as_array()
        .expect("explicit destination")
        .first()
        .and_then(|target| target.as_reference().ok())
        .expect("destination targets a page");

    doc.get_pages()
        .into_iter()
        .find(|(_, id)| *id == page_id)
        .map(|(number, _)| number)
        .expect("destination page is in the page tree")
}

fn decode_text(bytes: &[u8]) -> String {
    if bytes.starts_with(&[0xFE, 0xFF]) {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

pub struct FakePage {
    pub slug: &'static str,
    pub title: &'static str,
    pub depth: usize,
    pub pages: usize,
}

/// A help site held in memory: a collapsible menu and printable pages.
pub struct FakeSite {
    download_dir: PathBuf,
    pages: Vec<FakePage>,
    visible_depth: Mutex<usize>,
    broken_once: Mutex<HashSet<String>>,
    silent_once: Mutex<HashSet<String>>,
    printed: Mutex<Vec<String>>,
}

impl FakeSite {
    pub fn new(download_dir: &Path, pages: Vec<FakePage>) -> Self {
        Self {
            download_dir: download_dir.to_path_buf(),
            pages,
            visible_depth: Mutex::new(2),
            broken_once: Mutex::new(HashSet::new()),
            silent_once: Mutex::new(HashSet::new()),
            printed: Mutex::new(Vec::new()),
        }
    }

    /// The first print of `slug` comes out as a tiny, unreadable file.
    pub fn break_once(&self, slug: &str) {
        self.broken_once.lock().unwrap().insert(page_url(slug));
    }

    /// The first print of `slug` reports success but writes no file.
    pub fn silent_once(&self, slug: &str) {
        self.silent_once.lock().unwrap().insert(page_url(slug));
    }

    pub fn printed(&self) -> Vec<String> {
        self.printed.lock().unwrap().clone()
    }

    fn menu_html(&self) -> String {
        let visible = *self.visible_depth.lock().unwrap();
        self.pages
            .iter()
            .filter(|page| page.depth <= visible)
            .map(|page| {
                let icon = if page.depth < visible { "toc-icon toc-icon--opened" } else { "toc-icon" };
                format!(
                    r#"<li><svg class="{}"></svg><a href="{}.html">{}</a></li>"#,
                    icon, page.slug, page.title
                )
            })
            .collect()
    }
}

#[async_trait]
impl Navigator for FakeSite {
    async fn open(&self, _url: &str) -> Result<()> {
        Ok(())
    }

    async fn html(&self) -> Result<String> {
        Ok(format!(
            r#"<html><body>
                <a href="https://docs.example.test/">home</a>
                <div id="webhelp-root"><div><div>
                  <div class="dropdown__label">{}</div>
                  <nav><div><div><ul>{}</ul></div></div></nav>
                  <a href="https://www.example.test/buy/">buy</a>
                  <a href="late-page.html">not part of the book</a>
                </div></div></div>
            </body></html>"#,
            VERSION,
            self.menu_html()
        ))
    }

    async fn collapse_open_menus(&self) -> Result<()> {
        *self.visible_depth.lock().unwrap() = 1;
        Ok(())
    }

    async fn expand_closed_menus(&self) -> Result<()> {
        *self.visible_depth.lock().unwrap() += 1;
        Ok(())
    }
}

#[async_trait]
impl PagePrinter for FakeSite {
    async fn print_page(&self, url: &str) -> Result<()> {
        self.printed.lock().unwrap().push(url.to_string());
        let page = self
            .pages
            .iter()
            .find(|page| page_url(page.slug) == url)
            .expect("printed URL belongs to the site");
        if self.silent_once.lock().unwrap().remove(url) {
            return Ok(());
        }

        let path = self.download_dir.join(format!("{} _ PyCharm.pdf", page.title));
        if self.broken_once.lock().unwrap().remove(url) {
            std::fs::write(path, vec![b'%'; 1200])?;
        } else {
            std::fs::write(path, padded_pdf(page.pages))?;
        }
        Ok(())
    }
}
