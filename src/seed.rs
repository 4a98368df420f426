//! Bulk loading of categories and items from a directory tree.
//!
//! ```text
//! content/
//! ├── Soups/                  # category name
//! │   ├── summary.txt         # category summary
//! │   ├── cover.jpg           # category image (any image without a .md twin)
//! │   ├── Tom Yum.md          # item body, name from the file stem
//! │   ├── Tom Yum.jpg         # item image, same stem
//! │   └── Tom Yum.txt         # optional item summary
//! └── Desserts/
//!     └── ...
//! ```
//!
//! Without a `.txt` summary an item's summary is its first paragraph,
//! shortened to fit. Categories and items whose slug already exists are
//! skipped, so seeding the same tree twice is harmless. Images are
//! transformed in parallel with rayon; rows are committed one at a time so
//! the first category seeded into an empty database becomes the default.
//! Seeded items are not announced.

use crate::content::{self, PreparedCategory, PreparedItem};
use crate::error::AppError;
use crate::models::{CategoryDraft, ITEM_SUMMARY_MAX_CHARS, ItemDraft, Upload};
use crate::state::State;
use crate::store::{categories, items};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Category directory {0} has no cover image")]
    MissingCover(PathBuf),
    #[error("Category directory {0} has no summary.txt")]
    MissingSummary(PathBuf),
    #[error("Item {0} has no image")]
    MissingImage(PathBuf),
    #[error("{path}: {source}")]
    Content {
        path: PathBuf,
        #[source]
        source: AppError,
    },
    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "tif", "tiff"];

/// One category directory as found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedCategory {
    pub dir: PathBuf,
    pub name: String,
    pub summary_path: PathBuf,
    pub cover: PathBuf,
    pub items: Vec<SeedItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedItem {
    pub name: String,
    pub markdown: PathBuf,
    pub image: PathBuf,
    pub summary: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub categories: usize,
    pub items: usize,
    pub skipped: usize,
}

fn extension(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

fn is_image(path: &Path) -> bool {
    IMAGE_EXTENSIONS.contains(&extension(path).as_str())
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Find category directories and their items under `root`.
pub fn scan(root: &Path) -> Result<Vec<SeedCategory>, SeedError> {
    let mut files: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(2)
        .sort_by_file_name()
    {
        let entry = entry?;
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if hidden {
            continue;
        }
        if entry.depth() == 1 && entry.file_type().is_dir() {
            files.entry(entry.path().to_path_buf()).or_default();
        } else if entry.depth() == 2 && entry.file_type().is_file() {
            if let Some(parent) = entry.path().parent() {
                files
                    .entry(parent.to_path_buf())
                    .or_default()
                    .push(entry.path().to_path_buf());
            }
        }
    }

    files
        .into_iter()
        .map(|(dir, entries)| scan_category(dir, &entries))
        .collect()
}

fn scan_category(dir: PathBuf, entries: &[PathBuf]) -> Result<SeedCategory, SeedError> {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().trim().to_string())
        .unwrap_or_default();
    let summary_path = dir.join("summary.txt");
    if !entries.contains(&summary_path) {
        return Err(SeedError::MissingSummary(dir));
    }

    let with_ext = |stem_name: &str, wanted: &dyn Fn(&Path) -> bool| {
        entries
            .iter()
            .find(|p| stem(p) == stem_name && wanted(p.as_path()))
            .cloned()
    };

    let mut items = Vec::new();
    for markdown in entries.iter().filter(|p| extension(p) == "md") {
        let item_name = stem(markdown);
        let image = with_ext(&item_name, &is_image)
            .ok_or_else(|| SeedError::MissingImage(markdown.clone()))?;
        let summary = with_ext(&item_name, &|p: &Path| extension(p) == "txt");
        items.push(SeedItem {
            name: item_name,
            markdown: markdown.clone(),
            image,
            summary,
        });
    }

    let cover = entries
        .iter()
        .filter(|p| is_image(p))
        .find(|p| !items.iter().any(|item| &item.image == *p))
        .cloned()
        .ok_or_else(|| SeedError::MissingCover(dir.clone()))?;

    Ok(SeedCategory {
        dir,
        name,
        summary_path,
        cover,
        items,
    })
}

/// First paragraph of a Markdown body, headings skipped, cut to the summary
/// limit on a word boundary.
pub fn summarize(markdown: &str) -> String {
    let paragraph = markdown
        .split("\n\n")
        .map(str::trim)
        .find(|p| !p.is_empty() && !p.starts_with('#'))
        .unwrap_or_default()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if paragraph.chars().count() <= ITEM_SUMMARY_MAX_CHARS {
        return paragraph;
    }
    let mut out = String::new();
    for word in paragraph.split(' ') {
        // Room for the word, a space and the ellipsis
        if out.chars().count() + word.chars().count() + 2 > ITEM_SUMMARY_MAX_CHARS {
            break;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out.push('…');
    out
}

fn read_upload(path: &Path) -> Result<Upload, SeedError> {
    Ok(Upload {
        file_name: path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
        bytes: fs::read(path)?,
    })
}

fn content_error(path: &Path) -> impl FnOnce(AppError) -> SeedError + '_ {
    move |source| SeedError::Content {
        path: path.to_path_buf(),
        source,
    }
}

type PreparedTree = Vec<(SeedCategory, PreparedCategory, Vec<(SeedItem, PreparedItem)>)>;

fn prepare_all(state: &State, tree: Vec<SeedCategory>) -> Result<PreparedTree, SeedError> {
    let images = state.images.as_ref();
    let config = &state.config.images;

    tree.into_par_iter()
        .map(|category| -> Result<_, SeedError> {
            let draft = CategoryDraft {
                name: category.name.clone(),
                summary: fs::read_to_string(&category.summary_path)?,
                image: Some(read_upload(&category.cover)?),
            };
            let prepared = content::prepare_category(images, config, draft, true)
                .map_err(content_error(&category.dir))?;

            let items = category
                .items
                .par_iter()
                .map(|item| -> Result<_, SeedError> {
                    let body = fs::read_to_string(&item.markdown)?;
                    let summary = match &item.summary {
                        Some(path) => fs::read_to_string(path)?,
                        None => summarize(&body),
                    };
                    let draft = ItemDraft {
                        name: item.name.clone(),
                        summary,
                        content: body,
                        category_id: None,
                        published_at: None,
                        image: Some(read_upload(&item.image)?),
                    };
                    let prepared = content::prepare_item(images, config, draft, true)
                        .map_err(content_error(&item.markdown))?;
                    Ok((item.clone(), prepared))
                })
                .collect::<Result<Vec<_>, SeedError>>()?;

            Ok((category, prepared, items))
        })
        .collect()
}

/// Load every category and item under `root` into the site.
pub async fn seed(state: Arc<State>, root: &Path) -> Result<SeedReport, SeedError> {
    let tree = scan(root)?;
    info!(
        "Found {} categories and {} items under {}",
        tree.len(),
        tree.iter().map(|c| c.items.len()).sum::<usize>(),
        root.display()
    );

    let worker = Arc::clone(&state);
    let prepared = tokio::task::spawn_blocking(move || prepare_all(&worker, tree)).await??;

    let mut report = SeedReport::default();
    for (seed_category, category, items) in prepared {
        let slug = category.slug.clone();
        let existing = state
            .store
            .call(move |conn| categories::find_by_slug(conn, &slug))
            .await
            .map_err(|e| content_error(&seed_category.dir)(e.into()))?;
        let category = match existing {
            Some(existing) => {
                info!("Category {} exists, adding missing items only", existing.name);
                report.skipped += 1;
                existing
            }
            None => {
                let saved = content::commit_category(&state, None, category)
                    .await
                    .map_err(content_error(&seed_category.dir))?;
                report.categories += 1;
                saved
            }
        };

        for (seed_item, mut item) in items {
            let slug = item.slug.clone();
            let taken = state
                .store
                .call(move |conn| items::find_by_slug(conn, &slug))
                .await
                .map_err(|e| content_error(&seed_item.markdown)(e.into()))?;
            if taken.is_some() {
                warn!("Skipping {}: an item with this slug exists", seed_item.markdown.display());
                report.skipped += 1;
                continue;
            }
            item.category_id = Some(category.id);
            content::commit_item(&state, None, item, false)
                .await
                .map_err(content_error(&seed_item.markdown))?;
            report.items += 1;
        }
    }

    info!(
        "Seeded {} categories and {} items ({} skipped)",
        report.categories, report.items, report.skipped
    );
    Ok(report)
}
