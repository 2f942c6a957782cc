use crate::checklist::{PROGRESS_ATTR, storage_key};
use crate::dom::{HeadlessDom, Surface};
use crate::model::{ChecklistState, PageProgress};
use crate::page::page_name;
use crate::store::PersistedStore;
use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct LoadedPage {
    pub path: PathBuf,
    pub name: String,
    pub dom: HeadlessDom,
}

pub fn read_page(path: &Path) -> Result<LoadedPage> {
    let html = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read page: {}", path.display()))?;
    let dom = HeadlessDom::parse(&html)
        .with_context(|| format!("failed to parse html in {}", path.display()))?;
    Ok(LoadedPage {
        path: path.to_path_buf(),
        name: page_name(&dom),
        dom,
    })
}

pub fn discover_pages(site_dir: &Path) -> Result<Vec<LoadedPage>> {
    if !site_dir.exists() {
        bail!("site dir does not exist: {}", site_dir.display());
    }

    let mut pages = Vec::new();
    for entry in WalkDir::new(site_dir) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("html") {
            continue;
        }
        pages.push(read_page(path)?);
    }

    pages.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(pages)
}

/// Checklist progress for one page as recorded in `store`.
pub fn page_progress(page: &LoadedPage, store: &PersistedStore) -> PageProgress {
    let state: ChecklistState = store.load(&storage_key(&page.name), ChecklistState::default());
    let toggles: Vec<String> = page
        .dom
        .query_attr(PROGRESS_ATTR, None)
        .into_iter()
        .filter_map(|node| page.dom.attr(node, PROGRESS_ATTR))
        .collect();

    PageProgress {
        page: page.name.clone(),
        path: page.path.display().to_string(),
        completed: toggles.iter().filter(|item| state.is_done(item)).count(),
        toggles: toggles.len(),
    }
}
