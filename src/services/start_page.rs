//! Locates the bundled start page.
//!
//! The page lives in `resources/start/` next to the application. It is looked
//! up in order:
//! 1. `$QUIETBROWSER_RESOURCES/start`
//! 2. `resources/start` beside the executable
//! 3. the project root when running from `target/{debug,release}`
//! 4. `resources/start` under the working directory

use std::env;
use std::path::{Path, PathBuf};

use tracing::debug;
use url::Url;

use crate::types::settings::START_PAGE_HOST;

pub const START_PAGE_FILE: &str = "start.html";
pub const RESOURCES_ENV: &str = "QUIETBROWSER_RESOURCES";

/// A located start page and the directory it may read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartPage {
    pub file: PathBuf,
    pub dir: PathBuf,
}

/// True for the internal start marker and `about:blank`.
pub fn is_start_page(url: &Url) -> bool {
    url.as_str() == "about:blank"
        || (url.scheme() == "http" && url.host_str() == Some(START_PAGE_HOST))
}

/// Directories that may hold `start.html`, in lookup order.
pub fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(path) = env::var(RESOURCES_ENV) {
        dirs.push(PathBuf::from(path).join("start"));
    }

    if let Ok(exe) = env::current_exe().and_then(|p| p.canonicalize()) {
        if let Some(exe_dir) = exe.parent() {
            dirs.push(exe_dir.join("resources").join("start"));

            if let Some(target_dir) = exe_dir.parent() {
                if target_dir.file_name().is_some_and(|n| n == "target") {
                    if let Some(project_root) = target_dir.parent() {
                        dirs.push(project_root.join("resources").join("start"));
                    }
                }
            }
        }
    }

    if let Ok(cwd) = env::current_dir() {
        dirs.push(cwd.join("resources").join("start"));
    }

    dirs
}

/// First directory in `dirs` that contains the start page.
pub fn locate_in(dirs: &[PathBuf]) -> Option<StartPage> {
    dirs.iter().find_map(|dir| {
        let file = dir.join(START_PAGE_FILE);
        if file.is_file() {
            Some(StartPage {
                file,
                dir: dir.clone(),
            })
        } else {
            debug!("no start page in {}", dir.display());
            None
        }
    })
}

/// Resolves a request path against the start-page directory, refusing
/// anything that escapes it.
pub fn resolve_within(dir: &Path, request_path: &str) -> Option<PathBuf> {
    let relative = request_path.trim_start_matches('/');
    let relative = if relative.is_empty() { START_PAGE_FILE } else { relative };
    let candidate = dir.join(relative).canonicalize().ok()?;
    let root = dir.canonicalize().ok()?;
    if candidate.starts_with(&root) && candidate.is_file() {
        Some(candidate)
    } else {
        None
    }
}
