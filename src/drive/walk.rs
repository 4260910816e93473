// Depth-bounded walk of a Drive folder tree. Each call returns an owned
// subtree that the caller merges; parent folder names are back-filled once,
// at the root, after every folder that will be seen has been seen.

use super::client::DriveApi;
use super::{DriveItem, ItemKind, RemoteFile};
use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// How many levels below the root folder to descend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    Full,
    Levels(u32),
}

impl Depth {
    fn reached(self, level: u32) -> bool {
        match self {
            Depth::Full => false,
            Depth::Levels(max) => level >= max,
        }
    }
}

impl FromStr for Depth {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" | "unbounded" | "all" => Ok(Depth::Full),
            other => other
                .parse::<u32>()
                .map(Depth::Levels)
                .map_err(|_| format!("expected a number of levels or `full`, got `{s}`")),
        }
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Depth::Full => write!(f, "full"),
            Depth::Levels(n) => write!(f, "{n}"),
        }
    }
}

/// A folder whose contents were not listed because of the depth limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CutoffFolder {
    pub id: String,
    pub name: String,
    pub level: u32,
}

/// Result of a whole walk: STL files newest first, plus any folders left
/// unexplored at the depth limit.
#[derive(Debug, Clone, Default)]
pub struct Walk {
    pub files: Vec<RemoteFile>,
    pub cutoff: Vec<CutoffFolder>,
}

#[derive(Default)]
struct Subtree {
    folders: HashMap<String, DriveItem>,
    files: BTreeMap<String, DriveItem>,
    cutoff: Vec<CutoffFolder>,
}

impl Subtree {
    fn merge(&mut self, other: Subtree) {
        self.folders.extend(other.folders);
        self.files.extend(other.files);
        self.cutoff.extend(other.cutoff);
    }
}

/// Find every STL file under `root_id`. Any failure to read a folder aborts
/// the whole walk; partial results are discarded.
pub fn walk(api: &dyn DriveApi, root_id: &str, recursive: bool, depth: Depth) -> Result<Walk> {
    info!(%root_id, recursive, %depth, "walking drive folder");
    let tree = walk_folder(api, root_id, recursive, depth, 0)?;

    let mut files: Vec<RemoteFile> = tree
        .files
        .into_values()
        .map(|item| {
            let mut file = RemoteFile::from_item(item);
            file.parent_folder = file
                .parent_id
                .as_deref()
                .and_then(|pid| tree.folders.get(pid))
                .map(|folder| folder.name.clone());
            file
        })
        .collect();
    sort_newest_first(&mut files);

    if !tree.cutoff.is_empty() {
        warn!(
            depth = %depth,
            remaining = tree.cutoff.len(),
            "stopped recursion at depth limit with folders remaining"
        );
    }
    info!(
        files = files.len(),
        folders = tree.folders.len(),
        "drive walk complete"
    );
    Ok(Walk {
        files,
        cutoff: tree.cutoff,
    })
}

fn walk_folder(
    api: &dyn DriveApi,
    folder_id: &str,
    recursive: bool,
    depth: Depth,
    level: u32,
) -> Result<Subtree> {
    let inaccessible = |e: Error| match e {
        Error::InaccessibleFolder { .. } => e,
        other => Error::InaccessibleFolder {
            folder_id: folder_id.to_string(),
            source: Box::new(other),
        },
    };

    let this = api.folder(folder_id).map_err(inaccessible)?;
    let children = list_children(api, folder_id).map_err(inaccessible)?;
    debug!(folder = %this.name, level, children = children.len(), "listed folder");

    let mut tree = Subtree::default();
    let mut subfolders = Vec::new();
    for child in children {
        match child.kind() {
            Some(ItemKind::Folder) => subfolders.push(child),
            Some(ItemKind::File) => {
                tree.files.insert(child.id.clone(), child);
            }
            None => {}
        }
    }
    tree.folders.insert(this.id.clone(), this);

    if !recursive || depth.reached(level) {
        if recursive {
            tree.cutoff.extend(subfolders.iter().map(|f| CutoffFolder {
                id: f.id.clone(),
                name: f.name.clone(),
                level: level + 1,
            }));
        }
        for folder in subfolders {
            tree.folders.insert(folder.id.clone(), folder);
        }
        return Ok(tree);
    }

    for folder in subfolders {
        let sub = walk_folder(api, &folder.id, recursive, depth, level + 1)?;
        if sub.folders.len() <= 1 {
            debug!(folder = %folder.name, level = level + 1, "no subfolders remaining");
        }
        tree.folders.insert(folder.id.clone(), folder);
        tree.merge(sub);
    }
    Ok(tree)
}

fn list_children(api: &dyn DriveApi, folder_id: &str) -> Result<Vec<DriveItem>> {
    let mut items = Vec::new();
    let mut page_token: Option<String> = None;
    loop {
        let page = api.children(folder_id, page_token.as_deref())?;
        items.extend(page.files);
        match page.next_page_token {
            Some(next) if Some(&next) != page_token.as_ref() => page_token = Some(next),
            _ => break,
        }
    }
    Ok(items)
}

/// Most recently modified first; undated files go last.
pub fn sort_newest_first(files: &mut [RemoteFile]) {
    files.sort_by(|a, b| match (&a.modified_time, &b.modified_time) {
        (Some(x), Some(y)) => y.cmp(x).then_with(|| a.name.cmp(&b.name)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.name.cmp(&b.name),
    });
}
