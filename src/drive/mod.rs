// Google Drive side of the tool: credentials, the REST client, the folder
// walk that discovers STL files and the single-file downloader.

pub mod auth;
pub mod client;
pub mod download;
pub mod walk;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

pub use auth::DriveCredentials;
pub use client::{ChildPage, DriveApi, DriveClient};
pub use download::{download, file_id_from_url};
pub use walk::{walk, Depth, Walk};

pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
pub const STL_MIMES: &[&str] = &["application/vnd.ms-pki.stl", "model/stl"];
pub const UNKNOWN_FOLDER: &str = "Unknown";

/// Raw Drive object metadata as returned by the files endpoints.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DriveItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modified_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "size_from_string")]
    pub size: Option<u64>,
    #[serde(default)]
    pub parents: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    File,
    Folder,
}

impl DriveItem {
    /// Folder, STL file, or something the walk ignores.
    pub fn kind(&self) -> Option<ItemKind> {
        if self.mime_type == FOLDER_MIME {
            return Some(ItemKind::Folder);
        }
        if STL_MIMES.contains(&self.mime_type.as_str()) {
            return Some(ItemKind::File);
        }
        // Uploads from some tools land as generic binaries.
        let generic = matches!(
            self.mime_type.as_str(),
            "application/octet-stream" | "application/sla"
        );
        if generic && self.name.to_ascii_lowercase().ends_with(".stl") {
            return Some(ItemKind::File);
        }
        None
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parents.first().map(String::as_str)
    }
}

/// One discovered STL file, with its parent folder's display name filled in
/// once the walk has enumerated the folders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
    pub created_time: Option<DateTime<Utc>>,
    pub modified_time: Option<DateTime<Utc>>,
    pub size: Option<u64>,
    pub parent_id: Option<String>,
    pub parent_folder: Option<String>,
}

impl RemoteFile {
    pub fn from_item(item: DriveItem) -> Self {
        let parent_id = item.parent_id().map(str::to_string);
        RemoteFile {
            id: item.id,
            name: item.name,
            created_time: item.created_time,
            modified_time: item.modified_time,
            size: item.size,
            parent_id,
            parent_folder: None,
        }
    }

    /// Parent folder name for display and as the default output folder.
    pub fn folder_name(&self) -> &str {
        self.parent_folder.as_deref().unwrap_or(UNKNOWN_FOLDER)
    }
}

fn size_from_string<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Size {
        Text(String),
        Number(u64),
    }

    match Option::<Size>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Size::Number(n)) => Ok(Some(n)),
        Some(Size::Text(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}
