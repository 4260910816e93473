// Drive v3 REST calls used by the walk and the downloader. `DriveApi` is the
// seam the rest of the crate talks to, so tests can swap in an in-memory tree.

use super::auth::DriveCredentials;
use super::DriveItem;
use crate::error::{Error, Result};
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::Deserialize;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
const ITEM_FIELDS: &str = "id, name, mimeType, modifiedTime, createdTime, size, parents";

/// One page of a folder listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildPage {
    #[serde(default)]
    pub files: Vec<DriveItem>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

pub trait DriveApi {
    /// Metadata of a folder (id, name, parents).
    fn folder(&self, folder_id: &str) -> Result<DriveItem>;

    /// One page of the non-trashed direct children of `folder_id`.
    fn children(&self, folder_id: &str, page_token: Option<&str>) -> Result<ChildPage>;

    /// Metadata of a single file (name and size at least).
    fn file(&self, file_id: &str) -> Result<DriveItem>;

    /// Byte stream of a file's content.
    fn media(&self, file_id: &str) -> Result<Box<dyn Read>>;
}

/// Blocking Drive client. Holds the shared credentials rather than looking
/// anything up from the environment.
#[derive(Clone)]
pub struct DriveClient {
    http: Client,
    base_url: String,
    credentials: Arc<DriveCredentials>,
}

impl DriveClient {
    pub fn new(credentials: Arc<DriveCredentials>) -> Result<Self> {
        Self::with_base_url(credentials, DRIVE_API_BASE)
    }

    pub fn with_base_url(credentials: Arc<DriveCredentials>, base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()?;
        Ok(DriveClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    /// Force a token now so bad credentials fail at startup, not mid-review.
    pub fn authorize(&self) -> Result<()> {
        self.credentials.bearer(&self.http).map(|_| ())
    }

    fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Response> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(%url, ?query, "drive GET");
        let token = self.credentials.bearer(&self.http)?;
        let res = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(query)
            .send()?;
        check(res, &url)
    }
}

fn check(res: Response, url: &str) -> Result<Response> {
    match res.status() {
        s if s.is_success() => Ok(res),
        StatusCode::UNAUTHORIZED => Err(Error::Authentication(format!(
            "Google Drive rejected the credentials for {url}"
        ))),
        StatusCode::NOT_FOUND | StatusCode::FORBIDDEN => Err(Error::NotFound(format!(
            "{url}: does not exist, or permissions do not allow read"
        ))),
        status => Err(Error::Http {
            status,
            url: url.to_string(),
        }),
    }
}

impl DriveApi for DriveClient {
    fn folder(&self, folder_id: &str) -> Result<DriveItem> {
        let res = self.get(
            &format!("files/{folder_id}"),
            &[("fields", "id, name, mimeType, parents"), ("supportsAllDrives", "true")],
        )?;
        Ok(res.json()?)
    }

    fn children(&self, folder_id: &str, page_token: Option<&str>) -> Result<ChildPage> {
        let q = format!("'{}' in parents and trashed = false", folder_id.replace('\'', "\\'"));
        let fields = format!("nextPageToken, files({ITEM_FIELDS})");
        let mut query = vec![
            ("q", q.as_str()),
            ("spaces", "drive"),
            ("fields", fields.as_str()),
            ("supportsAllDrives", "true"),
            ("includeItemsFromAllDrives", "true"),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }
        let res = self.get("files", &query)?;
        Ok(res.json()?)
    }

    fn file(&self, file_id: &str) -> Result<DriveItem> {
        let res = self.get(
            &format!("files/{file_id}"),
            &[("fields", "id, name, size"), ("supportsAllDrives", "true")],
        )?;
        Ok(res.json()?)
    }

    fn media(&self, file_id: &str) -> Result<Box<dyn Read>> {
        let res = self.get(
            &format!("files/{file_id}"),
            &[("alt", "media"), ("supportsAllDrives", "true")],
        )?;
        Ok(Box::new(res))
    }
}
