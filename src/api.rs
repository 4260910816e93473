// GitHub contents client: fetches one versioned file (the pick database CSV)
// from a private repository. Blocking and single-shot, like the rest of the
// tool.

use crate::error::{Error, Result};
use base64::Engine;
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::StatusCode;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

pub const GITHUB_API_BASE: &str = "https://api.github.com";
const GITHUB_API_VERSION: &str = "2022-11-28";
const RAW_ACCEPT: &str = "application/vnd.github.v3.raw";

/// Where the metadata file lives. `git_ref` of `None` means "whatever the
/// repository's default branch is".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoFile {
    pub owner: String,
    pub repo: String,
    pub path: String,
    pub git_ref: Option<String>,
}

/// Blocking client holding the HTTP client, the API base URL and the bearer
/// token used for every request.
#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    base_url: String,
    token: String,
}

#[derive(Deserialize, Debug)]
struct RepoInfo {
    default_branch: String,
}

/// Shape returned by the contents endpoint when the raw media type is not
/// honoured.
#[derive(Deserialize, Debug)]
struct ContentsObject {
    content: String,
    #[serde(default)]
    encoding: Option<String>,
}

impl GitHubClient {
    /// Create a client against the public GitHub API.
    pub fn new(token: &str) -> Result<Self> {
        Self::with_base_url(token, GITHUB_API_BASE)
    }

    /// Create a client from a file holding the token (surrounding whitespace
    /// is ignored).
    pub fn from_token_file(path: &Path) -> Result<Self> {
        let token = std::fs::read_to_string(path).map_err(|e| {
            Error::Authentication(format!("cannot read GitHub token at {}: {e}", path.display()))
        })?;
        Self::new(&token)
    }

    /// Create a client against an arbitrary API base (used by tests and
    /// GitHub Enterprise installs).
    pub fn with_base_url(token: &str, base_url: &str) -> Result<Self> {
        let token = token.trim();
        if token.is_empty() {
            return Err(Error::Authentication(
                "GitHub token is empty. Use a PAT with repo scope (or Contents: Read on the repo)."
                    .into(),
            ));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(GitHubClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(RAW_ACCEPT));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static(GITHUB_API_VERSION),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("stl-curator/", env!("CARGO_PKG_VERSION"))),
        );
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|_| Error::Authentication("GitHub token contains invalid characters".into()))?;
        headers.insert(AUTHORIZATION, bearer);
        Ok(headers)
    }

    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<Response> {
        debug!(%url, "GET");
        let res = self
            .client
            .get(url)
            .headers(self.headers()?)
            .query(query)
            .send()?;
        Ok(res)
    }

    /// Look up the repository's default branch.
    pub fn default_branch(&self, owner: &str, repo: &str) -> Result<String> {
        let url = format!("{}/repos/{}/{}", self.base_url, owner, repo);
        let res = self.get(&url, &[])?;
        match res.status() {
            StatusCode::NOT_FOUND => Err(Error::NotFound(format!(
                "Repo not found or no access: {owner}/{repo}. Check org SSO and token scopes."
            ))),
            StatusCode::UNAUTHORIZED => Err(Error::Authentication(format!(
                "GitHub rejected the token for {owner}/{repo}"
            ))),
            s if !s.is_success() => Err(Error::Http { status: s, url }),
            _ => {
                let info: RepoInfo = res.json()?;
                Ok(info.default_branch)
            }
        }
    }

    /// Fetch the raw bytes of `file`. Resolves the default branch first when
    /// no ref is given.
    pub fn fetch(&self, file: &RepoFile) -> Result<Vec<u8>> {
        let git_ref = match &file.git_ref {
            Some(r) if !r.is_empty() => r.clone(),
            _ => self.default_branch(&file.owner, &file.repo)?,
        };

        let url = format!(
            "{}/repos/{}/{}/contents/{}",
            self.base_url,
            file.owner,
            file.repo,
            file.path.trim_start_matches('/')
        );
        let res = self.get(&url, &[("ref", git_ref.as_str())])?;
        let status = res.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(not_found_hint(file, &git_ref)));
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::Authentication(format!(
                "GitHub rejected the token for {}/{}",
                file.owner, file.repo
            )));
        }
        if !status.is_success() {
            return Err(Error::Http { status, url });
        }

        let is_json = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("application/json"))
            .unwrap_or(false);
        let body = res.bytes()?.to_vec();
        let bytes = if is_json { decode_contents(&body)? } else { body };
        info!(
            owner = %file.owner,
            repo = %file.repo,
            path = %file.path,
            %git_ref,
            bytes = bytes.len(),
            "fetched metadata file"
        );
        Ok(bytes)
    }
}

fn not_found_hint(file: &RepoFile, git_ref: &str) -> String {
    format!(
        "File not found or no access. Verify:\n\
         - owner/repo: {}/{}\n\
         - branch/ref: {}\n\
         - path: {}\n\
         - PAT has repo scope (or fine-grained: Contents: Read) and access to this repo\n\
         - If the org enforces SSO, the PAT is Authorized for the org (Configure SSO on the token).",
        file.owner, file.repo, git_ref, file.path
    )
}

fn decode_contents(body: &[u8]) -> Result<Vec<u8>> {
    let obj: ContentsObject = serde_json::from_slice(body)?;
    match obj.encoding.as_deref() {
        Some("base64") | None => {
            // GitHub wraps the base64 payload at 60 columns.
            let compact: String = obj.content.split_whitespace().collect();
            base64::engine::general_purpose::STANDARD
                .decode(compact)
                .map_err(|e| Error::validation("GitHub contents payload", e))
        }
        Some(other) => Err(Error::validation(
            "GitHub contents payload",
            format!("unsupported encoding `{other}`"),
        )),
    }
}
