// Configuration: command-line options (clap) plus the environment variables
// that point at secrets and the Drive root. Environment is read once at
// startup; nothing below this module looks at `std::env`.

use crate::api::RepoFile;
use crate::drive::Depth;
use clap::{ArgAction, Parser};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_OWNER: &str = "davedavepicks";
pub const DEFAULT_REPO: &str = "pick_db";
pub const DEFAULT_PATH: &str = "data/data.csv";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "stl-curator",
    version,
    about = "Review private STL designs on Google Drive and copy the chosen ones into a public folder"
)]
pub struct Cli {
    /// Root of the public output tree
    #[arg(long, default_value = "davedavepicks_stls")]
    pub output: PathBuf,

    /// Where the decision log, caches and log file live
    #[arg(long, default_value = ".stl-curator")]
    pub state_dir: PathBuf,

    /// How many folder levels below the root to search (`full` for no limit)
    #[arg(long, default_value = "3")]
    pub depth: Depth,

    /// Only look at files directly inside the root folder
    #[arg(long, action = ArgAction::SetTrue)]
    pub no_recursive: bool,

    /// Substring the Materials column must contain
    #[arg(long, default_value = crate::catalog::DEFAULT_MATERIAL)]
    pub material: String,

    /// Reuse the cached Drive listing and pick database instead of fetching
    #[arg(long, action = ArgAction::SetTrue)]
    pub cached: bool,

    /// Offer files skipped on earlier runs again without asking
    #[arg(long, action = ArgAction::SetTrue)]
    pub reconsider_skips: bool,

    /// Log level (error,warn,info,debug,trace); RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{var} is not set.\n{hint}")]
    Missing {
        var: &'static str,
        hint: &'static str,
    },
}

/// Values taken from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub github_token_path: PathBuf,
    pub gdrive_auth_path: PathBuf,
    pub folder_id: String,
    pub repo_file: RepoFile,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |var: &'static str, hint: &'static str| {
            get(var).ok_or(ConfigError::Missing { var, hint })
        };

        let github_token_path = require(
            "GITHUB_TOKEN_PATH",
            "Set GITHUB_TOKEN_PATH to a file holding a GitHub PAT with read access to the pick database.",
        )?;
        let gdrive_auth_path = require(
            "GDRIVE_AUTH_PATH",
            "Set GDRIVE_AUTH_PATH to a Google service account or authorized_user JSON key.",
        )?;
        let folder_id = require(
            "GDRIVE_FOLDER_ID",
            "Set GDRIVE_FOLDER_ID to the id of the Drive folder holding the STL files.",
        )?;

        Ok(Settings {
            github_token_path: expand_home(&github_token_path),
            gdrive_auth_path: expand_home(&gdrive_auth_path),
            folder_id: folder_id.trim().to_string(),
            repo_file: RepoFile {
                owner: get("GITHUB_OWNER").unwrap_or_else(|| DEFAULT_OWNER.into()),
                repo: get("GITHUB_REPO").unwrap_or_else(|| DEFAULT_REPO.into()),
                path: get("GITHUB_PATH").unwrap_or_else(|| DEFAULT_PATH.into()),
                git_ref: get("GITHUB_REF"),
            },
        })
    }
}

/// Expand a leading `~/` against the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    let path = path.trim();
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

/// Files kept under the state directory.
#[derive(Debug, Clone)]
pub struct StatePaths {
    pub dir: PathBuf,
    pub listing: PathBuf,
    pub metadata: PathBuf,
    pub decisions: PathBuf,
    pub log: PathBuf,
}

impl StatePaths {
    pub fn new(dir: &Path) -> Self {
        StatePaths {
            dir: dir.to_path_buf(),
            listing: dir.join("listing.csv"),
            metadata: dir.join("metadata.csv"),
            decisions: dir.join("decisions.csv"),
            log: dir.join("curator.log"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("GITHUB_TOKEN_PATH", "/secrets/gh"),
        ("GDRIVE_AUTH_PATH", "/secrets/drive.json"),
        ("GDRIVE_FOLDER_ID", " 1AbC "),
    ];

    #[test]
    fn defaults_fill_in_the_repo_location() {
        let settings = Settings::from_lookup(env(REQUIRED)).unwrap();
        assert_eq!(settings.folder_id, "1AbC");
        assert_eq!(settings.repo_file.owner, "davedavepicks");
        assert_eq!(settings.repo_file.repo, "pick_db");
        assert_eq!(settings.repo_file.path, "data/data.csv");
        assert_eq!(settings.repo_file.git_ref, None);
    }

    #[test]
    fn overrides_are_honoured() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("GITHUB_REF", "dev"));
        pairs.push(("GITHUB_OWNER", "someone"));
        let settings = Settings::from_lookup(env(&pairs)).unwrap();
        assert_eq!(settings.repo_file.git_ref.as_deref(), Some("dev"));
        assert_eq!(settings.repo_file.owner, "someone");
    }

    #[test]
    fn missing_required_variable_names_it() {
        let err = Settings::from_lookup(env(&REQUIRED[..2])).unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("GDRIVE_FOLDER_ID is not set."));
        assert!(msg.contains("Set GDRIVE_FOLDER_ID"));
    }

    #[test]
    fn blank_counts_as_missing() {
        let mut pairs = REQUIRED.to_vec();
        pairs[0] = ("GITHUB_TOKEN_PATH", "   ");
        let err = Settings::from_lookup(env(&pairs)).unwrap_err();
        assert!(err.to_string().contains("GITHUB_TOKEN_PATH"));
    }

    #[test]
    fn home_is_expanded() {
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/tok"), home.join("tok"));
        }
    }

    #[test]
    fn cli_parses_depth_and_flags() {
        let cli = Cli::try_parse_from(["stl-curator", "--depth", "full", "--cached"]).unwrap();
        assert_eq!(cli.depth, Depth::Full);
        assert!(cli.cached);
        assert!(!cli.no_recursive);
        assert_eq!(cli.material, "resin");

        let cli = Cli::try_parse_from(["stl-curator"]).unwrap();
        assert_eq!(cli.depth, Depth::Levels(3));
        assert!(Cli::try_parse_from(["stl-curator", "--depth", "deep"]).is_err());
    }
}
