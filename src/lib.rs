// Library root
// -----------
// The binary (`main.rs`) parses configuration and hands control to `app`.
//
// Module responsibilities:
// - `api`: GitHub contents client that fetches the private pick database.
// - `catalog`: the pick database table, its publishable filter and the
//   description lookup used to draft READMEs.
// - `drive`: Google Drive credentials, REST client, folder walk and
//   single-file download.
// - `listing`: CSV cache of the walk's output.
// - `decisions`: append-only decision log that makes reviews resumable.
// - `review`: the interactive per-file loop.
// - `ui`: terminal prompts, coloured output and progress bars behind the
//   `Prompter` / `Reporter` traits.
// - `config`, `logging`, `error`: the usual plumbing.
pub mod api;
pub mod app;
pub mod catalog;
pub mod config;
pub mod decisions;
pub mod drive;
pub mod error;
pub mod listing;
pub mod logging;
pub mod review;
pub mod ui;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Error, Result};
