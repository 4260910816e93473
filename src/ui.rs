// UI layer: terminal prompts via `dialoguer`, coloured status lines via
// `crossterm`, progress bars via `indicatif`. The review logic only sees the
// `Prompter` and `Reporter` traits, so it runs headless under test.

use crate::drive::RemoteFile;
use crate::error::Result;
use chrono::{DateTime, Utc};
use crossterm::style::{style, Stylize};
use dialoguer::{Confirm, Input};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Source of operator input.
pub trait Prompter {
    /// Free text; an empty answer is allowed and returned as "".
    fn line(&mut self, prompt: &str) -> Result<String>;

    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool>;
}

/// Where status output goes. Purely presentational.
pub trait Reporter {
    fn info(&self, msg: &str);
    fn success(&self, msg: &str);
    fn warn(&self, msg: &str);
    fn error(&self, msg: &str);

    /// Show a candidate file before asking about it.
    fn present(&self, file: &RemoteFile, position: usize, total: usize);

    /// Byte progress for a download; `total` may be filled in later.
    fn progress(&self) -> ProgressBar;

    fn spinner(&self, msg: &str) -> ProgressBar;
}

pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn line(&mut self, prompt: &str) -> Result<String> {
        let answer: String = Input::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()?;
        Ok(answer.trim().to_string())
    }

    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool> {
        Ok(Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()?)
    }
}

pub struct ConsoleReporter;

fn when(t: &Option<DateTime<Utc>>) -> String {
    t.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "unknown".into())
}

impl Reporter for ConsoleReporter {
    fn info(&self, msg: &str) {
        println!("{msg}");
    }

    fn success(&self, msg: &str) {
        println!("{}", style(msg).green());
    }

    fn warn(&self, msg: &str) {
        println!("{}", style(msg).yellow());
    }

    fn error(&self, msg: &str) {
        eprintln!("{}", style(msg).red().bold());
    }

    fn present(&self, file: &RemoteFile, position: usize, total: usize) {
        println!();
        println!("{}", style(format!("[{position}/{total}]")).dark_grey());
        println!(" Folder: {}", style(file.folder_name()).cyan());
        println!(" STL file: {}", style(&file.name).bold());
        println!(" Created: {}", when(&file.created_time));
        println!(" Modified: {}", when(&file.modified_time));
    }

    fn progress(&self) -> ProgressBar {
        let pb = ProgressBar::new(0);
        let bar_style = ProgressStyle::with_template(
            "{msg} [{bar:30}] {bytes}/{total_bytes} ({bytes_per_sec})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
        pb.set_style(bar_style);
        pb
    }

    fn spinner(&self, msg: &str) -> ProgressBar {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(msg.to_string());
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner
    }
}
