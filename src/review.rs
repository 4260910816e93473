// Interactive review: one candidate at a time, ask publish / skip / exit,
// and for published files download, draft a README and log the decision.

use crate::catalog::Catalog;
use crate::decisions::{Action, DecisionLog, DecisionRecord};
use crate::drive::{self, DriveApi, RemoteFile};
use crate::error::Result;
use crate::ui::{Prompter, Reporter};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tracing::{error, info};

pub const STL_EXTENSION: &str = ".stl";
pub const README: &str = "README.md";
pub const PLACEHOLDER: &str = "Placeholder.";
const README_SEPARATOR: &str = "\n---\n\n";
const CHOICE_PROMPT: &str = "Do you want to opensource this STL? (y)es / (n)o / (q)uit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Opensource,
    Skip,
    Exit,
}

impl Choice {
    pub fn parse(input: &str) -> Option<Choice> {
        match input.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" | "o" | "opensource" => Some(Choice::Opensource),
            "n" | "no" | "s" | "skip" => Some(Choice::Skip),
            "q" | "quit" | "exit" => Some(Choice::Exit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewSummary {
    pub opensourced: usize,
    pub skipped: usize,
    pub failed: usize,
    pub exited: bool,
}

/// Name the design is published under: the original when the answer is
/// empty, and always ending in `.stl`. Drive allows `/` in names; it is
/// replaced so the original still names a single file.
pub fn final_name(answer: &str, original: &str) -> String {
    let name = answer.trim();
    if name.is_empty() {
        return original.replace('/', "_");
    }
    if name.to_ascii_lowercase().ends_with(STL_EXTENSION) {
        name.to_string()
    } else {
        format!("{name}{STL_EXTENSION}")
    }
}

/// Output folder: the original parent folder when the answer is empty.
pub fn final_folder(answer: &str, original: &str) -> String {
    let folder = answer.trim();
    if folder.is_empty() {
        original.to_string()
    } else {
        folder.to_string()
    }
}

/// Only plain relative paths may be written below the output root.
fn stays_inside(relative: &str) -> bool {
    !relative.is_empty()
        && Path::new(relative)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

/// A file name: exactly one plain path component.
fn is_file_name(name: &str) -> bool {
    !name.contains('/') && stays_inside(name)
}

/// Create `<dir>/README.md` with a folder heading, or append a new section
/// to an existing one.
pub fn write_readme(
    dir: &Path,
    folder: &str,
    name: &str,
    description: Option<&str>,
) -> Result<PathBuf> {
    let path = dir.join(README);
    let body = description.unwrap_or(PLACEHOLDER).trim_end();
    let section = format!("## {name}\n\n{body}\n");
    if path.exists() {
        let mut file = OpenOptions::new().append(true).open(&path)?;
        write!(file, "{README_SEPARATOR}{section}")?;
    } else {
        fs::write(&path, format!("# {folder}\n\n{section}"))?;
    }
    Ok(path)
}

pub struct Review<'a> {
    pub drive: &'a dyn DriveApi,
    pub catalog: &'a Catalog,
    pub log: &'a DecisionLog,
    pub output_root: &'a Path,
    pub prompter: &'a mut dyn Prompter,
    pub reporter: &'a dyn Reporter,
}

impl Review<'_> {
    /// Walk through `files` in order. Returns early when the operator exits;
    /// decisions already made stay in the log.
    pub fn run(&mut self, files: &[RemoteFile]) -> Result<ReviewSummary> {
        let mut summary = ReviewSummary::default();
        let total = files.len();
        for (i, file) in files.iter().enumerate() {
            self.reporter.present(file, i + 1, total);
            match self.ask()? {
                Choice::Exit => {
                    info!(reviewed = i, total, "operator exited review");
                    summary.exited = true;
                    break;
                }
                Choice::Skip => {
                    self.reporter.info(&format!("Skipping {}.", file.name));
                    self.log.append(&DecisionRecord {
                        id: file.id.clone(),
                        name: file.name.clone(),
                        folder: file.folder_name().to_string(),
                        action: Action::Skip,
                    })?;
                    summary.skipped += 1;
                }
                Choice::Opensource => {
                    let (name, folder) = self.choose_target(file)?;
                    match self.publish(file, name, folder) {
                        Ok(record) => {
                            self.log.append(&record)?;
                            summary.opensourced += 1;
                        }
                        Err(e) => {
                            error!(id = %file.id, error = %e, "opensourcing failed");
                            self.reporter.error(&format!(
                                "Could not opensource {}: {e}. It will be offered again next run.",
                                file.name
                            ));
                            summary.failed += 1;
                        }
                    }
                }
            }
        }
        Ok(summary)
    }

    fn ask(&mut self) -> Result<Choice> {
        loop {
            let answer = self.prompter.line(CHOICE_PROMPT)?;
            match Choice::parse(&answer) {
                Some(choice) => return Ok(choice),
                None => self.reporter.warn("Please answer y, n or q."),
            }
        }
    }

    fn ask_path(
        &mut self,
        prompt: &str,
        resolve: fn(&str, &str) -> String,
        accept: fn(&str) -> bool,
        current: &str,
    ) -> Result<String> {
        loop {
            let answer = self.prompter.line(prompt)?;
            let value = resolve(&answer, current);
            if accept(&value) {
                return Ok(value);
            }
            self.reporter.warn(&format!(
                "`{value}` cannot be used here. Use a plain relative name (no `..`, no leading `/`)."
            ));
        }
    }

    fn choose_target(&mut self, file: &RemoteFile) -> Result<(String, String)> {
        self.reporter
            .info(&format!("{} will be opensourced.", file.name));
        let name = self.ask_path(
            &format!("Enter new name? (currently {})", file.name),
            final_name,
            is_file_name,
            &file.name,
        )?;
        let folder = self.ask_path(
            &format!("Enter new folder name? (currently {})", file.folder_name()),
            final_folder,
            stays_inside,
            file.folder_name(),
        )?;
        Ok((name, folder))
    }

    /// Everything that has to succeed before an `opensource` decision is
    /// logged. Any error leaves the file undecided.
    fn publish(&self, file: &RemoteFile, name: String, folder: String) -> Result<DecisionRecord> {
        let description = self.catalog.description_for(&name);

        let dir = self.output_root.join(&folder);
        fs::create_dir_all(&dir)?;
        let target = dir.join(&name);

        let progress = self.reporter.progress();
        progress.set_message(name.clone());
        let result = drive::download(self.drive, &file.id, &target, &progress);
        progress.finish_and_clear();
        let bytes = result?;
        self.reporter.success(&format!(
            "File '{}' downloaded successfully to '{}' ({bytes} bytes)",
            file.name,
            target.display()
        ));

        let readme = write_readme(&dir, &folder, &name, description)?;
        if description.is_some() {
            self.reporter.info(&format!(
                "A draft description was found and has been written to {}.",
                readme.display()
            ));
        } else {
            self.reporter.warn(&format!(
                "A draft description could not be found. A placeholder has been written to {}.",
                readme.display()
            ));
        }
        self.reporter.info("Review before committing.");

        Ok(DecisionRecord {
            id: file.id.clone(),
            name,
            folder,
            action: Action::Opensource,
        })
    }
}
