// Orchestration: load the pick database and the Drive listing (fresh or from
// cache), prune what the decision log already covers, then hand the rest to
// the review loop.

use crate::api::{GitHubClient, RepoFile};
use crate::catalog::Catalog;
use crate::config::{Cli, Settings, StatePaths};
use crate::decisions::{filter_undecided, Action, DecisionLog, Decisions, SkipPolicy};
use crate::drive::{self, DriveApi, DriveClient, DriveCredentials, RemoteFile};
use crate::listing;
use crate::review::{Review, ReviewSummary};
use crate::ui::{Prompter, Reporter};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

/// Run one curation session end to end.
pub fn run(
    cli: &Cli,
    settings: &Settings,
    prompter: &mut dyn Prompter,
    reporter: &dyn Reporter,
) -> Result<ReviewSummary> {
    let paths = StatePaths::new(&cli.state_dir);
    std::fs::create_dir_all(&paths.dir)
        .with_context(|| format!("create state directory {}", paths.dir.display()))?;

    let credentials = Arc::new(
        DriveCredentials::from_file(&settings.gdrive_auth_path)
            .context("load Google Drive credentials")?,
    );
    let drive = DriveClient::new(credentials)?;
    drive.authorize().context("authenticate with Google Drive")?;

    let catalog = load_catalog(cli, settings, &paths, reporter)?;
    let files = load_listing(cli, settings, &paths, &drive, reporter)?;

    let log = DecisionLog::open(&paths.decisions).context("open decision log")?;
    let decisions = log.load().context("read decision log")?;
    let candidates = select_candidates(files, &decisions, cli.reconsider_skips, prompter, reporter)?;
    if candidates.is_empty() {
        reporter.success("Nothing left to review.");
        return Ok(ReviewSummary::default());
    }

    let summary = Review {
        drive: &drive,
        catalog: &catalog,
        log: &log,
        output_root: &cli.output,
        prompter,
        reporter,
    }
    .run(&candidates)?;
    report_summary(&summary, reporter);
    Ok(summary)
}

fn load_catalog(
    cli: &Cli,
    settings: &Settings,
    paths: &StatePaths,
    reporter: &dyn Reporter,
) -> Result<Catalog> {
    if cli.cached && paths.metadata.exists() {
        info!(path = %paths.metadata.display(), "using cached pick database");
        return Catalog::load(&paths.metadata).context("read cached pick database");
    }
    let github = GitHubClient::from_token_file(&settings.github_token_path)?;
    let catalog = fetch_catalog(&github, &settings.repo_file, &cli.material, reporter)?;
    catalog
        .save(&paths.metadata)
        .with_context(|| format!("write {}", paths.metadata.display()))?;
    report_catalog(&catalog, &cli.material, reporter);
    Ok(catalog)
}

fn fetch_catalog(
    github: &GitHubClient,
    file: &RepoFile,
    material: &str,
    reporter: &dyn Reporter,
) -> Result<Catalog> {
    let spinner = reporter.spinner("Fetching pick database...");
    let result = github.fetch(file);
    spinner.finish_and_clear();
    let bytes = result.context("Problem getting data from repo")?;
    Ok(Catalog::from_csv_bytes(&bytes)?.filter_publishable(material)?)
}

fn report_catalog(catalog: &Catalog, material: &str, reporter: &dyn Reporter) {
    if catalog.is_empty() {
        reporter.warn(&format!(
            "No publishable {material} designs in the pick database. READMEs will get placeholders."
        ));
    } else {
        reporter.info(&format!("{} publishable designs in the pick database.", catalog.len()));
    }
}

fn load_listing(
    cli: &Cli,
    settings: &Settings,
    paths: &StatePaths,
    drive: &dyn DriveApi,
    reporter: &dyn Reporter,
) -> Result<Vec<RemoteFile>> {
    if cli.cached && paths.listing.exists() {
        info!(path = %paths.listing.display(), "using cached drive listing");
        let mut files = listing::load(&paths.listing).context("read cached drive listing")?;
        drive::walk::sort_newest_first(&mut files);
        return Ok(files);
    }
    let spinner = reporter.spinner("Searching Google Drive for STL files...");
    let result = drive::walk(drive, &settings.folder_id, !cli.no_recursive, cli.depth);
    spinner.finish_and_clear();
    let walk = result?;
    for folder in &walk.cutoff {
        reporter.warn(&format!(
            "Warning: stopping recursion at folder {} due to depth of {}.",
            folder.name, cli.depth
        ));
    }
    listing::save(&paths.listing, &walk.files)
        .with_context(|| format!("write {}", paths.listing.display()))?;
    reporter.info(&format!("Found {} STL files.", walk.files.len()));
    Ok(walk.files)
}

/// Drop already-decided files, asking once whether earlier skips should be
/// offered again.
pub fn select_candidates(
    files: Vec<RemoteFile>,
    decisions: &Decisions,
    reconsider_skips: bool,
    prompter: &mut dyn Prompter,
    reporter: &dyn Reporter,
) -> Result<Vec<RemoteFile>> {
    let skipped = files
        .iter()
        .filter(|f| decisions.action(&f.id) == Some(Action::Skip))
        .count();
    let policy = if skipped == 0 {
        SkipPolicy::Drop
    } else if reconsider_skips
        || prompter.confirm(
            &format!("{skipped} files were skipped on earlier runs. Review them again?"),
            false,
        )?
    {
        SkipPolicy::Reconsider
    } else {
        SkipPolicy::Drop
    };
    let total = files.len();
    let left = filter_undecided(files, decisions, policy);
    reporter.info(&format!(
        "{} of {} STL files still need a decision.",
        left.len(),
        total
    ));
    Ok(left)
}

fn report_summary(summary: &ReviewSummary, reporter: &dyn Reporter) {
    reporter.info(&format!(
        "Opensourced {}, skipped {}, failed {}.",
        summary.opensourced, summary.skipped, summary.failed
    ));
    if summary.failed > 0 {
        reporter.warn("Failed files were not recorded and will be offered again next run.");
    }
    if summary.opensourced > 0 {
        reporter.success(
            "Commit and push to complete the process and opensource the downloaded STLs.",
        );
    }
}
