// Entrypoint for the CLI application.
// - Keeps `main` small: read configuration, start logging and hand the
//   terminal prompter/reporter to the curation session.
// - Returns `anyhow::Result` so fatal errors print with their context chain.

use clap::Parser;
use stl_curator::config::{Cli, Settings, StatePaths};
use stl_curator::logging::init_logging;
use stl_curator::ui::{ConsoleReporter, TerminalPrompter};

fn main() -> anyhow::Result<()> {
    // A missing .env is fine; real environment variables still apply.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };

    init_logging(&StatePaths::new(&cli.state_dir).log, &cli.log_level)?;

    // Blocks until every candidate is decided or the operator quits.
    stl_curator::app::run(&cli, &settings, &mut TerminalPrompter, &ConsoleReporter)?;
    Ok(())
}
