use clap::Parser;
use desktidy::cli::{Args, resolve_directory, run_cli};
use desktidy::config::CleanerConfig;
use desktidy::error::CliError;
use desktidy::logging;
use desktidy::output::OutputFormatter;

fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        OutputFormatter::error(&e.to_string());
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let config = CleanerConfig::load(args.config.as_deref())?.compile()?;
    let directory = resolve_directory(args.command.directory(), &config)?;

    // The file appender would create a missing directory; leave that case to
    // the pass so it fails with a proper error.
    let log_directory =
        (args.command.writes_log() && directory.is_dir()).then_some(directory.as_path());
    logging::init(args.verbose, log_directory)?;

    run_cli(&args.command, &directory, &config)
}
