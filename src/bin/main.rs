use std::path::PathBuf;

use clap::Parser;
use log::{warn, LevelFilter};

use mgr::Mgr;

#[derive(Parser)]
#[command(version, about = "Tree-walking interpreter for the Mgr language", long_about = None)]
struct Cli {
    /// Script to run
    script: PathBuf,

    /// Print the parsed program instead of running it
    #[arg(long)]
    dump_ast: bool,

    #[arg(
        short,
        long,
        env = "MGR_VERBOSE",
        default_value = "0",
        allow_negative_numbers = true,
        help = "0 - 4, sets the log level from Error - Trace, negative numbers disable all logging"
    )]
    verbose: i8,
}

fn level_filter(verbose: i8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Error,
        1 => LevelFilter::Warn,
        2 => LevelFilter::Info,
        3 => LevelFilter::Debug,
        4 => LevelFilter::Trace,
        unsupported if unsupported.is_negative() => LevelFilter::Off,
        _ => LevelFilter::Warn,
    }
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    pretty_env_logger::formatted_builder().filter_level(level_filter(cli.verbose)).init();
    if cli.verbose > 4 {
        warn!("Unsupported Level {}, defaulting to warn", cli.verbose);
    }

    let mut mgr = Mgr::new().with_dump_ast(cli.dump_ast);
    mgr.run_file(&cli.script)?;

    if mgr.had_error() {
        std::process::exit(65);
    }
    if mgr.had_runtime_error() {
        std::process::exit(70);
    }

    Ok(())
}
