use std::process::ExitCode;

use clap::Parser;
use jir_driver::Opt;
use log::error;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

fn main() -> ExitCode {
    let opts = Opt::parse();

    let level = match opts.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    // Analysis results go to stdout, keep the log on stderr.
    if let Err(err) = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ) {
        eprintln!("Failed to set up logging: {err}");
    }

    let mut out = std::io::stdout().lock();
    if let Err(err) = jir_driver::run(&opts, &mut out) {
        error!("{err}");
        return ExitCode::from(1);
    }

    ExitCode::from(0)
}
