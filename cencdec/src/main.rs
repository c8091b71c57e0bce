mod commands;
mod logger;

use clap::{ColorChoice, Parser};
use colored::Colorize;
use commands::{Args, Commands};
use log::LevelFilter;
use std::{
    io::{IsTerminal, stderr},
    process,
};

fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.color {
        ColorChoice::Always => colored::control::set_override(true),
        ColorChoice::Auto => {
            if !stderr().is_terminal() {
                colored::control::set_override(false);
            }
        }
        ColorChoice::Never => colored::control::set_override(false),
    }

    logger::init(match args.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    });

    match args.command {
        Commands::Pssh(args) => args.execute()?,
        Commands::RequestKeys(args) => args.execute()?,
        Commands::SaveKey(args) => args.execute()?,
    }

    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".bold().red(), e);
        process::exit(1);
    }
}
