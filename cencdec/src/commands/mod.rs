mod pssh;
mod request_keys;
mod save_key;

pub use pssh::Pssh;
pub use request_keys::RequestKeys;
pub use save_key::SaveKey;

use clap::{ColorChoice, Parser, Subcommand};

/// Provision and inspect content keys for CENC encrypted DASH streams.
#[derive(Debug, Clone, Parser)]
#[command(version, about)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// When to output colored text.
    #[arg(long, global = true, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    Pssh(Pssh),
    RequestKeys(RequestKeys),
    SaveKey(SaveKey),
}
