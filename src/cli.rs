//! CLI struct definitions for the profilectl command-line interface.
//!
//! All clap-derived types live here. Dispatch logic lives in `lib.rs`.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "profilectl",
    version = env!("CARGO_PKG_VERSION"),
    about = "Manage isolated local profiles: one store, one secret and one preference namespace each, with exactly one store live at a time."
)]
pub(crate) struct Cli {
    /// Data root (defaults to $PROFILECTL_HOME, then ~/Documents/Profilectl).
    #[clap(long, global = true)]
    pub root: Option<PathBuf>,
    /// Output format.
    #[clap(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// List profiles, marking the current one
    List,
    /// Show the current profile
    Current,
    /// Create a profile and make it current
    Create {
        /// Display name
        name: String,
    },
    /// Make another profile current
    Switch {
        /// Profile id or display name
        profile: String,
    },
    /// Rename the current profile
    Rename {
        /// New display name
        name: String,
    },
    /// Move a profile to the archive area (its data is kept)
    Archive {
        /// Profile id or display name
        profile: String,
    },
    /// Permanently delete a profile's store and password
    Delete {
        /// Profile id or display name
        profile: String,
        /// Confirm the deletion
        #[clap(long)]
        yes: bool,
    },
    /// List archived profiles
    Archived,
    /// Manage the current profile's password
    Password(PasswordCli),
    /// Read and write preferences
    Pref(PrefCli),
}

#[derive(clap::Args, Debug)]
pub(crate) struct PasswordCli {
    #[clap(subcommand)]
    pub command: PasswordCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum PasswordCommand {
    /// Set (or replace) the password
    Set {
        #[clap(long)]
        password: String,
    },
    /// Check a candidate password
    Verify {
        #[clap(long)]
        password: String,
    },
    /// Remove the password
    Clear,
    /// Report whether a password is set
    Status,
}

#[derive(clap::Args, Debug)]
pub(crate) struct PrefCli {
    #[clap(subcommand)]
    pub command: PrefCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum PrefCommand {
    Get {
        key: String,
        /// Use the global (not per-profile) namespace
        #[clap(long)]
        global: bool,
    },
    Set {
        key: String,
        /// JSON value; anything that does not parse is stored as a string
        value: String,
        #[clap(long)]
        global: bool,
    },
    Unset {
        key: String,
        #[clap(long)]
        global: bool,
    },
}
