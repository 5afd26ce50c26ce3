//! CLI interface.
//!
//! `azion publish` runs the project's publish pre command, then creates or
//! updates the project's edge function and records its id in
//! `azion/azion.json`. Run it from the project directory or pass `--dir`.

use std::{env, io, path::PathBuf};

use clap::{Parser, Subcommand};
use tracing::debug;

use crate::{
    artifact::FsArtifactLoader,
    prepublish::ShellRunner,
    publish::{PublishError, PublishOptions, Synchronizer},
    remote::{self, HttpEdgeFunctions},
    settings::Settings,
    storage::FileStore,
};

/// Azion — publish and manage edge functions.
#[derive(Debug, Parser)]
#[command(name = "azion", version, after_long_help = PUBLISH_HELP)]
pub struct Cli {
    /// Project directory (defaults to the current directory).
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Log debug diagnostics to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

const PUBLISH_HELP: &str = r#"Project layout:
  azion/azion.json    function id, name, code file, args file, active flag
  azion/config.json   optional "publish": { "cmd": "...", "env": "..." }

Settings (~/.azion/settings.toml, or AZION_TOKEN / AZION_API_URL):
  token = "..."
  api-url = "https://api.azionapi.net""#;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Publish the project's edge function.
    ///
    /// Creates the function on first publish and updates it afterwards.
    Publish {
        /// Force yes to all user input.
        #[arg(short, long)]
        yes: bool,

        /// Force no to all user input.
        #[arg(short, long)]
        no: bool,
    },
}

/// Run the CLI, returning an error message on failure.
pub fn run(cli: Cli) -> Result<(), String> {
    let root = match cli.dir {
        Some(dir) => dir,
        None => env::current_dir().map_err(|e| format!("could not determine working directory: {e}"))?,
    };

    match cli.command {
        Command::Publish { yes, no } => cmd_publish(root, PublishOptions { yes, no }),
    }
}

fn cmd_publish(root: PathBuf, options: PublishOptions) -> Result<(), String> {
    options.validate().map_err(|e| e.to_string())?;
    debug!(root = %root.display(), "publishing");

    let settings = Settings::load().map_err(|e| e.to_string())?;
    let remote = HttpEdgeFunctions::new(&settings, &remote::user_agent())
        .map_err(|e| e.to_string())?;

    let store = FileStore::new(&root);
    let artifacts = FsArtifactLoader::new(&root);
    let runner = ShellRunner::new(&root);

    let sync = Synchronizer {
        store: &store,
        artifacts: &artifacts,
        runner: &runner,
        remote: &remote,
    };

    let mut stdout = io::stdout().lock();
    sync.publish(options, &mut stdout)
        .map(|_| ())
        .map_err(|e| describe(&e))
}

/// Render a publish failure, flagging the ones that left the platform ahead of
/// the local record.
fn describe(e: &PublishError) -> String {
    if e.is_split_brain() {
        format!("publish reached the platform but was not recorded locally\n{e}")
    } else {
        e.to_string()
    }
}
