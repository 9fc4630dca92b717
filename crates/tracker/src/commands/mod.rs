use std::path::PathBuf;
use std::sync::Arc;

use clap::ArgMatches;
use tracing::error;

use tracker_core::memory::MemoryDirectory;
use tracker_core::{Collaborators, NotificationSink, TrackerError};
use tracker_paths::TrackerPaths;

use crate::fixtures::load_fixtures;

mod refresh;
mod resolve;

pub fn run_command(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    match matches.subcommand() {
        Some(("refresh", sub_matches)) => refresh::handle_refresh_command(sub_matches),
        Some(("resolve", sub_matches)) => resolve::handle_resolve_command(sub_matches),
        _ => {
            error!(event = "cli.command_unknown");
            Err("Unknown command".into())
        }
    }
}

fn runtime() -> Result<tokio::runtime::Runtime, Box<dyn std::error::Error>> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| {
            eprintln!("Failed to start async runtime: {}", e);
            error!(event = "cli.runtime_failed", error = %e);
            e.into()
        })
}

/// Load the fixtures named by `--fixtures`, or `~/.tracker/fixtures.json`.
fn load_directory(matches: &ArgMatches) -> Result<Arc<MemoryDirectory>, Box<dyn std::error::Error>> {
    let path = match matches.get_one::<String>("fixtures") {
        Some(path) => PathBuf::from(path),
        None => TrackerPaths::resolve()?.fixtures_file(),
    };
    let session = matches.get_one::<String>("session").map(|s| s.as_str());

    match load_fixtures(&path, session) {
        Ok(directory) => Ok(Arc::new(directory)),
        Err(e) => {
            eprintln!("{}", e);
            error!(
                event = "cli.fixtures.load_failed",
                path = %path.display(),
                error_code = e.error_code(),
                error = %e,
            );
            Err(e.into())
        }
    }
}

/// The fixtures directory plays session, identity and sync collaborator.
fn collaborators(directory: Arc<MemoryDirectory>, sink: Arc<dyn NotificationSink>) -> Collaborators {
    Collaborators {
        session: directory.clone(),
        identity: directory.clone(),
        sync: directory,
        sink,
    }
}
