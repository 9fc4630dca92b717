use std::sync::Arc;

use clap::ArgMatches;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use tracker_core::memory::RecordingSink;
use tracker_core::{IdentifierResolver, TrackerError};
use tracker_protocol::{LoadTarget, Uid};

fn target_from(matches: &ArgMatches) -> LoadTarget {
    LoadTarget {
        uid: matches
            .get_one::<String>("uid")
            .map(|uid| Uid::from(uid.as_str())),
        assertion: matches.get_one::<String>("assertion").cloned(),
    }
}

pub(crate) fn handle_resolve_command(
    matches: &ArgMatches,
) -> Result<(), Box<dyn std::error::Error>> {
    let target = target_from(matches);
    let allow_network = !matches.get_flag("offline");
    let directory = super::load_directory(matches)?;

    info!(
        event = "cli.resolve_started",
        allow_network = allow_network,
        needs_session = target.needs_session(),
    );

    // Resolution never publishes.
    let resolver = IdentifierResolver::new(&super::collaborators(
        directory,
        Arc::new(RecordingSink::new()),
    ));
    let resolved = super::runtime()?.block_on(resolver.resolve(
        &target,
        allow_network,
        &CancellationToken::new(),
    ));

    match resolved {
        Ok(uid) => {
            println!("{}", uid);
            info!(event = "cli.resolve_completed", uid = %uid);
            Ok(())
        }
        Err(e) => {
            eprintln!("Could not resolve target: {}", e);
            error!(
                event = "cli.resolve_failed",
                error_code = e.error_code(),
                error = %e,
            );
            Err(e.into())
        }
    }
}
