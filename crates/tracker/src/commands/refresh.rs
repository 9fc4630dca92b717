use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::ArgMatches;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use tracker_core::logging::elapsed_ms;
use tracker_core::memory::{MemoryDirectory, RecordingSink};
use tracker_core::teardown::wait_for_shutdown_signal;
use tracker_core::{
    LoaderConfig, NotificationSink, RefreshLoader, RelationshipResult, ShutdownHooks,
    TrackerError, Uid, load_loader_config,
};

/// Prints each result to stdout as one JSON line and keeps a copy so the
/// command knows when everything it queued has arrived.
struct JsonLinesSink {
    recorder: RecordingSink,
}

impl NotificationSink for JsonLinesSink {
    fn publish(&self, result: RelationshipResult) {
        match serde_json::to_string(&result) {
            Ok(line) => println!("{}", line),
            Err(e) => warn!(event = "cli.refresh.encode_failed", uid = %result.uid, error = %e),
        }
        self.recorder.publish(result);
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct RefreshSummary {
    expected: usize,
    published: usize,
    rejected: usize,
    interrupted: bool,
}

impl RefreshSummary {
    fn outcome(&self) -> Result<(), String> {
        if self.interrupted || self.published >= self.expected {
            return Ok(());
        }
        Err(format!(
            "Timed out with {} of {} expected results published",
            self.published, self.expected
        ))
    }
}

pub(crate) fn handle_refresh_command(
    matches: &ArgMatches,
) -> Result<(), Box<dyn std::error::Error>> {
    let uids: Vec<Uid> = matches
        .get_many::<String>("uids")
        .ok_or("At least one uid is required")?
        .map(|uid| Uid::from(uid.as_str()))
        .collect();
    let timeout = Duration::from_secs(matches.get_one::<u64>("timeout").copied().unwrap_or(30));

    let config = match load_loader_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}\nTip: Check the [loader] section of ~/.tracker/config.toml.", e);
            error!(
                event = "cli.refresh_failed",
                error_code = e.error_code(),
                error = %e,
            );
            return Err(e.into());
        }
    };
    let directory = super::load_directory(matches)?;

    info!(
        event = "cli.refresh_started",
        uids = uids.len(),
        capacity = config.queue_capacity,
    );
    let started = Instant::now();

    let summary = super::runtime()?.block_on(refresh(directory, uids, &config, timeout))?;

    if summary.rejected > 0 {
        eprintln!("{} uid(s) rejected: refresh queue full", summary.rejected);
    }
    if summary.interrupted {
        eprintln!("Interrupted.");
    }
    eprintln!(
        "Published {} of {} expected results.",
        summary.published, summary.expected
    );
    info!(
        event = "cli.refresh_completed",
        published = summary.published,
        expected = summary.expected,
        rejected = summary.rejected,
        interrupted = summary.interrupted,
        elapsed_ms = elapsed_ms(started),
    );

    summary.outcome().map_err(|message| {
        eprintln!("{}", message);
        error!(event = "cli.refresh_failed", reason = "timeout");
        message.into()
    })
}

async fn refresh(
    directory: Arc<MemoryDirectory>,
    uids: Vec<Uid>,
    config: &LoaderConfig,
    timeout: Duration,
) -> Result<RefreshSummary, Box<dyn std::error::Error>> {
    let sink = Arc::new(JsonLinesSink {
        recorder: RecordingSink::new(),
    });
    let loader = Arc::new(RefreshLoader::from_config(
        super::collaborators(directory.clone(), sink.clone()),
        config,
    ));

    let mut hooks = ShutdownHooks::new(config.shutdown_timeout());
    let hook_loader = loader.clone();
    hooks.push("refresh_loader", move || hook_loader.shutdown().boxed());

    let root = CancellationToken::new();
    let signals = tokio::spawn(wait_for_shutdown_signal(root.clone()));

    loader.start(&root);

    let mut summary = RefreshSummary::default();
    for uid in uids {
        let expected = directory.expected_publishes(&uid);
        match loader.queue(uid.clone()) {
            Ok(()) => summary.expected += expected,
            Err(e) => {
                eprintln!("Skipped {}: {}", uid, e);
                summary.rejected += 1;
            }
        }
    }

    summary.interrupted = tokio::select! {
        finished = sink.recorder.wait_for(summary.expected, timeout) => {
            if !finished {
                warn!(event = "cli.refresh.wait_timed_out", timeout_secs = timeout.as_secs());
            }
            false
        }
        _ = root.cancelled() => true,
    };

    let teardown = hooks.run().await;

    // Stop listening for signals.
    root.cancel();
    match signals.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(event = "cli.refresh.signal_listener_failed", error = %e),
        Err(e) => warn!(event = "cli.refresh.signal_listener_failed", error = %e),
    }

    if let Err(e) = teardown {
        eprintln!("{}", e);
        error!(
            event = "cli.refresh_failed",
            error_code = e.error_code(),
            error = %e,
        );
        return Err(e.into());
    }

    summary.published = sink.recorder.len();
    Ok(summary)
}
