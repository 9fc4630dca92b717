//! Ordered process teardown.
//!
//! The process owner builds its components, registers each one's shutdown
//! here, and runs the list once on exit. Components never register
//! themselves.

use std::time::Duration;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::errors::TrackerError;

type Hook = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

#[derive(Debug, thiserror::Error)]
pub enum TeardownError {
    #[error("shutdown hooks timed out: {}", hooks.join(", "))]
    Timeout { hooks: Vec<String> },
}

impl TrackerError for TeardownError {
    fn error_code(&self) -> &'static str {
        match self {
            TeardownError::Timeout { .. } => "SHUTDOWN_TIMEOUT",
        }
    }
}

pub struct ShutdownHooks {
    hooks: Vec<(String, Hook)>,
    timeout: Duration,
}

impl ShutdownHooks {
    /// Each hook gets at most `timeout` before it is abandoned.
    pub fn new(timeout: Duration) -> Self {
        Self {
            hooks: Vec::new(),
            timeout,
        }
    }

    /// Register a hook. Hooks run in registration order.
    pub fn push<F>(&mut self, name: impl Into<String>, hook: F)
    where
        F: FnOnce() -> BoxFuture<'static, ()> + Send + 'static,
    {
        self.hooks.push((name.into(), Box::new(hook)));
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run every hook, in order, each awaited up to the timeout.
    ///
    /// A hook that times out does not stop the ones after it.
    pub async fn run(self) -> Result<(), TeardownError> {
        info!(event = "core.teardown.run_started", hooks = self.hooks.len());
        let mut timed_out = Vec::new();

        for (name, hook) in self.hooks {
            match tokio::time::timeout(self.timeout, hook()).await {
                Ok(()) => {
                    info!(event = "core.teardown.hook_completed", hook = %name);
                }
                Err(_) => {
                    warn!(
                        event = "core.teardown.hook_timed_out",
                        hook = %name,
                        timeout_secs = self.timeout.as_secs(),
                    );
                    timed_out.push(name);
                }
            }
        }

        if timed_out.is_empty() {
            info!(event = "core.teardown.run_completed");
            Ok(())
        } else {
            Err(TeardownError::Timeout { hooks: timed_out })
        }
    }
}

impl std::fmt::Debug for ShutdownHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.hooks.iter().map(|(name, _)| name.as_str()).collect();
        f.debug_struct("ShutdownHooks")
            .field("hooks", &names)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Wait for SIGTERM or SIGINT/Ctrl-C, then cancel `token`.
///
/// Returns early without cancelling if `token` is cancelled by someone else.
pub async fn wait_for_shutdown_signal(token: CancellationToken) -> std::io::Result<()> {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

        tokio::select! {
            result = ctrl_c => {
                result?;
                info!(event = "core.teardown.signal_received", signal = "SIGINT");
            }
            _ = sigterm.recv() => {
                info!(event = "core.teardown.signal_received", signal = "SIGTERM");
            }
            _ = token.cancelled() => return Ok(()),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::select! {
            result = ctrl_c => {
                result?;
                info!(event = "core.teardown.signal_received", signal = "SIGINT");
            }
            _ = token.cancelled() => return Ok(()),
        }
    }

    token.cancel();
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use futures::FutureExt;

    use super::*;

    #[tokio::test]
    async fn test_hooks_run_in_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut hooks = ShutdownHooks::new(Duration::from_secs(1));
        for name in ["loader", "sink", "session"] {
            let order = order.clone();
            hooks.push(name, move || {
                async move {
                    order.lock().unwrap().push(name);
                }
                .boxed()
            });
        }
        assert_eq!(hooks.len(), 3);

        hooks.run().await.unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["loader", "sink", "session"]);
    }

    #[tokio::test]
    async fn test_timed_out_hook_does_not_block_the_rest() {
        let ran = Arc::new(Mutex::new(false));
        let mut hooks = ShutdownHooks::new(Duration::from_millis(20));
        hooks.push("stuck", || futures::future::pending().boxed());
        let flag = ran.clone();
        hooks.push("after", move || {
            async move {
                *flag.lock().unwrap() = true;
            }
            .boxed()
        });

        let err = hooks.run().await.unwrap_err();
        assert_eq!(err.to_string(), "shutdown hooks timed out: stuck");
        assert_eq!(err.error_code(), "SHUTDOWN_TIMEOUT");
        assert!(*ran.lock().unwrap());
    }

    #[tokio::test]
    async fn test_empty_hooks() {
        let hooks = ShutdownHooks::new(Duration::from_secs(1));
        assert!(hooks.is_empty());
        assert!(hooks.run().await.is_ok());
    }

    #[tokio::test]
    async fn test_signal_wait_returns_when_token_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        let result = tokio::time::timeout(
            Duration::from_secs(1),
            wait_for_shutdown_signal(token.clone()),
        )
        .await;
        assert!(matches!(result, Ok(Ok(()))));
    }
}
