//! Tokio runtime for the binary.
//!
//! `tokio::io::stdin` reads on a blocking-pool thread that cannot be
//! interrupted. Dropping a runtime waits for such threads, so a worker told
//! to shut down would hang until the next input line. The runtime built here
//! gives outstanding blocking work [`SHUTDOWN_GRACE`] and then abandons it.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::error::Result;

/// How long blocking tasks may keep the process alive after the main future ends.
pub const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// Runs `future` to completion on a multi-threaded runtime, then shuts the
/// runtime down without waiting on blocked reads.
///
/// # Errors
///
/// Returns an error if the runtime cannot be built.
pub fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let output = runtime.block_on(future);

    debug!(grace_ms = SHUTDOWN_GRACE.as_millis(), "shutting down runtime");
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    use tokio::io::BufReader;
    use tokio::sync::watch;

    use crate::{Dispatcher, Engine};

    #[test]
    fn returns_value_of_future() {
        assert_eq!(block_on(async { 7 }).unwrap(), 7);
    }

    #[test]
    fn does_not_wait_for_blocked_reads() {
        let started = Instant::now();

        let stats = block_on(async {
            // Stands in for the pending stdin read.
            tokio::task::spawn_blocking(|| std::thread::sleep(Duration::from_secs(30)));

            let engine = Engine::new();
            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            // Never reaches EOF: the writer half stays alive for the whole run.
            let (_writer, reader) = tokio::io::duplex(64);

            let run = tokio::spawn(async move {
                Dispatcher::new(engine.listener(), 2, 4)
                    .run(BufReader::new(reader), shutdown_rx)
                    .await
            });
            tokio::time::sleep(Duration::from_millis(20)).await;
            shutdown_tx.send(true).unwrap();
            run.await.unwrap()
        })
        .unwrap()
        .unwrap();

        assert_eq!(stats.received, 0);
        assert!(
            started.elapsed() < Duration::from_secs(10),
            "runtime shutdown waited for a blocked read"
        );
    }
}
