use std::{fmt::Display, future::Future, time::Duration};

use backon::{ExponentialBuilder, Retryable};

/// Total attempts per call, including the first.
pub const RETRY_ATTEMPTS: usize = 5;

/// Failures worth retrying: the node may answer next time. Contract-logic and
/// decoding failures are final for the event.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for crate::rpc::RpcError {
    fn is_transient(&self) -> bool {
        self.is_retryable()
    }
}

impl Transient for crate::decoder::DecodeError {
    fn is_transient(&self) -> bool {
        self.is_retryable()
    }
}

impl Transient for crate::correlation::StoreError {
    fn is_transient(&self) -> bool {
        self.is_retryable()
    }
}

impl Transient for crate::pipeline::PipelineError {
    fn is_transient(&self) -> bool {
        self.is_retryable()
    }
}

/// Run `f` up to [`RETRY_ATTEMPTS`] times, sleeping 3^i seconds between
/// transient failures.
///
/// `None` is the gave-up sentinel. It never propagates as an error: giving up
/// on one event must not kill the per-chain loop, and the event is recovered
/// by the next backfill run because the checkpoint only advances on success.
pub async fn with_retries<T, E, F, Fut>(operation: &'static str, f: F) -> Option<T>
where
    E: Transient + Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let backoff = ExponentialBuilder::default()
        .with_min_delay(Duration::from_secs(1))
        .with_factor(3.0)
        .with_max_times(RETRY_ATTEMPTS - 1);

    let result = f
        .retry(backoff)
        .when(|err: &E| err.is_transient())
        .notify(|err, delay| {
            tracing::warn!(err = %err, ?delay, operation, "transient failure, backing off");
        })
        .await;

    match result {
        Ok(value) => Some(value),
        Err(err) if err.is_transient() => {
            tracing::error!(
                err = %err,
                operation,
                attempts = RETRY_ATTEMPTS,
                "maximum retries reached, giving up"
            );
            None
        }
        Err(err) => {
            tracing::error!(err = %err, operation, "non-retryable failure, skipping");
            None
        }
    }
}
