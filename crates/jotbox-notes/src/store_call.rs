//! Time-bounded store calls.

use std::future::Future;
use std::time::Duration;

use jotbox_core::{Error, Result, StoreKind};

/// Await a store call, failing with `Error::Connection` once `limit` elapses.
pub(crate) async fn timed<T, F>(limit: Duration, store: StoreKind, step: &'static str, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(Error::connection(
            store,
            format!("{} timed out after {} ms", step, limit.as_millis()),
        )),
    }
}

/// Run a saga on its own task so dropping the caller's future cannot stop it
/// between a write and its compensation.
pub(crate) async fn detached<T, F>(op: &'static str, saga: F) -> Result<T>
where
    F: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(saga)
        .await
        .map_err(|e| Error::Internal(format!("{} task did not complete: {}", op, e)))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_call_is_connection_error() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<(), Error>(())
        };
        let err = timed(Duration::from_secs(1), StoreKind::Blob, "put_object", slow)
            .await
            .unwrap_err();
        match err {
            Error::Connection { store, source } => {
                assert_eq!(store, StoreKind::Blob);
                assert!(source.to_string().contains("put_object timed out"));
            }
            other => panic!("Expected Connection error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timed_passes_through_result() {
        let value = timed(Duration::from_secs(1), StoreKind::Metadata, "get_by_id", async {
            Ok::<_, Error>(7)
        })
        .await
        .unwrap();
        assert_eq!(value, 7);
    }

    async fn exploding_saga() -> Result<()> {
        panic!("saga blew up")
    }

    #[tokio::test]
    async fn test_detached_panic_becomes_internal_error() {
        let err = detached("create", exploding_saga()).await.unwrap_err();
        assert_eq!(err.kind(), "internal");
    }
}
