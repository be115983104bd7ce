use tokio::select;
use tokio_util::sync::CancellationToken;

/// Detects signals sent to the process and cancels the collector, which in
/// turn unregisters every outstanding subscription.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    select! {
        _ = tokio::signal::ctrl_c() => {
            cancelation.cancel();
        },
    };
}
