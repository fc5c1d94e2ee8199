use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Debounced content writer. Each change restarts the quiet-period timer;
/// only the latest content is saved once edits pause.
pub struct AutoSaver {
    tx: mpsc::UnboundedSender<String>,
    handle: JoinHandle<()>,
}

impl AutoSaver {
    pub fn spawn<F, Fut>(delay: Duration, mut save: F) -> Self
    where
        F: FnMut(String) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let handle = tokio::spawn(async move {
            while let Some(mut latest) = rx.recv().await {
                loop {
                    tokio::select! {
                        next = rx.recv() => match next {
                            Some(content) => latest = content,
                            None => {
                                // Closed with edits pending: write them now.
                                save(latest).await;
                                return;
                            }
                        },
                        _ = tokio::time::sleep(delay) => {
                            save(latest).await;
                            break;
                        }
                    }
                }
            }
        });
        Self { tx, handle }
    }

    pub fn content_changed(&self, content: impl Into<String>) {
        if self.tx.send(content.into()).is_err() {
            tracing::warn!("Auto-save task has stopped; change not queued");
        }
    }

    /// Write anything pending and stop.
    pub async fn flush(self) {
        drop(self.tx);
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "Auto-save task failed");
        }
    }
}
