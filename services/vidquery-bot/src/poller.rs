//! Long-polling loop
//!
//! Each incoming message is answered in its own task so a slow question does
//! not hold up other chats. On shutdown, polling stops and in-flight answers
//! get a bounded grace period.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use vidquery_nlsql::QueryPipeline;

use crate::handler;
use crate::telegram::{TelegramClient, Update};

pub struct Poller {
    client: Arc<TelegramClient>,
    pipeline: Arc<QueryPipeline>,
    retry_backoff: Duration,
    shutdown_timeout: Duration,
}

impl Poller {
    pub fn new(
        client: Arc<TelegramClient>,
        pipeline: Arc<QueryPipeline>,
        retry_backoff: Duration,
        shutdown_timeout: Duration,
    ) -> Self {
        Self {
            client,
            pipeline,
            retry_backoff,
            shutdown_timeout,
        }
    }

    /// Poll until `shutdown` resolves
    pub async fn run(self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);

        let mut offset: Option<i64> = None;
        let mut in_flight = JoinSet::new();

        info!("Polling for updates");

        loop {
            let updates = tokio::select! {
                _ = &mut shutdown => break,
                result = self.client.get_updates(offset) => result,
            };

            // reap finished answers
            while let Some(joined) = in_flight.try_join_next() {
                if let Err(e) = joined {
                    error!(error = %e, "Answer task panicked");
                }
            }

            match updates {
                Ok(updates) => {
                    if let Some(next) = next_offset(&updates) {
                        offset = Some(next);
                    }
                    for update in updates {
                        self.dispatch(update, &mut in_flight);
                    }
                }
                Err(e) => {
                    warn!(error = %e, backoff_secs = self.retry_backoff.as_secs(), "Polling failed");
                    tokio::select! {
                        _ = &mut shutdown => break,
                        _ = tokio::time::sleep(self.retry_backoff) => {}
                    }
                }
            }
        }

        info!(
            in_flight = in_flight.len(),
            timeout_secs = self.shutdown_timeout.as_secs(),
            "Polling stopped, waiting for in-flight answers"
        );

        let drain = async { while in_flight.join_next().await.is_some() {} };
        if tokio::time::timeout(self.shutdown_timeout, drain).await.is_err() {
            warn!("Abandoning unfinished answers");
            in_flight.abort_all();
        }
    }

    fn dispatch(&self, update: Update, in_flight: &mut JoinSet<()>) {
        let Some(message) = update.message else {
            debug!(update_id = update.update_id, "Ignoring non-message update");
            return;
        };
        let Some(text) = message.text else {
            debug!(chat_id = message.chat.id, "Ignoring non-text message");
            return;
        };

        let client = self.client.clone();
        let pipeline = self.pipeline.clone();
        let chat_id = message.chat.id;

        in_flight.spawn(async move {
            let reply = handler::reply(&pipeline, &text).await;
            if let Err(e) = client.send_message(chat_id, &reply).await {
                error!(chat_id, error = %e, "Failed to send reply");
            }
        });
    }
}

/// Offset acknowledging every update in the batch
fn next_offset(updates: &[Update]) -> Option<i64> {
    updates.iter().map(|u| u.update_id).max().map(|id| id + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(update_id: i64) -> Update {
        Update {
            update_id,
            message: None,
        }
    }

    #[test]
    fn test_next_offset() {
        assert_eq!(next_offset(&[]), None);
        assert_eq!(next_offset(&[update(5)]), Some(6));
        assert_eq!(next_offset(&[update(7), update(9), update(8)]), Some(10));
    }
}
