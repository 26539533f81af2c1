//! Concurrent, settle-all delivery of outbox rows.

use std::time::Duration;

use futures::future::join_all;
use ringdesk_db::DbPool;
use serde::Deserialize;

use crate::channels::NotifyChannel;
use crate::error::NotifyError;
use crate::outbox::{self, OutboxRow};

/// Configuration for the downstream channels.
#[derive(Debug, Clone, Deserialize)]
pub struct NotifyConfig {
    /// Endpoint that appends completed calls to the log sheet.
    #[serde(default)]
    pub sheet_url: Option<String>,

    /// Endpoint that raises operator alerts.
    #[serde(default)]
    pub alert_url: Option<String>,

    /// Per-delivery timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Delivery attempt budget per outbox row.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i64,

    /// Interval between background retry passes, in seconds.
    #[serde(default = "default_retry_interval_secs")]
    pub retry_interval_secs: u64,
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_max_attempts() -> i64 {
    5
}

fn default_retry_interval_secs() -> u64 {
    30
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            sheet_url: None,
            alert_url: None,
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            retry_interval_secs: default_retry_interval_secs(),
        }
    }
}

/// How many rows one retry pass picks up.
const RETRY_BATCH_SIZE: i64 = 50;

/// Delivers outbox rows to their downstream channels.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    config: NotifyConfig,
    http: reqwest::Client,
}

impl Dispatcher {
    /// Builds a dispatcher with the delivery timeout applied to every post.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::Delivery` if the HTTP client cannot be built.
    pub fn new(config: NotifyConfig) -> Result<Self, NotifyError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NotifyError::Delivery(format!("failed to build http client: {e}")))?;

        Ok(Self { config, http })
    }

    pub fn max_attempts(&self) -> i64 {
        self.config.max_attempts
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.config.retry_interval_secs)
    }

    /// Dispatches all pending rows for one call and waits for every delivery
    /// to settle.
    ///
    /// Failures are recorded on the row, logged, and swallowed; the caller
    /// only learns how many rows were delivered. Database errors while
    /// loading rows are also swallowed; notification delivery must never
    /// fail a call-end.
    pub async fn dispatch_pending_for_call(&self, pool: &DbPool, call_id: &str) -> usize {
        let rows = {
            let pool = pool.clone();
            let call_id_owned = call_id.to_string();
            let loaded = tokio::task::spawn_blocking(move || {
                let conn = pool.get().map_err(|e| NotifyError::Delivery(e.to_string()))?;
                outbox::pending_for_call(&conn, &call_id_owned)
            })
            .await;

            match loaded {
                Ok(Ok(rows)) => rows,
                Ok(Err(e)) => {
                    tracing::warn!(call_id, error = %e, "failed to load outbox rows");
                    return 0;
                }
                Err(e) => {
                    tracing::warn!(call_id, error = %e, "outbox load task join error");
                    return 0;
                }
            }
        };

        self.dispatch_rows(pool, rows).await
    }

    /// One retry pass over rows with remaining attempt budget.
    pub async fn dispatch_due(&self, pool: &DbPool) -> usize {
        let rows = {
            let pool = pool.clone();
            let max_attempts = self.config.max_attempts;
            let loaded = tokio::task::spawn_blocking(move || {
                let conn = pool.get().map_err(|e| NotifyError::Delivery(e.to_string()))?;
                outbox::pending_for_retry(&conn, max_attempts, RETRY_BATCH_SIZE)
            })
            .await;

            match loaded {
                Ok(Ok(rows)) => rows,
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "failed to load retry batch");
                    return 0;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "retry batch task join error");
                    return 0;
                }
            }
        };

        self.dispatch_rows(pool, rows).await
    }

    /// Delivers the given rows concurrently and records every attempt.
    /// Returns the number of rows delivered successfully.
    async fn dispatch_rows(&self, pool: &DbPool, rows: Vec<OutboxRow>) -> usize {
        if rows.is_empty() {
            return 0;
        }

        let deliveries = rows.into_iter().map(|row| {
            let pool = pool.clone();
            async move {
                let outcome = self.deliver(row.channel, &row.payload_json).await;
                let delivered = outcome.is_ok();

                if let Err(e) = &outcome {
                    tracing::warn!(
                        call_id = %row.call_id,
                        channel = row.channel.as_str(),
                        attempts = row.attempts + 1,
                        error = %e,
                        "notification delivery failed"
                    );
                }

                let max_attempts = self.config.max_attempts;
                let error_text = outcome.err().map(|e| e.to_string());
                let recorded = tokio::task::spawn_blocking(move || {
                    let conn = pool.get().map_err(|e| NotifyError::Delivery(e.to_string()))?;
                    outbox::mark_attempt(
                        &conn,
                        row.id,
                        match &error_text {
                            None => Ok(()),
                            Some(e) => Err(e.as_str()),
                        },
                        max_attempts,
                    )
                })
                .await;

                match recorded {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        tracing::warn!(row_id = row.id, error = %e, "failed to record delivery attempt")
                    }
                    Err(e) => {
                        tracing::warn!(row_id = row.id, error = %e, "attempt record task join error")
                    }
                }

                delivered
            }
        });

        join_all(deliveries)
            .await
            .into_iter()
            .filter(|delivered| *delivered)
            .count()
    }

    async fn deliver(&self, channel: NotifyChannel, payload_json: &str) -> Result<(), NotifyError> {
        let url = match channel {
            NotifyChannel::SheetLog => self.config.sheet_url.as_deref(),
            NotifyChannel::Alert => self.config.alert_url.as_deref(),
        }
        .ok_or_else(|| NotifyError::ChannelUnconfigured(channel.as_str().to_string()))?;

        let response = self
            .http
            .post(url)
            .header("Content-Type", "application/json")
            .body(payload_json.to_string())
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Delivery(format!(
                "channel returned {status}"
            )));
        }

        Ok(())
    }
}
