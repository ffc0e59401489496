//! Long polling against `getUpdates`.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use teleforge_core::bot::Bot;
use teleforge_core::source::UpdateSource;
use teleforge_core::update::Update;

/// Pulls updates by holding `getUpdates` requests open.
///
/// Confirmed updates are acknowledged implicitly through the offset
/// parameter of the next request.
pub struct LongPoller {
    /// Server-side hold time for each poll.
    pub timeout: Duration,
    /// Maximum updates per poll, 1-100.
    pub limit: usize,
    /// Update kinds to receive; empty means the platform default set.
    pub allowed_updates: Vec<String>,
}

impl Default for LongPoller {
    fn default() -> Self {
        LongPoller { timeout: Duration::from_secs(30), limit: 100, allowed_updates: Vec::new() }
    }
}

#[async_trait]
impl UpdateSource for LongPoller {
    async fn run(&self, bot: Bot, sink: mpsc::Sender<Update>, stop: CancellationToken) {
        let mut offset: i64 = 0;
        loop {
            if stop.is_cancelled() {
                return;
            }
            let mut params = json!({
                "offset": offset,
                "timeout": self.timeout.as_secs(),
                "limit": self.limit,
            });
            if !self.allowed_updates.is_empty() {
                params["allowed_updates"] = json!(self.allowed_updates);
            }

            let result = tokio::select! {
                _ = stop.cancelled() => return,
                result = bot.raw("getUpdates", params) => result,
            };
            match result {
                Ok(serde_json::Value::Array(items)) => {
                    for item in items {
                        let update: Update = match serde_json::from_value(item) {
                            Ok(update) => update,
                            Err(err) => {
                                tracing::warn!(error = %err, "dropping malformed update");
                                continue;
                            }
                        };
                        offset = offset.max(update.id + 1);
                        if sink.send(update).await.is_err() {
                            return;
                        }
                    }
                }
                Ok(other) => {
                    tracing::warn!(body = %other, "unexpected getUpdates result shape");
                }
                Err(err) => {
                    tracing::error!(error = %err, "long poll failed");
                    tokio::select! {
                        _ = stop.cancelled() => return,
                        _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use teleforge_core::error::ApiError;
    use teleforge_core::transport::{ApiRequest, ApiResponse, Transport};

    /// Answers getUpdates with canned batches and records request bodies.
    struct PollScript {
        batches: Mutex<Vec<serde_json::Value>>,
        requests: Mutex<Vec<serde_json::Value>>,
    }

    #[async_trait]
    impl Transport for PollScript {
        async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
            let teleforge_core::transport::RequestBody::Encoded { bytes, .. } = request.body
            else {
                panic!("unexpected multipart request");
            };
            self.requests.lock().unwrap().push(serde_json::from_slice(&bytes).unwrap());

            let mut batches = self.batches.lock().unwrap();
            let result = if batches.is_empty() { json!([]) } else { batches.remove(0) };
            let body = json!({"ok": true, "result": result});
            Ok(ApiResponse { status: 200, body: serde_json::to_vec(&body).unwrap() })
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn confirms_updates_through_offset() {
        let script = Arc::new(PollScript {
            batches: Mutex::new(vec![json!([
                {"update_id": 41, "message": {"message_id": 1, "date": 0, "chat": {"id": 5, "type": "private"}, "text": "a"}},
                {"update_id": 42, "message": {"message_id": 2, "date": 0, "chat": {"id": 5, "type": "private"}, "text": "b"}},
            ])]),
            requests: Mutex::new(Vec::new()),
        });
        let bot = Bot::builder("TOKEN")
            .offline()
            .transport(script.clone())
            .build()
            .await
            .unwrap();

        let (sink, mut out) = mpsc::channel(8);
        let stop = CancellationToken::new();
        let poller = LongPoller { timeout: Duration::from_secs(0), ..Default::default() };
        let task = tokio::spawn({
            let stop = stop.clone();
            async move { poller.run(bot, sink, stop).await }
        });

        assert_eq!(out.recv().await.unwrap().id, 41);
        assert_eq!(out.recv().await.unwrap().id, 42);
        stop.cancel();
        task.await.unwrap();

        let requests = script.requests.lock().unwrap();
        assert_eq!(requests[0]["offset"], 0);
        if requests.len() > 1 {
            assert_eq!(requests[1]["offset"], 43);
        }
    }
}
