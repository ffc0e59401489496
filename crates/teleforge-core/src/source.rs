//! Where updates come from.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::bot::Bot;
use crate::update::Update;

/// Produces updates until cancelled.
///
/// A source runs on its own task; it pushes every update it obtains into
/// `sink` and returns promptly once `stop` is cancelled. Long polling over
/// HTTP is the usual implementation; tests feed updates through a channel.
#[async_trait]
pub trait UpdateSource: Send + Sync {
    async fn run(&self, bot: Bot, sink: mpsc::Sender<Update>, stop: CancellationToken);
}

/// A source backed by an in-process channel. Useful for tests and for
/// bridging webhook-style delivery into the dispatch loop.
pub struct ChannelSource {
    receiver: parking_lot::Mutex<Option<mpsc::Receiver<Update>>>,
}

impl ChannelSource {
    /// Returns the source and the sender used to feed it.
    pub fn new(buffer: usize) -> (Self, mpsc::Sender<Update>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { receiver: parking_lot::Mutex::new(Some(rx)) }, tx)
    }
}

#[async_trait]
impl UpdateSource for ChannelSource {
    async fn run(&self, _bot: Bot, sink: mpsc::Sender<Update>, stop: CancellationToken) {
        let Some(mut rx) = self.receiver.lock().take() else {
            tracing::warn!("channel source started twice");
            return;
        };
        loop {
            tokio::select! {
                _ = stop.cancelled() => return,
                update = rx.recv() => match update {
                    Some(update) => {
                        if sink.send(update).await.is_err() {
                            return;
                        }
                    }
                    None => return,
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn forwards_until_cancelled() {
        let bot = Bot::builder("TOKEN").offline().build().await.unwrap();
        let (source, feed) = ChannelSource::new(4);
        let (sink, mut out) = mpsc::channel(4);
        let stop = CancellationToken::new();

        let task = tokio::spawn({
            let stop = stop.clone();
            async move { source.run(bot, sink, stop).await }
        });

        feed.send(Update { id: 1, ..Default::default() }).await.unwrap();
        assert_eq!(out.recv().await.unwrap().id, 1);

        stop.cancel();
        task.await.unwrap();
    }
}
