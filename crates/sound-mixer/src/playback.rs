use crate::catalog::ChannelId;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

#[derive(Debug, Clone, thiserror::Error)]
pub enum PlaybackError {
    #[error("Unable to load {source_url}: {reason}")]
    LoadFailed { source_url: String, reason: String },
    #[error("Playback was rejected: {0}")]
    Rejected(String),
    #[error("Playback failed: {0}")]
    Failed(String),
}

/// One loaded, looping audio source.
#[async_trait]
pub trait Playback: Send + Sync {
    async fn play(&self) -> Result<(), PlaybackError>;
    fn pause(&self);
    fn set_volume(&self, volume: f32);
    fn set_looping(&self, looping: bool);
    /// Stops playback for good and releases the source.
    fn stop(&self);
}

pub trait PlaybackFactory: Send + Sync {
    /// Loads `source_url`. Errors that happen later, while the source is
    /// playing, are reported through `errors`.
    fn load(
        &self,
        source_url: &str,
        errors: PlaybackErrorSender,
    ) -> Result<Arc<dyn Playback>, PlaybackError>;
}

#[derive(Debug)]
pub(crate) struct PlaybackErrorEvent {
    pub(crate) channel_id: ChannelId,
    pub(crate) error: PlaybackError,
}

#[derive(Debug, Clone)]
pub struct PlaybackErrorSender {
    channel_id: ChannelId,
    tx: UnboundedSender<PlaybackErrorEvent>,
}

impl PlaybackErrorSender {
    pub(crate) fn new(channel_id: ChannelId, tx: UnboundedSender<PlaybackErrorEvent>) -> Self {
        Self { channel_id, tx }
    }

    pub fn channel_id(&self) -> &ChannelId {
        &self.channel_id
    }

    pub fn notify(&self, error: PlaybackError) {
        let event = PlaybackErrorEvent {
            channel_id: self.channel_id.clone(),
            error,
        };

        if self.tx.send(event).is_err() {
            debug!(channel_id = %self.channel_id, "Playback error dropped, mixer is gone");
        }
    }
}
