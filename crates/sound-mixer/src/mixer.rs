use crate::catalog::{ChannelDescriptor, ChannelId, SoundCatalog};
use crate::playback::{Playback, PlaybackErrorEvent, PlaybackErrorSender, PlaybackFactory};
use crate::timer::{PendingTimer, TimerDuration, TimerMode, TimerStatus, COUNTDOWN_TICK};
use async_lock::Mutex;
use serde::Serialize;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant};
use tracing::{debug, info, warn};

/// Volume a silent channel is raised to when it gets switched on.
pub const DEFAULT_AUDIBLE_VOLUME: f32 = 0.3;

#[derive(Debug, thiserror::Error)]
pub enum MixerError {
    #[error("Unknown sound channel: {0}")]
    UnknownChannel(ChannelId),
    #[error("Volume must be a finite number, got {0}")]
    InvalidVolume(f32),
    #[error("Sound mixer has been disposed")]
    Disposed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelSnapshot {
    pub id: ChannelId,
    pub volume: f32,
    pub is_toggled_on: bool,
    pub is_playing: bool,
    pub is_loaded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MixerSnapshot {
    pub channels: Vec<ChannelSnapshot>,
    pub is_master_playing: bool,
    pub timer: Option<TimerStatus>,
}

impl MixerSnapshot {
    pub fn channel(&self, id: &str) -> Option<&ChannelSnapshot> {
        self.channels.iter().find(|c| &*c.id == id)
    }
}

struct ChannelState {
    descriptor: ChannelDescriptor,
    volume: f32,
    is_toggled_on: bool,
    is_playing: bool,
    wants_playing: bool,
    // Bumped on every play/pause request so a stale play() result is not applied.
    generation: u64,
    handle: Option<Arc<dyn Playback>>,
}

impl ChannelState {
    fn new(descriptor: ChannelDescriptor) -> Self {
        Self {
            descriptor,
            volume: 0.0,
            is_toggled_on: false,
            is_playing: false,
            wants_playing: false,
            generation: 0,
            handle: None,
        }
    }

    fn id(&self) -> &ChannelId {
        &self.descriptor.id
    }

    fn raise_if_silent(&mut self) {
        if self.volume <= 0.0 {
            self.volume = DEFAULT_AUDIBLE_VOLUME;
        }
    }

    fn request_play(&mut self) -> u64 {
        self.wants_playing = true;
        self.generation += 1;
        self.generation
    }

    fn pause(&mut self) {
        if let Some(handle) = &self.handle {
            handle.pause();
        }
        self.wants_playing = false;
        self.is_playing = false;
        self.generation += 1;
    }

    fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.stop();
        }
        self.is_toggled_on = false;
        self.is_playing = false;
        self.wants_playing = false;
        self.generation += 1;
    }

    fn snapshot(&self) -> ChannelSnapshot {
        ChannelSnapshot {
            id: self.id().clone(),
            volume: self.volume,
            is_toggled_on: self.is_toggled_on,
            is_playing: self.is_playing,
            is_loaded: self.handle.is_some(),
        }
    }
}

struct MixerState {
    channels: Vec<ChannelState>,
    timer: Option<PendingTimer>,
    last_timer_id: u64,
    error_listener: Option<JoinHandle<()>>,
    is_disposed: bool,
}

impl MixerState {
    fn ensure_active(&self) -> Result<(), MixerError> {
        if self.is_disposed {
            return Err(MixerError::Disposed);
        }

        Ok(())
    }

    fn channel_mut(&mut self, id: &ChannelId) -> Result<&mut ChannelState, MixerError> {
        self.channels
            .iter_mut()
            .find(|c| c.id() == id)
            .ok_or_else(|| MixerError::UnknownChannel(id.clone()))
    }

    fn is_master_playing(&self) -> bool {
        self.channels.iter().any(|c| c.is_toggled_on && c.is_playing)
    }

    fn toggled_on_ids(&self) -> Vec<ChannelId> {
        self.channels
            .iter()
            .filter(|c| c.is_toggled_on)
            .map(|c| c.id().clone())
            .collect()
    }

    fn cancel_timer(&mut self) -> bool {
        match self.timer.take() {
            Some(timer) => {
                timer.cancel();
                true
            }
            None => false,
        }
    }

    fn teardown(&mut self) {
        if self.is_disposed {
            return;
        }

        self.is_disposed = true;
        self.cancel_timer();
        self.channels.iter_mut().for_each(ChannelState::release);

        if let Some(listener) = self.error_listener.take() {
            listener.abort();
        }
    }

    fn snapshot(&self) -> MixerSnapshot {
        MixerSnapshot {
            channels: self.channels.iter().map(ChannelState::snapshot).collect(),
            is_master_playing: self.is_master_playing(),
            timer: self.timer.as_ref().map(PendingTimer::status),
        }
    }
}

struct Shared {
    state: Mutex<MixerState>,
    factory: Arc<dyn PlaybackFactory>,
    errors_tx: mpsc::UnboundedSender<PlaybackErrorEvent>,
}

impl Shared {
    fn ensure_handle(&self, channel: &mut ChannelState) -> Option<Arc<dyn Playback>> {
        if channel.handle.is_none() {
            let errors = PlaybackErrorSender::new(channel.id().clone(), self.errors_tx.clone());

            match self.factory.load(&channel.descriptor.source_url, errors) {
                Ok(handle) => {
                    debug!(channel_id = %channel.id(), "Sound channel loaded");
                    handle.set_looping(true);
                    channel.handle = Some(handle);
                }
                Err(error) => {
                    warn!(channel_id = %channel.id(), ?error, "Unable to load sound channel");
                    return None;
                }
            }
        }

        let handle = channel.handle.clone()?;
        handle.set_volume(channel.volume);

        Some(handle)
    }

    /// Switches a channel on (if `toggle_on`) and starts its playback.
    async fn start_channel(&self, id: &ChannelId, toggle_on: bool) -> Result<(), MixerError> {
        let (handle, generation) = {
            let mut state = self.state.lock().await;
            state.ensure_active()?;

            let channel = state.channel_mut(id)?;
            if toggle_on {
                channel.is_toggled_on = true;
                channel.raise_if_silent();
            }

            let generation = channel.request_play();
            match self.ensure_handle(channel) {
                Some(handle) => (handle, generation),
                None => return Ok(()),
            }
        };

        let result = handle.play().await;

        let mut state = self.state.lock().await;
        if state.is_disposed {
            handle.stop();
            return Ok(());
        }

        let channel = state.channel_mut(id)?;
        if channel.generation != generation {
            if result.is_ok() && !channel.wants_playing {
                handle.pause();
            }
            return Ok(());
        }

        match result {
            Ok(()) => channel.is_playing = true,
            Err(error) => {
                warn!(channel_id = %id, ?error, "Unable to start sound channel playback");
                channel.is_playing = false;
            }
        }

        Ok(())
    }

    async fn on_playback_error(&self, event: PlaybackErrorEvent) {
        let PlaybackErrorEvent { channel_id, error } = event;
        warn!(%channel_id, ?error, "Sound channel playback failed");

        let mut state = self.state.lock().await;
        if let Ok(channel) = state.channel_mut(&channel_id) {
            channel.is_playing = false;
        }
    }

    async fn fire_timer(&self, timer_id: u64) {
        let mode = {
            let mut state = self.state.lock().await;

            let timer = match state.timer.take() {
                Some(timer) if timer.id == timer_id => timer,
                other => {
                    state.timer = other;
                    return;
                }
            };
            timer.tick_task.abort();

            info!(mode = %timer.mode, "Sound timer fired");

            if timer.mode == TimerMode::StopAll {
                for channel in state.channels.iter_mut().filter(|c| c.is_toggled_on) {
                    channel.pause();
                    channel.is_toggled_on = false;
                }
            }

            timer.mode
        };

        if mode == TimerMode::StartAll {
            let ids = {
                let state = self.state.lock().await;
                state.channels.iter().map(|c| c.id().clone()).collect::<Vec<_>>()
            };

            for id in ids {
                if let Err(error) = self.start_channel(&id, true).await {
                    warn!(channel_id = %id, ?error, "Unable to start sound channel from timer");
                }
            }
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        self.state.get_mut().teardown();
    }
}

async fn listen_for_playback_errors(
    shared: Weak<Shared>,
    mut rx: mpsc::UnboundedReceiver<PlaybackErrorEvent>,
) {
    while let Some(event) = rx.recv().await {
        let Some(shared) = shared.upgrade() else {
            break;
        };
        shared.on_playback_error(event).await;
    }
}

async fn run_timer(shared: Weak<Shared>, timer_id: u64, total: Duration) {
    sleep(total).await;

    if let Some(shared) = shared.upgrade() {
        shared.fire_timer(timer_id).await;
    }
}

async fn run_countdown(shared: Weak<Shared>, timer_id: u64) {
    let mut ticks = interval_at(Instant::now() + COUNTDOWN_TICK, COUNTDOWN_TICK);

    loop {
        ticks.tick().await;

        let Some(shared) = shared.upgrade() else {
            break;
        };
        let mut state = shared.state.lock().await;

        match state.timer.as_mut() {
            Some(timer) if timer.id == timer_id => {
                timer.remaining = timer.remaining.saturating_sub(COUNTDOWN_TICK);
            }
            _ => break,
        }
    }
}

/// Mixes the looping ambient channels of a [`SoundCatalog`].
///
/// The mixer exclusively owns every playback handle it creates. Handles are
/// loaded lazily the first time a channel is switched on and reused after
/// that. Must be created inside a tokio runtime.
pub struct SoundMixer {
    shared: Arc<Shared>,
}

impl SoundMixer {
    pub fn new(catalog: &SoundCatalog, factory: Arc<dyn PlaybackFactory>) -> Self {
        let (errors_tx, errors_rx) = mpsc::unbounded_channel();

        let shared = Arc::new_cyclic(|weak: &Weak<Shared>| {
            let listener = tokio::spawn(listen_for_playback_errors(weak.clone(), errors_rx));

            Shared {
                state: Mutex::new(MixerState {
                    channels: catalog
                        .channels()
                        .iter()
                        .cloned()
                        .map(ChannelState::new)
                        .collect(),
                    timer: None,
                    last_timer_id: 0,
                    error_listener: Some(listener),
                    is_disposed: false,
                }),
                factory,
                errors_tx,
            }
        });

        Self { shared }
    }

    /// Flips a channel on or off and returns whether it is now on.
    pub async fn toggle(&self, id: &ChannelId) -> Result<bool, MixerError> {
        {
            let mut state = self.shared.state.lock().await;
            state.ensure_active()?;

            let channel = state.channel_mut(id)?;
            if channel.is_toggled_on {
                channel.pause();
                channel.is_toggled_on = false;
                debug!(channel_id = %id, "Sound channel switched off");
                return Ok(false);
            }
        }

        self.shared.start_channel(id, true).await?;
        debug!(channel_id = %id, "Sound channel switched on");

        Ok(true)
    }

    /// Sets a channel's volume without touching its on/off state. Values are
    /// clamped to `0.0..=1.0`; NaN and infinities are rejected.
    pub async fn set_volume(&self, id: &ChannelId, volume: f32) -> Result<(), MixerError> {
        if !volume.is_finite() {
            return Err(MixerError::InvalidVolume(volume));
        }

        let mut state = self.shared.state.lock().await;
        state.ensure_active()?;

        let channel = state.channel_mut(id)?;
        channel.volume = volume.clamp(0.0, 1.0);

        if let Some(handle) = &channel.handle {
            handle.set_volume(channel.volume);
        }

        Ok(())
    }

    /// Pauses every switched-on channel, keeping them switched on.
    pub async fn pause_all(&self) -> Result<(), MixerError> {
        let mut state = self.shared.state.lock().await;
        state.ensure_active()?;

        for channel in state.channels.iter_mut().filter(|c| c.is_toggled_on) {
            channel.pause();
        }

        Ok(())
    }

    /// Resumes every switched-on channel.
    pub async fn play_all(&self) -> Result<(), MixerError> {
        let ids = {
            let state = self.shared.state.lock().await;
            state.ensure_active()?;
            state.toggled_on_ids()
        };

        for id in ids {
            self.shared.start_channel(&id, false).await?;
        }

        Ok(())
    }

    pub async fn toggle_master(&self) -> Result<(), MixerError> {
        if self.is_master_playing().await {
            self.pause_all().await
        } else {
            self.play_all().await
        }
    }

    pub async fn is_master_playing(&self) -> bool {
        self.shared.state.lock().await.is_master_playing()
    }

    /// Schedules `mode` to run once after `duration`, replacing any pending
    /// timer. Returns `false` without scheduling anything for a zero duration.
    pub async fn start_timer(
        &self,
        duration: TimerDuration,
        mode: TimerMode,
    ) -> Result<bool, MixerError> {
        let total = duration.as_duration();

        let mut state = self.shared.state.lock().await;
        state.ensure_active()?;

        if total.is_zero() {
            debug!("Ignoring sound timer without duration");
            return Ok(false);
        }

        if state.cancel_timer() {
            debug!("Pending sound timer replaced");
        }

        state.last_timer_id += 1;
        let id = state.last_timer_id;

        let fire_task = tokio::spawn(run_timer(Arc::downgrade(&self.shared), id, total));
        let tick_task = tokio::spawn(run_countdown(Arc::downgrade(&self.shared), id));

        state.timer = Some(PendingTimer {
            id,
            mode,
            total,
            remaining: total,
            fire_task,
            tick_task,
        });

        info!(%mode, seconds = total.as_secs(), "Sound timer started");

        Ok(true)
    }

    /// Cancels the pending timer, if any. Channels are left as they are.
    pub async fn cancel_timer(&self) -> Result<bool, MixerError> {
        let mut state = self.shared.state.lock().await;
        state.ensure_active()?;

        let cancelled = state.cancel_timer();
        if cancelled {
            info!("Sound timer cancelled");
        }

        Ok(cancelled)
    }

    pub async fn timer_status(&self) -> Option<TimerStatus> {
        let state = self.shared.state.lock().await;
        state.timer.as_ref().map(PendingTimer::status)
    }

    pub async fn snapshot(&self) -> MixerSnapshot {
        self.shared.state.lock().await.snapshot()
    }

    /// Stops and releases every playback handle and cancels the pending timer.
    /// The mixer rejects further commands afterwards.
    pub async fn dispose(&self) {
        self.shared.state.lock().await.teardown();
        info!("Sound mixer disposed");
    }
}
