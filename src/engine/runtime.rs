//! Engine task
//!
//! [`EngineHandle::spawn`] moves a [`PlaybackEngine`] into a tokio task that
//! is the only writer of its state. The task multiplexes three sources:
//! commands from handles, collaborator inputs, and the tick interval, which
//! only fires while the main session plays.

use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::events::{EngineEvent, EventHub};
use super::input::{InputReceiver, InputSink};
use super::player::PlaybackEngine;
use super::state::RepeatMode;
use crate::error::{MixdeckError, Result};
use crate::media::MediaItem;

type EngineFn = Box<dyn FnOnce(&mut PlaybackEngine) + Send + 'static>;

/// Command sent to the engine task
pub enum EngineCommand {
    Play(MediaItem),
    PlayPlaylist { items: Vec<MediaItem>, start: usize },
    Pause,
    Resume,
    TogglePlayPause,
    Stop,
    SeekTo(u64),
    Next,
    Previous,
    SetVolume(f32),
    SetRepeatMode(RepeatMode),
    ToggleShuffle,
    /// Run arbitrary code against the engine
    Exec(EngineFn),
    Shutdown(oneshot::Sender<()>),
}

impl std::fmt::Debug for EngineCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineCommand::Play(item) => write!(f, "Play({})", item.title),
            EngineCommand::PlayPlaylist { items, start } => {
                write!(f, "PlayPlaylist({} items from {})", items.len(), start)
            }
            EngineCommand::Pause => f.write_str("Pause"),
            EngineCommand::Resume => f.write_str("Resume"),
            EngineCommand::TogglePlayPause => f.write_str("TogglePlayPause"),
            EngineCommand::Stop => f.write_str("Stop"),
            EngineCommand::SeekTo(ms) => write!(f, "SeekTo({})", ms),
            EngineCommand::Next => f.write_str("Next"),
            EngineCommand::Previous => f.write_str("Previous"),
            EngineCommand::SetVolume(v) => write!(f, "SetVolume({})", v),
            EngineCommand::SetRepeatMode(m) => write!(f, "SetRepeatMode({:?})", m),
            EngineCommand::ToggleShuffle => f.write_str("ToggleShuffle"),
            EngineCommand::Exec(_) => f.write_str("Exec"),
            EngineCommand::Shutdown(_) => f.write_str("Shutdown"),
        }
    }
}

/// Handle to an engine running on the tokio runtime
pub struct EngineHandle {
    commands: mpsc::UnboundedSender<EngineCommand>,
    inputs: InputSink,
    events: EventHub,
    task: Option<JoinHandle<()>>,
}

impl EngineHandle {
    /// Start the engine task. Must be called from within a tokio runtime.
    pub fn spawn(mut engine: PlaybackEngine) -> Result<Self> {
        let Some(input_rx) = engine.take_input_receiver() else {
            return Err(MixdeckError::Config {
                reason: "engine is already running".to_string(),
            });
        };
        let (tx, rx) = mpsc::unbounded_channel();
        let inputs = engine.input_sink();
        let events = engine.event_hub();
        let task = tokio::spawn(run(engine, rx, input_rx));
        info!("Engine task started");
        Ok(Self {
            commands: tx,
            inputs,
            events,
            task: Some(task),
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub fn input_sink(&self) -> InputSink {
        self.inputs.clone()
    }

    pub fn send(&self, command: EngineCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| MixdeckError::EngineClosed)
    }

    pub fn play(&self, item: MediaItem) -> Result<()> {
        self.send(EngineCommand::Play(item))
    }

    pub fn play_playlist(&self, items: Vec<MediaItem>, start: usize) -> Result<()> {
        self.send(EngineCommand::PlayPlaylist { items, start })
    }

    pub fn pause(&self) -> Result<()> {
        self.send(EngineCommand::Pause)
    }

    pub fn resume(&self) -> Result<()> {
        self.send(EngineCommand::Resume)
    }

    pub fn toggle_play_pause(&self) -> Result<()> {
        self.send(EngineCommand::TogglePlayPause)
    }

    pub fn stop(&self) -> Result<()> {
        self.send(EngineCommand::Stop)
    }

    pub fn seek_to(&self, position_ms: u64) -> Result<()> {
        self.send(EngineCommand::SeekTo(position_ms))
    }

    pub fn next(&self) -> Result<()> {
        self.send(EngineCommand::Next)
    }

    pub fn previous(&self) -> Result<()> {
        self.send(EngineCommand::Previous)
    }

    pub fn set_volume(&self, volume: f32) -> Result<()> {
        self.send(EngineCommand::SetVolume(volume))
    }

    pub fn set_repeat_mode(&self, mode: RepeatMode) -> Result<()> {
        self.send(EngineCommand::SetRepeatMode(mode))
    }

    pub fn toggle_shuffle(&self) -> Result<()> {
        self.send(EngineCommand::ToggleShuffle)
    }

    /// Queue a closure to run on the engine task
    pub fn with<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut PlaybackEngine) + Send + 'static,
    {
        self.send(EngineCommand::Exec(Box::new(f)))
    }

    /// Run a closure on the engine task and wait for its result
    pub async fn query<R, F>(&self, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut PlaybackEngine) -> R + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.with(move |engine| {
            let _ = tx.send(f(engine));
        })?;
        rx.await.map_err(|_| MixdeckError::EngineClosed)
    }

    /// Release everything and wait for the task to end
    pub async fn shutdown(mut self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(EngineCommand::Shutdown(tx))?;
        let _ = rx.await;
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Engine task ended abnormally: {}", e);
            }
        }
        info!("Engine task stopped");
        Ok(())
    }
}

async fn run(
    mut engine: PlaybackEngine,
    mut commands: mpsc::UnboundedReceiver<EngineCommand>,
    mut inputs: InputReceiver,
) {
    let period = engine.config().tick_interval().max(Duration::from_millis(1));
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(EngineCommand::Shutdown(ack)) => {
                    engine.release();
                    let _ = ack.send(());
                    break;
                }
                Some(command) => dispatch(&mut engine, command),
                None => {
                    debug!("All handles dropped, releasing engine");
                    engine.release();
                    break;
                }
            },
            Some(input) = inputs.recv() => engine.handle_input(input),
            _ = ticker.tick(), if engine.is_ticking() => engine.tick(),
        }
    }
}

fn dispatch(engine: &mut PlaybackEngine, command: EngineCommand) {
    debug!("Command {:?}", command);
    match command {
        EngineCommand::Play(item) => engine.play(item),
        EngineCommand::PlayPlaylist { items, start } => engine.play_playlist(items, start),
        EngineCommand::Pause => engine.pause(),
        EngineCommand::Resume => engine.resume(),
        EngineCommand::TogglePlayPause => engine.toggle_play_pause(),
        EngineCommand::Stop => engine.stop(),
        EngineCommand::SeekTo(position_ms) => engine.seek_to(position_ms),
        EngineCommand::Next => {
            engine.next();
        }
        EngineCommand::Previous => {
            engine.previous();
        }
        EngineCommand::SetVolume(volume) => engine.set_volume(volume),
        EngineCommand::SetRepeatMode(mode) => engine.set_repeat_mode(mode),
        EngineCommand::ToggleShuffle => {
            engine.toggle_shuffle();
        }
        EngineCommand::Exec(f) => f(engine),
        EngineCommand::Shutdown(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::device::sim::SimBackend;

    #[test]
    fn test_spawn_without_receiver_fails() {
        let backend = SimBackend::new();
        let mut engine =
            PlaybackEngine::new(EngineConfig::default(), backend.collaborators()).unwrap();
        assert!(engine.take_input_receiver().is_some());

        let err = EngineHandle::spawn(engine).err().unwrap();
        assert_eq!(err.error_code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_command_debug_is_compact() {
        let command = EngineCommand::PlayPlaylist {
            items: vec![MediaItem::new("a", "sim://a", "A")],
            start: 0,
        };
        assert_eq!(format!("{:?}", command), "PlayPlaylist(1 items from 0)");
        assert_eq!(format!("{:?}", EngineCommand::SeekTo(42)), "SeekTo(42)");
    }
}
