//! Shared helpers for the integration tests

#![allow(dead_code)]

use mixdeck::device::sim::SimBackend;
use mixdeck::engine::{EngineEvent, PlaybackEngine};
use mixdeck::error::ErrorKind;
use mixdeck::media::MediaItem;
use mixdeck::EngineConfig;
use tokio::sync::broadcast;

/// Engine wired to a simulated world
pub struct Rig {
    pub backend: SimBackend,
    pub engine: PlaybackEngine,
    pub events: broadcast::Receiver<EngineEvent>,
}

impl Rig {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_backend(SimBackend::new(), config)
    }

    pub fn with_backend(backend: SimBackend, config: EngineConfig) -> Self {
        let engine = PlaybackEngine::new(config, backend.collaborators()).unwrap();
        let events = engine.subscribe();
        Self {
            backend,
            engine,
            events,
        }
    }

    /// Deliver every queued collaborator signal
    pub fn settle(&mut self) {
        self.engine.process_pending_inputs();
    }

    /// Let simulated time pass, then tick once
    pub fn advance(&mut self, ms: u64) {
        self.backend.advance(ms);
        self.engine.tick();
    }

    /// Play `item` and deliver the device's prepared signal
    pub fn play_now(&mut self, item: MediaItem) {
        self.engine.play(item);
        self.settle();
    }

    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        let mut out = Vec::new();
        loop {
            match self.events.try_recv() {
                Ok(event) => out.push(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return out,
            }
        }
    }

    pub fn error_kinds(&mut self) -> Vec<ErrorKind> {
        self.drain_events()
            .into_iter()
            .filter_map(|e| match e {
                EngineEvent::Error { kind, .. } => Some(kind),
                _ => None,
            })
            .collect()
    }
}

pub fn item(n: usize) -> MediaItem {
    MediaItem::new(format!("item-{}", n), format!("sim://item/{}", n), format!("Item {}", n))
}

pub fn items(count: usize) -> Vec<MediaItem> {
    (0..count).map(item).collect()
}
