//! Observer surface
//!
//! Events are fanned out over a broadcast channel. Emitting never blocks and
//! never fails: with no subscribers the event is dropped, and a subscriber
//! that falls behind sees `RecvError::Lagged` instead of slowing the engine.

use tokio::sync::broadcast;

use crate::device::analysis::AudioAnalysis;
use crate::error::{ErrorKind, MixdeckError};
use crate::fx::output::OutputType;
use crate::fx::presets::ListeningMode;
use crate::fx::state::FxState;
use crate::layers::LayerSnapshot;
use crate::looping::LoopRegion;
use crate::media::MediaItem;

use super::state::PlaybackState;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    PlaybackStateChanged(PlaybackState),
    MediaChanged(Option<MediaItem>),
    PlaylistChanged {
        items: Vec<MediaItem>,
        current_index: Option<usize>,
    },
    Error {
        kind: ErrorKind,
        message: String,
    },
    AudioAnalysisReady(AudioAnalysis),
    LayersChanged(Vec<LayerSnapshot>),
    OutputChanged(OutputType),
    ListeningModeChanged(ListeningMode),
    FxStateChanged(FxState),
    LoopChanged(Option<LoopRegion>),
}

impl EngineEvent {
    pub fn error(err: &MixdeckError) -> Self {
        EngineEvent::Error {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventHub {
    tx: broadcast::Sender<EngineEvent>,
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers() {
        let hub = EventHub::new(4);
        hub.emit(EngineEvent::MediaChanged(None));
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_subscribers_see_events_in_order() {
        let hub = EventHub::new(8);
        let mut rx = hub.subscribe();
        hub.emit(EngineEvent::OutputChanged(OutputType::Headphones));
        hub.emit(EngineEvent::ListeningModeChanged(ListeningMode::Night));
        assert_eq!(
            rx.try_recv().unwrap(),
            EngineEvent::OutputChanged(OutputType::Headphones)
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            EngineEvent::ListeningModeChanged(ListeningMode::Night)
        );
    }

    #[test]
    fn test_slow_subscriber_lags() {
        let hub = EventHub::new(2);
        let mut rx = hub.subscribe();
        for _ in 0..5 {
            hub.emit(EngineEvent::MediaChanged(None));
        }
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Lagged(_))
        ));
    }

    #[test]
    fn test_error_event_carries_kind() {
        let event = EngineEvent::error(&MixdeckError::FocusDenied);
        assert!(matches!(
            event,
            EngineEvent::Error {
                kind: ErrorKind::FocusDenied,
                ..
            }
        ));
    }
}
