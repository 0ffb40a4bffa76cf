//! Engine input funnel
//!
//! Every asynchronous signal from a collaborator enters the engine as an
//! [`EngineInput`] through an [`InputSink`]. The sink may be used from any
//! thread; inputs are only consumed by the engine's owner, one at a time.

use tokio::sync::mpsc;

use crate::device::analysis::AudioAnalysis;
use crate::device::focus_broker::FocusChange;
use crate::device::output::DeviceEvent;
use crate::fx::output::OutputType;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineInput {
    Device(DeviceEvent),
    Focus(FocusChange),
    OutputChanged(OutputType),
    AnalysisReady { token: u64, analysis: AudioAnalysis },
    /// Output is about to switch to the loudspeaker (headphones unplugged)
    BecomingNoisy,
}

/// Sending half of the engine input channel
#[derive(Debug, Clone)]
pub struct InputSink {
    tx: mpsc::UnboundedSender<EngineInput>,
}

impl InputSink {
    /// Queue an input. Returns false once the engine is gone.
    pub fn send(&self, input: EngineInput) -> bool {
        self.tx.send(input).is_ok()
    }
}

pub(crate) type InputReceiver = mpsc::UnboundedReceiver<EngineInput>;

pub(crate) fn channel() -> (InputSink, InputReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (InputSink { tx }, rx)
}
