//! Input funnel and periodic tick
//!
//! Every asynchronous signal enters here. A tick first drains the funnel,
//! then polls the device position, enforces the loop region and routes
//! automation at the resulting position.

use tracing::{debug, info, trace};

use super::input::EngineInput;
use super::player::PlaybackEngine;
use crate::device::focus_broker::FocusChange;
use crate::device::output::{DeviceEvent, DeviceEventKind, DeviceTarget};
use crate::error::MixdeckError;
use crate::focus::FocusAction;

impl PlaybackEngine {
    /// Ticks only run while the main session plays
    pub fn is_ticking(&self) -> bool {
        self.transport.is_playing()
    }

    pub fn tick(&mut self) {
        self.process_pending_inputs();
        if !self.transport.is_playing() {
            return;
        }
        if let Some(device) = self.device.as_ref() {
            self.state.position_ms = device.current_position();
        }
        self.enforce_loop();
        self.apply_automation(self.state.position_ms);
        trace!("[TRANSPORT] Tick at {}ms", self.state.position_ms);
        self.emit_state();
    }

    /// Handle every queued input in arrival order. Returns how many ran.
    ///
    /// Does nothing once the runtime has taken over the receiving side.
    pub fn process_pending_inputs(&mut self) -> usize {
        let mut handled = 0;
        loop {
            let Some(rx) = self.input_rx.as_mut() else {
                return handled;
            };
            let Ok(input) = rx.try_recv() else {
                return handled;
            };
            self.handle_input(input);
            handled += 1;
        }
    }

    pub fn handle_input(&mut self, input: EngineInput) {
        match input {
            EngineInput::Device(event) => self.on_device_event(event),
            EngineInput::Focus(change) => self.on_focus_change(change),
            EngineInput::OutputChanged(output) => self.on_output_changed(output),
            EngineInput::AnalysisReady { token, analysis } => {
                self.on_analysis_ready(token, analysis)
            }
            EngineInput::BecomingNoisy => {
                info!("[TRANSPORT] Output becoming noisy, pausing");
                self.pause();
            }
        }
    }

    fn on_device_event(&mut self, event: DeviceEvent) {
        match event.target {
            DeviceTarget::Main => {
                if event.token != self.session_token {
                    debug!(
                        "[TRANSPORT] Stale event from session {} ({:?})",
                        event.token, event.kind
                    );
                    return;
                }
                match event.kind {
                    DeviceEventKind::Prepared {
                        duration_ms,
                        session_id,
                    } => self.on_main_prepared(duration_ms, session_id),
                    DeviceEventKind::Buffering { percent } => {
                        self.state.buffer_percent = percent.min(100);
                        self.emit_state();
                    }
                    DeviceEventKind::Completed => self.on_main_completed(),
                    DeviceEventKind::Error { code, message } => {
                        if self.transport.status().is_active() {
                            self.fail_session(MixdeckError::playback(code, message));
                        }
                    }
                }
            }
            DeviceTarget::Layer(id) => match event.kind {
                DeviceEventKind::Prepared { .. } => self.on_layer_prepared(id, event.token),
                DeviceEventKind::Error { code, message } => {
                    self.on_layer_failed(id, event.token, MixdeckError::playback(code, message))
                }
                DeviceEventKind::Buffering { .. } | DeviceEventKind::Completed => {}
            },
        }
    }

    fn on_focus_change(&mut self, change: FocusChange) {
        let action = self.focus.on_change(change, self.transport.is_playing());
        match action {
            FocusAction::None => {}
            FocusAction::Pause => {
                self.pause_session();
            }
            FocusAction::PauseAndRelease => {
                self.pause_session();
                self.collab.focus.abandon();
            }
            FocusAction::Duck(_) => self.push_volume(),
            FocusAction::Restore { resume } => {
                self.push_volume();
                if resume {
                    self.resume_session();
                }
            }
        }
    }
}
