//! Playback Tests
//!
//! Transport, playlist, completion and focus behaviour of the main session
//! against simulated devices.

mod common;

use std::path::Path;

use common::{item, items, Rig};
use mixdeck::device::focus_broker::FocusChange;
use mixdeck::device::output::{DeviceEvent, DeviceEventKind, DeviceTarget};
use mixdeck::engine::{EngineEvent, EngineInput, PlaybackStatus, RepeatMode};
use mixdeck::error::ErrorKind;
use mixdeck::PlayerModule;
use approx::assert_relative_eq;
use pretty_assertions::assert_eq;

// === End-to-End ===

#[test]
fn test_play_pause_focus_scenario() {
    let mut rig = Rig::new();
    rig.engine.play(item(1));
    assert_eq!(rig.engine.status(), PlaybackStatus::Preparing);

    rig.settle();
    let state = rig.engine.state().clone();
    assert_eq!(state.status, PlaybackStatus::Playing);
    assert!(state.is_playing);
    assert_eq!(state.position_ms, 0);
    assert_eq!(state.duration_ms, 180_000);

    rig.advance(100);
    assert_eq!(rig.engine.state().position_ms, 100);

    rig.engine.pause();
    assert_eq!(rig.engine.status(), PlaybackStatus::Paused);
    assert!(!rig.engine.state().is_playing);

    // Already paused: a transient loss changes nothing
    assert!(rig.backend.focus_change(FocusChange::LossTransient));
    rig.settle();
    assert_eq!(rig.engine.status(), PlaybackStatus::Paused);

    // The pause was the user's, so regaining focus must not resume
    assert!(rig.backend.focus_change(FocusChange::Gain));
    rig.settle();
    assert_eq!(rig.engine.status(), PlaybackStatus::Paused);
    assert_eq!(rig.backend.main_device().unwrap().starts, 1);
}

#[test]
fn test_media_changed_emitted_on_play() {
    let mut rig = Rig::new();
    rig.play_now(item(4));
    let events = rig.drain_events();
    assert!(events.contains(&EngineEvent::MediaChanged(Some(item(4)))));
    assert!(events.iter().any(|e| matches!(
        e,
        EngineEvent::PlaybackStateChanged(s) if s.status == PlaybackStatus::Playing
    )));
}

// === Focus ===

#[test]
fn test_transient_focus_loss_resumes_on_gain() {
    let mut rig = Rig::new();
    rig.play_now(item(1));

    rig.backend.focus_change(FocusChange::LossTransient);
    rig.settle();
    assert_eq!(rig.engine.status(), PlaybackStatus::Paused);

    rig.backend.focus_change(FocusChange::Gain);
    rig.settle();
    assert_eq!(rig.engine.status(), PlaybackStatus::Playing);
    assert_eq!(rig.backend.main_device().unwrap().starts, 2);
}

#[test]
fn test_user_pause_during_transient_loss_blocks_resume() {
    let mut rig = Rig::new();
    rig.play_now(item(1));

    rig.backend.focus_change(FocusChange::LossTransient);
    rig.settle();
    rig.engine.pause();
    rig.backend.focus_change(FocusChange::Gain);
    rig.settle();
    assert_eq!(rig.engine.status(), PlaybackStatus::Paused);
}

#[test]
fn test_duck_scales_device_volume() {
    let mut rig = Rig::new();
    rig.play_now(item(1));
    rig.engine.set_volume(0.5);

    rig.backend.focus_change(FocusChange::LossTransientCanDuck);
    rig.settle();
    let (l, r) = rig.backend.main_device().unwrap().volume;
    assert_relative_eq!(l, 0.15, epsilon = 1e-6);
    assert_relative_eq!(r, 0.15, epsilon = 1e-6);
    assert_eq!(rig.engine.status(), PlaybackStatus::Playing);
    assert_relative_eq!(rig.engine.state().volume, 0.5);

    rig.backend.focus_change(FocusChange::Gain);
    rig.settle();
    assert_eq!(rig.backend.main_device().unwrap().volume, (0.5, 0.5));
}

#[test]
fn test_permanent_loss_pauses_and_abandons() {
    let mut rig = Rig::new();
    rig.play_now(item(1));

    rig.backend.focus_change(FocusChange::Loss);
    rig.settle();
    assert_eq!(rig.engine.status(), PlaybackStatus::Paused);
    assert_eq!(rig.backend.focus_abandons(), 1);
    // Nobody holds focus any more
    assert!(!rig.backend.focus_change(FocusChange::Gain));

    rig.engine.resume();
    assert_eq!(rig.backend.focus_requests(), 2);
    assert_eq!(rig.engine.status(), PlaybackStatus::Playing);
}

#[test]
fn test_focus_denied_reports_and_plays() {
    let mut rig = Rig::new();
    rig.backend.set_focus_granted(false);
    rig.play_now(item(1));
    assert!(rig.error_kinds().contains(&ErrorKind::FocusDenied));
    assert_eq!(rig.engine.status(), PlaybackStatus::Playing);
}

#[test]
fn test_becoming_noisy_pauses() {
    let mut rig = Rig::new();
    rig.play_now(item(1));
    assert!(rig.engine.input_sink().send(EngineInput::BecomingNoisy));
    rig.settle();
    assert_eq!(rig.engine.status(), PlaybackStatus::Paused);
}

// === Repeat / Advance ===

#[test]
fn test_repeat_all_next_wraps_to_first() {
    let mut rig = Rig::new();
    rig.engine.set_repeat_mode(RepeatMode::All);
    rig.engine.play_playlist(items(3), 2);
    rig.settle();

    assert!(rig.engine.next());
    assert_eq!(rig.engine.playlist().current_index(), Some(0));
    rig.settle();
    assert_eq!(rig.engine.status(), PlaybackStatus::Playing);
    assert_eq!(
        rig.backend.main_device().unwrap().uri.as_deref(),
        Some("sim://item/0")
    );
}

#[test]
fn test_repeat_off_next_at_end_is_noop() {
    let mut rig = Rig::new();
    rig.engine.play_playlist(items(3), 2);
    rig.settle();

    assert!(!rig.engine.next());
    assert_eq!(rig.engine.playlist().current_index(), Some(2));
    assert_eq!(rig.engine.status(), PlaybackStatus::Playing);
}

#[test]
fn test_completion_of_last_item_stops_at_zero() {
    let mut rig = Rig::new();
    rig.engine.play_playlist(items(3), 2);
    rig.settle();
    rig.advance(1_000);

    rig.backend.complete(DeviceTarget::Main);
    rig.settle();
    let state = rig.engine.state();
    assert_eq!(state.status, PlaybackStatus::Stopped);
    assert_eq!(state.position_ms, 0);
    assert!(!state.is_playing);
    assert_eq!(rig.engine.playlist().current_index(), Some(2));
}

#[test]
fn test_completion_advances_to_next_item() {
    let mut rig = Rig::new();
    rig.engine.play_playlist(items(3), 0);
    rig.settle();

    rig.backend.complete(DeviceTarget::Main);
    rig.settle();
    assert_eq!(rig.engine.playlist().current_index(), Some(1));
    assert_eq!(rig.engine.status(), PlaybackStatus::Playing);
}

#[test]
fn test_completion_with_repeat_all_wraps() {
    let mut rig = Rig::new();
    rig.engine.set_repeat_mode(RepeatMode::All);
    rig.engine.play_playlist(items(2), 1);
    rig.settle();

    rig.backend.complete(DeviceTarget::Main);
    rig.settle();
    assert_eq!(rig.engine.playlist().current_index(), Some(0));
    assert_eq!(rig.engine.status(), PlaybackStatus::Playing);
}

#[test]
fn test_completion_with_repeat_one_restarts() {
    let mut rig = Rig::new();
    rig.engine.set_repeat_mode(RepeatMode::One);
    rig.engine.play_playlist(items(3), 1);
    rig.settle();
    rig.advance(5_000);

    rig.backend.complete(DeviceTarget::Main);
    rig.settle();
    let device = rig.backend.main_device().unwrap();
    assert_eq!(device.starts, 2);
    assert_eq!(device.seeks.last(), Some(&0));
    assert_eq!(rig.engine.state().position_ms, 0);
    assert_eq!(rig.engine.status(), PlaybackStatus::Playing);
    assert_eq!(rig.engine.playlist().current_index(), Some(1));
}

// === Previous ===

#[test]
fn test_previous_restarts_past_threshold() {
    let mut rig = Rig::new();
    rig.engine.play_playlist(items(3), 1);
    rig.settle();

    rig.backend.set_position(DeviceTarget::Main, 5_000);
    assert!(rig.engine.previous());
    assert_eq!(rig.engine.playlist().current_index(), Some(1));
    assert_eq!(rig.backend.main_device().unwrap().seeks.last(), Some(&0));

    rig.backend.set_position(DeviceTarget::Main, 1_000);
    assert!(rig.engine.previous());
    assert_eq!(rig.engine.playlist().current_index(), Some(0));
}

#[test]
fn test_previous_at_first_item() {
    let mut rig = Rig::new();
    rig.engine.play_playlist(items(3), 0);
    rig.settle();
    assert!(!rig.engine.previous());
    assert_eq!(rig.engine.playlist().current_index(), Some(0));

    rig.engine.set_repeat_mode(RepeatMode::All);
    assert!(rig.engine.previous());
    assert_eq!(rig.engine.playlist().current_index(), Some(2));
}

// === Stop / Seek ===

#[test]
fn test_stop_keeps_preferences_and_is_idempotent() {
    let mut rig = Rig::new();
    rig.engine.play_playlist(items(3), 0);
    rig.settle();
    rig.engine.set_volume(0.4);
    assert!(rig.engine.set_speed(1.5));
    rig.engine.set_repeat_mode(RepeatMode::All);
    rig.engine.set_shuffle(true);
    rig.advance(2_000);

    rig.engine.stop();
    let state = rig.engine.state().clone();
    assert_eq!(state.status, PlaybackStatus::Stopped);
    assert_eq!(state.position_ms, 0);
    assert_eq!(state.duration_ms, 0);
    assert!(!state.is_prepared);
    assert!(!state.is_playing);
    assert_relative_eq!(state.volume, 0.4);
    assert_relative_eq!(state.speed, 1.5);
    assert_eq!(state.repeat_mode, RepeatMode::All);
    assert!(state.shuffle_enabled);

    assert!(rig.backend.main_device().unwrap().released);
    assert_eq!(rig.backend.focus_abandons(), 1);
    assert_eq!(rig.backend.fx_state().released, 1);

    rig.drain_events();
    rig.engine.stop();
    assert!(rig.drain_events().is_empty());
    assert_eq!(rig.backend.focus_abandons(), 1);
}

#[test]
fn test_seek_is_clamped_to_duration() {
    let mut rig = Rig::new();
    rig.play_now(item(1));

    rig.engine.seek_to(999_999);
    assert_eq!(rig.engine.state().position_ms, 180_000);

    rig.engine.seek_to_percent(0.5);
    assert_eq!(rig.engine.state().position_ms, 90_000);

    rig.engine.skip_backward(None);
    assert_eq!(rig.engine.state().position_ms, 80_000);

    rig.engine.skip_forward(Some(5_000));
    assert_eq!(rig.engine.state().position_ms, 85_000);
    assert_eq!(rig.backend.main_device().unwrap().position_ms, 85_000);
}

#[test]
fn test_seek_without_duration_only_floors() {
    let mut rig = Rig::new();
    rig.engine.seek_to(42_000);
    assert_eq!(rig.engine.state().position_ms, 42_000);
    rig.engine.skip_backward(Some(50_000));
    assert_eq!(rig.engine.state().position_ms, 0);
}

// === Play Variants ===

#[test]
fn test_play_missing_file_reports_error() {
    let mut rig = Rig::new();
    rig.engine
        .play_file(Path::new("/definitely/not/here/track.mp3"));
    assert_eq!(rig.error_kinds(), vec![ErrorKind::FileNotFound]);
    assert_eq!(rig.engine.status(), PlaybackStatus::Idle);
    assert!(rig.backend.devices().is_empty());
}

#[test]
fn test_play_existing_file() {
    let file = tempfile::Builder::new()
        .prefix("groove")
        .suffix(".flac")
        .tempfile()
        .unwrap();
    let mut rig = Rig::new();
    rig.engine.play_file(file.path());
    rig.settle();
    assert_eq!(rig.engine.status(), PlaybackStatus::Playing);
    let title = &rig.engine.current_item().unwrap().title;
    assert!(title.starts_with("groove"));
}

#[test]
fn test_play_stream() {
    let mut rig = Rig::new();
    rig.engine
        .play_stream("https://radio.example/live", "Live", "Station");
    rig.settle();
    let current = rig.engine.current_item().unwrap();
    assert_eq!(current.artist, "Station");
    assert_eq!(rig.engine.status(), PlaybackStatus::Playing);
}

#[test]
fn test_load_failure_enters_error() {
    let mut rig = Rig::new();
    rig.backend.fail_uri("sim://item/1");
    rig.engine.play(item(1));
    assert_eq!(rig.engine.status(), PlaybackStatus::Error);
    assert!(rig.error_kinds().contains(&ErrorKind::Playback));
}

// === Errors / Stale Events ===

#[test]
fn test_device_error_sets_error_status() {
    let mut rig = Rig::new();
    rig.play_now(item(1));

    rig.backend.fail(DeviceTarget::Main, -1004);
    rig.settle();
    assert_eq!(rig.engine.status(), PlaybackStatus::Error);
    assert!(!rig.engine.state().is_playing);
    assert!(rig.error_kinds().contains(&ErrorKind::Playback));

    // Later commands are still accepted
    rig.play_now(item(2));
    assert_eq!(rig.engine.status(), PlaybackStatus::Playing);
}

#[test]
fn test_stale_device_events_ignored() {
    let mut rig = Rig::new();
    rig.backend.set_auto_prepare(false);
    rig.engine.play(item(1));
    rig.engine.play(item(2));

    rig.engine.input_sink().send(EngineInput::Device(DeviceEvent {
        target: DeviceTarget::Main,
        token: 1,
        kind: DeviceEventKind::Prepared {
            duration_ms: 1_000,
            session_id: 99,
        },
    }));
    rig.settle();
    assert_eq!(rig.engine.status(), PlaybackStatus::Preparing);

    rig.backend.finish_prepare(DeviceTarget::Main);
    rig.settle();
    assert_eq!(rig.engine.status(), PlaybackStatus::Playing);
    assert_eq!(rig.engine.state().duration_ms, 180_000);
}

#[test]
fn test_buffering_updates_snapshot() {
    let mut rig = Rig::new();
    rig.play_now(item(1));
    rig.engine.handle_input(EngineInput::Device(DeviceEvent {
        target: DeviceTarget::Main,
        token: 1,
        kind: DeviceEventKind::Buffering { percent: 140 },
    }));
    assert_eq!(rig.engine.state().buffer_percent, 100);
}

// === Preferences ===

#[test]
fn test_speed_unsupported_keeps_state() {
    let mut rig = Rig::new();
    rig.backend.set_speed_supported(false);
    rig.play_now(item(1));
    assert!(!rig.engine.set_speed(2.0));
    assert_relative_eq!(rig.engine.state().speed, 1.0);
}

#[test]
fn test_speed_is_clamped() {
    let mut rig = Rig::new();
    rig.play_now(item(1));
    assert!(rig.engine.set_speed(10.0));
    assert_relative_eq!(rig.engine.state().speed, 4.0);
    assert_relative_eq!(rig.backend.main_device().unwrap().speed, 4.0);
    assert!(rig.engine.set_speed(0.1));
    assert_relative_eq!(rig.engine.state().speed, 0.25);
}

#[test]
fn test_shuffle_keeps_current_item_and_restores_order() {
    let mut rig = Rig::new();
    rig.engine.play_playlist(items(10), 3);
    rig.settle();
    rig.engine.set_shuffle_seed(7);
    rig.drain_events();

    assert!(rig.engine.toggle_shuffle());
    assert_eq!(rig.engine.playlist().current_index(), Some(3));
    assert_eq!(rig.engine.current_item().unwrap().id, "item-3");
    assert!(rig
        .drain_events()
        .iter()
        .any(|e| matches!(e, EngineEvent::PlaylistChanged { .. })));
    assert_eq!(rig.backend.main_device().unwrap().starts, 1);

    assert!(!rig.engine.toggle_shuffle());
    let ids: Vec<_> = rig
        .engine
        .playlist()
        .items()
        .iter()
        .map(|i| i.id.clone())
        .collect();
    let expected: Vec<_> = (0..10).map(|i| format!("item-{}", i)).collect();
    assert_eq!(ids, expected);
    assert_eq!(rig.engine.current_item().unwrap().id, "item-3");
}

#[test]
fn test_volume_is_clamped() {
    let mut rig = Rig::new();
    rig.play_now(item(1));
    rig.engine.set_volume(1.7);
    assert_relative_eq!(rig.engine.state().volume, 1.0);
    rig.engine.set_volume(-0.3);
    assert_relative_eq!(rig.engine.state().volume, 0.0);
    assert_eq!(rig.backend.main_device().unwrap().volume, (0.0, 0.0));
}

#[test]
fn test_toggle_play_pause() {
    let mut rig = Rig::new();
    rig.play_now(item(1));
    rig.engine.toggle_play_pause();
    assert_eq!(rig.engine.status(), PlaybackStatus::Paused);
    rig.engine.toggle_play_pause();
    assert_eq!(rig.engine.status(), PlaybackStatus::Playing);

    rig.engine.stop();
    rig.engine.toggle_play_pause();
    rig.settle();
    assert_eq!(rig.engine.status(), PlaybackStatus::Playing);
}

#[test]
fn test_resume_only_from_paused() {
    let mut rig = Rig::new();
    rig.engine.resume();
    assert_eq!(rig.engine.status(), PlaybackStatus::Idle);

    rig.play_now(item(1));
    rig.engine.resume();
    assert_eq!(rig.backend.main_device().unwrap().starts, 1);
}

// === Modules / Release ===

#[test]
fn test_disabling_modules_drops_their_state() {
    let mut rig = Rig::new();
    rig.play_now(item(1));
    assert!(rig.engine.add_automation_point("volume", 0, 0.5));
    assert!(rig.engine.set_loop_region(1_000, 2_000));
    assert!(rig.engine.add_bookmark(None).is_some());
    assert!(rig.engine.create_layer(None).is_some());

    rig.engine.disable_module(PlayerModule::Automation);
    assert!(rig.engine.automation().is_empty());
    assert!(!rig.engine.add_automation_point("volume", 0, 0.5));

    rig.engine.disable_module(PlayerModule::Looping);
    assert!(rig.engine.loop_region().is_none());
    assert!(rig.engine.bookmarks().is_empty());

    rig.engine.disable_module(PlayerModule::MultiLayer);
    assert_eq!(rig.engine.layer_count(), 0);
    assert!(rig.engine.create_layer(None).is_none());

    rig.engine.disable_module(PlayerModule::Core);
    assert!(rig.engine.is_module_enabled(PlayerModule::Core));
}

#[test]
fn test_release_stops_everything() {
    let mut rig = Rig::new();
    rig.play_now(item(1));
    let layer = rig.engine.create_layer(Some("pad")).unwrap();

    rig.engine.release();
    assert_eq!(rig.engine.status(), PlaybackStatus::Stopped);
    assert_eq!(rig.engine.layer_count(), 0);
    assert!(rig.backend.layer_device(layer).unwrap().released);
    assert!(rig.backend.main_device().unwrap().released);
    assert!(!rig.engine.is_ticking());
}
