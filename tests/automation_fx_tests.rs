//! Automation and Effects Tests
//!
//! Automation routing on tick, listening modes, output profiles and the
//! effect surface lifecycle.

mod common;

use common::{item, Rig};
use mixdeck::automation::Interpolation;
use mixdeck::device::sim::{SimBackend, SimFxFeature};
use mixdeck::device::output::DeviceTarget;
use mixdeck::engine::EngineEvent;
use mixdeck::fx::{suggest_mode, ListeningMode, OutputProfile, OutputType};
use mixdeck::{EngineConfig, PlayerModule};
use approx::assert_relative_eq;
use test_case::test_case;

// === Automation ===

#[test]
fn test_linear_interpolation_between_points() {
    let mut rig = Rig::new();
    rig.engine.add_automation_point("bass_boost", 1_000, 0.0);
    rig.engine.add_automation_point("bass_boost", 2_000, 100.0);

    let automation = rig.engine.automation();
    assert_relative_eq!(automation.value_at("bass_boost", 1_500).unwrap(), 50.0);
    assert_relative_eq!(automation.value_at("bass_boost", 0).unwrap(), 0.0);
    assert_relative_eq!(automation.value_at("bass_boost", 9_000).unwrap(), 100.0);
    assert!(automation.value_at("virtualizer", 1_500).is_none());

    // Every sample between the points stays inside their value range
    for t in (1_000..=2_000).step_by(50) {
        let v = automation.value_at("bass_boost", t).unwrap();
        assert!((0.0..=100.0).contains(&v), "{} at {}", v, t);
    }
}

#[test]
fn test_step_interpolation() {
    let mut rig = Rig::new();
    rig.engine.add_automation_point("loudness", 0, 0.0);
    rig.engine.add_automation_point("loudness", 1_000, 600.0);
    rig.engine
        .set_automation_interpolation("loudness", Interpolation::Step);
    let automation = rig.engine.automation();
    assert_relative_eq!(automation.value_at("loudness", 400).unwrap(), 0.0);
    assert_relative_eq!(automation.value_at("loudness", 600).unwrap(), 600.0);
}

#[test]
fn test_bass_boost_routed_on_tick() {
    let mut rig = Rig::new();
    rig.engine.add_automation_point("bass_boost", 0, 0.0);
    rig.engine.add_automation_point("bass_boost", 10_000, 1_000.0);
    rig.play_now(item(1));
    rig.drain_events();

    rig.advance(5_000);
    assert_eq!(rig.engine.fx_state().bass_boost.permille(), 500);
    assert!(rig.engine.fx_state().bass_boost_enabled);
    assert_eq!(rig.backend.fx_state().bass_boost, (true, 500));
    assert!(rig
        .drain_events()
        .iter()
        .any(|e| matches!(e, EngineEvent::FxStateChanged(_))));
}

#[test]
fn test_volume_routed_on_tick() {
    let mut rig = Rig::new();
    rig.engine.add_automation_point("volume", 0, 0.0);
    rig.engine.add_automation_point("volume", 10_000, 1.0);
    rig.play_now(item(1));
    assert_eq!(rig.backend.main_device().unwrap().volume, (0.0, 0.0));

    rig.advance(5_000);
    assert_relative_eq!(rig.engine.state().volume, 0.5, epsilon = 1e-6);
    let (l, r) = rig.backend.main_device().unwrap().volume;
    assert_relative_eq!(l, 0.5, epsilon = 1e-6);
    assert_relative_eq!(r, 0.5, epsilon = 1e-6);
}

#[test]
fn test_unrouted_parameter_is_ignored() {
    let mut rig = Rig::new();
    rig.engine.add_automation_point("tempo", 0, 10.0);
    rig.engine.add_automation_point("tempo", 10_000, 500.0);
    rig.play_now(item(1));
    let before = rig.engine.fx_state().clone();
    let volume = rig.engine.state().volume;

    rig.advance(5_000);
    assert_eq!(rig.engine.fx_state(), &before);
    assert_relative_eq!(rig.engine.state().volume, volume);
    assert!(rig.engine.automation().has_automation("tempo"));
}

#[test]
fn test_fx_automation_needs_fx_module() {
    let mut rig = Rig::new();
    rig.engine.disable_module(PlayerModule::Fx);
    rig.engine.add_automation_point("bass_boost", 0, 900.0);
    rig.play_now(item(1));
    rig.advance(1_000);
    assert_eq!(rig.engine.fx_state().bass_boost.permille(), 500);
}

#[test]
fn test_automation_follows_loop_wrap() {
    let mut rig = Rig::new();
    rig.engine.add_automation_point("volume", 1_000, 0.2);
    rig.engine.add_automation_point("volume", 4_000, 0.8);
    rig.play_now(item(1));
    assert!(rig.engine.set_loop_region(1_000, 3_000));

    rig.advance(3_500);
    assert_eq!(rig.engine.state().position_ms, 1_000);
    assert_eq!(rig.backend.main_device().unwrap().seeks.last(), Some(&1_000));
    assert_relative_eq!(rig.engine.state().volume, 0.2, epsilon = 1e-6);
}

#[test]
fn test_loop_not_enforced_before_end() {
    let mut rig = Rig::new();
    rig.play_now(item(1));
    rig.engine.set_loop_region(1_000, 3_000);

    rig.advance(2_999);
    assert_eq!(rig.engine.state().position_ms, 2_999);
    assert!(rig.backend.main_device().unwrap().seeks.is_empty());

    rig.advance(1);
    assert_eq!(rig.engine.state().position_ms, 1_000);
}

// === Effect Surface ===

#[test]
fn test_fx_bound_on_prepare_with_profile() {
    let mut rig = Rig::new();
    rig.play_now(item(1));
    let fx = rig.backend.fx_state();
    assert_eq!(fx.binds, 1);
    assert_eq!(fx.session_id, Some(1));
    assert_eq!(fx.bass_boost, (true, 500));
    assert_eq!(fx.loudness, (true, 300));
    assert_eq!(fx.virtualizer, (false, 0));
    assert!(fx.eq_enabled);
}

#[test]
fn test_unsupported_effect_keeps_state() {
    let backend = SimBackend::new();
    backend.mark_fx_unsupported(SimFxFeature::Virtualizer);
    let mut rig = Rig::with_backend(backend, EngineConfig::default());
    rig.play_now(item(1));

    assert!(!rig.engine.set_virtualizer(700));
    assert_eq!(rig.engine.fx_state().virtualizer.permille(), 0);
    assert!(rig.engine.set_bass_boost(700));
    assert_eq!(rig.backend.fx_state().bass_boost, (true, 700));
}

#[test]
fn test_effect_enable_rules() {
    let mut rig = Rig::new();
    rig.play_now(item(1));

    assert!(rig.engine.set_bass_boost(0));
    assert!(!rig.engine.fx_state().bass_boost_enabled);
    assert!(rig.engine.set_loudness_gain(-400));
    assert!(rig.engine.fx_state().loudness_enabled);
    assert!(rig.engine.set_reverb_preset(3));
    assert_eq!(rig.backend.fx_state().reverb, (true, 3));
    assert!(rig.engine.set_reverb_preset(0));
    assert!(!rig.engine.fx_state().reverb_enabled);
}

#[test]
fn test_equalizer_bands() {
    let mut rig = Rig::new();
    rig.play_now(item(1));
    assert!(rig.engine.set_eq_band_level(2, 500));
    assert_eq!(rig.backend.fx_state().eq_band_levels[2], 500);
    assert!(!rig.engine.set_eq_band_level(42, 500));

    rig.engine.disable_module(PlayerModule::Equalizer);
    assert!(!rig.engine.fx_state().eq_enabled);
    assert!(!rig.engine.set_eq_band_level(1, 100));
}

#[test]
fn test_fx_released_on_stop() {
    let mut rig = Rig::new();
    rig.play_now(item(1));
    rig.engine.stop();
    let fx = rig.backend.fx_state();
    assert_eq!(fx.released, 1);
    assert_eq!(fx.session_id, None);
}

#[test]
fn test_fx_disabled_blocks_commands() {
    let mut rig = Rig::new();
    rig.engine.disable_module(PlayerModule::Fx);
    rig.play_now(item(1));
    assert_eq!(rig.backend.fx_state().binds, 0);
    assert!(!rig.engine.set_bass_boost(300));
}

// === Listening Modes ===

#[test]
fn test_listening_mode_applies_settings() {
    let mut rig = Rig::new();
    rig.play_now(item(1));
    rig.drain_events();

    rig.engine.set_listening_mode(ListeningMode::Workout);
    assert_eq!(rig.engine.listening_mode(), ListeningMode::Workout);
    let fx = rig.engine.fx_state();
    assert_eq!(fx.bass_boost.permille(), 800);
    assert_eq!(fx.virtualizer.permille(), 600);
    assert_eq!(fx.loudness_gain_mb, 800);
    assert_eq!(rig.backend.fx_state().bass_boost, (true, 800));
    assert!(rig
        .drain_events()
        .contains(&EngineEvent::ListeningModeChanged(ListeningMode::Workout)));
}

#[test]
fn test_low_latency_bypasses_everything() {
    let mut rig = Rig::new();
    rig.play_now(item(1));
    rig.engine.set_listening_mode(ListeningMode::Workout);
    rig.engine.set_listening_mode(ListeningMode::LowLatency);

    let fx = rig.engine.fx_state();
    assert!(!fx.eq_enabled);
    assert!(!fx.bass_boost_enabled);
    assert!(!fx.virtualizer_enabled);
    assert!(!fx.loudness_enabled);
    assert!(!fx.reverb_enabled);
    assert!(!rig.backend.fx_state().bass_boost.0);
}

#[test]
fn test_mode_override_and_reset() {
    let mut rig = Rig::new();
    let mut settings = rig.engine.mode_settings(ListeningMode::Night);
    settings.bass_boost = 100;
    assert!(rig
        .engine
        .update_mode_settings(ListeningMode::Night, settings));
    assert_eq!(rig.engine.mode_settings(ListeningMode::Night).bass_boost, 100);

    rig.engine.set_listening_mode(ListeningMode::Night);
    assert_eq!(rig.engine.fx_state().bass_boost.permille(), 100);

    rig.engine.reset_mode(ListeningMode::Night);
    assert_eq!(rig.engine.mode_settings(ListeningMode::Night).bass_boost, 300);
    assert_eq!(rig.engine.fx_state().bass_boost.permille(), 300);
}

#[test_case(OutputType::Speaker, true, 12, ListeningMode::Car ; "car wins")]
#[test_case(OutputType::Headphones, false, 23, ListeningMode::Night ; "late night")]
#[test_case(OutputType::Speaker, false, 3, ListeningMode::Night ; "early morning")]
#[test_case(OutputType::Headphones, false, 14, ListeningMode::Focus ; "headphones")]
#[test_case(OutputType::Speaker, false, 7, ListeningMode::Normal ; "daytime speaker")]
fn test_mode_suggestion(output: OutputType, in_car: bool, hour: u32, expected: ListeningMode) {
    assert_eq!(suggest_mode(output, in_car, hour), expected);
}

// === Output Routing ===

#[test]
fn test_output_change_reapplies_profile() {
    let mut rig = Rig::new();
    rig.play_now(item(1));
    rig.drain_events();

    rig.backend.change_output(OutputType::Headphones);
    rig.settle();
    assert_eq!(rig.engine.output(), OutputType::Headphones);
    let fx = rig.engine.fx_state();
    assert_eq!(fx.bass_boost.permille(), 200);
    assert_eq!(fx.virtualizer.permille(), 400);
    assert_eq!(fx.loudness_gain_mb, 0);
    assert_eq!(rig.backend.fx_state().virtualizer, (true, 400));
    assert!(rig
        .drain_events()
        .contains(&EngineEvent::OutputChanged(OutputType::Headphones)));
}

#[test]
fn test_same_output_still_reapplies() {
    let mut rig = Rig::new();
    rig.play_now(item(1));
    rig.engine.set_bass_boost(900);

    rig.backend.change_output(OutputType::Speaker);
    rig.settle();
    assert_eq!(rig.engine.fx_state().bass_boost.permille(), 500);
}

#[test]
fn test_user_profile_takes_precedence() {
    let mut rig = Rig::new();
    let profile = OutputProfile {
        bass_boost: 900,
        virtualizer: 100,
        ..OutputProfile::builtin(OutputType::Headphones)
    };
    assert!(rig
        .engine
        .set_output_profile(OutputType::Headphones, profile));
    assert!(rig.engine.has_user_profile(OutputType::Headphones));

    rig.backend.change_output(OutputType::Headphones);
    rig.settle();
    assert_eq!(rig.engine.fx_state().bass_boost.permille(), 900);

    rig.engine.clear_output_profile(OutputType::Headphones);
    assert!(!rig.engine.has_user_profile(OutputType::Headphones));
    assert_eq!(rig.engine.fx_state().bass_boost.permille(), 200);
}

#[test]
fn test_profile_applied_at_construction() {
    let rig = Rig::new();
    let fx = rig.engine.fx_state();
    assert!(fx.eq_enabled);
    assert_eq!(fx.bass_boost.permille(), 500);
    assert_eq!(fx.loudness_gain_mb, 300);
}

#[test]
fn test_auto_listening_mode_in_car() {
    let backend = SimBackend::new();
    backend.set_in_car(true);
    let config = EngineConfig {
        auto_listening_mode: true,
        ..EngineConfig::default()
    };
    let mut rig = Rig::with_backend(backend, config);

    rig.backend.change_output(OutputType::Bluetooth);
    rig.settle();
    assert_eq!(rig.engine.listening_mode(), ListeningMode::Car);
    assert_eq!(rig.engine.fx_state().bass_boost.permille(), 600);
}

#[test]
fn test_routing_disabled_keeps_settings() {
    let mut rig = Rig::new();
    rig.engine.disable_module(PlayerModule::OutputRouting);
    rig.engine.set_bass_boost(50);

    rig.backend.change_output(OutputType::Headphones);
    rig.settle();
    assert_eq!(rig.engine.output(), OutputType::Headphones);
    assert_eq!(rig.engine.fx_state().bass_boost.permille(), 50);
}

#[test]
fn test_layer_devices_do_not_bind_fx() {
    let mut rig = Rig::new();
    let id = rig.engine.create_layer(None).unwrap();
    rig.engine.load_layer_media(id, "sim://layer/1");
    rig.settle();
    assert_eq!(rig.backend.fx_state().binds, 0);
    assert!(rig.backend.layer_device(id).is_some());
    assert!(rig.backend.devices().iter().all(|d| d.target != DeviceTarget::Main));
}
