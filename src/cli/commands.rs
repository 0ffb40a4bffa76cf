//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use chrono::Timelike;
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{info, warn};

use super::SimulateArgs;
use crate::config::EngineConfig;
use crate::device::output::DeviceTarget;
use crate::device::sim::SimBackend;
use crate::engine::{EngineEvent, PlaybackEngine, PlaybackStatus};
use crate::error::Result;
use crate::fx::{suggest_mode, ListeningMode, OutputProfile, OutputType};
use crate::media::MediaItem;

/// Run a scripted session on simulated devices, advancing simulated time
/// one tick at a time.
pub fn simulate(args: &SimulateArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => {
            info!("Loading config: {}", path.display());
            EngineConfig::from_file(path)?
        }
        None => EngineConfig::default(),
    };

    let backend = SimBackend::new();
    backend.set_duration(args.item_seconds * 1000);
    let mut engine = PlaybackEngine::new(config, backend.collaborators())?;
    let mut events = engine.subscribe();

    engine.set_repeat_mode(args.repeat.into());
    if args.shuffle {
        engine.set_shuffle(true);
    }
    if let Some(mode) = args.mode {
        engine.set_listening_mode(mode);
    }
    if let Some(fade_ms) = args.fade_in_ms {
        engine.automation_mut().create_fade_in("volume", 0, fade_ms);
    }
    for i in 0..args.layers {
        match engine.create_layer(None) {
            Some(id) => {
                engine.load_layer_media(id, &format!("sim://layer/{}", i + 1));
            }
            None => warn!("Could not create layer {}", i + 1),
        }
    }

    engine.play_playlist(playlist_from(&args.items), 0);
    engine.process_pending_inputs();
    if let Some((start, end)) = args.loop_region {
        if !engine.set_loop_region(start, end) {
            warn!("Ignoring loop region {}..{}", start, end);
        }
    }
    if args.layers > 0 {
        let started = engine.play_all_layers();
        println!("Started {} layer(s)", started);
    }

    let tick_ms = engine.config().tick_interval_ms.max(1);
    let total_ms = args.seconds * 1000;
    let mut elapsed = 0;
    let mut last_status = None;
    while elapsed < total_ms {
        backend.advance(tick_ms);
        elapsed += tick_ms;

        if let Some(device) = backend.main_device() {
            if device.playing && device.duration_ms > 0 && device.position_ms >= device.duration_ms {
                backend.complete(DeviceTarget::Main);
            }
        }
        if let Some(output) = args.switch_output {
            if elapsed == (total_ms / 2 / tick_ms) * tick_ms {
                backend.change_output(output);
            }
        }

        engine.tick();
        report(&mut events, elapsed, &mut last_status);
    }

    let state = engine.state().clone();
    let fx = engine.fx_state().clone();
    let layers = engine.layers();
    engine.release();
    report(&mut events, elapsed, &mut last_status);

    if args.json {
        let summary = json!({
            "state": state,
            "fx": fx,
            "layers": layers,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!();
        println!("Final status: {}", state.status);
        println!("Position: {}ms / {}ms", state.position_ms, state.duration_ms);
        println!("Volume: {:.2}", state.volume);
        println!(
            "FX: bass {} virt {} loudness {}mB",
            fx.bass_boost, fx.virtualizer, fx.loudness_gain_mb
        );
        println!("Layers: {}", layers.len());
    }
    Ok(())
}

fn playlist_from(uris: &[String]) -> Vec<MediaItem> {
    if uris.is_empty() {
        return (1..=3)
            .map(|i| MediaItem::new(format!("demo-{}", i), format!("sim://demo/{}", i), format!("Demo {}", i)))
            .collect();
    }
    uris.iter()
        .map(|uri| {
            let title = uri.rsplit('/').next().unwrap_or(uri).to_string();
            MediaItem::new(uri.clone(), uri.clone(), title)
        })
        .collect()
}

/// Print the interesting events received since the last call
fn report(
    events: &mut broadcast::Receiver<EngineEvent>,
    at_ms: u64,
    last_status: &mut Option<PlaybackStatus>,
) {
    let at = at_ms as f64 / 1000.0;
    loop {
        let event = match events.try_recv() {
            Ok(event) => event,
            Err(broadcast::error::TryRecvError::Lagged(n)) => {
                warn!("Missed {} events", n);
                continue;
            }
            Err(_) => return,
        };
        match event {
            EngineEvent::PlaybackStateChanged(state) => {
                if *last_status != Some(state.status) {
                    println!("[{:>6.1}s] {}", at, state.status);
                    *last_status = Some(state.status);
                }
            }
            EngineEvent::MediaChanged(Some(item)) => {
                println!("[{:>6.1}s] now playing: {}", at, item.title)
            }
            EngineEvent::Error { kind, message } => {
                println!("[{:>6.1}s] error ({:?}): {}", at, kind, message)
            }
            EngineEvent::OutputChanged(output) => println!("[{:>6.1}s] output: {}", at, output),
            EngineEvent::ListeningModeChanged(mode) => {
                println!("[{:>6.1}s] listening mode: {}", at, mode)
            }
            EngineEvent::LoopChanged(Some(region)) => println!(
                "[{:>6.1}s] loop {}..{}ms",
                at, region.start_ms, region.end_ms
            ),
            _ => {}
        }
    }
}

/// List the listening modes.
pub fn list_modes(json_output: bool) -> Result<()> {
    if json_output {
        let modes: Vec<_> = ListeningMode::ALL
            .into_iter()
            .map(|mode| json!({ "mode": mode, "settings": mode.builtin() }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&modes)?);
        return Ok(());
    }

    println!("{:<14} {:>6} {:>6} {:>8}  {:<12} Description", "Mode", "Bass", "Virt", "Loud", "EQ");
    for mode in ListeningMode::ALL {
        let s = mode.builtin();
        println!(
            "{:<14} {:>6} {:>6} {:>8}  {:<12} {}",
            mode.key(),
            s.bass_boost,
            s.virtualizer,
            s.loudness_gain,
            s.eq_preset,
            s.description
        );
    }
    Ok(())
}

/// List the built-in output profiles.
pub fn list_profiles(json_output: bool) -> Result<()> {
    let profiles: Vec<_> = OutputType::ALL
        .into_iter()
        .map(OutputProfile::builtin)
        .collect();
    if json_output {
        println!("{}", serde_json::to_string_pretty(&profiles)?);
        return Ok(());
    }

    println!("{:<12} {:<4} {:>6} {:>6} {:>8}", "Output", "EQ", "Bass", "Virt", "Loud");
    for p in profiles {
        println!(
            "{:<12} {:<4} {:>6} {:>6} {:>8}",
            p.output_type.key(),
            if p.eq_enabled { "on" } else { "off" },
            p.bass_boost,
            p.virtualizer,
            p.loudness_gain
        );
    }
    Ok(())
}

/// Print the suggested mode for a listening context.
pub fn suggest(output: OutputType, hour: Option<u32>, in_car: bool) -> Result<()> {
    let hour = hour.unwrap_or_else(|| chrono::Local::now().hour()) % 24;
    let mode = suggest_mode(output, in_car, hour);
    info!("Suggestion for {} at {}:00 (car: {})", output, hour, in_car);
    println!("{} ({})", mode, mode.builtin().description);
    Ok(())
}
