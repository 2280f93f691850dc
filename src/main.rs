//! staffbeat CLI: headless demo player.
//!
//! Usage:
//!   staffbeat [--bpm N] [--waveform NAME] [--bars N] [--config PATH]
//!   staffbeat --write-config PATH
//!   staffbeat --record MS
//!   staffbeat --wav output.wav

use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};
use std::{env, fs, thread};

use anyhow::{Context, Result};
use sb_master::{
    load_config, save_config, slot_of, Controller, Edit, EngineConfig, GridCoord, SymbolKind, BARS,
    SUBDIVISIONS_PER_BAR, TOTAL_POSITIONS,
};

/// Upper bound on a single sleep so the playhead display stays fresh.
const MAX_SLEEP: Duration = Duration::from_millis(10);

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let flag = |name: &str| {
        args.iter()
            .position(|a| a == name)
            .and_then(|i| args.get(i + 1))
            .cloned()
    };

    let mut config = match flag("--config") {
        Some(path) => load_config(Path::new(&path)),
        None => EngineConfig::default(),
    };
    if let Some(bpm) = flag("--bpm") {
        config.bpm = bpm.parse().with_context(|| format!("invalid --bpm value {:?}", bpm))?;
    }
    if let Some(waveform) = flag("--waveform") {
        config.waveform = waveform;
    }

    if let Some(path) = flag("--write-config") {
        save_config(&config, Path::new(&path))?;
        println!("Wrote {}", path);
        return Ok(());
    }

    let bars: u8 = match flag("--bars") {
        Some(n) => n.parse().with_context(|| format!("invalid --bars value {:?}", n))?,
        None => 4,
    };
    let bars = bars.clamp(1, BARS);

    let mut ctrl = Controller::new(config);
    match ctrl.audio_backend() {
        Some(name) => println!("Audio:    {}", name),
        None => println!("Audio:    {}", ctrl.audio_notice().unwrap_or("none")),
    }
    println!("Tempo:    {} BPM", ctrl.bpm());
    println!("Waveform: {}", ctrl.waveform());
    println!("Lanes:    {}", ctrl.lane_map().iter().collect::<Vec<_>>().join(" "));
    println!();

    if let Some(path) = flag("--wav") {
        return write_preview(&ctrl, &path);
    }

    if let Some(ms) = flag("--record") {
        let ms: u64 = ms.parse().with_context(|| format!("invalid --record value {:?}", ms))?;
        record(&mut ctrl, Duration::from_millis(ms))?;
    }

    let edits = demo_pattern(bars);
    log::info!("demo pattern: {} symbols over {} bars", edits.len(), bars);
    for edit in &edits {
        ctrl.apply(edit)?;
    }
    play(&mut ctrl, bars);
    Ok(())
}

/// A rising figure per bar: full, half, combo, then a rest. Every other bar
/// leaves its downbeat empty so the accent click is heard.
fn demo_pattern(bars: u8) -> Vec<Edit> {
    let mut edits = Vec::new();
    for bar in 0..bars {
        let root = bar % 4;
        let figure = [
            (0, root, SymbolKind::Full),
            (1, root + 2, SymbolKind::Half),
            (2, root + 4, SymbolKind::Combo),
            (3, root, SymbolKind::Rest),
        ];
        for (subdivision, lane, kind) in figure {
            if bar % 2 == 1 && subdivision == 0 {
                continue;
            }
            if let Ok(coord) = GridCoord::new(bar, subdivision, lane) {
                edits.push(Edit::Place { coord, kind });
            }
        }
    }
    edits
}

fn play(ctrl: &mut Controller, bars: u8) {
    let total_ticks = bars as u64 * SUBDIVISIONS_PER_BAR as u64;
    ctrl.play();
    println!("Playing {} bars...", bars);
    println!();

    while ctrl.ticks() < total_ticks {
        let now = Instant::now();
        let before = ctrl.ticks();
        ctrl.pump(now);
        if ctrl.ticks() != before {
            let (bar, beat) = slot_of(ctrl.current_position() + TOTAL_POSITIONS - 1);
            print!("\rBar {:02} | Beat {}", bar + 1, beat + 1);
            let _ = std::io::stdout().flush();
        }
        let wait = ctrl.time_until_next_tick(now).unwrap_or(MAX_SLEEP);
        thread::sleep(wait.min(MAX_SLEEP));
    }

    ctrl.stop();
    // Let the last note ring out before the process exits
    thread::sleep(Duration::from_secs_f32(60.0 / ctrl.bpm()));
    println!("\rDone.              ");
}

fn write_preview(ctrl: &Controller, path: &str) -> Result<()> {
    println!("Rendering lane 4 preview to {}...", path);
    let wav = ctrl.render_preview(4);
    fs::write(path, &wav).with_context(|| format!("Failed to write {}", path))?;
    println!("Wrote {} bytes", wav.len());
    Ok(())
}

fn record(ctrl: &mut Controller, duration: Duration) -> Result<()> {
    println!("Recording {} ms...", duration.as_millis());
    ctrl.record_microphone(duration)?.wait()?;
    println!("Captured sample ready; notes will use it instead of the synthesizer.");
    ctrl.play_captured_sample();
    Ok(())
}
