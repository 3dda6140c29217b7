//! resonators - play a modal model through the default output device
//!
//! Run with: cargo run -- [MODEL.json [PITCH ...]]
//!
//! One voice per pitch (note names like `c4` or frequencies in Hz). Voices
//! are struck in turn until Ctrl+C.

use std::path::PathBuf;
use std::time::Duration;

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use resonators::model::pitch::Pitch;
use resonators::{Resonators, ResonatorsConfig};

const DEFAULT_MODEL: &str = "models/marimba.json";
const RENDER_BLOCK: usize = 512;
const STRIKE_AMOUNT: f32 = 0.05;
const STRIKE_INTERVAL: Duration = Duration::from_millis(600);

fn parse_pitch(arg: &str) -> Pitch {
    match arg.parse::<f32>() {
        Ok(freq) => Pitch::Frequency(freq),
        Err(_) => Pitch::Note(arg.to_string()),
    }
}

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let model_path = PathBuf::from(args.next().unwrap_or_else(|| DEFAULT_MODEL.to_string()));
    let pitches: Vec<Pitch> = args.map(|a| parse_pitch(&a)).collect();

    // Set up audio
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| eyre!("no default output device available"))?;
    let config = device
        .default_output_config()
        .wrap_err("failed to fetch default output config")?;

    let sample_rate = config.sample_rate().0 as f32;
    let channels = config.channels() as usize;
    let voices = pitches.len().max(1);

    let mut res = Resonators::new(ResonatorsConfig::new(voices, sample_rate, RENDER_BLOCK));
    for voice in 0..voices {
        res.load_voice(voice, model_path.as_path())
            .wrap_err_with(|| format!("failed to load {}", model_path.display()))?;
        if let Some(pitch) = pitches.get(voice) {
            res.set_pitch(voice, pitch.clone())
                .wrap_err_with(|| format!("invalid pitch {}", pitch))?;
        }
    }

    println!("=== Resonators ===");
    println!("Sample rate: {} Hz", sample_rate);
    println!("Channels: {}", channels);
    println!();
    println!("{}", res.model(0)?);
    for voice in 0..voices {
        match res.pitch(voice)? {
            Some(pitch) => println!("  Voice {}: {}", voice, pitch),
            None => println!("  Voice {}: model pitch", voice),
        }
    }
    println!();
    println!("Playing... Press Ctrl+C to stop");

    let (mut control, mut renderer) = res.split();
    let gain = 1.0 / voices as f32;
    let silence = vec![0.0f32; RENDER_BLOCK];
    let mut block = vec![0.0f32; RENDER_BLOCK];

    let stream = device.build_output_stream(
        &config.into(),
        move |data: &mut [f32], _| {
            let total_frames = data.len() / channels;
            let mut frames_written = 0;

            while frames_written < total_frames {
                let frames = (total_frames - frames_written).min(RENDER_BLOCK);
                let out = &mut block[..frames];
                renderer.process_block(&silence[..frames], out);

                // Mono to all channels
                let out_off = frames_written * channels;
                for (i, &s) in out.iter().enumerate() {
                    for ch in 0..channels {
                        data[out_off + i * channels + ch] = s * gain;
                    }
                }
                frames_written += frames;
            }
        },
        |err| eprintln!("Audio error: {}", err),
        None,
    )?;

    stream.play()?;

    let mut voice = 0;
    loop {
        if let Err(e) = control.strike(voice, STRIKE_AMOUNT) {
            eprintln!("strike failed: {}", e);
        }
        control.report_dropped();
        voice = (voice + 1) % voices;
        std::thread::sleep(STRIKE_INTERVAL);
    }
}
