//! polyblit - demo player
//!
//! Run with: cargo run
//!
//! Plays a short progression through the engine into the default audio
//! output: detuned pad chords, then a bass line on the same patch.

#[cfg(feature = "rtrb")]
fn main() -> color_eyre::eyre::Result<()> {
    player::run()
}

#[cfg(not(feature = "rtrb"))]
fn main() {
    eprintln!("The demo player needs the message queue; build with the default `rtrb` feature.");
}

#[cfg(feature = "rtrb")]
mod player {
    use std::time::Duration;

    use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use rtrb::RingBuffer;

    use polyblit::patch::Patch;
    use polyblit::synth::{message, Synth, SynthMessage};
    use polyblit::MAX_BLOCK_SIZE;

    pub fn run() -> EyreResult<()> {
        color_eyre::install()?;

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| eyre!("no default output device available"))?;
        let config = device
            .default_output_config()
            .wrap_err("failed to fetch default output config")?;

        let sample_rate = config.sample_rate().0 as f32;
        let channels = config.channels() as usize;

        println!("=== polyblit ===");
        println!("Sample rate: {} Hz", sample_rate);
        println!("Channels: {}", channels);
        println!();

        let (mut tx, mut rx) = RingBuffer::<SynthMessage>::new(256);

        let mut synth = Synth::new();
        synth.allocate_resources(sample_rate, MAX_BLOCK_SIZE);
        synth.apply_patch(&Patch::super_saw());
        synth.reset();

        let mut left = vec![0.0f32; MAX_BLOCK_SIZE];
        let mut right = vec![0.0f32; MAX_BLOCK_SIZE];

        let stream = device.build_output_stream(
            &config.into(),
            move |data: &mut [f32], _| {
                // Queued messages land at block boundaries only; the engine
                // assumes stable control state within a render call.
                message::drain(&mut rx, &mut synth);

                let total_frames = data.len() / channels;
                let mut frames_written = 0;

                while frames_written < total_frames {
                    let frames = (total_frames - frames_written).min(MAX_BLOCK_SIZE);

                    let out_off = frames_written * channels;
                    if channels == 1 {
                        let block = &mut left[..frames];
                        synth.render(block, None);
                        data[out_off..out_off + frames].copy_from_slice(block);
                    } else {
                        let (l, r) = (&mut left[..frames], &mut right[..frames]);
                        synth.render(l, Some(r));

                        for i in 0..frames {
                            for ch in 0..channels {
                                // Stereo pair into channels 0/1, anything
                                // beyond mirrors the pair.
                                let sample = if ch % 2 == 0 { l[i] } else { r[i] };
                                data[out_off + i * channels + ch] = sample;
                            }
                        }
                    }

                    frames_written += frames;
                }
            },
            |err| eprintln!("Audio error: {}", err),
            None,
        )?;
        stream.play()?;

        println!("Playing pad chords (Super Saw)...");
        let chords: [&[u8]; 4] = [
            &[48, 60, 64, 67],
            &[45, 57, 60, 64],
            &[41, 53, 57, 60],
            &[43, 55, 59, 62],
        ];
        for chord in chords {
            for &note in chord {
                let _ = tx.push(SynthMessage::NoteOn { note, velocity: 96 });
            }
            std::thread::sleep(Duration::from_millis(900));
            for &note in chord {
                let _ = tx.push(SynthMessage::NoteOff { note, velocity: 0 });
            }
            std::thread::sleep(Duration::from_millis(100));
        }

        let _ = tx.push(SynthMessage::AllNotesOff);
        std::thread::sleep(Duration::from_millis(400));

        println!("Playing bass line...");
        let line: [u8; 8] = [36, 36, 43, 41, 36, 36, 46, 43];
        for note in line {
            let _ = tx.push(SynthMessage::NoteOn { note, velocity: 110 });
            std::thread::sleep(Duration::from_millis(230));
            let _ = tx.push(SynthMessage::NoteOff { note, velocity: 0 });
            std::thread::sleep(Duration::from_millis(20));
        }

        // Let the release tails ring out before tearing the stream down.
        std::thread::sleep(Duration::from_millis(1000));
        println!("Done.");
        Ok(())
    }
}
