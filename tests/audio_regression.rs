//! Whole-engine render regressions: the output must always be finite,
//! bounded, and silent exactly when it should be.

use polyblit::patch::Patch;
use polyblit::synth::Synth;

fn make_synth(patch: &Patch) -> Synth {
    let mut synth = Synth::new();
    synth.allocate_resources(48_000.0, 512);
    synth.apply_patch(patch);
    synth.reset();
    synth
}

fn peak(buffers: &[&[f32]]) -> f32 {
    buffers
        .iter()
        .flat_map(|b| b.iter())
        .fold(0.0f32, |acc, &x| acc.max(x.abs()))
}

#[test]
fn chord_renders_finite_bounded_audio() {
    let mut synth = make_synth(&Patch::super_saw());

    for note in [48, 60, 64, 67] {
        synth.midi_message(0x90, note, 100);
    }

    let mut left = vec![0.0; 4_800];
    let mut right = vec![0.0; 4_800];
    let mut energy = 0.0f64;

    for _ in 0..10 {
        synth.render(&mut left, Some(&mut right));
        for &s in left.iter().chain(right.iter()) {
            assert!(s.is_finite(), "engine output must be finite");
            assert!(s.abs() <= 1.0, "engine output must be scrub-bounded, got {}", s);
            energy += f64::from(s * s);
        }
    }

    assert!(energy > 1.0, "a four-note chord should carry real energy");
}

#[test]
fn sustained_note_does_not_fade_out() {
    let mut synth = make_synth(&Patch::default());
    synth.midi_message(0x90, 60, 100);

    let mut left = vec![0.0; 4_800];
    let mut right = vec![0.0; 4_800];
    for _ in 0..10 {
        synth.render(&mut left, Some(&mut right));
    }

    // One second in, the envelope sits at its sustain level.
    assert!(
        peak(&[&left, &right]) > 0.01,
        "sustained note should still be sounding after a second"
    );
}

#[test]
fn released_note_decays_to_true_silence() {
    let mut synth = make_synth(&Patch::default());
    synth.midi_message(0x90, 60, 100);

    let mut left = vec![0.0; 4_800];
    let mut right = vec![0.0; 4_800];
    synth.render(&mut left, Some(&mut right));

    synth.midi_message(0x80, 60, 0);
    for _ in 0..30 {
        synth.render(&mut left, Some(&mut right));
    }

    assert_eq!(synth.active_voice_count(), 0, "voice should be reclaimed");
    assert_eq!(
        peak(&[&left, &right]),
        0.0,
        "a fully released engine must output exact silence"
    );
}

#[test]
fn reset_cuts_everything_off() {
    let mut synth = make_synth(&Patch::super_saw());
    for note in [48, 60, 64, 67] {
        synth.midi_message(0x90, note, 100);
    }

    let mut left = vec![0.0; 2_048];
    let mut right = vec![0.0; 2_048];
    synth.render(&mut left, Some(&mut right));
    assert!(peak(&[&left, &right]) > 0.0);

    synth.reset();
    synth.render(&mut left, Some(&mut right));
    assert_eq!(peak(&[&left, &right]), 0.0, "reset engine must be silent");
}

#[test]
fn repeated_notes_stay_stable() {
    // Hammering one key reuses voices through every lifecycle path; nothing
    // may accumulate (filter state, saw offset, envelope residue).
    let mut synth = make_synth(&Patch::glide_bass());

    let mut left = vec![0.0; 1_024];
    let mut right = vec![0.0; 1_024];
    let mut worst = 0.0f32;

    for _ in 0..50 {
        synth.midi_message(0x90, 36, 127);
        synth.render(&mut left, Some(&mut right));
        synth.midi_message(0x80, 36, 0);
        synth.render(&mut left, Some(&mut right));
        worst = worst.max(peak(&[&left, &right]));
    }

    assert!(worst > 0.0);
    assert!(worst <= 1.0, "repeated notes must stay bounded, got {}", worst);
}

#[test]
fn every_midi_status_is_safe() {
    // Decoder fuzz: any 3-byte message, sensible or not, must leave the
    // engine in a state that still renders clean audio.
    let mut synth = make_synth(&Patch::default());

    let mut seed = 0x12345678u32;
    let mut next = || {
        seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        (seed >> 24) as u8
    };

    let mut left = vec![0.0; 256];
    let mut right = vec![0.0; 256];
    for _ in 0..2_000 {
        synth.midi_message(next(), next() & 0x7F, next() & 0x7F);
        synth.render(&mut left, Some(&mut right));
        for &s in left.iter().chain(right.iter()) {
            assert!(s.is_finite());
            assert!(s.abs() <= 1.0);
        }
    }
}
