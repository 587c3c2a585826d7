#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::synth::engine::GlideMode;

/// Polyphony mode: one gliding voice or the full pool.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PolyMode {
    /// Single voice with the legato held-note queue.
    Mono,
    /// All eight voices with quietest-voice stealing.
    #[default]
    Poly,
}

/// A complete sound, in musician units.
///
/// The engine itself runs on precomputed coefficients (one-pole multipliers,
/// period scalers, exp-space offsets); this struct is the human-facing side.
/// [`Synth::apply_patch`](crate::synth::Synth::apply_patch) does the
/// conversion, so apply a patch after `allocate_resources` and again any
/// time a field changes - at block boundaries only, like every other
/// control write.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct Patch {
    pub name: String,

    // Amplitude envelope, seconds / sustain fraction 0..1.
    pub amp_attack: f32,
    pub amp_decay: f32,
    pub amp_sustain: f32,
    pub amp_release: f32,

    // Filter envelope, same units, plus its sweep depth (-1..1, negative
    // sweeps the cutoff down).
    pub filter_attack: f32,
    pub filter_decay: f32,
    pub filter_sustain: f32,
    pub filter_release: f32,
    pub filter_env_depth: f32,

    /// Oscillator 2 level, 0..1.
    pub osc_mix: f32,
    /// Oscillator 2 detune in cents, positive = sharp.
    pub osc_detune: f32,
    /// Octave transpose, -2..2.
    pub octave: i32,
    /// Fine tuning in cents, -100..100.
    pub tuning: f32,

    pub glide_mode: GlideMode,
    /// Portamento time in seconds (0 = snap).
    pub glide_time: f32,
    /// Extra pitch offset in semitones that every new note slides in from.
    pub glide_bend: f32,

    /// White noise level, 0..1.
    pub noise_level: f32,

    /// Vibrato depth, 0..1.
    pub vibrato_depth: f32,
    /// Pulse-width modulation depth, 0..1. Only audible with
    /// `vibrato_depth` at zero (the oscillators can carry one or the other).
    pub pwm_depth: f32,
    /// Shared vibrato/PWM/filter LFO rate in Hz.
    pub lfo_rate: f32,

    /// How much velocity opens the filter, 0..1.
    pub velocity_sensitivity: f32,
    /// Play every note at a fixed velocity of 80.
    pub ignore_velocity: bool,

    /// Filter cutoff bias, 0..1 (0.1875 is neutral; above that brightens).
    pub filter_cutoff: f32,
    /// Filter resonance, 0..1.
    pub filter_resonance: f32,
    /// LFO depth on the filter cutoff, 0..1.
    pub filter_lfo_depth: f32,

    /// Master output level in dB.
    pub output_level: f32,

    pub poly_mode: PolyMode,
}

impl Default for Patch {
    fn default() -> Self {
        Self {
            name: "Init".to_string(),

            amp_attack: 0.005,
            amp_decay: 0.2,
            amp_sustain: 0.8,
            amp_release: 0.15,

            filter_attack: 0.005,
            filter_decay: 0.3,
            filter_sustain: 0.4,
            filter_release: 0.2,
            filter_env_depth: 0.5,

            osc_mix: 0.0,
            osc_detune: 0.0,
            octave: 0,
            tuning: 0.0,

            glide_mode: GlideMode::Off,
            glide_time: 0.0,
            glide_bend: 0.0,

            noise_level: 0.0,

            vibrato_depth: 0.0,
            pwm_depth: 0.0,
            lfo_rate: 5.0,

            velocity_sensitivity: 0.5,
            ignore_velocity: false,

            filter_cutoff: 0.4,
            filter_resonance: 0.15,
            filter_lfo_depth: 0.0,

            output_level: -6.0,

            poly_mode: PolyMode::Poly,
        }
    }
}

impl Patch {
    /// Detuned two-oscillator pad with a slow filter sweep - exercises most
    /// of the control surface, handy as a demo and in tests.
    pub fn super_saw() -> Self {
        Self {
            name: "Super Saw".to_string(),
            amp_attack: 0.05,
            amp_release: 0.5,
            osc_mix: 0.8,
            osc_detune: 12.0,
            filter_cutoff: 0.5,
            filter_resonance: 0.3,
            filter_env_depth: 0.6,
            vibrato_depth: 0.3,
            ..Self::default()
        }
    }

    /// Monophonic gliding bass.
    pub fn glide_bass() -> Self {
        Self {
            name: "Glide Bass".to_string(),
            amp_decay: 0.3,
            amp_sustain: 0.6,
            filter_cutoff: 0.3,
            filter_resonance: 0.45,
            glide_mode: GlideMode::Legato,
            glide_time: 0.08,
            poly_mode: PolyMode::Mono,
            ..Self::default()
        }
    }
}
