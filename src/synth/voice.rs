use std::f32::consts::FRAC_PI_4;

use crate::dsp::envelope::Envelope;
use crate::dsp::filter::Filter;
use crate::dsp::oscillator::Oscillator;

/// A single playing note: two detuned oscillators, an amplitude envelope, a
/// filter envelope, and a lowpass filter, wired in a fixed chain.
///
/// Voices are plain value slots inside the engine's fixed pool - created once
/// at startup, never reallocated. A voice is reusable as soon as its
/// amplitude envelope has decayed to silence after a render pass.
///
/// Fields are public because the engine writes them directly at note start
/// and at control rate, exactly like patch cables: there is no invariant
/// between them worth hiding behind setters.
pub struct Voice {
    /// 0 = idle, [`SUSTAIN`](crate::synth::SUSTAIN) (-1) = key released while
    /// the pedal is down, 1-127 = sounding MIDI note.
    pub note: i32,

    /// Leaky-integrator state. Accumulates the impulse trains into a
    /// sawtooth-like waveform.
    pub saw: f32,

    pub osc1: Oscillator,
    pub osc2: Oscillator,
    pub env: Envelope,
    pub filter_env: Envelope,
    pub filter: Filter,

    // Portamento: period walks toward target at glide_rate per control tick.
    pub period: f32,
    pub target: f32,
    pub glide_rate: f32,

    // Filter drive, refreshed by the engine at block and control rate.
    pub cutoff: f32,
    pub filter_mod: f32,
    pub filter_q: f32,
    pub filter_env_depth: f32,
    pub pitch_bend: f32,

    pub pan_left: f32,
    pub pan_right: f32,
}

impl Voice {
    pub fn new() -> Self {
        Self {
            note: 0,
            saw: 0.0,
            osc1: Oscillator::new(),
            osc2: Oscillator::new(),
            env: Envelope::new(),
            filter_env: Envelope::new(),
            filter: Filter::new(),
            period: 0.0,
            target: 0.0,
            glide_rate: 0.0,
            cutoff: 0.0,
            filter_mod: 0.0,
            filter_q: 1.0,
            filter_env_depth: 0.0,
            pitch_bend: 1.0,
            pan_left: 0.707,
            pan_right: 0.707,
        }
    }

    /// Clear every piece of per-note state. Settings the engine rewrites at
    /// note start do not need scrubbing; signal state does.
    pub fn reset(&mut self) {
        self.note = 0;
        self.saw = 0.0;
        self.osc1.reset();
        self.osc2.reset();
        self.env.reset();
        self.filter_env.reset();
        self.filter.reset();
        self.period = 0.0;
        self.target = 0.0;
        self.cutoff = 0.0;
        self.filter_mod = 0.0;
        self.pitch_bend = 1.0;
        self.pan_left = 0.707;
        self.pan_right = 0.707;
    }

    /// Start the release segment of both envelopes.
    pub fn release(&mut self) {
        self.env.release();
        self.filter_env.release();
    }

    /// Produce one sample. `noise` is this sample's share of the global
    /// noise source, already scaled by the engine's noise mix.
    #[inline]
    pub fn render(&mut self, noise: f32) -> f32 {
        let sample1 = self.osc1.next_sample();
        let sample2 = self.osc2.next_sample();

        // Leaky integration turns the impulse trains into a sawtooth (or,
        // with osc2 phase-locked, a square). The 0.997 leak is a one-pole
        // highpass that keeps any residual offset from building up.
        self.saw = self.saw * 0.997 + sample1 - sample2;

        let mut output = self.saw + noise;
        output = self.filter.render(output);

        let envelope = self.env.next_value();
        output * envelope
    }

    /// Control-rate update, driven by the engine once every
    /// [`LFO_MAX`](crate::synth::LFO_MAX) samples: advance portamento and the
    /// filter envelope, then rebuild the filter coefficients.
    pub fn update_lfo(&mut self) {
        self.period += self.glide_rate * (self.target - self.period);

        let fenv = self.filter_env.next_value();

        // Cutoff modulation is multiplicative in exp-space so LFO, envelope
        // and pitch bend all add up as octaves rather than raw Hz.
        let mut modulated_cutoff =
            self.cutoff * (self.filter_mod + self.filter_env_depth * fenv).exp() / self.pitch_bend;
        modulated_cutoff = modulated_cutoff.clamp(30.0, 20_000.0);
        self.filter.update_coefficients(modulated_cutoff, self.filter_q);
    }

    /// Derive equal-power pan gains from the note number: low notes lean
    /// left, high notes lean right, +-24 semitones around middle C covering
    /// the full field.
    pub fn update_panning(&mut self) {
        let pan = ((self.note as f32 - 60.0) / 24.0).clamp(-1.0, 1.0);
        self.pan_left = (FRAC_PI_4 * (1.0 - pan)).sin();
        self.pan_right = (FRAC_PI_4 * (1.0 + pan)).sin();
    }
}

impl Default for Voice {
    fn default() -> Self {
        Self::new()
    }
}
