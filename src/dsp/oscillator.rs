use std::f32::consts::{FRAC_PI_4, PI};

/*
Bandlimited Impulse Train (BLIT) Oscillator
===========================================

This is the crate's only audio-rate sound source. It produces a train of
impulses - one narrow spike per cycle - whose spectrum is flat up to a cutoff
just below Nyquist and empty above it. Integrate that train (the voice layer
does, with a leaky integrator) and you get a sawtooth with no aliasing.
Subtract two phase-offset trains before integrating and you get a square wave
with a controllable pulse width.

Vocabulary
----------

  period      Length of one cycle in samples. A 440 Hz tone at 48 kHz has a
              period of 48000 / 440 = 109.09 samples. The engine keeps this
              at 6.0 or above; below that the cycle bookkeeping breaks down.

  impulse     Not a single-sample spike (that would alias) but a sampled sinc
              pulse: sin(phase) / phase. The sinc is what makes the train
              bandlimited - its spectrum cuts off instead of rolling on
              forever.

  phase       Position inside the current sinc pulse, measured in samples
              times pi. It runs from near 0 out to `phase_max` and is then
              mirrored back down, so each cycle traces the sinc kernel out
              and back.

  modulation  Per-cycle multiplier on `period`. Vibrato wiggles it on
              oscillator 1; pulse-width modulation wiggles it on oscillator 2
              so the two trains drift against each other. Read once per
              cycle, so it is safe to update at control rate.

  resonator   Evaluating sin() per sample is too expensive for 8 voices x 2
              oscillators. A two-term recurrence

                  sin(x + d) = 2cos(d)*sin(x) - sin(x - d)

              produces the running sine from two previous values and one
              multiply. It is reseeded from the real sin()/cos() at every
              cycle start, so rounding error cannot accumulate for more than
              one period.

Cycle bookkeeping
-----------------

At each cycle start the half-period is rounded to an integer-plus-half number
of samples (`floor(0.5 + half_period) - 0.5`). That locks the mirror point
between two sample instants, which keeps the out-and-back phase walk
symmetric. The fractional difference between the true half-period and the
rounded one is absorbed by `phase_inc`, so average pitch stays exact even
though each individual cycle is quantized.

A train of all-positive pulses has a DC component (its time average is not
zero). `dc_offset = 0.5 * amplitude / phase_max` is that average; it is
subtracted from every sample so the downstream leaky integrator is not fed a
constant.
*/

pub struct Oscillator {
    /// Peak amplitude of each impulse.
    pub amplitude: f32,
    /// Samples per cycle. The engine keeps this >= 6.
    pub period: f32,
    /// Per-cycle period multiplier (1.0 = none). Carries vibrato on
    /// oscillator 1 and PWM drift on oscillator 2.
    pub modulation: f32,

    // Position inside the current sinc pulse, in samples * pi.
    phase: f32,
    phase_max: f32,
    phase_inc: f32,

    // Digital sine resonator state.
    sin0: f32,
    sin1: f32,
    dsin: f32,

    dc_offset: f32,
}

impl Oscillator {
    pub fn new() -> Self {
        Self {
            amplitude: 1.0,
            period: 0.0,
            modulation: 1.0,
            phase: 0.0,
            phase_max: 0.0,
            phase_inc: 0.0,
            sin0: 0.0,
            sin1: 0.0,
            dsin: 0.0,
            dc_offset: 0.0,
        }
    }

    /// Clear all phase and resonator state. `amplitude`, `period` and
    /// `modulation` are caller-owned settings and survive a reset.
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.phase_max = 0.0;
        self.phase_inc = 0.0;
        self.sin0 = 0.0;
        self.sin1 = 0.0;
        self.dsin = 0.0;
        self.dc_offset = 0.0;
    }

    /// Phase-lock this oscillator half a period behind `other`, with the
    /// walk direction inverted.
    ///
    /// Used at note start for pulse-width modulation: the difference of the
    /// two impulse trains integrates to a square wave, and their
    /// `modulation` values drifting apart wobbles the pulse width.
    pub fn square_wave(&mut self, other: &Oscillator, period: f32) {
        self.reset();

        if other.phase_inc > 0.0 {
            self.phase = other.phase_max + other.phase_max - other.phase;
            self.phase_inc = -other.phase_inc;
        } else if other.phase_inc < 0.0 {
            self.phase = other.phase;
            self.phase_inc = other.phase_inc;
        } else {
            // `other` has not produced a cycle yet; fall back to a plain
            // half-period offset.
            self.phase = -PI;
            self.phase_inc = PI;
        }

        self.phase += PI * period / 2.0;
        self.phase_max = self.phase;
    }

    /// Produce the next sample of the impulse train.
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let output;
        self.phase += self.phase_inc;

        if self.phase <= FRAC_PI_4 {
            // The previous pulse has been walked out and back; start a new
            // cycle. Period changes (and modulation) take effect here and
            // only here.
            let half_period = 0.5 * self.period * self.modulation;
            self.phase_max = (0.5 + half_period).floor() - 0.5;
            self.dc_offset = 0.5 * self.amplitude / self.phase_max;
            self.phase_max *= PI;

            self.phase_inc = self.phase_max / half_period;
            self.phase = -self.phase;

            // Reseed the resonator from the true sine so error cannot
            // accumulate across cycles.
            self.sin0 = self.amplitude * self.phase.sin();
            self.sin1 = self.amplitude * (self.phase - self.phase_inc).sin();
            self.dsin = 2.0 * self.phase_inc.cos();

            // sin(x)/x -> amplitude as x -> 0; square the phase so a tiny
            // negative value is caught too.
            if self.phase * self.phase > 1e-9 {
                output = self.sin0 / self.phase;
            } else {
                output = self.amplitude;
            }
        } else {
            // Walk the sinc kernel. Past the midpoint, mirror the phase and
            // count back down through the second half of the lobe.
            if self.phase > self.phase_max {
                self.phase = self.phase_max + self.phase_max - self.phase;
                self.phase_inc = -self.phase_inc;
            }

            let sinp = self.dsin * self.sin0 - self.sin1;
            self.sin1 = self.sin0;
            self.sin0 = sinp;
            output = sinp / self.phase;
        }

        output - self.dc_offset
    }
}

impl Default for Oscillator {
    fn default() -> Self {
        Self::new()
    }
}
