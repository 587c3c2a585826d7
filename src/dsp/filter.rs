use std::f32::consts::PI;

/*
State-variable lowpass, trapezoidal integration ("TPT SVF").

Two integrators in a loop, discretized with the trapezoidal rule so the
topology (and therefore the stability behavior) of the analog circuit is
preserved. Coefficients depend only on cutoff and resonance and are
recomputed at control rate; `render` runs per sample and touches nothing but
the two integrator states.

| symbol        | meaning                                      |
| ------------- | -------------------------------------------- |
| g             | tan(pi * cutoff / sample_rate), warped gain  |
| k             | 1/Q, damping                                 |
| a1, a2, a3    | derived once per coefficient update          |
| ic1eq, ic2eq  | integrator ("capacitor") state               |

Stable for g, k >= 0. The caller clamps cutoff to [30, 20000] Hz and keeps
Q >= 0.5; this module assumes sane inputs and does not re-check them.
*/

pub struct Filter {
    pub sample_rate: f32,

    // Coefficients, valid between update_coefficients() calls.
    g: f32,
    k: f32,
    a1: f32,
    a2: f32,
    a3: f32,

    // Integrator state. Persists sample to sample for as long as a voice
    // owns this filter; must be reset when the voice is freed.
    ic1eq: f32,
    ic2eq: f32,
}

impl Filter {
    pub fn new() -> Self {
        Self {
            sample_rate: 44_100.0,
            g: 0.0,
            k: 0.0,
            a1: 0.0,
            a2: 0.0,
            a3: 0.0,
            ic1eq: 0.0,
            ic2eq: 0.0,
        }
    }

    /// Recompute coefficients for a new cutoff (Hz) and resonance Q.
    /// Control-rate only - never call this per sample.
    pub fn update_coefficients(&mut self, cutoff: f32, q: f32) {
        self.g = (PI * cutoff / self.sample_rate).tan();
        self.k = 1.0 / q;
        self.a1 = 1.0 / (1.0 + self.g * (self.g + self.k));
        self.a2 = self.g * self.a1;
        self.a3 = self.g * self.a2;
    }

    /// Zero coefficients and integrator state. Called when a voice is
    /// freed so stale pole energy cannot leak into the next note.
    pub fn reset(&mut self) {
        self.g = 0.0;
        self.k = 0.0;
        self.a1 = 0.0;
        self.a2 = 0.0;
        self.a3 = 0.0;
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }

    /// One sample through the filter; returns the lowpass output.
    #[inline]
    pub fn render(&mut self, x: f32) -> f32 {
        // v1..v3 are node voltages in the analog prototype.
        let v3 = x - self.ic2eq;
        let v1 = self.a1 * self.ic1eq + self.a2 * v3;
        let v2 = self.ic2eq + self.a2 * self.ic1eq + self.a3 * v3;

        // Trapezoidal state update: 2v - state.
        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;

        v2
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;

    fn sine(frequency: f32, sample_rate: f32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| (TAU * frequency * i as f32 / sample_rate).sin())
            .collect()
    }

    fn peak_after_transient(buffer: &[f32]) -> f32 {
        let skip = buffer.len().min(256);
        buffer
            .get(skip..)
            .unwrap_or(buffer)
            .iter()
            .fold(0.0f32, |acc, &x| acc.max(x.abs()))
    }

    #[test]
    fn passes_dc() {
        let mut filter = Filter::new();
        filter.sample_rate = 48_000.0;
        filter.update_coefficients(500.0, 0.707);

        let mut last = 0.0;
        for _ in 0..4096 {
            last = filter.render(1.0);
        }
        assert!((last - 1.0).abs() < 0.01, "lowpass should pass DC, got {}", last);
    }

    #[test]
    fn attenuates_above_cutoff() {
        let sample_rate = 48_000.0;
        let mut filter = Filter::new();
        filter.sample_rate = sample_rate;
        filter.update_coefficients(500.0, 0.707);

        let mut low = sine(100.0, sample_rate, 4096);
        for s in low.iter_mut() {
            *s = filter.render(*s);
        }
        let low_peak = peak_after_transient(&low);

        filter.reset();
        filter.update_coefficients(500.0, 0.707);
        let mut high = sine(5_000.0, sample_rate, 4096);
        for s in high.iter_mut() {
            *s = filter.render(*s);
        }
        let high_peak = peak_after_transient(&high);

        assert!(
            high_peak < low_peak * 0.1,
            "expected >20 dB attenuation an octave-plus above cutoff: low={}, high={}",
            low_peak,
            high_peak
        );
    }

    #[test]
    fn resonance_boosts_the_cutoff_frequency() {
        let sample_rate = 48_000.0;
        let cutoff = 1_000.0;

        let mut filter = Filter::new();
        filter.sample_rate = sample_rate;

        filter.update_coefficients(cutoff, 0.707);
        let mut flat = sine(cutoff, sample_rate, 8192);
        for s in flat.iter_mut() {
            *s = filter.render(*s);
        }
        let flat_peak = peak_after_transient(&flat);

        filter.reset();
        filter.update_coefficients(cutoff, 8.0);
        let mut resonant = sine(cutoff, sample_rate, 8192);
        for s in resonant.iter_mut() {
            *s = filter.render(*s);
        }
        let resonant_peak = peak_after_transient(&resonant);

        assert!(
            resonant_peak > flat_peak * 2.0,
            "high Q should boost the cutoff frequency: flat={}, resonant={}",
            flat_peak,
            resonant_peak
        );
    }

    #[test]
    fn reset_clears_stored_energy() {
        let mut filter = Filter::new();
        filter.sample_rate = 48_000.0;
        filter.update_coefficients(2_000.0, 4.0);

        for s in sine(2_000.0, 48_000.0, 1024) {
            filter.render(s);
        }
        filter.reset();

        // With zeroed coefficients and state, silence in means silence out.
        for _ in 0..64 {
            assert_eq!(filter.render(0.0), 0.0, "reset filter must be silent");
        }
    }
}
