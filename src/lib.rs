pub mod dsp;
pub mod patch; // Serializable sound-design layer
pub mod synth; // MIDI decode, voice management and polyphony

pub const MAX_BLOCK_SIZE: usize = 2048;

/// Envelope floor: 20 * log10(0.001) = -80 dB. A voice whose amplitude
/// envelope has decayed to this level is silent and may be reclaimed.
pub const SILENCE: f32 = 0.001;

pub(crate) const MIN_TIME: f32 = 1.0 / 48_000.0;
