// Purpose: MIDI decode, voice allocation, polyphony
// This layer sits above the dsp primitives and owns voice lifetime.

pub mod engine;
pub mod message;
pub mod voice;

pub use engine::{GlideMode, Synth, LFO_MAX, MAX_VOICES, SUSTAIN};
pub use message::SynthMessage;
pub use voice::Voice;
