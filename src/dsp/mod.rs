//! Low-level DSP primitives used by the synth voices.
//!
//! These components are allocation-free and realtime-safe, making them safe to
//! embed directly inside voice structs. They intentionally stay focused on the
//! signal-processing math; the `synth` layer owns orchestration, modulation
//! routing, and voice lifetime.

/// Exponential multi-segment envelope generator.
pub mod envelope;
/// Trapezoidally-integrated state-variable lowpass filter.
pub mod filter;
/// Linear-congruential white noise source.
pub mod noise;
/// Bandlimited impulse-train oscillator.
pub mod oscillator;
/// Output safety pass (NaN/Inf/over detection).
pub mod scrub;
/// One-pole parameter smoother for the master level.
pub mod smoother;

pub use envelope::EnvelopeStage;
