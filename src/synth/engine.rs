use std::f32::consts::{PI, TAU};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::noise::NoiseGenerator;
use crate::dsp::scrub::scrub;
use crate::dsp::smoother::Smoother;
use crate::patch::{Patch, PolyMode};
use crate::synth::voice::Voice;
use crate::{MIN_TIME, SILENCE};

/*
The Engine
==========

`Synth` owns everything: a fixed pool of voices, the noise source, the
control-rate LFO, and the decoded control state. One thread calls `render`
repeatedly with contiguous sample ranges; `midi_message` (or the message
queue) is only touched between those calls. Nothing here allocates, blocks,
or loops unbounded per sample.

Voice allocation
----------------

  polyphonic   All MAX_VOICES slots are in play. A new note takes the voice
               whose amplitude envelope is quietest, skipping voices still in
               their attack - stealing a note the player just struck sounds
               far worse than stealing one that is already fading.

  monophonic   Only voice 0 sounds. A new note while one is held plays
               legato: the sounding pitch moves (optionally gliding) without
               retriggering the envelopes, and the previous note is pushed
               onto a held-note queue kept in the note fields of the unused
               voice slots 1..MAX_VOICES. Releasing the sounding key pops the
               most recently queued note and resumes it the same legato way.
               When the queue is full the oldest held note falls off the end.

Control rate
------------

The LFO, portamento, and filter coefficient updates run once every LFO_MAX
samples. The filter modulation target additionally passes through a one-pole
"zipper" so the 32-sample steps do not leak into the audio as stairsteps.
*/

pub const MAX_VOICES: usize = 8;

/// Control-rate divisor: LFO / glide / filter updates run once per this many
/// audio samples.
pub const LFO_MAX: i32 = 32;

/// Sentinel stored in `Voice::note` for a key released while the sustain
/// pedal is held: the voice keeps sounding until the pedal comes up.
pub const SUSTAIN: i32 = -1;

// Per-voice-slot detune inside calc_period. Keeps the pool of voices very
// slightly out of tune with each other, like the oscillators of a real
// polysynth never quite agreeing.
const ANALOG: f32 = 0.002;

/// When a new note glides from the previous pitch.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GlideMode {
    /// New notes start at their own pitch.
    #[default]
    Off,
    /// Glide only when the previous note is still held (overlapping keys).
    Legato,
    /// Glide on every note change.
    Always,
}

pub struct Synth {
    sample_rate: f32,
    voices: [Voice; MAX_VOICES],
    noise_gen: NoiseGenerator,
    output_level_smoother: Smoother,

    // ------------------------------------------------------------------
    // Control surface. Engine units, written by `apply_patch` (or directly
    // by a host that has done its own conversions), only between renders.
    // ------------------------------------------------------------------
    /// Amplitude envelope one-pole multipliers / sustain fraction.
    pub env_attack: f32,
    pub env_decay: f32,
    pub env_sustain: f32,
    pub env_release: f32,

    /// Filter envelope, same encoding.
    pub filter_attack: f32,
    pub filter_decay: f32,
    pub filter_sustain: f32,
    pub filter_release: f32,
    /// Exponent scale of the filter envelope on cutoff.
    pub filter_env_depth: f32,

    /// Oscillator 2 level relative to oscillator 1 (0..1).
    pub osc_mix: f32,
    /// Oscillator 2 period multiplier (< 1.0 tunes sharp).
    pub detune: f32,
    /// Master tuning: period of MIDI note 0 in samples. `calc_period` scales
    /// it down by equal-temperament semitones.
    pub tune: f32,

    pub glide_mode: GlideMode,
    /// Portamento pole per control tick: 1.0 snaps, small values drift.
    pub glide_rate: f32,
    /// Pitch offset in semitones a new note starts away from its target.
    pub glide_bend: f32,

    /// Noise level mixed into every voice, pre-filter.
    pub noise_mix: f32,
    /// Vibrato depth (period swing fraction at full LFO).
    pub vibrato: f32,
    /// PWM depth, same units as vibrato but applied to oscillator 2.
    pub pwm_depth: f32,

    /// Exponent scale of (velocity - 64) on the initial cutoff.
    pub velocity_sensitivity: f32,
    /// Force every note to velocity 80.
    pub ignore_velocity: bool,

    /// Constant cutoff offset in exp-space (the "freq" knob).
    pub filter_key_tracking: f32,
    /// Filter resonance Q before the CC 0x47 multiplier.
    pub filter_q: f32,
    /// LFO depth on the filter cutoff, exp-space.
    pub filter_lfo_depth: f32,

    /// LFO phase advance per control tick (radians).
    pub lfo_inc: f32,

    /// Headroom trim applied to oscillator amplitudes at note start.
    pub volume_trim: f32,

    /// 1 = monophonic with legato queue, MAX_VOICES = polyphonic.
    pub num_voices: usize,

    // ------------------------------------------------------------------
    // Modulation and performance state, owned by the engine.
    // ------------------------------------------------------------------
    lfo_phase: f32,
    lfo_step: i32,
    pitch_bend: f32,
    mod_wheel: f32,
    pressure: f32,
    filter_ctrl: f32,
    filter_zip: f32,
    resonance_ctrl: f32,
    sustain_pedal_pressed: bool,
    last_note: i32,
}

impl Synth {
    pub fn new() -> Self {
        let mut synth = Self {
            sample_rate: 44_100.0,
            voices: std::array::from_fn(|_| Voice::new()),
            noise_gen: NoiseGenerator::new(),
            output_level_smoother: Smoother::new(),

            env_attack: 0.0,
            env_decay: 0.0,
            env_sustain: 0.0,
            env_release: 0.0,
            filter_attack: 0.0,
            filter_decay: 0.0,
            filter_sustain: 0.0,
            filter_release: 0.0,
            filter_env_depth: 0.0,
            osc_mix: 0.0,
            detune: 1.0,
            tune: 0.0,
            glide_mode: GlideMode::Off,
            glide_rate: 1.0,
            glide_bend: 0.0,
            noise_mix: 0.0,
            vibrato: 0.0,
            pwm_depth: 0.0,
            velocity_sensitivity: 0.0,
            ignore_velocity: false,
            filter_key_tracking: 0.0,
            filter_q: 1.0,
            filter_lfo_depth: 0.0,
            lfo_inc: 0.0,
            volume_trim: 0.0,
            num_voices: MAX_VOICES,

            lfo_phase: 0.0,
            lfo_step: 0,
            pitch_bend: 1.0,
            mod_wheel: 0.0,
            pressure: 0.0,
            filter_ctrl: 0.0,
            filter_zip: 0.0,
            resonance_ctrl: 1.0,
            sustain_pedal_pressed: false,
            last_note: 0,
        };
        synth.apply_patch(&Patch::default());
        synth
    }

    /// One-time (or resize-time) setup. Propagates the sample rate to every
    /// voice filter. Re-apply your patch afterwards: the engine-unit
    /// conversions depend on the sample rate.
    pub fn allocate_resources(&mut self, sample_rate: f32, _block_size: usize) {
        self.sample_rate = sample_rate;
        for voice in &mut self.voices {
            voice.filter.sample_rate = sample_rate;
        }
    }

    /// Silence everything and clear performance state. Control-surface
    /// settings survive; only the playing state is wiped.
    pub fn reset(&mut self) {
        for voice in &mut self.voices {
            voice.reset();
        }

        self.sustain_pedal_pressed = false;
        self.pressure = 0.0;
        self.lfo_phase = 0.0;
        self.lfo_step = 0;
        self.last_note = 0;
        self.mod_wheel = 0.0;
        self.filter_ctrl = 0.0;
        self.filter_zip = 0.0;

        self.pitch_bend = 1.0;
        self.resonance_ctrl = 1.0;

        self.noise_gen.reset();
        self.output_level_smoother.reset(self.sample_rate, 0.05);
    }

    /// Convert a patch (musician units) into engine coefficients.
    ///
    /// Not realtime-critical, but cheap enough to run at a block boundary
    /// whenever a parameter moves. Call after `allocate_resources`.
    pub fn apply_patch(&mut self, patch: &Patch) {
        let sample_rate = self.sample_rate;

        self.env_attack = envelope_multiplier(patch.amp_attack, sample_rate);
        self.env_decay = envelope_multiplier(patch.amp_decay, sample_rate);
        self.env_sustain = patch.amp_sustain.clamp(0.0, 1.0);
        self.env_release = envelope_multiplier(patch.amp_release, sample_rate);

        self.filter_attack = envelope_multiplier(patch.filter_attack, sample_rate);
        self.filter_decay = envelope_multiplier(patch.filter_decay, sample_rate);
        self.filter_sustain = patch.filter_sustain.clamp(0.0, 1.0);
        self.filter_release = envelope_multiplier(patch.filter_release, sample_rate);
        self.filter_env_depth = 6.0 * patch.filter_env_depth.clamp(-1.0, 1.0);

        self.osc_mix = patch.osc_mix.clamp(0.0, 1.0);
        // Positive cents tune oscillator 2 sharp, i.e. a shorter period.
        self.detune = 2.0_f32.powf(-patch.osc_detune.clamp(-1_200.0, 1_200.0) / 1_200.0);
        // Period of note 0 such that note 69 lands on 440 Hz (before the
        // octave switch and fine tuning shift everything).
        let transpose =
            12.0 * patch.octave.clamp(-2, 2) as f32 + patch.tuning.clamp(-100.0, 100.0) / 100.0;
        self.tune = sample_rate / 440.0 * 2.0_f32.powf((69.0 - transpose) / 12.0);

        self.glide_mode = patch.glide_mode;
        self.glide_rate = if patch.glide_time < MIN_TIME {
            1.0
        } else {
            1.0 - (-(LFO_MAX as f32) / (sample_rate * patch.glide_time)).exp()
        };
        self.glide_bend = patch.glide_bend.clamp(-36.0, 36.0);

        let noise = patch.noise_level.clamp(0.0, 1.0);
        self.noise_mix = noise * noise * 0.06;

        let vibrato = patch.vibrato_depth.clamp(0.0, 1.0);
        self.vibrato = 0.05 * vibrato * vibrato;
        let pwm = patch.pwm_depth.clamp(0.0, 1.0);
        self.pwm_depth = 0.05 * pwm * pwm;

        self.velocity_sensitivity = 0.05 * patch.velocity_sensitivity.clamp(0.0, 1.0);
        self.ignore_velocity = patch.ignore_velocity;

        self.filter_key_tracking = 8.0 * patch.filter_cutoff.clamp(0.0, 1.0) - 1.5;
        let resonance = patch.filter_resonance.clamp(0.0, 1.0);
        self.filter_q = 0.5 + 19.5 * resonance * resonance;
        let filter_lfo = patch.filter_lfo_depth.clamp(0.0, 1.0);
        self.filter_lfo_depth = 2.5 * filter_lfo * filter_lfo;

        self.lfo_inc = TAU * patch.lfo_rate.clamp(0.0, 20.0) * LFO_MAX as f32 / sample_rate;

        // Stacking a second oscillator and noise on top of eight voices eats
        // headroom fast; trim the per-voice gain as sources come in.
        self.volume_trim = 0.0008 * (3.2 - self.osc_mix - 25.0 * self.noise_mix);

        self.output_level_smoother
            .set_target(10.0_f32.powf(patch.output_level.clamp(-60.0, 6.0) / 20.0));

        self.num_voices = match patch.poly_mode {
            PolyMode::Mono => 1,
            PolyMode::Poly => MAX_VOICES,
        };
    }

    /// Feed one decoded channel-voice message. Must be called between
    /// `render` calls; the engine assumes control state is stable for the
    /// duration of a block.
    pub fn midi_message(&mut self, status: u8, data1: u8, data2: u8) {
        match status & 0xF0 {
            0x80 => self.note_off(i32::from(data1 & 0x7F)),
            0x90 => {
                let note = i32::from(data1 & 0x7F);
                let velocity = i32::from(data2 & 0x7F);
                // Running-status convention: note-on at velocity 0 is off.
                if velocity > 0 {
                    self.note_on(note, velocity);
                } else {
                    self.note_off(note);
                }
            }
            0xB0 => self.control_change(data1, data2),
            0xD0 => {
                // Channel pressure, squared taper: 0 .. ~1.61 at full press.
                self.pressure = 0.0001 * f32::from(data1) * f32::from(data1);
            }
            0xE0 => {
                // 14-bit bend mapped to a symmetric period multiplier,
                // exactly 1.0 at center (8192).
                self.pitch_bend =
                    (-0.000014102 * (f32::from(data1) + 128.0 * f32::from(data2) - 8192.0)).exp();
            }
            _ => {}
        }
    }

    /// Render `left.len()` samples. `right` may be `None` for a mono
    /// fold-down (left and right averaged into the single buffer).
    pub fn render(&mut self, left: &mut [f32], mut right: Option<&mut [f32]>) {
        // Per-block refresh: base periods (pitch bend and detune applied)
        // and the per-voice copies of control values.
        for v in 0..MAX_VOICES {
            if self.voices[v].env.is_active() {
                self.update_period(v);
                let voice = &mut self.voices[v];
                voice.glide_rate = self.glide_rate;
                voice.filter_q = self.filter_q * self.resonance_ctrl;
                voice.pitch_bend = self.pitch_bend;
                voice.filter_env_depth = self.filter_env_depth;
            }
        }

        match right.as_deref_mut() {
            Some(right) => {
                debug_assert_eq!(left.len(), right.len());
                for (l, r) in left.iter_mut().zip(right.iter_mut()) {
                    let (out_left, out_right) = self.next_sample();
                    *l = out_left;
                    *r = out_right;
                }
            }
            None => {
                for l in left.iter_mut() {
                    let (out_left, out_right) = self.next_sample();
                    *l = (out_left + out_right) * 0.5;
                }
            }
        }

        // Voices that decayed to silence this block are scrubbed so no
        // envelope or filter-pole state leaks into their next note.
        for voice in &mut self.voices {
            if !voice.env.is_active() {
                voice.env.reset();
                voice.filter.reset();
            }
        }

        scrub(left);
        if let Some(right) = right {
            scrub(right);
        }
    }

    #[inline]
    fn next_sample(&mut self) -> (f32, f32) {
        self.update_lfo();

        // One noise sample shared by every voice, scaled once.
        let noise = self.noise_gen.next_value() * self.noise_mix;

        let mut left = 0.0;
        let mut right = 0.0;
        for voice in &mut self.voices {
            if voice.env.is_active() {
                let output = voice.render(noise);
                left += output * voice.pan_left;
                right += output * voice.pan_right;
            }
        }

        let output_level = self.output_level_smoother.next_value();
        (left * output_level, right * output_level)
    }

    /// Control-rate tick. Runs the LFO once every LFO_MAX samples and pushes
    /// the fresh modulation into every active voice.
    fn update_lfo(&mut self) {
        self.lfo_step -= 1;
        if self.lfo_step > 0 {
            return;
        }
        self.lfo_step = LFO_MAX;

        self.lfo_phase += self.lfo_inc;
        if self.lfo_phase > PI {
            self.lfo_phase -= TAU;
        }

        let sine = self.lfo_phase.sin();
        let vibrato_mod = 1.0 + sine * (self.mod_wheel + self.vibrato);
        let pwm = 1.0 + sine * (self.mod_wheel + self.pwm_depth);
        let filter_mod =
            self.filter_key_tracking + self.filter_ctrl + (self.filter_lfo_depth + self.pressure) * sine;

        // One-pole zipper between the control-rate filter target and the
        // value the voices see; raw 32-sample steps would be audible.
        self.filter_zip += 0.005 * (filter_mod - self.filter_zip);

        for v in 0..MAX_VOICES {
            if self.voices[v].env.is_active() {
                let voice = &mut self.voices[v];
                voice.osc1.modulation = vibrato_mod;
                voice.osc2.modulation = pwm;
                voice.filter_mod = self.filter_zip;
                voice.update_lfo();
                self.update_period(v);
            }
        }
    }

    /// Refresh a voice's oscillator periods from its glided base period,
    /// with pitch bend and oscillator 2 detune applied.
    fn update_period(&mut self, v: usize) {
        let voice = &mut self.voices[v];
        voice.osc1.period = voice.period * self.pitch_bend;
        voice.osc2.period = voice.osc1.period * self.detune;
    }

    fn note_on(&mut self, note: i32, velocity: i32) {
        let velocity = if self.ignore_velocity { 80 } else { velocity };

        if self.num_voices == 1 {
            // Monophonic. A second key while one is held plays legato.
            if self.voices[0].note > 0 {
                self.shift_queued_notes();
                self.restart_mono_voice(note, Some(velocity));
                return;
            }
            self.start_voice(0, note, velocity);
        } else {
            let v = self.find_free_voice();
            self.start_voice(v, note, velocity);
        }
    }

    fn note_off(&mut self, note: i32) {
        // Monophonic: releasing the sounding key resumes the most recently
        // queued held note, if any.
        if self.num_voices == 1 && self.voices[0].note == note {
            let queued = self.next_queued_note();
            if queued > 0 {
                self.restart_mono_voice(queued, None);
            }
        }

        for voice in &mut self.voices {
            if voice.note == note {
                if self.sustain_pedal_pressed {
                    voice.note = SUSTAIN;
                } else {
                    voice.release();
                    voice.note = 0;
                }
            }
        }
    }

    fn control_change(&mut self, data1: u8, data2: u8) {
        match data1 {
            // Sustain pedal. Releasing it sends a synthetic note-off for
            // every voice parked on the SUSTAIN sentinel.
            0x40 => {
                self.sustain_pedal_pressed = data2 >= 64;
                if !self.sustain_pedal_pressed {
                    self.note_off(SUSTAIN);
                }
            }
            // Mod wheel, squared taper.
            0x01 => {
                self.mod_wheel = 0.000_005 * f32::from(data2) * f32::from(data2);
            }
            // Resonance boost.
            0x47 => {
                self.resonance_ctrl = 154.0 / (154 - i32::from(data2)) as f32;
            }
            // Filter cutoff up / down.
            0x4A => {
                self.filter_ctrl = 0.02 * f32::from(data2);
            }
            0x4B => {
                self.filter_ctrl = -0.03 * f32::from(data2);
            }
            _ => {
                // Channel-mode messages (all notes off, all sound off, reset
                // controllers, ...) all get the big hammer.
                if data1 >= 0x78 {
                    for voice in &mut self.voices {
                        voice.reset();
                    }
                    self.sustain_pedal_pressed = false;
                }
            }
        }
    }

    /// Voice stealing: take the quietest voice that is not still rising
    /// through its attack.
    fn find_free_voice(&self) -> usize {
        let mut v = 0;
        let mut level = 100.0; // louder than any envelope
        for i in 0..MAX_VOICES {
            if self.voices[i].env.level < level && !self.voices[i].env.is_in_attack() {
                level = self.voices[i].env.level;
                v = i;
            }
        }
        v
    }

    fn start_voice(&mut self, v: usize, note: i32, velocity: i32) {
        let period = self.calc_period(v, note);

        // Glide-bend: in the gliding modes a new note starts offset by its
        // distance from the previous note (and the configured bend) and
        // slides in from there.
        let mut note_distance = 0;
        if self.last_note > 0
            && (self.glide_mode == GlideMode::Always
                || (self.glide_mode == GlideMode::Legato && self.is_playing_legato_style()))
        {
            note_distance = note - self.last_note;
        }

        self.last_note = note;

        let voice = &mut self.voices[v];
        voice.target = period;
        voice.period =
            period * 1.059_463_094_359_f32.powf(note_distance as f32 - self.glide_bend);
        if voice.period < 6.0 {
            voice.period = 6.0;
        }

        voice.note = note;
        voice.update_panning();

        // Squared velocity taper, roughly -26 dB .. +6 dB across the range.
        let velocity_curve = 0.004 * ((velocity + 64) * (velocity + 64)) as f32 - 8.0;
        voice.osc1.amplitude = self.volume_trim * velocity_curve;
        voice.osc2.amplitude = voice.osc1.amplitude * self.osc_mix;

        // Pure PWM patch: with no vibrato wanted, phase-lock oscillator 2
        // against oscillator 1 so their difference is a square wave.
        if self.vibrato == 0.0 && self.pwm_depth > 0.0 {
            let start_period = voice.period;
            voice.osc2.square_wave(&voice.osc1, start_period);
        }

        // Initial cutoff tracks the note (it is derived from the period)
        // and opens with velocity.
        voice.cutoff = self.sample_rate / (period * PI);
        voice.cutoff *= (self.velocity_sensitivity * (velocity - 64) as f32).exp();

        let env = &mut voice.env;
        env.attack_multiplier = self.env_attack;
        env.decay_multiplier = self.env_decay;
        env.sustain_level = self.env_sustain;
        env.release_multiplier = self.env_release;
        env.attack();

        let filter_env = &mut voice.filter_env;
        filter_env.attack_multiplier = self.filter_attack;
        filter_env.decay_multiplier = self.filter_decay;
        filter_env.sustain_level = self.filter_sustain;
        filter_env.release_multiplier = self.filter_release;
        filter_env.attack();

        voice.filter_env_depth = self.filter_env_depth;
    }

    /// Legato pitch change: move voice 0 to a new note without retriggering
    /// the envelopes or recomputing oscillator amplitudes. `velocity` is
    /// `None` when resuming a queued note (no fresh key strike to read).
    fn restart_mono_voice(&mut self, note: i32, velocity: Option<i32>) {
        let period = self.calc_period(0, note);

        let glide_mode = self.glide_mode;
        let voice = &mut self.voices[0];
        voice.target = period;
        if glide_mode == GlideMode::Off {
            voice.period = period;
        }

        voice.cutoff = self.sample_rate / (period * PI);
        if let Some(velocity) = velocity {
            voice.cutoff *= (self.velocity_sensitivity * (velocity - 64) as f32).exp();
        }

        // Nudge the level so the voice cannot be sitting exactly at the
        // silence floor when the pitch lands.
        voice.env.level += SILENCE + SILENCE;
        voice.note = note;
        voice.update_panning();
    }

    /// Period in samples for `note` played on voice slot `v`, floored so
    /// neither oscillator can be asked for a cycle shorter than 6 samples.
    fn calc_period(&self, v: usize, note: i32) -> f32 {
        // exp(-ln(2)/12 * note): equal-temperament semitones, with the
        // ANALOG constant keeping each voice slot microscopically detuned.
        let mut period = self.tune * (-0.057_762_265_05 * (note as f32 + ANALOG * v as f32)).exp();

        // Drop octaves until both oscillators clear the 6-sample floor. At
        // 44.1 kHz that caps the fundamental at 7350 Hz.
        while period < 6.0 || (period * self.detune) < 6.0 {
            period += period;
        }

        period
    }

    /// Push the sounding note onto the held-note queue (slots 1..). The
    /// queue holds MAX_VOICES-1 notes; the oldest falls off the far end.
    fn shift_queued_notes(&mut self) {
        for slot in (1..MAX_VOICES).rev() {
            self.voices[slot].note = self.voices[slot - 1].note;
            self.voices[slot].release();
        }
    }

    /// Pop the most recently queued held note, or 0 if none are waiting.
    fn next_queued_note(&mut self) -> i32 {
        let mut held = 0;
        for v in (1..MAX_VOICES).rev() {
            if self.voices[v].note > 0 {
                held = v;
            }
        }

        if held > 0 {
            let note = self.voices[held].note;
            self.voices[held].note = 0;
            return note;
        }

        0
    }

    /// True while at least one key is held (any voice slot carrying a
    /// positive note number).
    fn is_playing_legato_style(&self) -> bool {
        self.voices.iter().any(|voice| voice.note > 0)
    }

    // Read-side accessors for hosts, meters and tests.

    pub fn voices(&self) -> &[Voice; MAX_VOICES] {
        &self.voices
    }

    pub fn active_voice_count(&self) -> usize {
        self.voices.iter().filter(|v| v.env.is_active()).count()
    }

    pub fn pitch_bend(&self) -> f32 {
        self.pitch_bend
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }
}

impl Default for Synth {
    fn default() -> Self {
        Self::new()
    }
}

/// One-pole multiplier that decays a unit step with time constant `seconds`.
fn envelope_multiplier(seconds: f32, sample_rate: f32) -> f32 {
    (-1.0 / (seconds.max(MIN_TIME) * sample_rate)).exp()
}
