use crate::SILENCE;

/*
ADSR Envelope Implementation
============================

This module implements an exponential ADSR envelope built from a single
one-pole recurrence. Every segment - attack, decay, sustain, release - runs
the same update:

    level = multiplier * (level - target) + target

which walks `level` toward `target` geometrically, the way a capacitor
charges. Changing segment means changing nothing but (multiplier, target).

Vocabulary
----------

  level       The envelope's current output value. Multiplies the voice's
              audio to control loudness over time. Always >= 0.

  stage       Which phase we are in: Idle, Attack, DecaySustain, or Release.
              An explicit state machine governs transitions.

  multiplier  Per-sample pole of the recurrence, in (0, 1). Closer to 1.0 is
              slower. Each stage installs its own multiplier.

  target      The asymptote `level` is walking toward. Exponential approach
              never actually arrives, which is exactly the shape we want.

  SILENCE     0.001, about -80 dB. Below this the envelope counts as
              inactive and the owning voice may be reclaimed.


The Shape: Exponential Segments
-------------------------------

  Level
    2.0 ┄┄┄┄┄┄┄┄┄┄┄┄┄┄┄┄┄┄┄┄┄┄┄  (attack target, never reached)
        │    ╱╲
    1.0 │   ╱  ╲
        │  ╱    ╲______________
    S   │ ╱                    ╲
    0.0 └╱──────────────────────╲┄┄┄→ Time
         Attack  DecaySustain    Release

The attack aims OVERSHOOT-style at 2.0 - twice full scale - so the rise
stays steep all the way up instead of flattening as it approaches 1.0 the
way a plain exponential would. When the level works out to have effectively
arrived (see below), the stage flips to DecaySustain, which aims at the
sustain level. Decay and sustain are one stage: walking toward the sustain
level IS the decay, and sitting at the asymptote IS the sustain.


The State Machine
-----------------

    ┌────────────────────────────────────────────────────────┐
    │                                                        │
    │  ┌──────┐  attack()  ┌────────┐ level+target>3 ┌─────┐ │
    │  │ Idle │ ─────────→ │ Attack │ ──────────────→│ D/S │ │
    │  └──────┘            └────────┘                └─────┘ │
    │      ↑                    │ release()             │    │
    │      │                    ↓                       ↓    │
    │      │               ┌─────────┐    release()          │
    │      │               │ Release │ ←─────────────────────│
    │      │               └─────────┘                       │
    │      │  level<SILENCE     │                            │
    │      └────────────────────┘                            │
    │                                                        │
    └────────────────────────────────────────────────────────┘

The Attack→DecaySustain test is geometric, not timed: with the target
pinned at 2.0, `level + target > 3.0` fires when the level has climbed past
1.0, i.e. has effectively reached the audible ceiling. Earlier versions of
this trick ran the same comparison in every stage and leaned on no other
stage ever summing past 3.0; making the stage explicit removes that
coincidence - the test is only honored while in Attack.

`attack()` also bumps the level by 2*SILENCE before aiming at 2.0. A level
of exactly 0.0 would otherwise scale the whole recurrence by zero forever;
the bump guarantees the envelope is immediately "active" and climbing.
*/

/// The current stage of the envelope state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStage {
    Idle,         // level decayed away (or never started); voice reclaimable
    Attack,       // walking toward the unreachable 2.0 ceiling
    DecaySustain, // walking toward (and then holding at) the sustain level
    Release,      // walking toward 0 after note-off
}

pub struct Envelope {
    /// Current output value. Invariant: always >= 0.
    pub level: f32,

    // Per-stage poles, loaded by the engine at note start from the global
    // patch settings.
    pub attack_multiplier: f32,
    pub decay_multiplier: f32,
    pub sustain_level: f32,
    pub release_multiplier: f32,

    stage: EnvelopeStage,
    multiplier: f32,
    target: f32,
}

impl Envelope {
    pub fn new() -> Self {
        Self {
            level: 0.0,
            attack_multiplier: 0.0,
            decay_multiplier: 0.0,
            sustain_level: 0.0,
            release_multiplier: 0.0,
            stage: EnvelopeStage::Idle,
            multiplier: 0.0,
            target: 0.0,
        }
    }

    /// Start (or restart) the attack segment.
    ///
    /// Valid from any stage - retriggering a releasing voice picks up from
    /// the current level, which is what keeps fast repeated notes from
    /// clicking.
    pub fn attack(&mut self) {
        // Never let the recurrence start from a hard zero.
        self.level += SILENCE + SILENCE;
        self.target = 2.0;
        self.multiplier = self.attack_multiplier;
        self.stage = EnvelopeStage::Attack;
    }

    /// Start the release segment from the current level. Valid from any
    /// stage; a no-op when already idle.
    pub fn release(&mut self) {
        if self.stage == EnvelopeStage::Idle {
            return;
        }
        self.target = 0.0;
        self.multiplier = self.release_multiplier;
        self.stage = EnvelopeStage::Release;
    }

    /// Advance one sample and return the new level.
    #[inline]
    pub fn next_value(&mut self) -> f32 {
        self.level = self.multiplier * (self.level - self.target) + self.target;

        match self.stage {
            EnvelopeStage::Attack => {
                // Geometric arrival test: with target pinned at 2.0 this
                // fires once the level passes 1.0.
                if self.level + self.target > 3.0 {
                    self.stage = EnvelopeStage::DecaySustain;
                    self.multiplier = self.decay_multiplier;
                    self.target = self.sustain_level;
                }
            }
            EnvelopeStage::Release => {
                if self.level < SILENCE {
                    self.stage = EnvelopeStage::Idle;
                }
            }
            _ => {}
        }

        debug_assert!(self.level >= 0.0);
        self.level
    }

    /// Clear all state back to Idle.
    pub fn reset(&mut self) {
        self.level = 0.0;
        self.target = 0.0;
        self.multiplier = 0.0;
        self.stage = EnvelopeStage::Idle;
    }

    /// True while the envelope is audible (level above the -80 dB floor).
    #[inline]
    pub fn is_active(&self) -> bool {
        self.level > SILENCE
    }

    /// True only during the attack segment. Voice stealing refuses voices
    /// that are still rising.
    #[inline]
    pub fn is_in_attack(&self) -> bool {
        self.stage == EnvelopeStage::Attack
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new()
    }
}
