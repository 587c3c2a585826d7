#[cfg(feature = "rtrb")]
use rtrb::Consumer;

use crate::synth::engine::Synth;

/// Control messages a UI or MIDI thread can queue for the audio thread.
///
/// `Copy` on purpose: messages cross threads through a lock-free ring
/// buffer, so they must be trivially movable with no drop glue.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SynthMessage {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8, velocity: u8 },
    ControlChange { controller: u8, value: u8 },
    ChannelPressure { pressure: u8 },
    /// 14-bit bend value, 8192 = center.
    PitchBend { value: u16 },
    AllNotesOff,
}

impl SynthMessage {
    /// Hand this message to the engine, encoded as the standard 3-byte
    /// channel-voice form its `midi_message` entry point expects.
    pub fn apply(self, synth: &mut Synth) {
        match self {
            SynthMessage::NoteOn { note, velocity } => synth.midi_message(0x90, note, velocity),
            SynthMessage::NoteOff { note, velocity } => synth.midi_message(0x80, note, velocity),
            SynthMessage::ControlChange { controller, value } => {
                synth.midi_message(0xB0, controller, value);
            }
            SynthMessage::ChannelPressure { pressure } => synth.midi_message(0xD0, pressure, 0),
            SynthMessage::PitchBend { value } => {
                synth.midi_message(0xE0, (value & 0x7F) as u8, ((value >> 7) & 0x7F) as u8);
            }
            SynthMessage::AllNotesOff => synth.midi_message(0xB0, 0x7B, 0),
        }
    }
}

pub trait MessageReceiver {
    fn pop(&mut self) -> Option<SynthMessage>;
}

#[cfg(feature = "rtrb")]
impl MessageReceiver for Consumer<SynthMessage> {
    fn pop(&mut self) -> Option<SynthMessage> {
        Consumer::pop(self).ok()
    }
}

/// Apply everything queued. Call between `render` calls only - the engine
/// assumes control state is stable for the duration of one block.
pub fn drain<R: MessageReceiver>(receiver: &mut R, synth: &mut Synth) {
    while let Some(message) = receiver.pop() {
        message.apply(synth);
    }
}
