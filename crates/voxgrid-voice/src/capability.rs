//! **Speech capability**: the platform recognizer, treated as a black box.
//!
//! Implement `SpeechCapability` for a real recognizer. Each capture is one-shot:
//! the stream yields at most one final result or error and then ends.

use crate::error::{VoiceError, VoiceResult};
use crate::transcript::{SpeechEvent, Transcript, TranscriptStream};
use tokio::sync::mpsc;
use tracing::debug;

pub trait SpeechCapability: Send {
    fn is_available(&self) -> bool;

    fn start_capture(&mut self) -> VoiceResult<TranscriptStream>;

    /// Abort the running capture, if any. The stream then ends.
    fn stop_capture(&mut self);
}

/// Replays a fixed queue of events, one per capture. Use for tests and demos.
#[derive(Debug, Default)]
pub struct ScriptedSpeech {
    script: std::collections::VecDeque<SpeechEvent>,
}

impl ScriptedSpeech {
    pub fn new(events: impl IntoIterator<Item = SpeechEvent>) -> Self {
        Self {
            script: events.into_iter().collect(),
        }
    }

    pub fn transcripts<'a>(items: impl IntoIterator<Item = (&'a str, f32)>) -> Self {
        Self::new(
            items
                .into_iter()
                .map(|(text, confidence)| SpeechEvent::Result(Transcript::new(text, confidence))),
        )
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl SpeechCapability for ScriptedSpeech {
    fn is_available(&self) -> bool {
        true
    }

    fn start_capture(&mut self) -> VoiceResult<TranscriptStream> {
        let (tx, stream) = TranscriptStream::channel(1);
        if let Some(event) = self.script.pop_front() {
            tx.try_send(event).map_err(|_| VoiceError::ChannelClosed)?;
        }
        Ok(stream)
    }

    fn stop_capture(&mut self) {}
}

/// Recognizer fed by hand, e.g. from a text box standing in for a microphone.
#[derive(Debug, Default)]
pub struct ManualSpeech {
    pending: Option<mpsc::Sender<SpeechEvent>>,
}

impl ManualSpeech {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_capturing(&self) -> bool {
        self.pending.is_some()
    }

    /// Deliver the final result for the running capture and end it.
    pub fn submit(&mut self, text: impl Into<String>, confidence: f32) -> VoiceResult<()> {
        self.send(SpeechEvent::Result(Transcript::new(text, confidence)))
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> VoiceResult<()> {
        self.send(SpeechEvent::Error(reason.into()))
    }

    fn send(&mut self, event: SpeechEvent) -> VoiceResult<()> {
        let tx = self.pending.take().ok_or(VoiceError::ChannelClosed)?;
        tx.try_send(event).map_err(|_| VoiceError::ChannelClosed)
    }
}

impl SpeechCapability for ManualSpeech {
    fn is_available(&self) -> bool {
        true
    }

    fn start_capture(&mut self) -> VoiceResult<TranscriptStream> {
        if self.pending.is_some() {
            return Err(VoiceError::AlreadyListening);
        }
        let (tx, stream) = TranscriptStream::channel(1);
        self.pending = Some(tx);
        debug!(target: "voxgrid::voice", "manual capture started");
        Ok(stream)
    }

    fn stop_capture(&mut self) {
        self.pending = None;
    }
}

/// Platform without a recognizer.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableSpeech;

impl SpeechCapability for UnavailableSpeech {
    fn is_available(&self) -> bool {
        false
    }

    fn start_capture(&mut self) -> VoiceResult<TranscriptStream> {
        Err(VoiceError::Unavailable)
    }

    fn stop_capture(&mut self) {}
}
