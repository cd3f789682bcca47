//! Capture session: the mic toggle state machine (Idle ⇄ Listening).

use crate::capability::SpeechCapability;
use crate::error::{VoiceError, VoiceResult};
use crate::feedback::Feedback;
use crate::gate::{ConfidenceGate, GateOutcome};
use crate::transcript::{SpeechEvent, Transcript, TranscriptStream};
use futures::StreamExt;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Listening,
}

/// What a capture produced once it finished.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutput {
    /// Passed the confidence gate; hand it to the pipeline.
    Transcript(Transcript),
    /// Capture ended without a usable result.
    Feedback(Feedback),
}

pub struct CaptureSession<S: SpeechCapability> {
    capability: S,
    gate: ConfidenceGate,
    state: CaptureState,
    stream: Option<TranscriptStream>,
}

impl<S: SpeechCapability> CaptureSession<S> {
    pub fn new(capability: S, gate: ConfidenceGate) -> Self {
        Self {
            capability,
            gate,
            state: CaptureState::Idle,
            stream: None,
        }
    }

    pub fn capability(&self) -> &S {
        &self.capability
    }

    pub fn capability_mut(&mut self) -> &mut S {
        &mut self.capability
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_listening(&self) -> bool {
        self.state == CaptureState::Listening
    }

    pub fn is_available(&self) -> bool {
        self.capability.is_available()
    }

    /// Shown once at startup when there is no recognizer.
    pub fn availability_feedback(&self) -> Option<Feedback> {
        if self.is_available() {
            None
        } else {
            VoiceError::Unavailable.feedback()
        }
    }

    /// Label for the voice panel.
    pub fn status_label(&self, processing: bool) -> &'static str {
        if self.is_listening() {
            "Listening..."
        } else if processing {
            "Processing..."
        } else {
            "Tap to speak"
        }
    }

    /// Mic button: stop when listening, otherwise start.
    pub fn toggle(&mut self, processing: bool) -> VoiceResult<Option<Feedback>> {
        if self.is_listening() {
            self.stop();
            return Ok(None);
        }
        self.start(processing).map(Some)
    }

    pub fn start(&mut self, processing: bool) -> VoiceResult<Feedback> {
        if processing {
            return Err(VoiceError::Busy);
        }
        if self.is_listening() {
            return Err(VoiceError::AlreadyListening);
        }
        if !self.capability.is_available() {
            return Err(VoiceError::Unavailable);
        }
        let stream = self.capability.start_capture()?;
        self.stream = Some(stream);
        self.state = CaptureState::Listening;
        info!(target: "voxgrid::voice", "capture started");
        Ok(Feedback::listening())
    }

    pub fn stop(&mut self) {
        self.capability.stop_capture();
        if let Some(mut stream) = self.stream.take() {
            stream.close();
        }
        if self.state == CaptureState::Listening {
            debug!(target: "voxgrid::voice", "capture stopped");
        }
        self.state = CaptureState::Idle;
    }

    /// Non-blocking check for a finished capture; call once per UI frame.
    pub fn poll(&mut self) -> Option<SessionOutput> {
        let stream = self.stream.as_mut()?;
        match stream.try_next() {
            Ok(None) => None,
            Ok(Some(event)) => Some(self.finish(event)),
            Err(_) => {
                self.stop();
                None
            }
        }
    }

    /// Wait for the running capture to finish.
    pub async fn recv(&mut self) -> Option<SessionOutput> {
        let stream = self.stream.as_mut()?;
        match stream.next().await {
            Some(event) => Some(self.finish(event)),
            None => {
                self.stop();
                None
            }
        }
    }

    fn finish(&mut self, event: SpeechEvent) -> SessionOutput {
        self.stop();
        match event {
            SpeechEvent::Result(transcript) => match self.gate.check(transcript) {
                GateOutcome::Accepted(t) => {
                    info!(
                        target: "voxgrid::voice",
                        text = %t.text,
                        confidence = t.confidence,
                        "transcript accepted"
                    );
                    SessionOutput::Transcript(t)
                }
                GateOutcome::Rejected { feedback, .. } => SessionOutput::Feedback(feedback),
            },
            SpeechEvent::Error(reason) => {
                warn!(target: "voxgrid::voice", reason = %reason, "recognition error");
                let err = VoiceError::Recognition(reason);
                SessionOutput::Feedback(err.feedback().unwrap_or_else(|| {
                    Feedback::destructive("Voice Recognition Error", err.to_string())
                }))
            }
        }
    }
}
