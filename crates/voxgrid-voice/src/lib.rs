//! # voxgrid-voice
//!
//! Speech input for the dashboard. The recognizer itself is a platform capability
//! consumed through [`SpeechCapability`]; this crate owns what happens around it:
//!
//! ```text
//!  mic toggle → CaptureSession → SpeechCapability::start_capture
//!                     ↓                       ↓
//!             status / Feedback      TranscriptStream (one event)
//!                     ↓                       ↓
//!               host toasts      ConfidenceGate (> 0.5) → Transcript
//! ```

pub mod capability;
pub mod error;
pub mod feedback;
pub mod gate;
pub mod session;
pub mod transcript;

pub use capability::{ManualSpeech, ScriptedSpeech, SpeechCapability, UnavailableSpeech};
pub use error::{VoiceError, VoiceResult};
pub use feedback::Feedback;
pub use gate::{ConfidenceGate, GateOutcome, DEFAULT_CONFIDENCE_THRESHOLD};
pub use session::{CaptureSession, CaptureState, SessionOutput};
pub use transcript::{SpeechEvent, Transcript, TranscriptStream};
