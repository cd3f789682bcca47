//! Error types for speech capture

use crate::feedback::Feedback;
use thiserror::Error;

/// Result type alias for voice operations
pub type VoiceResult<T> = Result<T, VoiceError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VoiceError {
    #[error("speech recognition is not available")]
    Unavailable,

    #[error("capture already in progress")]
    AlreadyListening,

    #[error("a previous request is still processing")]
    Busy,

    #[error("transcript channel closed")]
    ChannelClosed,

    #[error("recognition error: {0}")]
    Recognition(String),
}

impl VoiceError {
    /// What the user should be told, if anything.
    pub fn feedback(&self) -> Option<Feedback> {
        match self {
            VoiceError::Unavailable => Some(Feedback::destructive(
                "Speech Recognition Not Available",
                "This platform doesn't support voice recognition.",
            )),
            VoiceError::Busy => Some(Feedback::info(
                "Processing Previous Request",
                "Please wait while processing your previous request.",
            )),
            VoiceError::Recognition(reason) => Some(Feedback::destructive(
                "Voice Recognition Error",
                format!("Error: {}. Please try again.", reason),
            )),
            VoiceError::AlreadyListening | VoiceError::ChannelClosed => None,
        }
    }
}
