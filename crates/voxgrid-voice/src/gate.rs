//! Confidence gate: only clearly heard transcripts reach the pipeline.

use crate::feedback::Feedback;
use crate::transcript::Transcript;
use tracing::debug;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub enum GateOutcome {
    Accepted(Transcript),
    Rejected { feedback: Feedback, confidence: f32 },
}

#[derive(Debug, Clone, Copy)]
pub struct ConfidenceGate {
    threshold: f32,
}

impl Default for ConfidenceGate {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIDENCE_THRESHOLD)
    }
}

impl ConfidenceGate {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Strictly above the threshold passes.
    pub fn check(&self, transcript: Transcript) -> GateOutcome {
        if transcript.confidence > self.threshold {
            return GateOutcome::Accepted(transcript);
        }
        debug!(
            target: "voxgrid::voice",
            confidence = transcript.confidence,
            threshold = self.threshold,
            "transcript below confidence threshold"
        );
        GateOutcome::Rejected {
            feedback: Feedback::unclear(),
            confidence: transcript.confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_exclusive() {
        let gate = ConfidenceGate::default();
        assert!(matches!(
            gate.check(Transcript::new("weather", 0.51)),
            GateOutcome::Accepted(_)
        ));
        match gate.check(Transcript::new("mumble", 0.5)) {
            GateOutcome::Rejected { feedback, confidence } => {
                assert_eq!(feedback.title, "Couldn't hear that clearly");
                assert_eq!(confidence, 0.5);
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }
}
