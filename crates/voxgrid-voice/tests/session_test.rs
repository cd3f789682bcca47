//! Integration tests for the capture session state machine.

use voxgrid_voice::{
    CaptureSession, CaptureState, ConfidenceGate, ManualSpeech, ScriptedSpeech, SessionOutput,
    SpeechEvent, UnavailableSpeech, VoiceError,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[tokio::test]
async fn confident_transcript_is_forwarded() {
    init_tracing();
    let mut session = CaptureSession::new(
        ScriptedSpeech::transcripts([("show the weather", 0.93)]),
        ConfidenceGate::default(),
    );

    let feedback = session.toggle(false).unwrap().unwrap();
    assert_eq!(feedback.title, "Listening...");
    assert_eq!(session.status_label(false), "Listening...");

    match session.recv().await {
        Some(SessionOutput::Transcript(t)) => assert_eq!(t.text, "show the weather"),
        other => panic!("unexpected output: {:?}", other),
    }
    assert_eq!(session.state(), CaptureState::Idle);
    assert_eq!(session.status_label(false), "Tap to speak");
}

#[tokio::test]
async fn low_confidence_is_rejected_with_feedback() {
    let mut session = CaptureSession::new(
        ScriptedSpeech::transcripts([("mmhm", 0.3)]),
        ConfidenceGate::default(),
    );
    session.start(false).unwrap();
    match session.recv().await {
        Some(SessionOutput::Feedback(f)) => {
            assert_eq!(f.title, "Couldn't hear that clearly");
            assert!(f.destructive);
        }
        other => panic!("unexpected output: {:?}", other),
    }
    assert!(!session.is_listening());
}

#[test]
fn refuses_to_start_while_processing() {
    let mut session = CaptureSession::new(ScriptedSpeech::default(), ConfidenceGate::default());
    let err = session.toggle(true).unwrap_err();
    assert_eq!(err, VoiceError::Busy);
    assert_eq!(err.feedback().unwrap().title, "Processing Previous Request");
    assert_eq!(session.state(), CaptureState::Idle);
    assert_eq!(session.status_label(true), "Processing...");
}

#[test]
fn unavailable_platform_reports_once() {
    let mut session = CaptureSession::new(UnavailableSpeech, ConfidenceGate::default());
    assert_eq!(
        session.availability_feedback().unwrap().title,
        "Speech Recognition Not Available"
    );
    assert_eq!(session.start(false), Err(VoiceError::Unavailable));
}

#[test]
fn manual_speech_polls_without_blocking() {
    let mut session = CaptureSession::new(ManualSpeech::new(), ConfidenceGate::new(0.5));
    session.start(false).unwrap();
    assert!(session.poll().is_none());
    assert!(session.is_listening());

    session.capability_mut().submit("stock ticker", 1.0).unwrap();
    assert!(matches!(session.poll(), Some(SessionOutput::Transcript(_))));
    assert!(!session.is_listening());
    assert!(!session.capability().is_capturing());
}

#[test]
fn toggling_twice_stops_capture() {
    let mut session = CaptureSession::new(ManualSpeech::new(), ConfidenceGate::default());
    assert!(session.toggle(false).unwrap().is_some());
    assert!(session.toggle(false).unwrap().is_none());
    assert_eq!(session.state(), CaptureState::Idle);
    assert!(session.poll().is_none());
    assert_eq!(
        session.capability_mut().submit("late", 1.0),
        Err(VoiceError::ChannelClosed)
    );
}

#[tokio::test]
async fn recognition_error_becomes_feedback() {
    let mut session = CaptureSession::new(
        ScriptedSpeech::new([SpeechEvent::Error("network".into())]),
        ConfidenceGate::default(),
    );
    session.start(false).unwrap();
    match session.recv().await {
        Some(SessionOutput::Feedback(f)) => {
            assert_eq!(f.title, "Voice Recognition Error");
            assert_eq!(f.description, "Error: network. Please try again.");
        }
        other => panic!("unexpected output: {:?}", other),
    }
}

#[tokio::test]
async fn empty_capture_ends_quietly() {
    let mut session = CaptureSession::new(ScriptedSpeech::default(), ConfidenceGate::default());
    session.start(false).unwrap();
    assert!(session.recv().await.is_none());
    assert_eq!(session.state(), CaptureState::Idle);
}
