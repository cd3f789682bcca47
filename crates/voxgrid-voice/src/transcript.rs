//! Transcripts and the stream a capture yields them on.

use crate::error::{VoiceError, VoiceResult};
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio_stream::wrappers::ReceiverStream;

/// One final recognition result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    /// Recognizer confidence in `0.0..=1.0`.
    pub confidence: f32,
    pub timestamp: DateTime<Utc>,
}

impl Transcript {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
            timestamp: Utc::now(),
        }
    }
}

/// Something the recognizer reported during a capture.
#[derive(Debug, Clone, PartialEq)]
pub enum SpeechEvent {
    Result(Transcript),
    Error(String),
}

/// Events from one capture. Ends when the backend drops its sender.
pub struct TranscriptStream {
    inner: ReceiverStream<SpeechEvent>,
}

impl TranscriptStream {
    pub fn channel(buffer: usize) -> (mpsc::Sender<SpeechEvent>, Self) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (
            tx,
            Self {
                inner: ReceiverStream::new(rx),
            },
        )
    }

    /// Non-blocking poll for UI loops. `Ok(None)` means nothing yet;
    /// `Err(ChannelClosed)` means the capture is over.
    pub fn try_next(&mut self) -> VoiceResult<Option<SpeechEvent>> {
        match self.inner.as_mut().try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(VoiceError::ChannelClosed),
        }
    }

    pub fn close(&mut self) {
        self.inner.close();
    }
}

impl Stream for TranscriptStream {
    type Item = SpeechEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn try_next_reports_empty_then_closed() {
        let (tx, mut stream) = TranscriptStream::channel(4);
        assert_eq!(stream.try_next(), Ok(None));
        tx.try_send(SpeechEvent::Result(Transcript::new("hi", 0.9))).unwrap();
        assert!(matches!(stream.try_next(), Ok(Some(SpeechEvent::Result(_)))));
        drop(tx);
        assert_eq!(stream.try_next(), Err(VoiceError::ChannelClosed));
    }

    #[test]
    fn stream_yields_in_order() {
        let (tx, stream) = TranscriptStream::channel(4);
        tx.try_send(SpeechEvent::Error("no-speech".into())).unwrap();
        tx.try_send(SpeechEvent::Result(Transcript::new("a", 1.0))).unwrap();
        drop(tx);
        let events: Vec<_> = tokio_test::block_on(stream.collect());
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], SpeechEvent::Error("no-speech".into()));
    }
}
