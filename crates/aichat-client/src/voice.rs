//! Press-and-hold voice capture.
//!
//! No speech recognition is wired up: the bundled [`PlaceholderTranscriber`]
//! waits one second and yields a fixed marker string.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::ClientError;

pub const MICROPHONE_UNAVAILABLE: &str = "[Microphone not available]";
pub const TRANSCRIPTION_PLACEHOLDER: &str = "[Voice message - transcription service needed]";
pub const TRANSCRIPTION_DELAY: Duration = Duration::from_secs(1);

#[async_trait]
pub trait Microphone: Send + Sync + Debug {
    /// Start recording. Fails with [`ClientError::MicrophoneUnavailable`]
    /// when there is no usable input device or permission was denied.
    async fn start(&self) -> Result<(), ClientError>;

    /// Stop recording and return the captured audio.
    async fn stop(&self) -> Result<Vec<u8>, ClientError>;
}

#[async_trait]
pub trait Transcriber: Send + Sync + Debug {
    async fn transcribe(&self, audio: Vec<u8>) -> Result<String, ClientError>;
}

/// A device that is never available.
#[derive(Debug, Default)]
pub struct NoMicrophone;

#[async_trait]
impl Microphone for NoMicrophone {
    async fn start(&self) -> Result<(), ClientError> {
        Err(ClientError::MicrophoneUnavailable)
    }

    async fn stop(&self) -> Result<Vec<u8>, ClientError> {
        Err(ClientError::MicrophoneUnavailable)
    }
}

/// A device that records silence.
#[derive(Debug, Default)]
pub struct SilentMicrophone;

#[async_trait]
impl Microphone for SilentMicrophone {
    async fn start(&self) -> Result<(), ClientError> {
        Ok(())
    }

    async fn stop(&self) -> Result<Vec<u8>, ClientError> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Default)]
pub struct PlaceholderTranscriber;

#[async_trait]
impl Transcriber for PlaceholderTranscriber {
    async fn transcribe(&self, audio: Vec<u8>) -> Result<String, ClientError> {
        debug!(bytes = audio.len(), "simulating transcription");
        tokio::time::sleep(TRANSCRIPTION_DELAY).await;
        Ok(TRANSCRIPTION_PLACEHOLDER.to_owned())
    }
}

#[derive(Debug)]
pub struct VoiceRecorder {
    microphone: Arc<dyn Microphone>,
    transcriber: Arc<dyn Transcriber>,
    recording: bool,
}

impl VoiceRecorder {
    pub fn new(microphone: Arc<dyn Microphone>, transcriber: Arc<dyn Transcriber>) -> Self {
        Self { microphone, transcriber, recording: false }
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Start capture. Returns text for the draft right away when the
    /// microphone cannot be opened.
    pub async fn press(&mut self) -> Option<String> {
        if self.recording {
            return None;
        }
        match self.microphone.start().await {
            Ok(()) => {
                self.recording = true;
                None
            }
            Err(e) => {
                warn!(error = %e, "microphone unavailable");
                Some(MICROPHONE_UNAVAILABLE.to_owned())
            }
        }
    }

    /// Stop capture and transcribe. `Ok(None)` when nothing was recording.
    pub async fn release(&mut self) -> Result<Option<String>, ClientError> {
        if !std::mem::take(&mut self.recording) {
            return Ok(None);
        }
        let audio = self.microphone.stop().await?;
        let text = self.transcriber.transcribe(audio).await?;
        Ok(Some(text))
    }
}
