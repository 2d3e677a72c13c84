//! The reading controller: sequences sentences through a [`SpeechDevice`] one
//! utterance at a time.
//!
//! The controller never blocks. A session advances when `start` kicks off the
//! drive loop and again whenever the device reports an utterance outcome via
//! [`ReadingController::handle_signal`]. Every signal is checked against the
//! handle of the utterance currently in flight, so signals from a stopped or
//! replaced session are dropped.

use uuid::Uuid;

use crate::device::{
    DeviceError, DeviceSignal, SettingsProvider, SpeechDevice, Utterance, UtteranceHandle,
    VoiceSettings,
};
use crate::models::{saturating_u32, Notice, ProgressEvent, ReadingStatus, StatusResponse};
use crate::segment::{is_blank, segment, utterance_text};

/// Receives progress and lifecycle notifications from a controller.
pub trait ReadingObserver {
    /// Called after each non-blank sentence completes.
    fn progress(&self, event: ProgressEvent);

    fn notice(&self, notice: Notice);
}

/// Why `start` refused to begin a session. Nothing changes state when this is
/// returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ReadError {
    #[error("No text to read")]
    NothingToRead,
    #[error("Text-to-speech is not supported on this device")]
    Unsupported,
}

impl ReadError {
    fn notice(self) -> Notice {
        match self {
            ReadError::NothingToRead => Notice::NothingToRead,
            ReadError::Unsupported => Notice::Unsupported,
        }
    }
}

#[derive(Debug)]
struct Session {
    id: Uuid,
    sentences: Vec<String>,
    /// Index of the next sentence to dispatch.
    cursor: usize,
    status: ReadingStatus,
    /// Utterance the device still owes a signal for.
    active: Option<UtteranceHandle>,
}

impl Session {
    fn owns(&self, handle: UtteranceHandle) -> bool {
        self.status.is_active() && self.active == Some(handle)
    }
}

pub struct ReadingController<D, S, O> {
    device: D,
    settings: S,
    observer: O,
    /// `None` means idle.
    session: Option<Session>,
    last_text: Option<String>,
}

impl<D, S, O> ReadingController<D, S, O>
where
    D: SpeechDevice,
    S: SettingsProvider,
    O: ReadingObserver,
{
    pub fn new(device: D, settings: S, observer: O) -> Self {
        Self {
            device,
            settings,
            observer,
            session: None,
            last_text: None,
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn is_available(&self) -> bool {
        self.device.is_available()
    }

    pub fn reading_status(&self) -> ReadingStatus {
        self.session
            .as_ref()
            .map_or(ReadingStatus::Idle, |session| session.status)
    }

    pub fn status(&self) -> StatusResponse {
        match &self.session {
            Some(session) => StatusResponse {
                status: session.status,
                cursor: saturating_u32(session.cursor),
                total_sentences: saturating_u32(session.sentences.len()),
            },
            None => StatusResponse::default(),
        }
    }

    /// Begin reading `text` from its first sentence.
    ///
    /// A no-op while a session is reading or paused.
    pub fn start(&mut self, text: &str) -> Result<(), ReadError> {
        if text.trim().is_empty() {
            return Err(self.reject(ReadError::NothingToRead));
        }
        if !self.device.is_available() {
            return Err(self.reject(ReadError::Unsupported));
        }
        if self.reading_status().is_active() {
            log::debug!("Ignoring start: a reading session is already active");
            return Ok(());
        }

        let sentences = segment(text);
        let total = sentences.len();
        let session = Session {
            id: Uuid::new_v4(),
            sentences,
            cursor: 0,
            status: ReadingStatus::Reading,
            active: None,
        };
        log::info!("Starting read-aloud session {} ({} sentences)", session.id, total);

        self.last_text = Some(text.to_owned());
        self.session = Some(session);
        self.observer.notice(Notice::Started {
            total_sentences: saturating_u32(total),
        });
        self.advance();
        Ok(())
    }

    /// Cancel the session, whatever its state. Idempotent when idle.
    pub fn stop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        if session.status.is_active() {
            self.device.cancel();
            log::info!(
                "Stopped read-aloud session {} at {}/{}",
                session.id,
                session.cursor,
                session.sentences.len()
            );
            self.observer.notice(Notice::Stopped);
        }
    }

    /// Pause while reading, resume while paused, otherwise restart the last
    /// text from the beginning.
    ///
    /// A pause that lands between utterances (or on a device that cannot pause
    /// mid-utterance) holds the drive loop at the next sentence boundary until
    /// resumed.
    pub fn toggle_pause(&mut self) -> Result<(), ReadError> {
        match self.session.as_mut() {
            Some(session) if session.status == ReadingStatus::Reading => {
                if session.active.is_some() && self.device.is_speaking() {
                    self.device.pause();
                }
                session.status = ReadingStatus::Paused;
                log::debug!("Paused read-aloud session {} at {}", session.id, session.cursor);
                self.observer.notice(Notice::Paused);
                Ok(())
            }
            Some(session) if session.status == ReadingStatus::Paused => {
                session.status = ReadingStatus::Reading;
                if self.device.is_paused() {
                    self.device.resume();
                }
                let held = session.active.is_none();
                log::debug!("Resumed read-aloud session {} at {}", session.id, session.cursor);
                self.observer.notice(Notice::Resumed);
                if held {
                    self.advance();
                }
                Ok(())
            }
            _ => {
                let text = self.last_text.clone().unwrap_or_default();
                self.start(&text)
            }
        }
    }

    /// Apply new settings to the utterance in flight. Without one, the next
    /// dispatch reads them from the settings provider anyway.
    pub fn update_settings(&mut self, settings: VoiceSettings) {
        if let Some(handle) = self.session.as_ref().and_then(|session| session.active) {
            self.device.apply_settings(handle, settings);
        }
    }

    pub fn handle_signal(&mut self, signal: DeviceSignal) {
        match signal {
            DeviceSignal::Completed(handle) => self.on_utterance_complete(handle),
            DeviceSignal::Failed(handle, error) => self.on_utterance_error(handle, error),
        }
    }

    pub fn on_utterance_complete(&mut self, handle: UtteranceHandle) {
        let Some(session) = self.session.as_mut().filter(|s| s.owns(handle)) else {
            log::debug!("Dropping stale completion for {:?}", handle);
            return;
        };

        session.active = None;
        session.cursor += 1;
        let event = ProgressEvent::new(session.cursor, session.sentences.len());
        self.observer.progress(event);
        self.advance();
    }

    pub fn on_utterance_error(&mut self, handle: UtteranceHandle, error: DeviceError) {
        if !self.session.as_ref().is_some_and(|s| s.owns(handle)) {
            log::debug!("Dropping stale error for {:?}: {}", handle, error);
            return;
        }
        self.abort(error);
    }

    fn reject(&self, error: ReadError) -> ReadError {
        log::info!("Cannot start reading: {}", error);
        self.observer.notice(error.notice());
        error
    }

    /// The drive loop. Dispatches at most one utterance and returns; it is
    /// re-entered from the completion of that utterance.
    fn advance(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        while session.status == ReadingStatus::Reading {
            let Some(sentence) = session.sentences.get(session.cursor) else {
                session.status = ReadingStatus::Finished;
                session.active = None;
                log::info!("Finished read-aloud session {}", session.id);
                self.observer.notice(Notice::Finished);
                return;
            };

            if is_blank(sentence) {
                session.cursor += 1;
                continue;
            }

            let handle = UtteranceHandle {
                session: session.id,
                index: session.cursor,
            };
            let text = utterance_text(sentence);
            let settings = self.settings.current();
            log::debug!(
                "Speaking sentence {}/{} of session {}",
                session.cursor + 1,
                session.sentences.len(),
                session.id
            );

            session.active = Some(handle);
            match self.device.speak(Utterance {
                handle,
                text: &text,
                settings,
            }) {
                Ok(()) => return,
                Err(error) => {
                    self.abort(error);
                    return;
                }
            }
        }
    }

    fn abort(&mut self, error: DeviceError) {
        if let Some(session) = self.session.as_mut() {
            session.status = ReadingStatus::Finished;
            session.active = None;
            log::warn!(
                "Read-aloud session {} aborted at sentence {}: {}",
                session.id,
                session.cursor,
                error
            );
        }
        self.observer.notice(Notice::Error {
            reason: error.to_string(),
        });
    }
}
