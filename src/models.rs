use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::device::VoiceSettings;

/// Default maximum text length in bytes (1MB)
pub const DEFAULT_MAX_TEXT_LENGTH: usize = 1_000_000;

/// Plugin configuration read from `plugins.read-aloud` in `tauri.conf.json`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Initial speech rate (1.0 = normal)
    #[serde(default = "default_rate")]
    pub rate: f32,
    /// Initial volume (0.0 to 1.0)
    #[serde(default = "default_volume")]
    pub volume: f32,
    /// Largest text accepted by `start`, in bytes
    #[serde(default = "default_max_text_length")]
    pub max_text_length: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rate: default_rate(),
            volume: default_volume(),
            max_text_length: default_max_text_length(),
        }
    }
}

impl Config {
    pub fn initial_settings(&self) -> VoiceSettings {
        VoiceSettings {
            rate: self.rate,
            volume: self.volume,
        }
    }
}

fn default_rate() -> f32 {
    1.0
}
fn default_volume() -> f32 {
    1.0
}
fn default_max_text_length() -> usize {
    DEFAULT_MAX_TEXT_LENGTH
}

/// Lifecycle state of the reading session.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "../guest-js/bindings/")]
#[serde(rename_all = "lowercase")]
pub enum ReadingStatus {
    #[default]
    Idle,
    Reading,
    Paused,
    Finished,
}

impl ReadingStatus {
    /// Whether a session is in progress (`start` would be a no-op).
    pub fn is_active(self) -> bool {
        matches!(self, ReadingStatus::Reading | ReadingStatus::Paused)
    }
}

/// One-shot lifecycle notification.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, TS)]
#[ts(export, export_to = "../guest-js/bindings/")]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Notice {
    #[serde(rename_all = "camelCase")]
    Started { total_sentences: u32 },
    Paused,
    Resumed,
    Stopped,
    Finished,
    Error { reason: String },
    Unsupported,
    NothingToRead,
}

/// Emitted after each non-blank sentence completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, TS)]
#[ts(export, export_to = "../guest-js/bindings/")]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub sentences_read: u32,
    pub total_sentences: u32,
}

impl ProgressEvent {
    pub fn new(sentences_read: usize, total_sentences: usize) -> Self {
        Self {
            sentences_read: saturating_u32(sentences_read),
            total_sentences: saturating_u32(total_sentences),
        }
    }
}

pub(crate) fn saturating_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

#[derive(Debug, Clone, Deserialize, Serialize, TS)]
#[ts(export, export_to = "../guest-js/bindings/")]
#[serde(rename_all = "camelCase")]
pub struct StartOptions {
    /// The text to read aloud
    pub text: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, TS)]
#[ts(export, export_to = "../guest-js/bindings/")]
#[serde(rename_all = "camelCase")]
pub struct SettingsOptions {
    /// Speech rate (1.0 = normal)
    pub rate: f32,
    /// Volume (0.0 = silent, 1.0 = full volume)
    pub volume: f32,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    /// The text to read aloud
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsRequest {
    /// Speech rate (1.0 = normal)
    #[serde(default = "default_rate")]
    pub rate: f32,
    /// Volume (0.0 = silent, 1.0 = full volume)
    #[serde(default = "default_volume")]
    pub volume: f32,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ValidationError {
    #[error("Text too long: {len} bytes (max: {max})")]
    TextTooLong { len: usize, max: usize },
    #[error("Invalid {name}: must be a finite number")]
    InvalidSetting { name: &'static str },
}

impl StartRequest {
    /// Emptiness is not checked here; the controller reports it as
    /// "nothing to read".
    pub fn validate(&self, max_text_length: usize) -> Result<&str, ValidationError> {
        if self.text.len() > max_text_length {
            return Err(ValidationError::TextTooLong {
                len: self.text.len(),
                max: max_text_length,
            });
        }
        Ok(&self.text)
    }
}

impl SettingsRequest {
    pub fn validate(&self) -> Result<VoiceSettings, ValidationError> {
        if !self.rate.is_finite() {
            return Err(ValidationError::InvalidSetting { name: "rate" });
        }
        if !self.volume.is_finite() {
            return Err(ValidationError::InvalidSetting { name: "volume" });
        }
        Ok(VoiceSettings {
            rate: self.rate,
            volume: self.volume,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, TS)]
#[ts(export, export_to = "../guest-js/bindings/")]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: ReadingStatus,
    /// Index of the next sentence to speak
    pub cursor: u32,
    /// Number of segments in the current session (0 when idle)
    pub total_sentences: u32,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponse {
    pub available: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.rate, 1.0);
        assert_eq!(config.volume, 1.0);
        assert_eq!(config.max_text_length, DEFAULT_MAX_TEXT_LENGTH);
    }

    #[test]
    fn test_config_full() {
        let json = r#"{"rate": 1.25, "volume": 0.5, "maxTextLength": 2048}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.max_text_length, 2048);
        assert_eq!(
            config.initial_settings(),
            VoiceSettings {
                rate: 1.25,
                volume: 0.5
            }
        );
    }

    #[test]
    fn test_notice_serialization() {
        let json = serde_json::to_string(&Notice::Error {
            reason: "device lost".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"error","reason":"device lost"}"#);

        let json = serde_json::to_string(&Notice::NothingToRead).unwrap();
        assert_eq!(json, r#"{"type":"nothingToRead"}"#);

        let json = serde_json::to_string(&Notice::Started { total_sentences: 3 }).unwrap();
        assert_eq!(json, r#"{"type":"started","totalSentences":3}"#);
    }

    #[test]
    fn test_progress_event_serialization() {
        let json = serde_json::to_string(&ProgressEvent::new(1, 3)).unwrap();
        assert_eq!(json, r#"{"sentencesRead":1,"totalSentences":3}"#);
    }

    #[test]
    fn test_status_response_serialization() {
        let response = StatusResponse {
            status: ReadingStatus::Paused,
            cursor: 2,
            total_sentences: 5,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"paused\""));
        assert!(json.contains("\"totalSentences\":5"));
    }

    #[test]
    fn test_start_request_defaults() {
        let request: StartRequest = serde_json::from_str("{}").unwrap();
        assert!(request.text.is_empty());
        assert!(request.validate(DEFAULT_MAX_TEXT_LENGTH).is_ok());
    }

    #[test]
    fn test_validation_text_too_long() {
        let request = StartRequest {
            text: "x".repeat(11),
        };

        let result = request.validate(10);
        assert!(matches!(
            result.unwrap_err(),
            ValidationError::TextTooLong { len: 11, max: 10 }
        ));
    }

    #[test]
    fn test_settings_request_defaults() {
        let request: SettingsRequest = serde_json::from_str(r#"{"rate": 2.0}"#).unwrap();
        let settings = request.validate().unwrap();
        assert_eq!(settings.rate, 2.0);
        assert_eq!(settings.volume, 1.0);
    }

    #[test]
    fn test_settings_request_rejects_non_finite() {
        let request = SettingsRequest {
            rate: f32::NAN,
            volume: 1.0,
        };
        assert!(matches!(
            request.validate().unwrap_err(),
            ValidationError::InvalidSetting { name: "rate" }
        ));

        let request = SettingsRequest {
            rate: 1.0,
            volume: f32::INFINITY,
        };
        assert!(matches!(
            request.validate().unwrap_err(),
            ValidationError::InvalidSetting { name: "volume" }
        ));
    }

    #[test]
    fn test_settings_request_passes_out_of_range_values() {
        // Range clamping belongs to the device.
        let request = SettingsRequest {
            rate: 99.0,
            volume: -1.0,
        };
        let settings = request.validate().unwrap();
        assert_eq!(settings.rate, 99.0);
        assert_eq!(settings.volume, -1.0);
    }

    #[test]
    fn test_reading_status_active() {
        assert!(ReadingStatus::Reading.is_active());
        assert!(ReadingStatus::Paused.is_active());
        assert!(!ReadingStatus::Idle.is_active());
        assert!(!ReadingStatus::Finished.is_active());
    }
}
