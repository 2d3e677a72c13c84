//! Capabilities the reading controller consumes: a speech device and a
//! playback settings provider.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Rate and volume applied to an utterance.
///
/// `rate` is relative (1.0 = normal), `volume` ranges 0.0 to 1.0. Devices
/// clamp both to whatever they support.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize, TS)]
#[ts(export, export_to = "../guest-js/bindings/")]
#[serde(rename_all = "camelCase")]
pub struct VoiceSettings {
    pub rate: f32,
    pub volume: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            rate: 1.0,
            volume: 1.0,
        }
    }
}

/// Identifies one dispatched utterance: the session it belongs to and the
/// sentence index it speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UtteranceHandle {
    pub session: Uuid,
    pub index: usize,
}

/// One unit of text handed to a [`SpeechDevice`].
#[derive(Debug, Clone, Copy)]
pub struct Utterance<'a> {
    pub handle: UtteranceHandle,
    pub text: &'a str,
    pub settings: VoiceSettings,
}

/// Speech production failure reported by a device.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct DeviceError(pub String);

/// Asynchronous outcome of an utterance, delivered back to the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceSignal {
    Completed(UtteranceHandle),
    Failed(UtteranceHandle, DeviceError),
}

/// A speech-producing device that renders one utterance at a time.
///
/// `speak` returns once the utterance has been submitted; its outcome arrives
/// later as a [`DeviceSignal`] carrying the same handle. A synchronous `Err`
/// from `speak` means no signal will follow.
pub trait SpeechDevice {
    /// Feature-detection gate, checked before a session starts.
    fn is_available(&self) -> bool;

    fn speak(&mut self, utterance: Utterance<'_>) -> Result<(), DeviceError>;

    fn pause(&mut self);

    fn resume(&mut self);

    /// Best-effort cancel of whatever is in flight. Must not produce a signal
    /// the controller would mistake for a live one.
    fn cancel(&mut self);

    /// Whether audio is currently being produced.
    fn is_speaking(&self) -> bool;

    fn is_paused(&self) -> bool;

    /// Live-update the rate and volume of an in-flight utterance.
    fn apply_settings(&mut self, handle: UtteranceHandle, settings: VoiceSettings);
}

impl<D: SpeechDevice + ?Sized> SpeechDevice for Box<D> {
    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn speak(&mut self, utterance: Utterance<'_>) -> Result<(), DeviceError> {
        (**self).speak(utterance)
    }

    fn pause(&mut self) {
        (**self).pause()
    }

    fn resume(&mut self) {
        (**self).resume()
    }

    fn cancel(&mut self) {
        (**self).cancel()
    }

    fn is_speaking(&self) -> bool {
        (**self).is_speaking()
    }

    fn is_paused(&self) -> bool {
        (**self).is_paused()
    }

    fn apply_settings(&mut self, handle: UtteranceHandle, settings: VoiceSettings) {
        (**self).apply_settings(handle, settings)
    }
}

/// A device that never speaks. Every start against it reports "unsupported".
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableDevice;

impl SpeechDevice for UnavailableDevice {
    fn is_available(&self) -> bool {
        false
    }

    fn speak(&mut self, _utterance: Utterance<'_>) -> Result<(), DeviceError> {
        Err(DeviceError("speech synthesis is not available".to_string()))
    }

    fn pause(&mut self) {}

    fn resume(&mut self) {}

    fn cancel(&mut self) {}

    fn is_speaking(&self) -> bool {
        false
    }

    fn is_paused(&self) -> bool {
        false
    }

    fn apply_settings(&mut self, _handle: UtteranceHandle, _settings: VoiceSettings) {}
}

/// Supplies the current playback settings, read fresh at every dispatch.
pub trait SettingsProvider {
    fn current(&self) -> VoiceSettings;
}

/// Cloneable settings store shared between the command layer and the
/// controller.
#[derive(Debug, Clone, Default)]
pub struct SharedSettings(Arc<RwLock<VoiceSettings>>);

impl SharedSettings {
    pub fn new(settings: VoiceSettings) -> Self {
        Self(Arc::new(RwLock::new(settings)))
    }

    pub fn set(&self, settings: VoiceSettings) {
        match self.0.write() {
            Ok(mut guard) => *guard = settings,
            Err(poisoned) => *poisoned.into_inner() = settings,
        }
    }
}

impl SettingsProvider for SharedSettings {
    fn current(&self) -> VoiceSettings {
        match self.0.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
