use std::sync::mpsc::{self, Sender};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use tauri::{plugin::PluginApi, AppHandle, Runtime};
use tts::{Features, Tts as TtsEngine, UtteranceId};

use crate::device::{
    DeviceError, DeviceSignal, SpeechDevice, Utterance, UtteranceHandle, VoiceSettings,
};
use crate::models::Config;
use crate::reader::ReadAloud;

/// Normalize user rate (1.0 = normal) to platform-specific rate
/// Each platform has different rate scales:
/// - AVFoundation (macOS): 0.1-2.0, normal = 0.5
/// - WinRT (Windows): 0.5-6.0, normal = 1.0
/// - SpeechDispatcher (Linux): -100 to 100, normal = 0.0
/// - AppKit (macOS legacy): 10-500, normal = 175.0
fn normalize_rate(user_rate: f32, min: f32, normal: f32, max: f32) -> f32 {
    if user_rate <= 1.0 {
        // 0.25-1.0 → min-normal
        let t = ((user_rate - 0.25) / 0.75).clamp(0.0, 1.0);
        min + t * (normal - min)
    } else {
        // 1.0-4.0 → normal-max
        let t = ((user_rate - 1.0) / 3.0).clamp(0.0, 1.0);
        normal + t * (max - normal)
    }
}

/// Map a 0.0-1.0 volume onto the platform range.
fn normalize_volume(user_volume: f32, min: f32, max: f32) -> f32 {
    min + user_volume.clamp(0.0, 1.0) * (max - min)
}

fn configure(engine: &mut TtsEngine, settings: VoiceSettings) {
    let rate = normalize_rate(
        settings.rate,
        engine.min_rate(),
        engine.normal_rate(),
        engine.max_rate(),
    );
    if let Err(e) = engine.set_rate(rate) {
        log::warn!("Failed to set speech rate {}: {}", rate, e);
    }

    let volume = normalize_volume(settings.volume, engine.min_volume(), engine.max_volume());
    if let Err(e) = engine.set_volume(volume) {
        log::warn!("Failed to set speech volume {}: {}", volume, e);
    }
}

fn engine_key(id: &UtteranceId) -> String {
    format!("{:?}", id)
}

/// The utterance the engine is currently speaking for the controller.
#[derive(Debug)]
struct Pending {
    handle: UtteranceHandle,
    /// Debug rendering of the engine id, once `speak` has returned one.
    /// Engine ids are not `Send` on every platform.
    key: Option<String>,
}

/// Maps engine callbacks, keyed by engine id, back to controller handles.
#[derive(Debug, Default)]
struct UtteranceTracker {
    pending: Option<Pending>,
    /// Keys of utterances dropped by `cancel` whose engine callbacks may still
    /// arrive.
    cancelled: HashSet<String>,
}

impl UtteranceTracker {
    fn begin(&mut self, handle: UtteranceHandle) {
        self.pending = Some(Pending { handle, key: None });
    }

    fn assign_key(&mut self, handle: UtteranceHandle, key: Option<String>) {
        if let Some(pending) = self.pending.as_mut().filter(|p| p.handle == handle) {
            pending.key = key;
        }
    }

    fn forget(&mut self) {
        self.pending = None;
    }

    fn cancel(&mut self) {
        if let Some(key) = self.pending.take().and_then(|p| p.key) {
            self.cancelled.insert(key);
        }
    }

    fn current(&self) -> Option<UtteranceHandle> {
        self.pending.as_ref().map(|p| p.handle)
    }

    /// Natural completion. An unkeyed pending utterance matches any key: the
    /// end callback can fire before `speak` has returned the engine id.
    fn on_end(&mut self, key: &str) -> Option<UtteranceHandle> {
        if self.cancelled.remove(key) {
            return None;
        }
        let matches = self
            .pending
            .as_ref()
            .is_some_and(|p| p.key.as_deref().map_or(true, |pending| pending == key));
        if matches {
            self.pending.take().map(|p| p.handle)
        } else {
            None
        }
    }

    /// Interruption the controller did not ask for. Only an exact key match
    /// counts.
    fn on_stop(&mut self, key: &str) -> Option<UtteranceHandle> {
        if self.cancelled.remove(key) {
            return None;
        }
        let matches = self
            .pending
            .as_ref()
            .is_some_and(|p| p.key.as_deref() == Some(key));
        if matches {
            self.pending.take().map(|p| p.handle)
        } else {
            None
        }
    }
}

type SharedTracker = Arc<Mutex<UtteranceTracker>>;

fn lock_tracker(tracker: &SharedTracker) -> MutexGuard<'_, UtteranceTracker> {
    match tracker.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Speech device over the native OS engine.
///
/// The engine cannot pause, so `pause`/`resume` are no-ops and a pause takes
/// effect at the next sentence boundary.
pub(crate) struct TtsDevice {
    engine: Option<TtsEngine>,
    tracker: SharedTracker,
}

impl TtsDevice {
    fn new(signals: Sender<DeviceSignal>) -> Self {
        let tracker = SharedTracker::default();

        let engine = match TtsEngine::default() {
            Ok(engine) => engine,
            Err(e) => {
                #[cfg(target_os = "linux")]
                log::warn!(
                    "Speech engine unavailable ({}). On Linux, install speech-dispatcher:\n\
                    Ubuntu/Debian: sudo apt install speech-dispatcher\n\
                    Fedora: sudo dnf install speech-dispatcher\n\
                    Arch: sudo pacman -S speech-dispatcher",
                    e
                );
                #[cfg(not(target_os = "linux"))]
                log::warn!("Speech engine unavailable: {}", e);
                return Self {
                    engine: None,
                    tracker,
                };
            }
        };

        let Features {
            utterance_callbacks,
            ..
        } = engine.supported_features();

        if !utterance_callbacks {
            log::warn!("Speech engine does not support utterance callbacks - read-aloud disabled");
            return Self {
                engine: None,
                tracker,
            };
        }

        let end_tracker = Arc::clone(&tracker);
        let end_signals = signals.clone();
        // Natural completion
        if let Err(e) = engine.on_utterance_end(Some(Box::new(move |utterance_id| {
            let handle = lock_tracker(&end_tracker).on_end(&engine_key(&utterance_id));
            if let Some(handle) = handle {
                let _ = end_signals.send(DeviceSignal::Completed(handle));
            }
        }))) {
            log::warn!("Failed to set on_utterance_end callback: {:?}", e);
            return Self {
                engine: None,
                tracker,
            };
        }

        // Interrupted by something other than our own cancel
        let stop_tracker = Arc::clone(&tracker);
        if let Err(e) = engine.on_utterance_stop(Some(Box::new(move |utterance_id| {
            let handle = lock_tracker(&stop_tracker).on_stop(&engine_key(&utterance_id));
            if let Some(handle) = handle {
                let _ = signals.send(DeviceSignal::Failed(
                    handle,
                    DeviceError("utterance interrupted".to_string()),
                ));
            }
        }))) {
            log::warn!("Failed to set on_utterance_stop callback: {:?}", e);
        }

        log::info!("Read-aloud speech engine ready");
        Self {
            engine: Some(engine),
            tracker,
        }
    }
}

impl SpeechDevice for TtsDevice {
    fn is_available(&self) -> bool {
        self.engine.is_some()
    }

    fn speak(&mut self, utterance: Utterance<'_>) -> Result<(), DeviceError> {
        let Some(engine) = self.engine.as_mut() else {
            return Err(DeviceError("speech engine is not available".to_string()));
        };
        configure(engine, utterance.settings);

        // Registered before speaking: the end callback may fire before
        // `speak` returns for very short utterances.
        lock_tracker(&self.tracker).begin(utterance.handle);

        match engine.speak(utterance.text, false) {
            Ok(id) => {
                lock_tracker(&self.tracker)
                    .assign_key(utterance.handle, id.as_ref().map(engine_key));
                Ok(())
            }
            Err(e) => {
                lock_tracker(&self.tracker).forget();
                Err(DeviceError(e.to_string()))
            }
        }
    }

    fn pause(&mut self) {
        log::debug!("Speech engine cannot pause mid-utterance; holding at sentence boundary");
    }

    fn resume(&mut self) {}

    fn cancel(&mut self) {
        // Recorded before stopping so the engine's stop callback is dropped.
        lock_tracker(&self.tracker).cancel();
        if let Some(engine) = self.engine.as_mut() {
            if let Err(e) = engine.stop() {
                log::warn!("Failed to stop speech engine: {}", e);
            }
        }
    }

    fn is_speaking(&self) -> bool {
        self.engine
            .as_ref()
            .is_some_and(|engine| engine.is_speaking().unwrap_or(false))
    }

    fn is_paused(&self) -> bool {
        false
    }

    fn apply_settings(&mut self, handle: UtteranceHandle, settings: VoiceSettings) {
        if lock_tracker(&self.tracker).current() != Some(handle) {
            return;
        }
        if let Some(engine) = self.engine.as_mut() {
            configure(engine, settings);
        }
    }
}

pub fn init<R: Runtime>(
    app: &AppHandle<R>,
    api: PluginApi<R, Option<Config>>,
) -> crate::Result<ReadAloud<R>> {
    let config = api.config().clone().unwrap_or_default();
    let (signals, receiver) = mpsc::channel();

    let reader = ReadAloud::new(app, Box::new(TtsDevice::new(signals)), config);
    reader.spawn_signal_pump(receiver)?;
    Ok(reader)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_rate_anchors() {
        // SpeechDispatcher scale
        assert_eq!(normalize_rate(1.0, -100.0, 0.0, 100.0), 0.0);
        assert_eq!(normalize_rate(0.25, -100.0, 0.0, 100.0), -100.0);
        assert_eq!(normalize_rate(4.0, -100.0, 0.0, 100.0), 100.0);
        // AVFoundation scale
        assert!((normalize_rate(1.0, 0.1, 0.5, 2.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_rate_clamps() {
        assert_eq!(normalize_rate(0.0, 0.5, 1.0, 6.0), 0.5);
        assert_eq!(normalize_rate(10.0, 0.5, 1.0, 6.0), 6.0);
    }

    fn handle(index: usize) -> UtteranceHandle {
        UtteranceHandle {
            session: uuid::Uuid::new_v4(),
            index,
        }
    }

    fn speaking(tracker: &mut UtteranceTracker, handle: UtteranceHandle, key: &str) {
        tracker.begin(handle);
        tracker.assign_key(handle, Some(key.to_string()));
    }

    #[test]
    fn test_end_callback_completes_pending_utterance() {
        let mut tracker = UtteranceTracker::default();
        let first = handle(0);
        speaking(&mut tracker, first, "SpeechDispatcher(1)");

        assert_eq!(tracker.on_end("SpeechDispatcher(1)"), Some(first));
        assert_eq!(tracker.current(), None);
        // Delivered once only.
        assert_eq!(tracker.on_end("SpeechDispatcher(1)"), None);
    }

    #[test]
    fn test_end_callback_before_key_is_assigned() {
        let mut tracker = UtteranceTracker::default();
        let first = handle(0);
        tracker.begin(first);

        assert_eq!(tracker.on_end("SpeechDispatcher(7)"), Some(first));
    }

    #[test]
    fn test_uncancelled_stop_interrupts_pending_utterance() {
        let mut tracker = UtteranceTracker::default();
        let first = handle(0);
        speaking(&mut tracker, first, "SpeechDispatcher(1)");

        assert_eq!(tracker.on_stop("SpeechDispatcher(1)"), Some(first));
        assert_eq!(tracker.current(), None);
    }

    #[test]
    fn test_mismatched_key_is_ignored() {
        let mut tracker = UtteranceTracker::default();
        let first = handle(0);
        speaking(&mut tracker, first, "SpeechDispatcher(2)");

        assert_eq!(tracker.on_end("SpeechDispatcher(1)"), None);
        assert_eq!(tracker.on_stop("SpeechDispatcher(1)"), None);
        assert_eq!(tracker.current(), Some(first));
    }

    #[test]
    fn test_stop_after_cancel_is_dropped() {
        let mut tracker = UtteranceTracker::default();
        speaking(&mut tracker, handle(0), "SpeechDispatcher(1)");

        tracker.cancel();
        assert_eq!(tracker.current(), None);
        assert_eq!(tracker.on_stop("SpeechDispatcher(1)"), None);
        assert!(tracker.cancelled.is_empty());
    }

    #[test]
    fn test_late_stop_does_not_hit_next_unkeyed_utterance() {
        let mut tracker = UtteranceTracker::default();
        speaking(&mut tracker, handle(0), "SpeechDispatcher(1)");
        tracker.cancel();

        // The next session starts before the old stop callback arrives.
        let next = handle(0);
        tracker.begin(next);

        assert_eq!(tracker.on_stop("SpeechDispatcher(1)"), None);
        assert_eq!(tracker.current(), Some(next));

        tracker.assign_key(next, Some("SpeechDispatcher(2)".to_string()));
        assert_eq!(tracker.on_end("SpeechDispatcher(2)"), Some(next));
    }

    #[test]
    fn test_late_end_of_cancelled_utterance_is_dropped() {
        let mut tracker = UtteranceTracker::default();
        speaking(&mut tracker, handle(0), "SpeechDispatcher(1)");
        tracker.cancel();

        let next = handle(0);
        tracker.begin(next);

        assert_eq!(tracker.on_end("SpeechDispatcher(1)"), None);
        assert_eq!(tracker.current(), Some(next));
    }

    #[test]
    fn test_stop_never_matches_unkeyed_utterance() {
        let mut tracker = UtteranceTracker::default();
        let first = handle(0);
        tracker.begin(first);

        assert_eq!(tracker.on_stop("SpeechDispatcher(9)"), None);
        assert_eq!(tracker.current(), Some(first));
    }

    #[test]
    fn test_assign_key_ignores_replaced_handle() {
        let mut tracker = UtteranceTracker::default();
        let old = handle(0);
        let next = handle(1);
        tracker.begin(next);

        tracker.assign_key(old, Some("SpeechDispatcher(1)".to_string()));
        assert_eq!(tracker.on_stop("SpeechDispatcher(1)"), None);
        assert_eq!(tracker.current(), Some(next));
    }

    #[test]
    fn test_normalize_volume() {
        assert_eq!(normalize_volume(0.5, 0.0, 1.0), 0.5);
        assert_eq!(normalize_volume(2.0, 0.0, 100.0), 100.0);
        assert_eq!(normalize_volume(-1.0, -100.0, 100.0), -100.0);
    }
}
