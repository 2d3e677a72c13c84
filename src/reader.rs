use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, Weak};

use tauri::{AppHandle, Emitter, Runtime};

use crate::controller::{ReadingController, ReadingObserver};
use crate::device::{DeviceSignal, SharedSettings, SpeechDevice};
use crate::models::*;

/// Speech device as held by the plugin state.
pub type BoxedDevice = Box<dyn SpeechDevice + Send>;

type Controller<R> = ReadingController<BoxedDevice, SharedSettings, EventEmitter<R>>;

/// Forwards controller notifications to the webview as Tauri events.
pub(crate) struct EventEmitter<R: Runtime> {
    app: AppHandle<R>,
}

impl<R: Runtime> EventEmitter<R> {
    fn emit<T: serde::Serialize + Clone>(&self, event_name: &str, payload: T) {
        let full_event_name = format!("read-aloud://{}", event_name);
        if let Err(e) = self.app.emit(&full_event_name, payload) {
            log::warn!("Failed to emit read-aloud event '{}': {}", event_name, e);
        }
    }
}

impl<R: Runtime> ReadingObserver for EventEmitter<R> {
    fn progress(&self, event: ProgressEvent) {
        self.emit("progress", event);
    }

    fn notice(&self, notice: Notice) {
        self.emit("notice", notice);
    }
}

/// Access to the read-aloud APIs.
pub struct ReadAloud<R: Runtime> {
    controller: Arc<Mutex<Controller<R>>>,
    settings: SharedSettings,
    config: Config,
}

impl<R: Runtime> ReadAloud<R> {
    pub(crate) fn new(app: &AppHandle<R>, device: BoxedDevice, config: Config) -> Self {
        let settings = SharedSettings::new(config.initial_settings());
        let emitter = EventEmitter { app: app.clone() };
        Self {
            controller: Arc::new(Mutex::new(ReadingController::new(
                device,
                settings.clone(),
                emitter,
            ))),
            settings,
            config,
        }
    }

    /// Deliver device signals to the controller on a dedicated thread, so
    /// device callbacks never run under the controller lock.
    ///
    /// The thread holds only a weak reference: it exits on the first signal
    /// after the plugin state is dropped, or when the channel closes.
    pub(crate) fn spawn_signal_pump(&self, signals: Receiver<DeviceSignal>) -> crate::Result<()> {
        let controller: Weak<Mutex<Controller<R>>> = Arc::downgrade(&self.controller);
        std::thread::Builder::new()
            .name("read-aloud-signals".to_string())
            .spawn(move || {
                for signal in signals {
                    let Some(controller) = controller.upgrade() else {
                        log::debug!("Read-aloud state dropped, stopping signal pump");
                        return;
                    };
                    match controller.lock() {
                        Ok(mut controller) => controller.handle_signal(signal),
                        Err(_) => {
                            log::warn!("Read-aloud controller poisoned, dropping device signals");
                            return;
                        }
                    };
                }
                log::debug!("Read-aloud signal channel closed");
            })?;
        Ok(())
    }

    /// Helper to acquire the controller lock with proper error handling
    fn with_controller<T, F>(&self, f: F) -> crate::Result<T>
    where
        F: FnOnce(&mut Controller<R>) -> T,
    {
        let mut controller = self
            .controller
            .lock()
            .map_err(|_| crate::Error::MutexPoisoned)?;
        Ok(f(&mut controller))
    }

    pub fn start(&self, payload: StartRequest) -> crate::Result<StatusResponse> {
        // Validate input first (before acquiring lock)
        let text = payload.validate(self.config.max_text_length)?;

        self.with_controller(|controller| -> crate::Result<StatusResponse> {
            controller.start(text)?;
            Ok(controller.status())
        })?
    }

    pub fn stop(&self) -> crate::Result<StatusResponse> {
        self.with_controller(|controller| {
            controller.stop();
            controller.status()
        })
    }

    pub fn toggle_pause(&self) -> crate::Result<StatusResponse> {
        self.with_controller(|controller| -> crate::Result<StatusResponse> {
            controller.toggle_pause()?;
            Ok(controller.status())
        })?
    }

    pub fn update_settings(&self, payload: SettingsRequest) -> crate::Result<StatusResponse> {
        let settings = payload.validate()?;
        self.settings.set(settings);

        self.with_controller(|controller| {
            controller.update_settings(settings);
            controller.status()
        })
    }

    pub fn status(&self) -> crate::Result<StatusResponse> {
        self.with_controller(|controller| controller.status())
    }

    pub fn is_available(&self) -> crate::Result<AvailabilityResponse> {
        self.with_controller(|controller| AvailabilityResponse {
            available: controller.is_available(),
        })
    }
}
