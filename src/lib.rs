use tauri::{
    plugin::{Builder, TauriPlugin},
    Manager, Runtime,
};

pub use models::*;

#[cfg(desktop)]
mod desktop;
#[cfg(mobile)]
mod mobile;

mod commands;
mod error;
mod models;
mod reader;

pub mod controller;
pub mod device;
pub mod segment;

pub use controller::{ReadError, ReadingController, ReadingObserver};
pub use device::{
    DeviceError, DeviceSignal, SettingsProvider, SharedSettings, SpeechDevice, UnavailableDevice,
    Utterance, UtteranceHandle, VoiceSettings,
};
pub use error::{Error, Result};
pub use reader::{BoxedDevice, ReadAloud};

/// Extensions to [`tauri::App`], [`tauri::AppHandle`] and [`tauri::Window`] to access the read-aloud APIs.
pub trait ReadAloudExt<R: Runtime> {
    fn read_aloud(&self) -> &ReadAloud<R>;
}

impl<R: Runtime, T: Manager<R>> crate::ReadAloudExt<R> for T {
    fn read_aloud(&self) -> &ReadAloud<R> {
        self.state::<ReadAloud<R>>().inner()
    }
}

/// Initializes the plugin.
pub fn init<R: Runtime>() -> TauriPlugin<R, Option<Config>> {
    Builder::<R, Option<Config>>::new("read-aloud")
        .invoke_handler(tauri::generate_handler![
            commands::start,
            commands::stop,
            commands::toggle_pause,
            commands::update_settings,
            commands::status,
            commands::is_available
        ])
        .setup(|app, api| {
            #[cfg(mobile)]
            let reader = mobile::init(app, api)?;
            #[cfg(desktop)]
            let reader = desktop::init(app, api)?;
            app.manage(reader);
            Ok(())
        })
        .build()
}
