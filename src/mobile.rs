use tauri::{plugin::PluginApi, AppHandle, Runtime};

use crate::device::UnavailableDevice;
use crate::models::Config;
use crate::reader::ReadAloud;

// No native speech backend is bundled for mobile targets yet; every start
// reports "unsupported".
pub fn init<R: Runtime>(
    app: &AppHandle<R>,
    api: PluginApi<R, Option<Config>>,
) -> crate::Result<ReadAloud<R>> {
    let config = api.config().clone().unwrap_or_default();
    log::info!("Read-aloud has no speech backend on this platform");
    Ok(ReadAloud::new(app, Box::new(UnavailableDevice), config))
}
