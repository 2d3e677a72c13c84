const COMMANDS: &[&str] = &[
    "start",
    "stop",
    "toggle_pause",
    "update_settings",
    "status",
    "is_available",
];

fn main() {
    tauri_plugin::Builder::new(COMMANDS).build();
}
