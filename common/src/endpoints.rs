use crate::types::DeviceCommand;

pub const STATUS_PATH: &str = "/status";
pub const DEVICE_PATH_PREFIX: &str = "/device";

pub fn status_url(base_url: &str) -> String {
    format!("{}{STATUS_PATH}", base_url.trim_end_matches('/'))
}

pub fn device_command_url(base_url: &str, command: DeviceCommand) -> String {
    format!(
        "{}{DEVICE_PATH_PREFIX}/{}/{}",
        base_url.trim_end_matches('/'),
        command.device,
        command.action
    )
}
