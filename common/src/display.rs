//! Presentation values derived from a snapshot. Computed on read, never stored.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::types::{DeviceName, StateSnapshot};

pub const BRIGHT_LUX_THRESHOLD: f64 = 100.0;

pub fn temperature_label(celsius: f64) -> String {
    format!("{celsius:.1}°C")
}

pub fn humidity_label(percent: f64) -> String {
    format!("{percent:.1}%")
}

pub fn light_label(level: f64) -> String {
    format!("{} lux", level.round() as i64)
}

pub fn is_bright(level: f64) -> bool {
    level > BRIGHT_LUX_THRESHOLD
}

pub fn motion_label(motion: bool) -> &'static str {
    if motion {
        "DETECTED"
    } else {
        "CLEAR"
    }
}

pub fn wifi_label(wifi: bool) -> &'static str {
    if wifi {
        "Connected"
    } else {
        "Offline"
    }
}

pub fn connection_label(online: bool) -> &'static str {
    if online {
        "Online"
    } else {
        "Offline"
    }
}

/// Wall-clock time of the server's last update in `timezone`, or `--` when the
/// server has not reported one.
pub fn last_update_label(last_update: Option<DateTime<Utc>>, timezone: Tz) -> String {
    match last_update {
        Some(ts) => ts.with_timezone(&timezone).format("%H:%M:%S").to_string(),
        None => "--".to_string(),
    }
}

pub fn device_line(snapshot: &StateSnapshot, name: DeviceName) -> String {
    let device = snapshot.device(name);
    format!(
        "{:<16} {:<4} Mode: {}",
        name.display_name(),
        if device.status { "ON" } else { "off" },
        device.mode().as_str()
    )
}
