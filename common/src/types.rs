use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceName {
    Fan,
    Ac,
    Light,
}

impl DeviceName {
    pub const ALL: [DeviceName; 3] = [Self::Fan, Self::Ac, Self::Light];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fan => "fan",
            Self::Ac => "ac",
            Self::Light => "light",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Fan => "Fan",
            Self::Ac => "Air Conditioner",
            Self::Light => "Smart Light",
        }
    }
}

impl fmt::Display for DeviceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceName {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fan" => Ok(Self::Fan),
            "ac" => Ok(Self::Ac),
            "light" => Ok(Self::Light),
            _ => Err(ParseError::UnknownDevice(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceAction {
    On,
    Off,
    Auto,
}

impl DeviceAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
            Self::Auto => "auto",
        }
    }
}

impl fmt::Display for DeviceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceAction {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "on" => Ok(Self::On),
            "off" => Ok(Self::Off),
            "auto" => Ok(Self::Auto),
            _ => Err(ParseError::UnknownAction(value.to_string())),
        }
    }
}

/// Mode shown for a device. Derived from [`DeviceState`], never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceMode {
    Auto,
    On,
    Off,
}

impl DeviceMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "Auto",
            Self::On => "On",
            Self::Off => "Off",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceState {
    pub status: bool,
    pub manual: bool,
}

impl DeviceState {
    pub fn mode(self) -> DeviceMode {
        match (self.manual, self.status) {
            (false, _) => DeviceMode::Auto,
            (true, true) => DeviceMode::On,
            (true, false) => DeviceMode::Off,
        }
    }
}

/// The fixed device set reported by the server. A key missing from the
/// payload reads as the default device state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Devices {
    pub fan: DeviceState,
    pub ac: DeviceState,
    pub light: DeviceState,
}

impl Devices {
    pub fn get(&self, name: DeviceName) -> DeviceState {
        match name {
            DeviceName::Fan => self.fan,
            DeviceName::Ac => self.ac,
            DeviceName::Light => self.light,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClimateReading {
    pub temperature: f64,
    pub humidity: f64,
}

/// One complete telemetry record as returned by the status endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub indoor: ClimateReading,
    pub outdoor: ClimateReading,
    #[serde(rename = "lightLevel")]
    pub light_level: f64,
    pub motion: bool,
    pub wifi: bool,
    #[serde(
        rename = "lastUpdate",
        default,
        deserialize_with = "deserialize_last_update"
    )]
    pub last_update: Option<DateTime<Utc>>,
    #[serde(default)]
    pub devices: Devices,
}

impl StateSnapshot {
    pub fn device(&self, name: DeviceName) -> DeviceState {
        self.devices.get(name)
    }
}

/// Accepts RFC 3339, a naive ISO-8601 timestamp (read as UTC), or anything
/// else as "unknown".
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn deserialize_last_update<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceCommand {
    pub device: DeviceName,
    pub action: DeviceAction,
}

impl DeviceCommand {
    pub fn new(device: DeviceName, action: DeviceAction) -> Self {
        Self { device, action }
    }
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.device, self.action)
    }
}

/// Read-only state handed to the renderer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineView {
    pub snapshot: StateSnapshot,
    pub online: bool,
    pub busy: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    CommandFailed { device: DeviceName },
}

impl Notification {
    pub fn message(&self) -> String {
        match self {
            Self::CommandFailed { device } => {
                format!("Failed to control {device}. Please try again.")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    use super::*;

    const SERVER_PAYLOAD: &str = r#"{
        "indoor": {"temperature": 27.4, "humidity": 61},
        "outdoor": {"temperature": 29.15, "humidity": 74},
        "lightLevel": 132.6,
        "motion": true,
        "wifi": true,
        "lastUpdate": "2024-05-01T10:15:30.123456",
        "devices": {
            "fan": {"status": true, "manual": true},
            "ac": {"status": false, "manual": false},
            "light": {"status": false, "manual": true}
        }
    }"#;

    #[test]
    fn parses_server_payload() {
        let snapshot: StateSnapshot = serde_json::from_str(SERVER_PAYLOAD).unwrap();

        assert_eq!(snapshot.indoor.temperature, 27.4);
        assert_eq!(snapshot.indoor.humidity, 61.0);
        assert_eq!(snapshot.outdoor.humidity, 74.0);
        assert_eq!(snapshot.light_level, 132.6);
        assert!(snapshot.motion);
        assert!(snapshot.wifi);
        assert_eq!(
            snapshot.last_update.map(|ts| ts.timestamp()),
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 15, 30).unwrap().timestamp())
        );
        assert_eq!(
            snapshot.devices,
            Devices {
                fan: DeviceState {
                    status: true,
                    manual: true
                },
                ac: DeviceState::default(),
                light: DeviceState {
                    status: false,
                    manual: true
                },
            }
        );
    }

    #[test]
    fn missing_device_reads_as_default() {
        let payload = r#"{
            "indoor": {"temperature": 0, "humidity": 0},
            "outdoor": {"temperature": 0, "humidity": 0},
            "lightLevel": 0,
            "motion": false,
            "wifi": false,
            "lastUpdate": "",
            "devices": {"fan": {"status": true, "manual": false}, "heater": {"status": true}}
        }"#;

        let snapshot: StateSnapshot = serde_json::from_str(payload).unwrap();

        assert_eq!(snapshot.device(DeviceName::Ac), DeviceState::default());
        assert_eq!(snapshot.device(DeviceName::Light), DeviceState::default());
        assert!(snapshot.device(DeviceName::Fan).status);
        assert_eq!(snapshot.last_update, None);
    }

    #[test]
    fn rejects_payload_missing_readings() {
        let payload = r#"{"motion": false, "wifi": true}"#;
        assert!(serde_json::from_str::<StateSnapshot>(payload).is_err());
    }

    #[test]
    fn timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 10, 15, 30).unwrap();

        assert_eq!(parse_timestamp("2024-05-01T10:15:30"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-01T10:15:30Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-01T12:15:30+02:00"), Some(expected));
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn serialized_snapshot_reads_back_identically() {
        let snapshot: StateSnapshot = serde_json::from_str(SERVER_PAYLOAD).unwrap();
        let encoded = serde_json::to_string(&snapshot).unwrap();
        let decoded: StateSnapshot = serde_json::from_str(&encoded).unwrap();

        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn mode_is_derived_from_status_and_manual() {
        let auto_on = DeviceState {
            status: true,
            manual: false,
        };
        let manual_on = DeviceState {
            status: true,
            manual: true,
        };
        let manual_off = DeviceState {
            status: false,
            manual: true,
        };

        assert_eq!(DeviceState::default().mode(), DeviceMode::Auto);
        assert_eq!(auto_on.mode(), DeviceMode::Auto);
        assert_eq!(manual_on.mode().as_str(), "On");
        assert_eq!(manual_off.mode().as_str(), "Off");
    }

    #[test]
    fn parses_names_and_actions() {
        assert_eq!("fan".parse::<DeviceName>(), Ok(DeviceName::Fan));
        assert_eq!(" AC ".parse::<DeviceName>(), Ok(DeviceName::Ac));
        assert_eq!("auto".parse::<DeviceAction>(), Ok(DeviceAction::Auto));
        assert_eq!(
            "heater".parse::<DeviceName>(),
            Err(ParseError::UnknownDevice("heater".to_string()))
        );
        assert_eq!(
            "toggle".parse::<DeviceAction>(),
            Err(ParseError::UnknownAction("toggle".to_string()))
        );
    }

    #[test]
    fn failure_notification_names_device() {
        let notification = Notification::CommandFailed {
            device: DeviceName::Light,
        };
        assert_eq!(
            notification.message(),
            "Failed to control light. Please try again."
        );
    }
}
