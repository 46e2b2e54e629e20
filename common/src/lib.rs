pub mod config;
pub mod connection;
pub mod display;
pub mod endpoints;
pub mod error;
pub mod sync;
pub mod types;

pub use config::{ApiConfig, DisplayConfig, RuntimeConfig, SyncConfig};
pub use connection::ConnectionSupervisor;
pub use error::{ApiError, ParseError};
pub use sync::{EngineAction, GuardRejection, PollOutcome, SyncEngine};
pub use types::{
    ClimateReading, DeviceAction, DeviceCommand, DeviceMode, DeviceName, DeviceState, Devices,
    EngineView, Notification, StateSnapshot,
};
