use crate::{
    config::SyncConfig,
    connection::ConnectionSupervisor,
    error::ApiError,
    types::{DeviceCommand, EngineView, Notification, StateSnapshot},
};

/// Side effects requested by the engine. The runtime performs them and feeds
/// the results back through [`SyncEngine::complete_poll`] and
/// [`SyncEngine::complete_command`].
#[derive(Debug, Clone, PartialEq)]
pub enum EngineAction {
    FetchStatus { seq: u64 },
    SendCommand(DeviceCommand),
    SchedulePoll { delay_ms: u64 },
    Notify(Notification),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Applied,
    Failed,
    Discarded,
}

/// Why a command intent was dropped without a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardRejection {
    Stopped,
    Busy,
    Offline,
}

#[derive(Debug, Clone)]
pub struct SyncEngine {
    pub config: SyncConfig,

    snapshot: StateSnapshot,
    connection: ConnectionSupervisor,
    running: bool,

    // At most one command in flight across all devices.
    in_flight: Option<DeviceCommand>,

    next_poll_seq: u64,
    last_completed_seq: u64,
    // Polls issued before the last stop carry a sequence below this.
    stale_floor: u64,
}

impl SyncEngine {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            snapshot: StateSnapshot::default(),
            connection: ConnectionSupervisor::new(),
            running: false,
            in_flight: None,
            next_poll_seq: 1,
            last_completed_seq: 0,
            stale_floor: 0,
        }
    }

    pub fn snapshot(&self) -> &StateSnapshot {
        &self.snapshot
    }

    pub fn connection(&self) -> &ConnectionSupervisor {
        &self.connection
    }

    pub fn is_online(&self) -> bool {
        self.connection.is_online()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn in_flight(&self) -> Option<DeviceCommand> {
        self.in_flight
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn view(&self) -> EngineView {
        EngineView {
            snapshot: self.snapshot.clone(),
            online: self.is_online(),
            busy: self.is_busy(),
        }
    }

    /// Activates polling. The first fetch is issued immediately.
    pub fn start(&mut self) -> Vec<EngineAction> {
        if self.running {
            return Vec::new();
        }
        self.running = true;
        vec![self.issue_poll()]
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.stale_floor = self.next_poll_seq;
    }

    /// A regular tick or an out-of-cycle request. No-op while stopped.
    pub fn poll_due(&mut self) -> Vec<EngineAction> {
        if !self.running {
            return Vec::new();
        }
        vec![self.issue_poll()]
    }

    pub fn complete_poll(
        &mut self,
        seq: u64,
        result: Result<StateSnapshot, ApiError>,
    ) -> PollOutcome {
        if !self.running || seq < self.stale_floor {
            return PollOutcome::Discarded;
        }
        if self.config.discard_stale_polls && seq <= self.last_completed_seq {
            return PollOutcome::Discarded;
        }
        self.last_completed_seq = self.last_completed_seq.max(seq);

        match result {
            Ok(snapshot) => {
                self.snapshot = snapshot;
                self.connection.report_success();
                PollOutcome::Applied
            }
            Err(err) => {
                self.connection.report_failure(err);
                PollOutcome::Failed
            }
        }
    }

    pub fn admit(&self) -> Result<(), GuardRejection> {
        if !self.running {
            Err(GuardRejection::Stopped)
        } else if self.is_busy() {
            Err(GuardRejection::Busy)
        } else if !self.is_online() {
            Err(GuardRejection::Offline)
        } else {
            Ok(())
        }
    }

    pub fn submit_command(
        &mut self,
        command: DeviceCommand,
    ) -> Result<Vec<EngineAction>, GuardRejection> {
        self.admit()?;
        self.in_flight = Some(command);
        Ok(vec![EngineAction::SendCommand(command)])
    }

    /// Clears the busy flag for every outcome. A completion with no command
    /// in flight is ignored.
    pub fn complete_command(&mut self, result: Result<(), ApiError>) -> Vec<EngineAction> {
        let Some(command) = self.in_flight.take() else {
            return Vec::new();
        };

        match result {
            Ok(()) if self.running => vec![EngineAction::SchedulePoll {
                delay_ms: self.config.resync_delay_ms,
            }],
            Ok(()) => Vec::new(),
            Err(_) => vec![EngineAction::Notify(Notification::CommandFailed {
                device: command.device,
            })],
        }
    }

    fn issue_poll(&mut self) -> EngineAction {
        let seq = self.next_poll_seq;
        self.next_poll_seq += 1;
        EngineAction::FetchStatus { seq }
    }
}
