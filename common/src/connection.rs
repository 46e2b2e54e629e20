use crate::error::ApiError;

/// Client-side reachability of the status endpoint, as seen by the last poll.
/// Independent of the `wifi` flag the server reports about itself.
#[derive(Debug, Clone, Default)]
pub struct ConnectionSupervisor {
    online: bool,
    last_failure: Option<ApiError>,
    consecutive_failures: u32,
}

impl ConnectionSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report_success(&mut self) {
        self.online = true;
        self.consecutive_failures = 0;
    }

    pub fn report_failure(&mut self, cause: ApiError) {
        self.online = false;
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_failure = Some(cause);
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    /// Most recent poll failure, kept for diagnostics after recovery too.
    pub fn last_failure(&self) -> Option<&ApiError> {
        self.last_failure.as_ref()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}
