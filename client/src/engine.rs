use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{broadcast, mpsc, oneshot, watch},
    task::{JoinHandle, JoinSet},
    time::{self, Instant, Interval, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use homedash_common::{
    ApiError, DeviceAction, DeviceCommand, DeviceName, EngineAction, EngineView, Notification,
    PollOutcome, StateSnapshot, SyncConfig, SyncEngine,
};

use crate::api::StatusApi;

const NOTIFICATION_CAPACITY: usize = 16;

enum Request {
    Start,
    Stop(oneshot::Sender<()>),
    Command(DeviceCommand),
    PollNow,
}

enum Completion {
    Poll {
        seq: u64,
        result: Result<StateSnapshot, ApiError>,
    },
    Command {
        result: Result<(), ApiError>,
    },
    ResyncDue {
        activation: u64,
    },
}

struct WorkerHandle {
    requests: mpsc::UnboundedSender<Request>,
    task: JoinHandle<()>,
}

/// Polls the status endpoint, publishes snapshots and dispatches device
/// commands. All mutation happens on one worker task; callers only read the
/// published [`EngineView`] and enqueue intents.
///
/// The worker lives as long as the engine. While stopped it no longer polls,
/// but a command already in flight still completes and clears `busy`.
///
/// [`start`](Self::start) must be called from within a tokio runtime.
pub struct DashboardEngine {
    config: SyncConfig,
    api: Arc<dyn StatusApi>,
    view_tx: watch::Sender<EngineView>,
    notify_tx: broadcast::Sender<Notification>,
    worker: Option<WorkerHandle>,
    running: bool,
}

impl DashboardEngine {
    pub fn new(config: SyncConfig, api: Arc<dyn StatusApi>) -> Self {
        let (view_tx, _) = watch::channel(SyncEngine::new(config.clone()).view());
        let (notify_tx, _) = broadcast::channel(NOTIFICATION_CAPACITY);

        Self {
            config,
            api,
            view_tx,
            notify_tx,
            worker: None,
            running: false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn view(&self) -> EngineView {
        self.view_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<EngineView> {
        self.view_tx.subscribe()
    }

    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.notify_tx.subscribe()
    }

    pub fn start(&mut self) {
        if self.running {
            return;
        }

        let worker = match self.worker.take() {
            Some(worker) if !worker.task.is_finished() => worker,
            ended => {
                if ended.is_some() {
                    warn!("dashboard engine worker ended abnormally, starting a fresh one");
                }
                self.spawn_worker()
            }
        };
        let _ = worker.requests.send(Request::Start);

        self.worker = Some(worker);
        self.running = true;
        info!(
            "dashboard engine started (poll every {} ms)",
            self.config.poll_interval_ms
        );
    }

    /// Cancels the poll timer and any poll in flight. Returns once the worker
    /// has acknowledged; nothing is published for polls issued before this
    /// call.
    pub async fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;

        let Some(worker) = &self.worker else {
            return;
        };
        let (done_tx, done_rx) = oneshot::channel();
        if worker.requests.send(Request::Stop(done_tx)).is_err() || done_rx.await.is_err() {
            warn!("dashboard engine worker ended before acknowledging stop");
        }
        info!("dashboard engine stopped");
    }

    /// Queues a command intent. Dropped silently when stopped, busy or
    /// offline.
    pub fn submit_command(&self, device: DeviceName, action: DeviceAction) {
        let command = DeviceCommand::new(device, action);
        match self.active_requests() {
            Some(requests) => {
                if requests.send(Request::Command(command)).is_err() {
                    debug!(%command, "engine worker gone, dropping command");
                }
            }
            None => debug!(%command, "engine stopped, dropping command"),
        }
    }

    /// Queues one out-of-cycle poll without touching the regular schedule.
    pub fn poll_now(&self) {
        if let Some(requests) = self.active_requests() {
            let _ = requests.send(Request::PollNow);
        }
    }

    fn active_requests(&self) -> Option<&mpsc::UnboundedSender<Request>> {
        self.worker
            .as_ref()
            .filter(|_| self.running)
            .map(|worker| &worker.requests)
    }

    fn spawn_worker(&self) -> WorkerHandle {
        let (requests, requests_rx) = mpsc::unbounded_channel();
        let (worker, completions_rx) = Worker::new(
            SyncEngine::new(self.config.clone()),
            Arc::clone(&self.api),
            self.view_tx.clone(),
            self.notify_tx.clone(),
        );
        let task = tokio::spawn(worker.run(requests_rx, completions_rx));
        WorkerHandle { requests, task }
    }
}

struct Worker {
    core: SyncEngine,
    api: Arc<dyn StatusApi>,
    view_tx: watch::Sender<EngineView>,
    notify_tx: broadcast::Sender<Notification>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    ticker: Interval,
    // Bumped on every start; resync timers from an earlier activation are
    // ignored.
    activation: u64,
    // Poll round trips and resync timers; aborted on stop.
    tasks: JoinSet<()>,
}

impl Worker {
    fn new(
        core: SyncEngine,
        api: Arc<dyn StatusApi>,
        view_tx: watch::Sender<EngineView>,
        notify_tx: broadcast::Sender<Notification>,
    ) -> (Self, mpsc::UnboundedReceiver<Completion>) {
        let period = Duration::from_millis(core.config.poll_interval_ms.max(1));
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        let worker = Self {
            core,
            api,
            view_tx,
            notify_tx,
            completions_tx,
            ticker,
            activation: 0,
            tasks: JoinSet::new(),
        };
        (worker, completions_rx)
    }

    async fn run(
        mut self,
        mut requests: mpsc::UnboundedReceiver<Request>,
        mut completions: mpsc::UnboundedReceiver<Completion>,
    ) {
        loop {
            let running = self.core.is_running();
            tokio::select! {
                _ = self.ticker.tick(), if running => {
                    let actions = self.core.poll_due();
                    self.execute(actions);
                }
                request = requests.recv() => match request {
                    Some(Request::Start) => self.activate(),
                    Some(Request::Stop(done)) => {
                        self.deactivate();
                        let _ = done.send(());
                    }
                    Some(Request::Command(command)) => self.handle_command(command),
                    Some(Request::PollNow) => {
                        let actions = self.core.poll_due();
                        self.execute(actions);
                    }
                    None => break,
                },
                Some(completion) = completions.recv() => self.handle_completion(completion),
                Some(_) = self.tasks.join_next(), if !self.tasks.is_empty() => {}
            }
        }

        self.deactivate();
    }

    fn activate(&mut self) {
        self.activation += 1;
        self.ticker.reset();
        let actions = self.core.start();
        self.execute(actions);
        self.publish();
    }

    fn deactivate(&mut self) {
        self.core.stop();
        self.tasks.abort_all();
        self.publish();
    }

    fn handle_command(&mut self, command: DeviceCommand) {
        match self.core.submit_command(command) {
            Ok(actions) => {
                info!(%command, "sending device command");
                self.execute(actions);
                self.publish();
            }
            Err(reason) => debug!(%command, ?reason, "command intent dropped"),
        }
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Poll { seq, result } => {
                let was_online = self.core.is_online();
                match self.core.complete_poll(seq, result) {
                    PollOutcome::Applied => {
                        if !was_online {
                            info!("status endpoint reachable");
                        }
                    }
                    PollOutcome::Failed => {
                        let connection = self.core.connection();
                        if let Some(err) = connection.last_failure() {
                            warn!(
                                seq,
                                failures = connection.consecutive_failures(),
                                "status poll failed: {err}"
                            );
                        }
                    }
                    PollOutcome::Discarded => debug!(seq, "discarding stale status poll"),
                }
                self.publish();
            }
            Completion::Command { result } => {
                if let (Some(command), Err(err)) = (self.core.in_flight(), &result) {
                    warn!(%command, "device command failed: {err}");
                }
                let actions = self.core.complete_command(result);
                self.execute(actions);
                self.publish();
            }
            Completion::ResyncDue { activation } if activation == self.activation => {
                let actions = self.core.poll_due();
                self.execute(actions);
            }
            Completion::ResyncDue { activation } => {
                debug!(activation, "dropping resync from an earlier activation");
            }
        }
    }

    fn execute(&mut self, actions: Vec<EngineAction>) {
        for action in actions {
            match action {
                EngineAction::FetchStatus { seq } => {
                    let api = Arc::clone(&self.api);
                    let completions = self.completions_tx.clone();
                    self.tasks.spawn(async move {
                        let result = api.fetch_status().await;
                        let _ = completions.send(Completion::Poll { seq, result });
                    });
                }
                EngineAction::SendCommand(command) => {
                    // Not tied to the worker: a command outlives a stop.
                    let api = Arc::clone(&self.api);
                    let completions = self.completions_tx.clone();
                    tokio::spawn(async move {
                        let result = api.send_command(command).await;
                        let _ = completions.send(Completion::Command { result });
                    });
                }
                EngineAction::SchedulePoll { delay_ms } => {
                    let completions = self.completions_tx.clone();
                    let activation = self.activation;
                    self.tasks.spawn(async move {
                        time::sleep(Duration::from_millis(delay_ms)).await;
                        let _ = completions.send(Completion::ResyncDue { activation });
                    });
                }
                EngineAction::Notify(notification) => {
                    let _ = self.notify_tx.send(notification);
                }
            }
        }
    }

    fn publish(&self) {
        let core = &self.core;
        self.view_tx.send_if_modified(|current| {
            let next = core.view();
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}
