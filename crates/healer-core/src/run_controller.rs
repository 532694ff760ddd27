use crate::derived::{ScoringPolicy, branch_name};
use crate::model::{LogEntry, RunConfig, RunPhase, RunReport, RunTelemetry, ScoreBreakdown};
use crate::playback::{LogPlayback, PlaybackHandle};
use crate::report::log_script;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchDecision {
    Accepted,
    RejectedRunning,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    Phase(RunPhase),
    Log(LogEntry),
}

#[derive(Debug, Clone, Copy)]
pub struct RunTiming {
    pub playback_interval: Duration,
    pub settle_delay: Duration,
}

impl Default for RunTiming {
    fn default() -> Self {
        Self {
            playback_interval: Duration::from_millis(800),
            settle_delay: Duration::from_millis(800),
        }
    }
}

/// Derived outputs, available once the run is displayed.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResults {
    pub config: RunConfig,
    pub branch_name: String,
    pub score: ScoreBreakdown,
    pub report: RunReport,
}

#[derive(Default)]
struct ControllerState {
    generation: u64,
    active: Option<(RunConfig, RunReport)>,
    playback: Option<PlaybackHandle>,
    settle: Option<JoinHandle<()>>,
    revealed: Vec<LogEntry>,
    results: Option<RunResults>,
}

impl ControllerState {
    fn release_tasks(&mut self) {
        if let Some(mut playback) = self.playback.take() {
            playback.stop();
        }
        if let Some(settle) = self.settle.take() {
            settle.abort();
        }
    }
}

struct Shared {
    state: Mutex<ControllerState>,
    phase: watch::Sender<RunPhase>,
    events: broadcast::Sender<RunEvent>,
    timing: RunTiming,
    scoring: ScoringPolicy,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_phase(&self, phase: RunPhase) {
        self.phase.send_replace(phase);
        let _ = self.events.send(RunEvent::Phase(phase));
        info!(phase = %phase, "run phase changed");
    }

    fn reveal(&self, generation: u64, entry: LogEntry) {
        let mut state = self.lock();
        if state.generation != generation {
            return;
        }
        state.revealed.push(entry.clone());
        let _ = self.events.send(RunEvent::Log(entry));
    }

    fn playback_complete(shared: &Arc<Shared>, generation: u64) {
        let mut state = shared.lock();
        if state.generation != generation || *shared.phase.borrow() != RunPhase::Running {
            debug!(generation, "ignoring stale playback completion");
            return;
        }
        shared.set_phase(RunPhase::Done);
        let weak = Arc::downgrade(shared);
        let delay = shared.timing.settle_delay;
        state.settle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(shared) = weak.upgrade() {
                shared.display(generation);
            }
        }));
    }

    fn display(&self, generation: u64) {
        let mut state = self.lock();
        if state.generation != generation || *self.phase.borrow() != RunPhase::Done {
            return;
        }
        let Some((config, report)) = state.active.clone() else {
            return;
        };
        let results = RunResults {
            branch_name: branch_name(&config.team_name, &config.leader_name),
            score: self.scoring.score(&RunTelemetry::from(&report)),
            config,
            report,
        };
        state.results = Some(results);
        state.settle = None;
        self.set_phase(RunPhase::Displayed);
    }
}

/// Drives one dashboard's run through Idle → Running → Done → Displayed.
///
/// Dropping the controller tears it down: pending playback and settle tasks
/// are released and their callbacks never fire.
pub struct RunController {
    shared: Arc<Shared>,
}

impl RunController {
    pub fn new(timing: RunTiming, scoring: ScoringPolicy) -> Self {
        let (phase, _rx) = watch::channel(RunPhase::Idle);
        let (events, _events_rx) = broadcast::channel(EVENT_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(ControllerState::default()),
                phase,
                events,
                timing,
                scoring,
            }),
        }
    }

    pub fn phase(&self) -> RunPhase {
        *self.shared.phase.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<RunPhase> {
        self.shared.phase.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<RunEvent> {
        self.shared.events.subscribe()
    }

    pub fn active_config(&self) -> Option<RunConfig> {
        self.shared
            .lock()
            .active
            .as_ref()
            .map(|(config, _)| config.clone())
    }

    pub fn revealed(&self) -> Vec<LogEntry> {
        self.shared.lock().revealed.clone()
    }

    pub fn results(&self) -> Option<RunResults> {
        let state = self.shared.lock();
        if self.phase() != RunPhase::Displayed {
            return None;
        }
        state.results.clone()
    }

    /// Accepts `config` unless a run is already in flight. The report supplies
    /// the playback script and scoring telemetry.
    pub fn launch(&self, config: RunConfig, report: RunReport) -> LaunchDecision {
        let shared = &self.shared;
        let mut state = shared.lock();
        if *shared.phase.borrow() == RunPhase::Running {
            info!(repo = %config.repo_url, "launch rejected; run already in progress");
            return LaunchDecision::RejectedRunning;
        }

        state.release_tasks();
        state.generation = state.generation.wrapping_add(1);
        let generation = state.generation;
        let branch = branch_name(&config.team_name, &config.leader_name);
        let script = log_script(&report, &branch);
        state.active = Some((config.clone(), report));
        state.revealed.clear();
        state.results = None;

        if *shared.phase.borrow() != RunPhase::Idle {
            shared.set_phase(RunPhase::Idle);
        }
        shared.set_phase(RunPhase::Running);
        info!(
            repo = %config.repo_url,
            branch = %branch,
            entries = script.len(),
            "run launched"
        );

        let entry_target: Weak<Shared> = Arc::downgrade(shared);
        let complete_target: Weak<Shared> = Arc::downgrade(shared);
        state.playback = Some(LogPlayback::start(
            script,
            shared.timing.playback_interval,
            move |entry| {
                if let Some(shared) = entry_target.upgrade() {
                    shared.reveal(generation, entry);
                }
            },
            move || {
                if let Some(shared) = complete_target.upgrade() {
                    Shared::playback_complete(&shared, generation);
                }
            },
        ));
        LaunchDecision::Accepted
    }

    /// Releases playback and settle tasks. Phase is left where it was.
    pub fn teardown(&self) {
        let mut state = self.shared.lock();
        state.generation = state.generation.wrapping_add(1);
        state.release_tasks();
        debug!("run controller torn down");
    }
}

impl Drop for RunController {
    fn drop(&mut self) {
        self.teardown();
    }
}
