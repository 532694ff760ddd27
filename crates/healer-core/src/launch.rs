use crate::backend::HealerBackend;
use crate::derived::branch_name;
use crate::error::ClientError;
use crate::model::{RunConfig, RunPhase};
use crate::run_controller::{LaunchDecision, RunController};
use crate::session::SessionStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};

/// Launch form contents as typed by the operator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchForm {
    pub repo_url: String,
    pub team_name: String,
    pub leader_name: String,
}

impl LaunchForm {
    pub fn validate(&self) -> Result<RunConfig, ClientError> {
        let repo_url = self.repo_url.trim();
        let team_name = self.team_name.trim();
        let leader_name = self.leader_name.trim();
        if repo_url.is_empty() || team_name.is_empty() || leader_name.is_empty() {
            return Err(ClientError::validation(
                "repository URL, team name and leader name are all required",
            ));
        }
        Ok(RunConfig::new(repo_url, team_name, leader_name))
    }

    pub fn branch_preview(&self) -> String {
        branch_name(&self.team_name, &self.leader_name)
    }
}

#[derive(Default)]
struct SlotState {
    current: Option<ClientError>,
    generation: u64,
}

/// Inline error display for the launch form.
///
/// Validation errors clear themselves after `clear_after` unless replaced
/// first; every other error stays until the next attempt.
#[derive(Clone)]
pub struct ErrorSlot {
    state: Arc<Mutex<SlotState>>,
    clear_after: Duration,
}

impl ErrorSlot {
    pub fn new(clear_after: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(SlotState::default())),
            clear_after,
        }
    }

    pub fn current(&self) -> Option<ClientError> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.current.clone())
    }

    pub fn clear(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.generation = state.generation.wrapping_add(1);
            state.current = None;
        }
    }

    pub fn show(&self, err: ClientError) {
        let auto_clear = matches!(err, ClientError::Validation(_));
        let generation = {
            let Ok(mut state) = self.state.lock() else {
                return;
            };
            state.generation = state.generation.wrapping_add(1);
            state.current = Some(err);
            state.generation
        };
        if !auto_clear {
            return;
        }
        let slot = Arc::downgrade(&self.state);
        let delay = self.clear_after;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(slot) = slot.upgrade()
                && let Ok(mut state) = slot.lock()
                && state.generation == generation
            {
                state.current = None;
            }
        });
    }
}

struct SubmitGuard<'a>(&'a AtomicBool);

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// One dashboard view: owns its run controller and launch form error state.
pub struct Dashboard {
    backend: Arc<dyn HealerBackend>,
    session: SessionStore,
    controller: RunController,
    errors: ErrorSlot,
    submitting: AtomicBool,
}

impl Dashboard {
    pub fn new(
        backend: Arc<dyn HealerBackend>,
        session: SessionStore,
        controller: RunController,
        error_clear_after: Duration,
    ) -> Self {
        Self {
            backend,
            session,
            controller,
            errors: ErrorSlot::new(error_clear_after),
            submitting: AtomicBool::new(false),
        }
    }

    pub fn controller(&self) -> &RunController {
        &self.controller
    }

    pub fn error(&self) -> Option<ClientError> {
        self.errors.current()
    }

    /// Validates the form, asks the backend to start the job and, on success,
    /// hands the response to the run controller.
    ///
    /// While a run is playing, or a previous submission is still awaiting the
    /// backend, the request is rejected without touching the network.
    pub async fn launch(&self, form: &LaunchForm) -> Result<LaunchDecision, ClientError> {
        if self.controller.phase() == RunPhase::Running {
            return Ok(LaunchDecision::RejectedRunning);
        }
        if self.submitting.swap(true, Ordering::SeqCst) {
            return Ok(LaunchDecision::RejectedRunning);
        }
        let _submit = SubmitGuard(&self.submitting);

        let config = form.validate().inspect_err(|err| self.errors.show(err.clone()))?;
        let token = self
            .session
            .bearer()
            .inspect_err(|err| self.errors.show(err.clone()))?;
        self.errors.clear();

        let report = match self.backend.run_agent(&token, &config).await {
            Ok(report) => report,
            Err(err) => {
                warn!(kind = err.kind(), error = %err, "launch request failed");
                self.errors.show(err.clone());
                return Err(err);
            }
        };
        let decision = self.controller.launch(config, report);
        info!(decision = ?decision, "launch handled");
        Ok(decision)
    }

    /// View teardown: releases every pending task of the current run. The
    /// dashboard is consumed, so a torn-down view cannot launch again.
    pub fn close(self) {
        self.controller.teardown();
        self.errors.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derived::ScoringPolicy;
    use crate::run_controller::{RunEvent, RunTiming};
    use crate::test_utils::FakeBackend;
    use tokio::time::sleep;

    fn form() -> LaunchForm {
        LaunchForm {
            repo_url: "https://github.com/a/b".to_string(),
            team_name: "RIFT".to_string(),
            leader_name: "Ada".to_string(),
        }
    }

    fn dashboard(backend: FakeBackend, token: Option<&str>) -> (Dashboard, Arc<FakeBackend>) {
        let backend = Arc::new(backend);
        let session = SessionStore::new();
        if let Some(token) = token {
            session.login_with_token(Some(token)).unwrap();
        }
        let controller = RunController::new(RunTiming::default(), ScoringPolicy::default());
        let dashboard = Dashboard::new(
            backend.clone(),
            session,
            controller,
            Duration::from_secs(3),
        );
        (dashboard, backend)
    }

    #[tokio::test(start_paused = true)]
    async fn accepted_launch_runs_to_displayed() {
        let (dashboard, backend) = dashboard(FakeBackend::accepting("tok"), Some("tok"));
        assert_eq!(
            dashboard.launch(&form()).await.unwrap(),
            LaunchDecision::Accepted
        );
        assert_eq!(dashboard.controller().phase(), RunPhase::Running);

        assert_eq!(
            dashboard.launch(&form()).await.unwrap(),
            LaunchDecision::RejectedRunning
        );
        assert_eq!(backend.calls(), vec!["run_agent".to_string()]);

        sleep(Duration::from_secs(10)).await;
        let results = dashboard.controller().results().unwrap();
        assert_eq!(results.branch_name, "RIFT_ADA_AI_FIX");
    }

    #[tokio::test(start_paused = true)]
    async fn validation_error_clears_itself() {
        let (dashboard, backend) = dashboard(FakeBackend::accepting("tok"), Some("tok"));
        let mut incomplete = form();
        incomplete.leader_name = "  ".to_string();

        let err = dashboard.launch(&incomplete).await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        assert!(dashboard.error().is_some());
        assert!(backend.calls().is_empty());

        sleep(Duration::from_millis(3100)).await;
        assert!(dashboard.error().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn expired_session_is_surfaced_and_sticks() {
        let (dashboard, _backend) = dashboard(FakeBackend::accepting("fresh"), Some("stale"));
        let err = dashboard.launch(&form()).await.unwrap_err();
        assert_eq!(err, ClientError::SessionExpired);
        assert_eq!(dashboard.controller().phase(), RunPhase::Idle);

        sleep(Duration::from_secs(10)).await;
        assert_eq!(dashboard.error(), Some(ClientError::SessionExpired));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_session_never_reaches_backend() {
        let (dashboard, backend) = dashboard(FakeBackend::accepting("tok"), None);
        let err = dashboard.launch(&form()).await.unwrap_err();
        assert!(err.requires_login());
        assert!(backend.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn close_cancels_playback() {
        let (dashboard, _backend) = dashboard(FakeBackend::accepting("tok"), Some("tok"));
        dashboard.launch(&form()).await.unwrap();
        sleep(Duration::from_millis(900)).await;
        let phases = dashboard.controller().subscribe();
        let mut events = dashboard.controller().events();
        dashboard.close();
        sleep(Duration::from_secs(10)).await;

        assert_eq!(*phases.borrow(), RunPhase::Running);
        while let Ok(event) = events.try_recv() {
            assert!(!matches!(
                event,
                RunEvent::Phase(RunPhase::Done | RunPhase::Displayed)
            ));
        }
    }

    #[test]
    fn branch_preview_tracks_form() {
        let mut form = form();
        form.leader_name = "Saiyam Kumar".to_string();
        form.team_name = "INVINCIBLE".to_string();
        assert_eq!(form.branch_preview(), "INVINCIBLE_SAIYAM_KUMAR_AI_FIX");
    }
}
