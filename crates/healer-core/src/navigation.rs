use std::fmt;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    Dashboard,
    VerifyOtp { email: String },
    ResetPassword { email: String, otp: String },
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Login => f.write_str("/login"),
            Route::Dashboard => f.write_str("/app/dashboard"),
            Route::VerifyOtp { .. } => f.write_str("/verify-otp"),
            Route::ResetPassword { .. } => f.write_str("/reset-password"),
        }
    }
}

/// Performs view transitions on behalf of the auth and launch flows.
/// Transitions replace the current entry; there is no way back to a login
/// view through history.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Keeps every transition in order. Used where no real view stack exists.
#[derive(Default)]
pub struct HistoryNavigator {
    history: Mutex<Vec<Route>>,
}

impl HistoryNavigator {
    pub fn history(&self) -> Vec<Route> {
        self.history
            .lock()
            .map(|history| history.clone())
            .unwrap_or_default()
    }

    pub fn current(&self) -> Option<Route> {
        self.history().last().cloned()
    }
}

impl Navigator for HistoryNavigator {
    fn navigate(&self, route: Route) {
        if let Ok(mut history) = self.history.lock() {
            history.push(route);
        }
    }
}
