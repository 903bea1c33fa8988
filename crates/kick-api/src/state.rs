use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use kick_core::{Tracker, UpdateScheduler};

/// Basic-auth credentials for the admin routes.
#[derive(Debug, Clone)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl AdminCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn matches(&self, username: &str, password: &str) -> bool {
        // Evaluate both comparisons so timing does not reveal which part was wrong.
        let user_ok = constant_time_eq(self.username.as_bytes(), username.as_bytes());
        let pass_ok = constant_time_eq(self.password.as_bytes(), password.as_bytes());
        user_ok & pass_ok
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<UpdateScheduler>,
    /// `None` disables the admin routes entirely (every request gets 401).
    pub admin: Option<AdminCredentials>,
    /// Where accepted settings are persisted. `None` keeps them in memory only.
    pub settings_path: Option<PathBuf>,
    /// Serializes read-merge-save-apply of admin updates.
    pub settings_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(scheduler: Arc<UpdateScheduler>) -> Self {
        Self {
            scheduler,
            admin: None,
            settings_path: None,
            settings_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_admin(mut self, credentials: AdminCredentials) -> Self {
        self.admin = Some(credentials);
        self
    }

    pub fn with_settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_path = Some(path.into());
        self
    }

    pub fn tracker(&self) -> &Arc<Tracker> {
        self.scheduler.tracker()
    }
}
