//! Debug session bookkeeping.
//!
//! The editor UI drives at most one CFML debug session at a time, so the
//! registry is a single slot rather than a map. Termination events may arrive
//! late (after a new session replaced the old one); they only clear the slot
//! when they refer to the session currently in it.

use std::sync::{Arc, Mutex};

use serde_json::Value;
use uuid::Uuid;

use crate::pathmap::SeparatorPolicy;
use crate::transport::Transport;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 10000;

/// Connection parameters read from the editor's attach/launch configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub host: String,
    pub port: u16,
    pub path_separator: SeparatorPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            path_separator: SeparatorPolicy::default(),
        }
    }
}

impl SessionConfig {
    /// Build a config from raw launch arguments, tolerating missing or
    /// ill-typed fields (they fall back to defaults).
    pub fn from_launch_args(arguments: &Value) -> Self {
        let mut config = SessionConfig::default();

        if let Some(host) = arguments.get("hostName").and_then(Value::as_str) {
            config.host = host.to_string();
        }
        if let Some(port) = arguments.get("port").and_then(Value::as_u64) {
            if let Ok(port) = u16::try_from(port) {
                config.port = port;
            }
        }
        if let Some(policy) = arguments.get("pathSeparator").and_then(Value::as_str) {
            if let Ok(policy) = policy.parse() {
                config.path_separator = policy;
            }
        }

        config
    }
}

/// One live connection to a CFML debug server.
pub struct DebugSession {
    id: Uuid,
    config: SessionConfig,
    transport: Arc<dyn Transport>,
}

impl DebugSession {
    pub fn new(config: SessionConfig, transport: Arc<dyn Transport>) -> Self {
        DebugSession {
            id: Uuid::new_v4(),
            config,
            transport,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }
}

/// Single-slot registry of the active debug session.
#[derive(Default)]
pub struct SessionRegistry {
    current: Mutex<Option<Arc<DebugSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        SessionRegistry::default()
    }

    /// Record `session` as the active one, silently replacing any previous
    /// entry.
    pub fn on_session_start(&self, session: Arc<DebugSession>) {
        log::info!(target: "bridge", "debug session started: {}", session.id());
        *self.current.lock().unwrap() = Some(session);
    }

    pub fn active_session(&self) -> Option<Arc<DebugSession>> {
        self.current.lock().unwrap().clone()
    }

    /// Clear the slot iff it still holds `session`. A stale termination for a
    /// superseded session is a no-op.
    pub fn on_session_terminate(&self, session: &Arc<DebugSession>) {
        let mut current = self.current.lock().unwrap();
        match current.as_ref() {
            Some(active) if Arc::ptr_eq(active, session) => {
                log::info!(target: "bridge", "debug session terminated: {}", session.id());
                *current = None;
            }
            _ => {
                log::debug!(
                    target: "bridge",
                    "termination for inactive session {} ignored",
                    session.id()
                );
            }
        }
    }
}
