//! Server state and configuration.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::capture::CaptureMachine;
use crate::editor::EditorSession;
use crate::error::PhotoboxError;
use crate::registry::TemplateStore;

/// Editor sessions left untouched this long are disposed.
pub const SESSION_EXPIRATION_SECS: u64 = 30 * 60;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "0.0.0.0:5000")
    pub listen_addr: String,
    /// Directory holding the template index and uploaded images
    pub data_dir: PathBuf,
}

/// An editor session plus its expiry bookkeeping.
pub struct EditorEntry {
    pub session: EditorSession,
    pub last_accessed: Instant,
}

impl EditorEntry {
    pub fn new(session: EditorSession) -> Self {
        Self { session, last_accessed: Instant::now() }
    }

    /// Keep the session alive.
    pub fn touch(&mut self) {
        self.last_accessed = Instant::now();
    }
}

/// Application state shared across handlers.
pub struct AppState {
    pub config: ServerConfig,
    /// Template CRUD storage.
    pub registry: RwLock<TemplateStore>,
    /// Live slot-editor sessions, keyed by session id.
    pub editors: RwLock<HashMap<Uuid, EditorEntry>>,
    /// The single kiosk capture flow.
    pub capture: RwLock<CaptureMachine>,
    /// Unix timestamp of server boot for cache busting.
    pub boot_time: u64,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Result<Self, PhotoboxError> {
        let registry = TemplateStore::open(&config.data_dir)?;
        let boot_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Ok(Self {
            config,
            registry: RwLock::new(registry),
            editors: RwLock::new(HashMap::new()),
            capture: RwLock::new(CaptureMachine::new()),
            boot_time,
        })
    }
}
