use std::path::Path;

use log::{error, info};
use serde::Deserialize;

use crate::error::Result;
use crate::gradebook::Gradebook;
use crate::ids::AccountId;
use crate::store::Store;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// An opened data directory and the graph loaded from it.
pub struct Workspace {
    pub store: Store,
    pub book: Gradebook,
}

pub struct AppState {
    pub workspace: Option<Workspace>,
    /// Administrator that last logged in; purge keeps this one.
    pub session: Option<AccountId>,
    pub seed: Option<u64>,
}

impl AppState {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            workspace: None,
            session: None,
            seed,
        }
    }

    /// Loads `path` and makes it the active workspace. The previous one, if
    /// any, stays active when loading fails.
    pub fn open_workspace(&mut self, path: &Path) -> Result<&Workspace> {
        let store = Store::open(path)?;
        let fresh = match self.seed {
            Some(seed) => Gradebook::seeded(seed),
            None => Gradebook::new(),
        };
        let book = store.load_into(fresh).inspect_err(|e| {
            error!("failed to load workspace {}: {e}", path.display());
        })?;
        info!("workspace {} open", path.display());
        self.session = None;
        Ok(self.workspace.insert(Workspace { store, book }))
    }
}
