//! Cache-first preset manager with single-flight initialization.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::{PresetCache, PRESET_TABLE};
use crate::catalog::{Preset, PresetCatalog};
use crate::PresetResult;

/// Structured outcome of a load request. A load before initialization is a
/// routine failure with an explanation, never a panic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadOutcome {
    pub success: bool,
    pub preset: Option<Preset>,
    pub message: Option<String>,
}

impl LoadOutcome {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            preset: None,
            message: Some(message.into()),
        }
    }

    fn success(preset: Preset) -> Self {
        Self {
            success: true,
            preset: Some(preset),
            message: None,
        }
    }
}

#[derive(Debug, Default)]
struct ManagerState {
    initialized: bool,
    presets: HashMap<String, Preset>,
}

/// Fetches the remote catalog only when the local cache is empty; hydrates
/// from cache otherwise. The state mutex is held across the fetch, so a
/// second `initialize` arriving mid-flight waits and then observes the
/// completed state instead of starting a duplicate fetch.
pub struct PresetManager<C, R> {
    cache: C,
    catalog: R,
    state: Mutex<ManagerState>,
}

impl<C: PresetCache, R: PresetCatalog> PresetManager<C, R> {
    pub fn new(cache: C, catalog: R) -> Self {
        Self {
            cache,
            catalog,
            state: Mutex::new(ManagerState::default()),
        }
    }

    /// Initialize for a user. Returns the number of presets available.
    /// Idempotent and single-flight.
    pub async fn initialize(&self, user_id: &str) -> PresetResult<usize> {
        let mut state = self.state.lock().await;
        if state.initialized {
            debug!(user_id, "preset manager already initialized");
            return Ok(state.presets.len());
        }

        let cached = self.cache.get_all(PRESET_TABLE).await?;
        if !cached.is_empty() {
            info!(user_id, count = cached.len(), "hydrating presets from cache");
            state.presets = cached.into_iter().map(|p| (p.id.clone(), p)).collect();
            state.initialized = true;
            return Ok(state.presets.len());
        }

        info!(user_id, "cache empty, fetching preset catalog");
        let fetched = self.catalog.fetch_catalog().await?;
        for preset in &fetched {
            // One write per preset: a failed write loses that record only.
            if let Err(err) = self.cache.store(PRESET_TABLE, preset).await {
                warn!(preset = %preset.id, %err, "preset cache write failed");
            }
        }
        state.presets = fetched.into_iter().map(|p| (p.id.clone(), p)).collect();
        state.initialized = true;
        Ok(state.presets.len())
    }

    /// Presets passing the TriLaw safety gate. Empty before `initialize`
    /// completes.
    pub async fn accessible_presets(&self) -> Vec<Preset> {
        let state = self.state.lock().await;
        if !state.initialized {
            return Vec::new();
        }
        let mut presets: Vec<Preset> = state
            .presets
            .values()
            .filter(|p| p.is_accessible())
            .cloned()
            .collect();
        presets.sort_by(|a, b| a.id.cmp(&b.id));
        presets
    }

    pub async fn load_preset(&self, id: &str) -> LoadOutcome {
        let state = self.state.lock().await;
        if !state.initialized {
            return LoadOutcome::failure(
                "preset manager is not initialized; call initialize() before loading presets",
            );
        }
        match state.presets.get(id) {
            None => LoadOutcome::failure(format!("unknown preset id: {}", id)),
            Some(preset) if !preset.is_accessible() => {
                LoadOutcome::failure(format!("preset {} is blocked by the TriLaw safety gate", id))
            }
            Some(preset) => LoadOutcome::success(preset.clone()),
        }
    }

    pub async fn is_initialized(&self) -> bool {
        self.state.lock().await.initialized
    }
}
