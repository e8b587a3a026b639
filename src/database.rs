use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

use crate::geo::{proximity_filter, Candidate, GeoPoint};

const CACHE_VERSION: u32 = 1;
const CACHE_FILE: &str = "trees_v1.bin";

// Structure for disk persistence. Flat, since bincode cannot encode
// the flattened JSON shape of `Candidate`.
#[derive(Serialize, Deserialize)]
struct CachedPlan {
    version: u32,
    next_id: u64,
    trees: Vec<CachedTree>,
}

#[derive(Serialize, Deserialize)]
struct CachedTree {
    id: u64,
    lat: f64,
    lng: f64,
    species: String,
    created_at: DateTime<Utc>,
}

impl From<&Candidate> for CachedTree {
    fn from(c: &Candidate) -> Self {
        Self {
            id: c.id,
            lat: c.position.latitude,
            lng: c.position.longitude,
            species: c.species.clone(),
            created_at: c.created_at,
        }
    }
}

impl From<CachedTree> for Candidate {
    fn from(t: CachedTree) -> Self {
        Candidate {
            id: t.id,
            position: GeoPoint::new_unchecked(t.lat, t.lng),
            species: t.species,
            created_at: t.created_at,
        }
    }
}

#[derive(Default)]
struct PlanInner {
    next_id: u64,
    trees: Vec<Candidate>,
}

/// Tree placement state shared between handlers.
#[derive(Clone, Default)]
pub struct CandidateStore {
    inner: Arc<RwLock<PlanInner>>,
}

impl CandidateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plants a tree and returns the stored record with its assigned id.
    pub fn insert(&self, position: GeoPoint, species: &str) -> Result<Candidate> {
        position.validate()?;
        let mut plan = self.write();
        plan.next_id += 1;
        let candidate = Candidate::new(plan.next_id, position, species);
        plan.trees.push(candidate.clone());
        debug!(id = candidate.id, species = %candidate.species, "tree planted");
        Ok(candidate)
    }

    pub fn remove(&self, id: u64) -> Option<Candidate> {
        let mut plan = self.write();
        let index = plan.trees.iter().position(|t| t.id == id)?;
        Some(plan.trees.remove(index))
    }

    pub fn get(&self, id: u64) -> Option<Candidate> {
        self.read().trees.iter().find(|t| t.id == id).cloned()
    }

    /// All trees ordered by id.
    pub fn all(&self) -> Vec<Candidate> {
        let mut trees = self.read().trees.clone();
        trees.sort_by_key(|t| t.id);
        trees
    }

    pub fn count(&self) -> usize {
        self.read().trees.len()
    }

    pub fn clear(&self) {
        let mut plan = self.write();
        plan.trees.clear();
    }

    pub fn nearby(&self, center: GeoPoint, radius_m: f64) -> Vec<Candidate> {
        let plan = self.read();
        proximity_filter(&plan.trees, center, radius_m)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Save the plan to the app data directory using bincode
    pub fn save_to_disk(&self) -> Result<()> {
        let app_dir = crate::utils::get_app_data_dir();
        crate::utils::ensure_directory_exists(&app_dir)?;
        self.save_to(&app_dir.join(CACHE_FILE))
    }

    pub fn load_from_disk(&self) -> Result<bool> {
        let app_dir = crate::utils::get_app_data_dir();
        self.load_from(&app_dir.join(CACHE_FILE))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let plan = self.read();
        let cache = CachedPlan {
            version: CACHE_VERSION,
            next_id: plan.next_id,
            trees: plan.trees.iter().map(CachedTree::from).collect(),
        };

        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        bincode::serialize_into(file, &cache).context("Failed to serialize tree plan")?;
        Ok(())
    }

    /// Replace the plan with the cached one. Returns false when there is no
    /// usable cache; unreadable or outdated caches are deleted.
    pub fn load_from(&self, path: &Path) -> Result<bool> {
        if !path.exists() {
            return Ok(false);
        }

        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let cache: CachedPlan = match bincode::deserialize_from(file) {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "tree cache corrupted, deleting");
                let _ = std::fs::remove_file(path);
                return Ok(false);
            }
        };

        if cache.version != CACHE_VERSION {
            warn!(
                found = cache.version,
                expected = CACHE_VERSION,
                "tree cache version mismatch, deleting"
            );
            let _ = std::fs::remove_file(path);
            return Ok(false);
        }

        let max_id = cache.trees.iter().map(|t| t.id).max().unwrap_or(0);
        let mut plan = self.write();
        plan.next_id = cache.next_id.max(max_id);
        plan.trees = cache.trees.into_iter().map(Candidate::from).collect();
        Ok(true)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, PlanInner> {
        // A panic while holding the lock leaves the plan itself consistent
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, PlanInner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}
