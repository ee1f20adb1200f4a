//! In-memory diet backend seeded with sample plans.
use async_trait::async_trait;
use chrono::Utc;
use nutriplan_common::{Diet, DietPatch, NewDiet};
use parking_lot::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use super::DietBackend;
use crate::config::DietProviderKind;
use crate::error::ClientError;

const SEED: &str = include_str!("seed.json");

/// Every diet counts as both public and owned by the caller.
pub struct MockDietBackend {
    diets: Mutex<Vec<Diet>>,
}

impl MockDietBackend {
    /// Backend holding the three sample diets
    pub fn new() -> Self {
        let diets = match serde_json::from_str::<Vec<Diet>>(SEED) {
            Ok(diets) => diets,
            Err(e) => {
                warn!(error = %e, "sample diets unreadable, starting empty");
                Vec::new()
            },
        };
        Self::with_diets(diets)
    }

    pub fn with_diets(diets: Vec<Diet>) -> Self {
        Self {
            diets: Mutex::new(diets),
        }
    }

    pub fn len(&self) -> usize {
        self.diets.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.diets.lock().is_empty()
    }
}

impl Default for MockDietBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(id: &str) -> ClientError {
    ClientError::NotFound(format!("diet {id}"))
}

#[async_trait]
impl DietBackend for MockDietBackend {
    fn provider(&self) -> DietProviderKind {
        DietProviderKind::Mock
    }

    async fn list_all(&self) -> Result<Vec<Diet>, ClientError> {
        Ok(self.diets.lock().clone())
    }

    async fn list_mine(&self) -> Result<Vec<Diet>, ClientError> {
        Ok(self.diets.lock().clone())
    }

    async fn get(&self, id: &str) -> Result<Diet, ClientError> {
        self.diets
            .lock()
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn create(&self, diet: &NewDiet) -> Result<Diet, ClientError> {
        let now = Utc::now().to_rfc3339();
        let created = Diet {
            id: Uuid::new_v4().to_string(),
            owner_id: None,
            name: diet.name.clone(),
            start_date: diet.start_date,
            end_date: diet.end_date,
            total_calories: Some(diet.total_calories.unwrap_or(0)),
            weekly_menu: diet.weekly_menu.clone(),
            created_at: Some(now.clone()),
            updated_at: Some(now),
        };
        debug!(id = %created.id, "mock diet created");
        self.diets.lock().push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: &str, patch: &DietPatch) -> Result<DietPatch, ClientError> {
        let mut diets = self.diets.lock();
        let diet = diets
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| not_found(id))?;

        let mut changes = patch.clone();
        changes.id = None;
        changes.updated_at = Some(Utc::now().to_rfc3339());
        diet.apply(changes);
        Ok(DietPatch::from(diet.clone()))
    }

    async fn delete(&self, id: &str) -> Result<(), ClientError> {
        let mut diets = self.diets.lock();
        let before = diets.len();
        diets.retain(|d| d.id != id);
        if diets.len() == before {
            return Err(not_found(id));
        }
        Ok(())
    }
}
