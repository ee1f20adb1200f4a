// ============================
// crates/client-lib/src/diet/cache.rs
// ============================
//! Local cache of the signed-in user's diets.
//!
//! The cache only changes after the backend has accepted a mutation. The
//! public listing is never cached.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use metrics::counter;
use nutriplan_common::{Diet, DietPatch, Meal, NewDiet};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::DietBackend;
use crate::error::ClientError;
use crate::metrics::DIET_CACHE_MUTATION;
use crate::pagination::{paginate, Page, PUBLIC_PAGE_SIZE};
use crate::validation;

pub struct DietCollection {
    backend: Arc<dyn DietBackend>,
    diets: RwLock<Vec<Diet>>,
    loading: AtomicBool,
}

impl DietCollection {
    pub fn new(backend: Arc<dyn DietBackend>) -> Self {
        Self {
            backend,
            diets: RwLock::new(Vec::new()),
            loading: AtomicBool::new(false),
        }
    }

    pub fn backend(&self) -> &Arc<dyn DietBackend> {
        &self.backend
    }

    /// Snapshot of the cached diets
    pub fn diets(&self) -> Vec<Diet> {
        self.diets.read().clone()
    }

    pub fn get(&self, id: &str) -> Option<Diet> {
        self.diets.read().iter().find(|d| d.id == id).cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Replace the cache with the user's diets from the backend
    pub async fn refresh(&self) -> Result<Vec<Diet>, ClientError> {
        self.loading.store(true, Ordering::SeqCst);
        let result = self.backend.list_mine().await;
        self.loading.store(false, Ordering::SeqCst);

        match result {
            Ok(diets) => {
                debug!(count = diets.len(), "diet cache refreshed");
                *self.diets.write() = diets.clone();
                Ok(diets)
            },
            Err(e) => {
                warn!(error = %e, "could not load diets");
                Err(e)
            },
        }
    }

    pub async fn create(&self, diet: NewDiet) -> Result<Diet, ClientError> {
        validation::validate_new_diet(&diet)?;
        let created = self.backend.create(&diet).await.inspect_err(|e| {
            warn!(error = %e, "could not create diet");
        })?;

        info!(id = %created.id, "diet created");
        self.diets.write().push(created.clone());
        counter!(DIET_CACHE_MUTATION, "op" => "create").increment(1);
        Ok(created)
    }

    /// Send `patch` and merge the fields the backend reports into the cached
    /// record. An id that is not cached is `NotFound` and never appended.
    /// The patched record must still have a name and a start no later than
    /// its end.
    pub async fn update(&self, id: &str, patch: &DietPatch) -> Result<Diet, ClientError> {
        let Some(mut edited) = self.get(id) else {
            return Err(ClientError::NotFound(format!("diet {id} is not loaded")));
        };
        edited.apply(patch.clone());
        validation::validate_diet(&edited)?;

        let reported = self.backend.update(id, patch).await.inspect_err(|e| {
            warn!(error = %e, id, "could not update diet");
        })?;

        let mut diets = self.diets.write();
        let Some(diet) = diets.iter_mut().find(|d| d.id == id) else {
            warn!(id, "diet left the cache while its update was in flight");
            return Err(ClientError::NotFound(format!("diet {id} is not loaded")));
        };
        diet.apply(reported);
        counter!(DIET_CACHE_MUTATION, "op" => "update").increment(1);
        Ok(diet.clone())
    }

    /// Remove the diet once the backend has deleted it
    pub async fn delete(&self, id: &str) -> Result<(), ClientError> {
        self.backend.delete(id).await.inspect_err(|e| {
            warn!(error = %e, id, "could not delete diet");
        })?;

        self.diets.write().retain(|d| d.id != id);
        counter!(DIET_CACHE_MUTATION, "op" => "delete").increment(1);
        Ok(())
    }

    /// Add one meal to `day` of a cached diet and push the whole menu
    pub async fn add_meal(&self, id: &str, day: &str, meal: Meal) -> Result<Diet, ClientError> {
        validation::validate_meal(&meal)?;
        let mut menu = self
            .get(id)
            .map(|d| d.weekly_menu)
            .ok_or_else(|| ClientError::NotFound(format!("diet {id} is not loaded")))?;

        menu.add_meal(day.trim(), meal);
        self.update(id, &DietPatch::weekly_menu(menu)).await
    }

    /// Fetch every public diet and cut out one page
    pub async fn public_page(&self, page: usize) -> Result<Page<Diet>, ClientError> {
        let all = self.backend.list_all().await.inspect_err(|e| {
            warn!(error = %e, "could not load public diets");
        })?;
        Ok(paginate(all, page, PUBLIC_PAGE_SIZE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diet::MockDietBackend;
    use crate::validation::ValidationError;
    use chrono::{TimeZone, Utc};
    use nutriplan_common::WeeklyMenu;

    const VEGETARIANA: &str = "68606241dbc9f2fa6c586ddd";

    async fn loaded() -> DietCollection {
        let collection = DietCollection::new(Arc::new(MockDietBackend::new()));
        collection.refresh().await.unwrap();
        collection
    }

    #[tokio::test]
    async fn test_refresh_loads_diets() {
        let collection = DietCollection::new(Arc::new(MockDietBackend::new()));
        assert!(collection.diets().is_empty());
        collection.refresh().await.unwrap();
        assert_eq!(collection.diets().len(), 3);
        assert!(!collection.is_loading());
    }

    #[tokio::test]
    async fn test_update_merges_by_id() {
        let collection = loaded().await;
        let before = collection.diets();

        let patch = DietPatch {
            name: Some("Vegetariana Plus".to_string()),
            ..DietPatch::default()
        };
        collection.update(VEGETARIANA, &patch).await.unwrap();

        let after = collection.diets();
        assert_eq!(after.len(), before.len());
        let updated = collection.get(VEGETARIANA).unwrap();
        assert_eq!(updated.name, "Vegetariana Plus");
        assert_eq!(updated.weekly_menu, before[0].weekly_menu);
        assert_eq!(after[1..], before[1..]);
    }

    #[tokio::test]
    async fn test_menu_update_preserves_name() {
        let diet: Diet = serde_json::from_value(serde_json::json!({
            "_id": "1",
            "nombre": "Vegetariana",
            "fechaInicio": "2025-06-28T00:00:00Z",
            "menuSemanal": []
        }))
        .unwrap();
        let collection = DietCollection::new(Arc::new(MockDietBackend::with_diets(vec![diet])));
        collection.refresh().await.unwrap();

        let mut menu = WeeklyMenu::new();
        menu.add_meal("Lunes", Meal::new("Ensalada", 250, "Almuerzo"));
        let merged = collection
            .update("1", &DietPatch::weekly_menu(menu.clone()))
            .await
            .unwrap();

        assert_eq!(merged.name, "Vegetariana");
        assert_eq!(merged.weekly_menu, menu);
        assert_eq!(collection.diets(), vec![merged]);
    }

    #[tokio::test]
    async fn test_update_of_unknown_id_appends_nothing() {
        let collection = loaded().await;
        let result = collection.update("ghost", &DietPatch::default()).await;
        assert!(matches!(result, Err(ClientError::NotFound(_))));
        assert_eq!(collection.diets().len(), 3);
    }

    #[tokio::test]
    async fn test_update_rejects_invalid_edit() {
        let collection = loaded().await;
        let before = collection.get(VEGETARIANA).unwrap();

        let blank = DietPatch {
            name: Some("   ".to_string()),
            ..DietPatch::default()
        };
        assert!(matches!(
            collection.update(VEGETARIANA, &blank).await,
            Err(ClientError::Validation(ValidationError::MissingDietName))
        ));

        let backwards = DietPatch {
            end_date: Some(before.start_date - chrono::Duration::days(1)),
            ..DietPatch::default()
        };
        assert!(matches!(
            collection.update(VEGETARIANA, &backwards).await,
            Err(ClientError::Validation(ValidationError::InvalidDateRange))
        ));
        assert_eq!(collection.get(VEGETARIANA), Some(before));
    }

    #[tokio::test]
    async fn test_create_appends_server_record() {
        let collection = loaded().await;
        let start = Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).unwrap();
        let created = collection.create(NewDiet::new("Mediterranea", start)).await.unwrap();
        assert_eq!(collection.diets().last(), Some(&created));

        let invalid = NewDiet::new("  ", start);
        assert!(matches!(
            collection.create(invalid).await,
            Err(ClientError::Validation(_))
        ));
        assert_eq!(collection.diets().len(), 4);
    }

    #[tokio::test]
    async fn test_delete_only_after_backend_success() {
        let collection = loaded().await;
        collection.delete(VEGETARIANA).await.unwrap();
        assert!(collection.get(VEGETARIANA).is_none());

        assert!(collection.delete(VEGETARIANA).await.is_err());
        assert_eq!(collection.diets().len(), 2);
    }

    #[tokio::test]
    async fn test_add_meal_coalesces_day() {
        let collection = loaded().await;
        let diet = collection
            .add_meal(VEGETARIANA, "Lunes", Meal::new("Lentejas", 450, "Cena"))
            .await
            .unwrap();

        let lunes = diet.weekly_menu.day("Lunes").unwrap();
        assert_eq!(lunes.meals.len(), 2);
        assert_eq!(diet.weekly_menu.len(), 2);

        let bad = Meal::new("", 100, "Cena");
        assert!(matches!(
            collection.add_meal(VEGETARIANA, "Lunes", bad).await,
            Err(ClientError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_public_page_is_fresh() {
        let collection = DietCollection::new(Arc::new(MockDietBackend::new()));
        let page = collection.public_page(1).await.unwrap();
        assert_eq!(page.items.len(), 3);
        assert_eq!(page.total_pages, 1);
        assert!(collection.diets().is_empty());
        assert!(collection.public_page(2).await.unwrap().items.is_empty());
    }

    #[test]
    fn test_weekly_menu_patch_keeps_other_fields_unset() {
        let patch = DietPatch::weekly_menu(WeeklyMenu::new());
        assert!(patch.name.is_none());
        assert!(patch.weekly_menu.is_some());
    }
}
