// ============================
// crates/client-lib/src/diet/mod.rs
// ============================
//! Diet plans: the backend contract, its implementations and the local cache.

pub mod cache;
pub mod mock;
pub mod rest;

use async_trait::async_trait;
use nutriplan_common::{Diet, DietPatch, NewDiet};

use crate::config::DietProviderKind;
use crate::error::ClientError;

pub use cache::DietCollection;
pub use mock::MockDietBackend;
pub use rest::RestDietBackend;

/// Remote store of diet plans
#[async_trait]
pub trait DietBackend: Send + Sync {
    fn provider(&self) -> DietProviderKind;

    /// Every public diet
    async fn list_all(&self) -> Result<Vec<Diet>, ClientError>;

    /// Diets owned by the signed-in user
    async fn list_mine(&self) -> Result<Vec<Diet>, ClientError>;

    async fn get(&self, id: &str) -> Result<Diet, ClientError>;

    /// Returns the record as stored, with its assigned id
    async fn create(&self, diet: &NewDiet) -> Result<Diet, ClientError>;

    /// Returns the fields the backend reports after the update
    async fn update(&self, id: &str, patch: &DietPatch) -> Result<DietPatch, ClientError>;

    async fn delete(&self, id: &str) -> Result<(), ClientError>;
}
