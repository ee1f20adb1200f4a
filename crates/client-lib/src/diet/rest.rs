//! Diet backend over the REST API at `{api_url}/diet`.
//!
//! Requests ride on the same cookie jar as the session-cookie auth backend,
//! the backend identifies the owner from the session.
use std::sync::Arc;

use async_trait::async_trait;
use nutriplan_common::{
    wire::{DietList, UpdatedDiet},
    Diet, DietPatch, NewDiet,
};
use reqwest::{Response, StatusCode};
use tracing::{debug, instrument};

use super::DietBackend;
use crate::auth::PersistentCookies;
use crate::config::{DietProviderKind, Settings};
use crate::error::ClientError;

const FETCH_ALL: &str = "Could not fetch the public diets.";
const FETCH_OWN: &str = "Could not fetch your diets.";
const FETCH_ONE: &str = "Could not fetch the requested diet.";
const CREATE: &str = "Could not create the diet.";
const UPDATE: &str = "Could not update the diet.";
const DELETE: &str = "Could not delete the diet.";

pub struct RestDietBackend {
    client: reqwest::Client,
    base: String,
}

impl RestDietBackend {
    pub fn new(settings: &Settings, cookies: Arc<PersistentCookies>) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().cookie_provider(cookies).build()?;
        Ok(Self {
            client,
            base: format!("{}/diet", settings.api_url.trim_end_matches('/')),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

/// 404 becomes `NotFound`, any other failure status `Backend` with `message`
fn check(response: Response, message: &str) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    debug!(%status, url = %response.url(), "diet request failed");
    if status == StatusCode::NOT_FOUND {
        return Err(ClientError::NotFound(message.to_string()));
    }
    Err(ClientError::Backend {
        status: status.as_u16(),
        message: message.to_string(),
    })
}

#[async_trait]
impl DietBackend for RestDietBackend {
    fn provider(&self) -> DietProviderKind {
        DietProviderKind::Mongo
    }

    #[instrument(skip(self))]
    async fn list_all(&self) -> Result<Vec<Diet>, ClientError> {
        let response = self.client.get(self.url("")).send().await?;
        let list: DietList = check(response, FETCH_ALL)?.json().await?;
        Ok(list.dietas)
    }

    #[instrument(skip(self))]
    async fn list_mine(&self) -> Result<Vec<Diet>, ClientError> {
        let response = self.client.get(self.url("/mis-dietas")).send().await?;
        let list: DietList = check(response, FETCH_OWN)?.json().await?;
        Ok(list.dietas)
    }

    #[instrument(skip(self))]
    async fn get(&self, id: &str) -> Result<Diet, ClientError> {
        let response = self.client.get(self.url(&format!("/{id}"))).send().await?;
        Ok(check(response, FETCH_ONE)?.json().await?)
    }

    #[instrument(skip(self, diet), fields(name = %diet.name))]
    async fn create(&self, diet: &NewDiet) -> Result<Diet, ClientError> {
        let response = self.client.post(self.url("")).json(diet).send().await?;
        Ok(check(response, CREATE)?.json().await?)
    }

    #[instrument(skip(self, patch))]
    async fn update(&self, id: &str, patch: &DietPatch) -> Result<DietPatch, ClientError> {
        let response = self
            .client
            .put(self.url(&format!("/{id}")))
            .json(patch)
            .send()
            .await?;
        let updated: UpdatedDiet = check(response, UPDATE)?.json().await?;
        Ok(updated.diet)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> Result<(), ClientError> {
        let response = self.client.delete(self.url(&format!("/{id}"))).send().await?;
        check(response, DELETE)?;
        Ok(())
    }
}
