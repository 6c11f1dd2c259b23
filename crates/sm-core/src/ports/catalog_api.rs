//! Catalog API port - abstracts the remote catalog-asset service.
//!
//! The remote service is an external collaborator; this port is the only
//! surface the engine talks to it through. The binary payload ordering
//! passed to `create_entity`/`update_entity` is the ordering computed by
//! the diff, which matches each payload's position at validation time.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{AssetId, EntityId};
use crate::media::payload::ImagePayload;

/// Scalar entity fields carried alongside the media batch on upsert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityFields(pub serde_json::Map<String, serde_json::Value>);

impl EntityFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }
}

/// One asset as the server reports it after an upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAsset {
    pub id: AssetId,
    pub url: String,
    pub order: u32,
}

/// Authoritative server state returned by `create_entity`/`update_entity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityResponse {
    pub entity_id: EntityId,
    /// All assets of the entity, including server-assigned ids and order
    /// for newly added ones.
    pub assets: Vec<RemoteAsset>,
}

/// Errors from the remote catalog service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogApiError {
    #[error("resource not found")]
    NotFound,

    #[error("not authorized")]
    Unauthorized,

    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),
}

/// Catalog API port - abstracts the remote catalog-asset service.
#[async_trait]
pub trait CatalogApiPort: Send + Sync {
    /// Create a new entity carrying scalar fields plus an ordered batch of
    /// new binary payloads.
    async fn create_entity(
        &self,
        fields: &EntityFields,
        new_payloads: &[ImagePayload],
    ) -> Result<EntityResponse, CatalogApiError>;

    /// Update an existing entity; semantics of the payload batch match
    /// `create_entity`.
    async fn update_entity(
        &self,
        id: &EntityId,
        fields: &EntityFields,
        new_payloads: &[ImagePayload],
    ) -> Result<EntityResponse, CatalogApiError>;

    /// Delete one persisted asset of an entity.
    async fn delete_asset(
        &self,
        entity_id: &EntityId,
        asset_id: &AssetId,
    ) -> Result<(), CatalogApiError>;
}
