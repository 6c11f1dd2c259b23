//! HTTP client for the remote catalog-asset service.
//!
//! Implements `CatalogApiPort` over REST: entity upserts are multipart
//! requests carrying the scalar fields as JSON plus the new payloads as an
//! ordered batch of binary parts (part order equals batch order). The
//! bearer credential is injected at construction, never read from ambient
//! state.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, instrument};

use sm_core::ids::{AssetId, EntityId};
use sm_core::media::ImagePayload;
use sm_core::ports::catalog_api::{
    CatalogApiError, CatalogApiPort, EntityFields, EntityResponse, RemoteAsset,
};
use sm_core::ports::Credentials;

#[derive(Debug, Clone)]
pub struct CatalogHttpConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl CatalogHttpConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
        }
    }
}

pub struct CatalogHttpClient {
    http: reqwest::Client,
    config: CatalogHttpConfig,
    credentials: Credentials,
}

impl CatalogHttpClient {
    pub fn new(
        config: CatalogHttpConfig,
        credentials: Credentials,
    ) -> Result<Self, CatalogApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| CatalogApiError::Transport(err.to_string()))?;
        Ok(Self {
            http,
            config,
            credentials,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn multipart_form(
        fields: &EntityFields,
        new_payloads: &[ImagePayload],
    ) -> Result<Form, CatalogApiError> {
        let fields_json = serde_json::to_string(fields)
            .map_err(|err| CatalogApiError::Transport(err.to_string()))?;
        let mut form = Form::new().text("fields", fields_json);

        // Part order carries the batch order; the server assigns trailing
        // order indexes in this order.
        for (index, payload) in new_payloads.iter().enumerate() {
            let file_name = payload
                .file_name
                .clone()
                .unwrap_or_else(|| format!("image-{index}"));
            let part = Part::bytes(payload.content().to_vec())
                .file_name(file_name)
                .mime_str(payload.mime.as_str())
                .map_err(|err| CatalogApiError::Transport(err.to_string()))?;
            form = form.part(format!("images[{index}]"), part);
        }
        Ok(form)
    }

    async fn send_upsert(
        &self,
        method: reqwest::Method,
        url: String,
        fields: &EntityFields,
        new_payloads: &[ImagePayload],
    ) -> Result<reqwest::Response, CatalogApiError> {
        let form = Self::multipart_form(fields, new_payloads)?;
        let response = self
            .http
            .request(method, &url)
            .bearer_auth(self.credentials.token())
            .multipart(form)
            .send()
            .await
            .map_err(|err| CatalogApiError::Transport(err.to_string()))?;
        error_for_status(response).await
    }
}

async fn error_for_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, CatalogApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(map_status(status, message))
}

fn map_status(status: StatusCode, message: String) -> CatalogApiError {
    match status {
        StatusCode::NOT_FOUND => CatalogApiError::NotFound,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CatalogApiError::Unauthorized,
        _ => CatalogApiError::Server {
            status: status.as_u16(),
            message,
        },
    }
}

#[derive(Debug, Deserialize)]
struct AssetDto {
    id: String,
    url: String,
    order: u32,
}

#[derive(Debug, Deserialize)]
struct CreateEntityDto {
    id: String,
    assets: Vec<AssetDto>,
}

/// `updateEntity` returns only the asset list; the entity id is already
/// known to the caller.
#[derive(Debug, Deserialize)]
struct UpdateEntityDto {
    assets: Vec<AssetDto>,
}

fn to_remote_assets(assets: Vec<AssetDto>) -> Vec<RemoteAsset> {
    assets
        .into_iter()
        .map(|asset| RemoteAsset {
            id: AssetId::from_string(asset.id),
            url: asset.url,
            order: asset.order,
        })
        .collect()
}

#[async_trait]
impl CatalogApiPort for CatalogHttpClient {
    #[instrument(skip_all, fields(payloads = new_payloads.len()))]
    async fn create_entity(
        &self,
        fields: &EntityFields,
        new_payloads: &[ImagePayload],
    ) -> Result<EntityResponse, CatalogApiError> {
        let response = self
            .send_upsert(
                reqwest::Method::POST,
                self.url("entities"),
                fields,
                new_payloads,
            )
            .await?;
        let dto: CreateEntityDto = response
            .json()
            .await
            .map_err(|err| CatalogApiError::Transport(err.to_string()))?;
        debug!(entity_id = %dto.id, assets = dto.assets.len(), "Entity created");
        Ok(EntityResponse {
            entity_id: EntityId::from_string(dto.id),
            assets: to_remote_assets(dto.assets),
        })
    }

    #[instrument(skip_all, fields(entity_id = %id, payloads = new_payloads.len()))]
    async fn update_entity(
        &self,
        id: &EntityId,
        fields: &EntityFields,
        new_payloads: &[ImagePayload],
    ) -> Result<EntityResponse, CatalogApiError> {
        let response = self
            .send_upsert(
                reqwest::Method::PUT,
                self.url(&format!("entities/{id}")),
                fields,
                new_payloads,
            )
            .await?;
        let dto: UpdateEntityDto = response
            .json()
            .await
            .map_err(|err| CatalogApiError::Transport(err.to_string()))?;
        debug!(assets = dto.assets.len(), "Entity updated");
        Ok(EntityResponse {
            entity_id: id.clone(),
            assets: to_remote_assets(dto.assets),
        })
    }

    #[instrument(skip(self))]
    async fn delete_asset(
        &self,
        entity_id: &EntityId,
        asset_id: &AssetId,
    ) -> Result<(), CatalogApiError> {
        let url = self.url(&format!("entities/{entity_id}/assets/{asset_id}"));
        let response = self
            .http
            .delete(&url)
            .bearer_auth(self.credentials.token())
            .send()
            .await
            .map_err(|err| CatalogApiError::Transport(err.to_string()))?;
        error_for_status(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_covers_the_error_taxonomy() {
        assert_eq!(
            map_status(StatusCode::NOT_FOUND, String::new()),
            CatalogApiError::NotFound
        );
        assert_eq!(
            map_status(StatusCode::UNAUTHORIZED, String::new()),
            CatalogApiError::Unauthorized
        );
        assert_eq!(
            map_status(StatusCode::FORBIDDEN, String::new()),
            CatalogApiError::Unauthorized
        );
        assert_eq!(
            map_status(StatusCode::INTERNAL_SERVER_ERROR, "boom".into()),
            CatalogApiError::Server {
                status: 500,
                message: "boom".into()
            }
        );
        assert_eq!(
            map_status(StatusCode::UNPROCESSABLE_ENTITY, "bad".into()),
            CatalogApiError::Server {
                status: 422,
                message: "bad".into()
            }
        );
    }

    #[test]
    fn wire_assets_convert_preserving_order_field() {
        let assets = vec![
            AssetDto {
                id: "b".into(),
                url: "https://cdn.example/b.jpg".into(),
                order: 1,
            },
            AssetDto {
                id: "a".into(),
                url: "https://cdn.example/a.jpg".into(),
                order: 0,
            },
        ];
        let converted = to_remote_assets(assets);
        assert_eq!(converted[0].id, AssetId::from("b"));
        assert_eq!(converted[0].order, 1);
        assert_eq!(converted[1].order, 0);
    }

    #[test]
    fn multipart_form_rejects_invalid_mime() {
        use bytes::Bytes;
        use sm_core::media::MimeType;

        let payload = ImagePayload::new(
            Bytes::from_static(b"x"),
            MimeType("not a mime".into()),
            None,
        );
        let err = CatalogHttpClient::multipart_form(&EntityFields::new(), &[payload])
            .expect_err("invalid mime");
        assert!(matches!(err, CatalogApiError::Transport(_)));
    }

    #[test]
    fn urls_join_without_duplicate_slashes() {
        let client = CatalogHttpClient::new(
            CatalogHttpConfig::new("https://api.example/v1/"),
            Credentials::bearer("t"),
        )
        .expect("client");
        assert_eq!(client.url("entities"), "https://api.example/v1/entities");
    }
}
