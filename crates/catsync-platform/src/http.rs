//! Thin HTTP binding of [`CatalogPlatform`].
//!
//! Speaks plain JSON over REST against a catalog platform instance. Only the
//! operations the reconciliation engine needs are bound; retry and backoff
//! belong to the caller's transport configuration, not here.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::api::*;
use crate::error::{PlatformError, PlatformResult};

/// HTTP client for a remote catalog platform.
pub struct HttpCatalogPlatform {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpCatalogPlatform {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn read_json<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> PlatformResult<T> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PlatformError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json::<T>().await?)
    }

    /// Like [`Self::read_json`] but maps 404 to `None`.
    async fn read_optional<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> PlatformResult<Option<T>> {
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(Self::read_json(response).await?))
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> PlatformResult<reqwest::Response> {
        tracing::debug!(event = "platform.get", path = %path);
        Ok(self
            .client
            .get(self.url(path))
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await?)
    }
}

#[async_trait]
impl CatalogPlatform for HttpCatalogPlatform {
    async fn find_object(
        &self,
        kind: ObjectKind,
        domain_id: Option<&ObjectId>,
        name: &str,
    ) -> PlatformResult<Option<CatalogObject>> {
        let mut query = vec![("name", name)];
        if let Some(id) = domain_id {
            query.push(("applicationDomainId", id.as_str()));
        }
        let response = self.get(kind.path_segment(), &query).await?;
        let matches: Vec<CatalogObject> = Self::read_json(response).await?;
        Ok(matches.into_iter().next())
    }

    async fn latest_version(
        &self,
        object_id: &ObjectId,
    ) -> PlatformResult<Option<CatalogVersion>> {
        let path = format!("objects/{}/versions/latest", object_id);
        let response = self.get(&path, &[]).await?;
        Self::read_optional(response).await
    }

    async fn get_version(&self, version_id: &VersionId) -> PlatformResult<Option<CatalogVersion>> {
        let path = format!("versions/{}", version_id);
        let response = self.get(&path, &[]).await?;
        Self::read_optional(response).await
    }

    async fn list_versions(&self, object_id: &ObjectId) -> PlatformResult<Vec<CatalogVersion>> {
        let path = format!("objects/{}/versions", object_id);
        let response = self.get(&path, &[]).await?;
        Self::read_json(response).await
    }

    async fn create_object(&self, request: CreateObject) -> PlatformResult<CatalogObject> {
        tracing::debug!(event = "platform.create_object", kind = %request.kind, name = %request.name);
        let response = self
            .client
            .post(self.url(request.kind.path_segment()))
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn create_version(&self, request: CreateVersion) -> PlatformResult<CatalogVersion> {
        tracing::debug!(
            event = "platform.create_version",
            object_id = %request.object_id,
            version = %request.version,
        );
        let path = format!("objects/{}/versions", request.object_id);
        let response = self
            .client
            .post(self.url(&path))
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn delete_object(&self, object_id: &ObjectId) -> PlatformResult<()> {
        tracing::debug!(event = "platform.delete_object", object_id = %object_id);
        let path = format!("objects/{}", object_id);
        let response = self
            .client
            .delete(self.url(&path))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(PlatformError::NotFound {
                id: object_id.0.clone(),
            });
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PlatformError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}
