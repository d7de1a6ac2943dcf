//! Catalog platform record types and the client trait.
//!
//! The platform stores unversioned [`CatalogObject`]s and their immutable
//! [`CatalogVersion`] revisions. The [`CatalogPlatform`] trait is the only
//! surface the reconciliation engine talks to; an in-memory fake is provided
//! for testing via the `fakes` module and an HTTP binding via `http`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PlatformResult;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Opaque platform identifier of an unversioned catalog object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub String);

impl ObjectId {
    /// Generate a fresh random id (used by fakes; real platforms assign their own).
    pub fn generate() -> Self {
        ObjectId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque platform identifier of one object version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionId(pub String);

impl VersionId {
    pub fn generate() -> Self {
        VersionId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VersionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// The resource kinds the catalog manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    ApplicationDomain,
    Enumeration,
    Schema,
    Event,
    EventApi,
    Application,
}

impl ObjectKind {
    /// REST collection segment on the remote platform.
    pub fn path_segment(&self) -> &'static str {
        match self {
            ObjectKind::ApplicationDomain => "applicationDomains",
            ObjectKind::Enumeration => "enums",
            ObjectKind::Schema => "schemas",
            ObjectKind::Event => "events",
            ObjectKind::EventApi => "eventApis",
            ObjectKind::Application => "applications",
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ObjectKind::ApplicationDomain => "application_domain",
            ObjectKind::Enumeration => "enumeration",
            ObjectKind::Schema => "schema",
            ObjectKind::Event => "event",
            ObjectKind::EventApi => "event_api",
            ObjectKind::Application => "application",
        };
        write!(f, "{}", s)
    }
}

/// Lifecycle state of an object version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Draft,
    Released,
    Deprecated,
    Retired,
}

/// An unversioned, named catalog resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogObject {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub name: String,
    /// Owning application domain. `None` only for application domains themselves.
    pub domain_id: Option<ObjectId>,
    /// Whether the resource is visible outside its owning domain.
    pub shared: bool,
}

/// One immutable revision of a [`CatalogObject`].
///
/// Versions are never mutated in place; an update always produces a new
/// version with a greater semver `version` string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogVersion {
    pub id: VersionId,
    pub object_id: ObjectId,
    /// Semantic version string, unique per object.
    pub version: String,
    pub state: LifecycleState,
    pub display_name: Option<String>,
    pub description: Option<String>,
    /// Kind-specific content, including reference fields pointing at other
    /// versions by id.
    pub settings: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Request payload for creating an unversioned object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateObject {
    pub kind: ObjectKind,
    pub name: String,
    pub domain_id: Option<ObjectId>,
    pub shared: bool,
}

/// Request payload for creating a new version of an existing object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateVersion {
    pub object_id: ObjectId,
    pub version: String,
    pub state: LifecycleState,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub settings: serde_json::Value,
}

// ---------------------------------------------------------------------------
// CatalogPlatform
// ---------------------------------------------------------------------------

/// Remote catalog platform client.
///
/// Guarantees:
/// - Object names are unique per (kind, owning domain).
/// - `latest_version` returns the version with the greatest semver string.
/// - `delete_object` cascades to all versions of the object.
/// - Any call may fail with a structured [`crate::PlatformError`].
#[async_trait]
pub trait CatalogPlatform: Send + Sync {
    /// Look up an object by name within its owning domain. Application
    /// domains pass `domain_id = None`.
    async fn find_object(
        &self,
        kind: ObjectKind,
        domain_id: Option<&ObjectId>,
        name: &str,
    ) -> PlatformResult<Option<CatalogObject>>;

    /// The version of `object_id` with the greatest semver, if any exist.
    async fn latest_version(&self, object_id: &ObjectId)
        -> PlatformResult<Option<CatalogVersion>>;

    /// Look up a single version by its id, across all objects.
    async fn get_version(&self, version_id: &VersionId) -> PlatformResult<Option<CatalogVersion>>;

    /// All versions of an object, in creation order.
    async fn list_versions(&self, object_id: &ObjectId) -> PlatformResult<Vec<CatalogVersion>>;

    /// Create a new unversioned object.
    async fn create_object(&self, request: CreateObject) -> PlatformResult<CatalogObject>;

    /// Create a new version of an existing object.
    async fn create_version(&self, request: CreateVersion) -> PlatformResult<CatalogVersion>;

    /// Delete an object and all of its versions.
    async fn delete_object(&self, object_id: &ObjectId) -> PlatformResult<()>;
}

#[async_trait]
impl<P: CatalogPlatform + ?Sized> CatalogPlatform for &P {
    async fn find_object(
        &self,
        kind: ObjectKind,
        domain_id: Option<&ObjectId>,
        name: &str,
    ) -> PlatformResult<Option<CatalogObject>> {
        (**self).find_object(kind, domain_id, name).await
    }

    async fn latest_version(
        &self,
        object_id: &ObjectId,
    ) -> PlatformResult<Option<CatalogVersion>> {
        (**self).latest_version(object_id).await
    }

    async fn get_version(&self, version_id: &VersionId) -> PlatformResult<Option<CatalogVersion>> {
        (**self).get_version(version_id).await
    }

    async fn list_versions(&self, object_id: &ObjectId) -> PlatformResult<Vec<CatalogVersion>> {
        (**self).list_versions(object_id).await
    }

    async fn create_object(&self, request: CreateObject) -> PlatformResult<CatalogObject> {
        (**self).create_object(request).await
    }

    async fn create_version(&self, request: CreateVersion) -> PlatformResult<CatalogVersion> {
        (**self).create_version(request).await
    }

    async fn delete_object(&self, object_id: &ObjectId) -> PlatformResult<()> {
        (**self).delete_object(object_id).await
    }
}

#[async_trait]
impl<P: CatalogPlatform + ?Sized> CatalogPlatform for std::sync::Arc<P> {
    async fn find_object(
        &self,
        kind: ObjectKind,
        domain_id: Option<&ObjectId>,
        name: &str,
    ) -> PlatformResult<Option<CatalogObject>> {
        (**self).find_object(kind, domain_id, name).await
    }

    async fn latest_version(
        &self,
        object_id: &ObjectId,
    ) -> PlatformResult<Option<CatalogVersion>> {
        (**self).latest_version(object_id).await
    }

    async fn get_version(&self, version_id: &VersionId) -> PlatformResult<Option<CatalogVersion>> {
        (**self).get_version(version_id).await
    }

    async fn list_versions(&self, object_id: &ObjectId) -> PlatformResult<Vec<CatalogVersion>> {
        (**self).list_versions(object_id).await
    }

    async fn create_object(&self, request: CreateObject) -> PlatformResult<CatalogObject> {
        (**self).create_object(request).await
    }

    async fn create_version(&self, request: CreateVersion) -> PlatformResult<CatalogVersion> {
        (**self).create_version(request).await
    }

    async fn delete_object(&self, object_id: &ObjectId) -> PlatformResult<()> {
        (**self).delete_object(object_id).await
    }
}
