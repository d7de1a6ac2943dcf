//! In-memory fake of the catalog platform (testing only).
//!
//! `MemoryCatalogPlatform` satisfies the [`CatalogPlatform`] contract without
//! any network access. It additionally counts mutating calls so tests can
//! assert that dry runs issue none.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::api::*;
use crate::error::{PlatformError, PlatformResult};

#[derive(Debug, Default)]
struct Inner {
    objects: HashMap<String, CatalogObject>,
    versions: HashMap<String, CatalogVersion>,
}

/// In-memory catalog platform backed by `HashMap`s.
#[derive(Debug, Default)]
pub struct MemoryCatalogPlatform {
    inner: Mutex<Inner>,
    mutations: AtomicU64,
}

impl MemoryCatalogPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of mutating calls (`create_object`, `create_version`,
    /// `delete_object`) issued so far.
    pub fn mutation_count(&self) -> u64 {
        self.mutations.load(Ordering::SeqCst)
    }

    /// Insert an object directly, bypassing the mutation counter. Test setup only.
    pub fn seed_object(&self, object: CatalogObject) {
        let mut inner = self.inner.lock().unwrap();
        inner.objects.insert(object.id.0.clone(), object);
    }

    /// Insert a version directly, bypassing the mutation counter. Test setup only.
    pub fn seed_version(&self, version: CatalogVersion) {
        let mut inner = self.inner.lock().unwrap();
        inner.versions.insert(version.id.0.clone(), version);
    }

    fn max_semver(versions: &[&CatalogVersion]) -> Option<CatalogVersion> {
        versions
            .iter()
            .max_by_key(|v| semver::Version::parse(&v.version).unwrap_or_else(|_| {
                // Unparsable versions sort lowest.
                semver::Version::new(0, 0, 0)
            }))
            .map(|v| (*v).clone())
    }
}

#[async_trait]
impl CatalogPlatform for MemoryCatalogPlatform {
    async fn find_object(
        &self,
        kind: ObjectKind,
        domain_id: Option<&ObjectId>,
        name: &str,
    ) -> PlatformResult<Option<CatalogObject>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .objects
            .values()
            .find(|o| o.kind == kind && o.name == name && o.domain_id.as_ref() == domain_id)
            .cloned())
    }

    async fn latest_version(
        &self,
        object_id: &ObjectId,
    ) -> PlatformResult<Option<CatalogVersion>> {
        let inner = self.inner.lock().unwrap();
        let versions: Vec<&CatalogVersion> = inner
            .versions
            .values()
            .filter(|v| v.object_id == *object_id)
            .collect();
        Ok(Self::max_semver(&versions))
    }

    async fn get_version(&self, version_id: &VersionId) -> PlatformResult<Option<CatalogVersion>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.versions.get(&version_id.0).cloned())
    }

    async fn list_versions(&self, object_id: &ObjectId) -> PlatformResult<Vec<CatalogVersion>> {
        let inner = self.inner.lock().unwrap();
        let mut versions: Vec<CatalogVersion> = inner
            .versions
            .values()
            .filter(|v| v.object_id == *object_id)
            .cloned()
            .collect();
        versions.sort_by_key(|v| v.created_at);
        Ok(versions)
    }

    async fn create_object(&self, request: CreateObject) -> PlatformResult<CatalogObject> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.inner.lock().unwrap();
        let exists = inner.objects.values().any(|o| {
            o.kind == request.kind && o.name == request.name && o.domain_id == request.domain_id
        });
        if exists {
            return Err(PlatformError::Api {
                status: 409,
                message: format!("{} '{}' already exists", request.kind, request.name),
            });
        }
        let object = CatalogObject {
            id: ObjectId::generate(),
            kind: request.kind,
            name: request.name,
            domain_id: request.domain_id,
            shared: request.shared,
        };
        inner.objects.insert(object.id.0.clone(), object.clone());
        Ok(object)
    }

    async fn create_version(&self, request: CreateVersion) -> PlatformResult<CatalogVersion> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.inner.lock().unwrap();
        if !inner.objects.contains_key(&request.object_id.0) {
            return Err(PlatformError::NotFound {
                id: request.object_id.0.clone(),
            });
        }
        let duplicate = inner
            .versions
            .values()
            .any(|v| v.object_id == request.object_id && v.version == request.version);
        if duplicate {
            return Err(PlatformError::Api {
                status: 409,
                message: format!("version '{}' already exists", request.version),
            });
        }
        let version = CatalogVersion {
            id: VersionId::generate(),
            object_id: request.object_id,
            version: request.version,
            state: request.state,
            display_name: request.display_name,
            description: request.description,
            settings: request.settings,
            created_at: Utc::now(),
        };
        inner.versions.insert(version.id.0.clone(), version.clone());
        Ok(version)
    }

    async fn delete_object(&self, object_id: &ObjectId) -> PlatformResult<()> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.inner.lock().unwrap();
        if inner.objects.remove(&object_id.0).is_none() {
            return Err(PlatformError::NotFound {
                id: object_id.0.clone(),
            });
        }
        inner.versions.retain(|_, v| v.object_id != *object_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_req(name: &str) -> CreateObject {
        CreateObject {
            kind: ObjectKind::Schema,
            name: name.to_string(),
            domain_id: None,
            shared: false,
        }
    }

    #[tokio::test]
    async fn latest_version_orders_by_semver_not_insertion() {
        let platform = MemoryCatalogPlatform::new();
        let object = platform.create_object(create_req("s1")).await.unwrap();

        for v in ["1.0.0", "1.10.0", "1.2.0"] {
            platform
                .create_version(CreateVersion {
                    object_id: object.id.clone(),
                    version: v.to_string(),
                    state: LifecycleState::Released,
                    display_name: None,
                    description: None,
                    settings: json!({}),
                })
                .await
                .unwrap();
        }

        let latest = platform.latest_version(&object.id).await.unwrap().unwrap();
        assert_eq!(latest.version, "1.10.0");
    }

    #[tokio::test]
    async fn duplicate_object_name_conflicts() {
        let platform = MemoryCatalogPlatform::new();
        platform.create_object(create_req("s1")).await.unwrap();
        let err = platform.create_object(create_req("s1")).await.unwrap_err();
        match err {
            PlatformError::Api { status, .. } => assert_eq!(status, 409),
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn delete_cascades_versions() {
        let platform = MemoryCatalogPlatform::new();
        let object = platform.create_object(create_req("s1")).await.unwrap();
        let version = platform
            .create_version(CreateVersion {
                object_id: object.id.clone(),
                version: "1.0.0".to_string(),
                state: LifecycleState::Released,
                display_name: None,
                description: None,
                settings: json!({}),
            })
            .await
            .unwrap();

        platform.delete_object(&object.id).await.unwrap();
        assert!(platform.get_version(&version.id).await.unwrap().is_none());
        assert!(platform
            .find_object(ObjectKind::Schema, None, "s1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn mutation_counter_tracks_writes_only() {
        let platform = MemoryCatalogPlatform::new();
        let object = platform.create_object(create_req("s1")).await.unwrap();
        platform
            .find_object(ObjectKind::Schema, None, "s1")
            .await
            .unwrap();
        platform.latest_version(&object.id).await.unwrap();
        assert_eq!(platform.mutation_count(), 1);
    }
}
