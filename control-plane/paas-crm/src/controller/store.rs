use std::fmt::{self, Debug};

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::{Api, DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::{Client, Resource, ResourceExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::crd::{AppProject, ClusterResourceQuota, PaasNS};

/// Identity of a derived object: namespace (if namespaced) and name.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectKey {
    pub namespace: Option<String>,
    pub name: String,
}

impl ObjectKey {
    pub fn cluster(name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            name: name.into(),
        }
    }

    pub fn namespaced(ns: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: Some(ns.into()),
            name: name.into(),
        }
    }

    pub fn of<K: Resource>(obj: &K) -> Self {
        Self {
            namespace: obj.meta().namespace.clone(),
            name: obj.meta().name.clone().unwrap_or_default(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}", ns, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A resource kind the engine derives from tenants.
pub trait ManagedKind:
    Resource<DynamicType = ()>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// Api handle for `namespace`; cluster-scoped kinds ignore it.
    fn api(client: Client, namespace: Option<&str>) -> Api<Self>;

    /// Whether `current` already carries everything `desired` writes.
    fn in_sync(current: &Self, desired: &Self) -> bool;

    /// Replace the mutable fields of `current` with those of `desired`.
    fn overwrite(current: &mut Self, desired: &Self);

    /// Whether claiming a foreign object also rewrites it to the desired
    /// shape. When false only the owner references are written.
    fn rewrite_on_claim() -> bool {
        true
    }

    fn kind_name() -> String {
        Self::kind(&()).into_owned()
    }
}

fn labels_match<K: Resource>(current: &K, desired: &K) -> bool {
    current.meta().labels.clone().unwrap_or_default()
        == desired.meta().labels.clone().unwrap_or_default()
}

impl ManagedKind for ClusterResourceQuota {
    fn api(client: Client, _namespace: Option<&str>) -> Api<Self> {
        Api::all(client)
    }

    fn in_sync(current: &Self, desired: &Self) -> bool {
        current.spec == desired.spec && labels_match(current, desired)
    }

    fn overwrite(current: &mut Self, desired: &Self) {
        current.spec = desired.spec.clone();
        current.metadata.labels = desired.metadata.labels.clone();
    }
}

impl ManagedKind for PaasNS {
    fn api(client: Client, namespace: Option<&str>) -> Api<Self> {
        match namespace {
            Some(ns) => Api::namespaced(client, ns),
            None => Api::all(client),
        }
    }

    fn in_sync(current: &Self, desired: &Self) -> bool {
        current.spec == desired.spec && labels_match(current, desired)
    }

    fn overwrite(current: &mut Self, desired: &Self) {
        current.spec = desired.spec.clone();
        current.metadata.labels = desired.metadata.labels.clone();
    }
}

// The project belongs to whoever set it up; only ownership is written back.
impl ManagedKind for AppProject {
    fn api(client: Client, namespace: Option<&str>) -> Api<Self> {
        match namespace {
            Some(ns) => Api::namespaced(client, ns),
            None => Api::all(client),
        }
    }

    fn in_sync(_current: &Self, _desired: &Self) -> bool {
        true
    }

    fn overwrite(_current: &mut Self, _desired: &Self) {}

    fn rewrite_on_claim() -> bool {
        false
    }
}

impl ManagedKind for Namespace {
    fn api(client: Client, _namespace: Option<&str>) -> Api<Self> {
        Api::all(client)
    }

    fn in_sync(current: &Self, desired: &Self) -> bool {
        labels_match(current, desired)
    }

    fn overwrite(current: &mut Self, desired: &Self) {
        current.metadata.labels = desired.metadata.labels.clone();
    }
}

/// Storage seam of the engine: the cluster in production, memory in tests.
#[async_trait]
pub trait ObjectStore<K: ManagedKind>: Send + Sync {
    async fn get(&self, key: &ObjectKey) -> Result<Option<K>, kube::Error>;
    async fn create(&self, obj: &K) -> Result<K, kube::Error>;
    async fn replace(&self, obj: &K) -> Result<K, kube::Error>;
    /// Set the owner references of the object at `key`, leaving every other
    /// field as stored.
    async fn set_owners(
        &self,
        key: &ObjectKey,
        owners: &[OwnerReference],
    ) -> Result<(), kube::Error>;
    /// Deleting an absent object succeeds.
    async fn delete(&self, key: &ObjectKey) -> Result<(), kube::Error>;
    async fn list(&self, namespace: Option<&str>) -> Result<Vec<K>, kube::Error>;
}

/// Every kind a tenant pass touches.
pub trait TenantStore:
    ObjectStore<ClusterResourceQuota>
    + ObjectStore<PaasNS>
    + ObjectStore<AppProject>
    + ObjectStore<Namespace>
{
}

impl<T> TenantStore for T where
    T: ObjectStore<ClusterResourceQuota>
        + ObjectStore<PaasNS>
        + ObjectStore<AppProject>
        + ObjectStore<Namespace>
{
}

pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 404)
}

#[derive(Clone)]
pub struct KubeStore {
    client: Client,
    field_manager: String,
}

impl KubeStore {
    pub fn new(client: Client, field_manager: impl Into<String>) -> Self {
        Self {
            client,
            field_manager: field_manager.into(),
        }
    }

    fn post_params(&self) -> PostParams {
        PostParams {
            field_manager: Some(self.field_manager.clone()),
            ..Default::default()
        }
    }

    fn patch_params(&self) -> PatchParams {
        PatchParams {
            field_manager: Some(self.field_manager.clone()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl<K: ManagedKind> ObjectStore<K> for KubeStore {
    async fn get(&self, key: &ObjectKey) -> Result<Option<K>, kube::Error> {
        K::api(self.client.clone(), key.namespace.as_deref())
            .get_opt(&key.name)
            .await
    }

    async fn create(&self, obj: &K) -> Result<K, kube::Error> {
        K::api(self.client.clone(), obj.meta().namespace.as_deref())
            .create(&self.post_params(), obj)
            .await
    }

    async fn replace(&self, obj: &K) -> Result<K, kube::Error> {
        K::api(self.client.clone(), obj.meta().namespace.as_deref())
            .replace(&obj.name_any(), &self.post_params(), obj)
            .await
    }

    async fn set_owners(
        &self,
        key: &ObjectKey,
        owners: &[OwnerReference],
    ) -> Result<(), kube::Error> {
        let patch = json!({ "metadata": { "ownerReferences": owners } });
        K::api(self.client.clone(), key.namespace.as_deref())
            .patch(&key.name, &self.patch_params(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &ObjectKey) -> Result<(), kube::Error> {
        let api = K::api(self.client.clone(), key.namespace.as_deref());
        match api.delete(&key.name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(&e) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn list(&self, namespace: Option<&str>) -> Result<Vec<K>, kube::Error> {
        let list = K::api(self.client.clone(), namespace)
            .list(&ListParams::default())
            .await?;
        Ok(list.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::PaasNSSpec;

    #[test]
    fn key_display_includes_namespace() {
        assert_eq!(ObjectKey::cluster("acme").to_string(), "acme");
        assert_eq!(
            ObjectKey::namespaced("acme", "build").to_string(),
            "acme/build"
        );
    }

    #[test]
    fn key_of_object() {
        let mut ns = PaasNS::new(
            "build",
            PaasNSSpec {
                paas: "acme".into(),
                ..Default::default()
            },
        );
        ns.metadata.namespace = Some("acme".into());
        assert_eq!(ObjectKey::of(&ns), ObjectKey::namespaced("acme", "build"));
    }

    #[test]
    fn not_found_detection() {
        let err = kube::Error::Api(kube::core::ErrorResponse {
            status: "Failure".into(),
            message: "paasns \"x\" not found".into(),
            reason: "NotFound".into(),
            code: 404,
        });
        assert!(is_not_found(&err));
        let err = kube::Error::Api(kube::core::ErrorResponse {
            status: "Failure".into(),
            message: "boom".into(),
            reason: "InternalError".into(),
            code: 500,
        });
        assert!(!is_not_found(&err));
    }

    #[test]
    fn project_is_always_in_sync() {
        let a = AppProject::new("acme", crate::crd::AppProjectSpec::wildcard());
        let b = AppProject::new("acme", Default::default());
        assert!(AppProject::in_sync(&a, &b));
        assert!(!ClusterResourceQuota::in_sync(
            &ClusterResourceQuota::new("acme", Default::default()),
            &{
                let mut q = ClusterResourceQuota::new("acme", Default::default());
                q.metadata.labels =
                    Some([("team".to_string(), "blue".to_string())].into());
                q
            }
        ));
    }
}
