use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::Resource;
use kube::core::ErrorResponse;

use super::store::{ManagedKind, ObjectKey, ObjectStore};
use crate::crd::{Paas, PaasSpec};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Op {
    Get,
    Create,
    Replace,
    Patch,
    Delete,
    List,
}

#[derive(Default)]
struct Inner {
    objects: BTreeMap<(String, ObjectKey), serde_json::Value>,
    calls: Vec<(Op, String, String)>,
    failures: BTreeSet<(Op, String, String)>,
    next_version: u64,
}

/// Object store kept in memory, keyed by kind and object key. Failures can
/// be injected per operation, kind and name; `List` failures use the
/// namespace as name.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

fn api_error(code: u16, reason: &str, message: String) -> kube::Error {
    kube::Error::Api(ErrorResponse {
        status: "Failure".into(),
        message,
        reason: reason.into(),
        code,
    })
}

impl MemoryStore {
    /// Seed an object without recording a call.
    pub fn insert<K: ManagedKind>(&self, obj: K) {
        let key = ObjectKey::of(&obj);
        let value = serde_json::to_value(&obj).expect("serializable object");
        self.inner
            .lock()
            .unwrap()
            .objects
            .insert((K::kind_name(), key), value);
    }

    /// Seed a raw document, keeping fields the typed model does not know.
    pub fn insert_raw(&self, kind: &str, key: ObjectKey, value: serde_json::Value) {
        self.inner
            .lock()
            .unwrap()
            .objects
            .insert((kind.to_string(), key), value);
    }

    /// Stored document as written, without a typed round trip.
    pub fn raw<K: ManagedKind>(&self, key: &ObjectKey) -> Option<serde_json::Value> {
        self.inner
            .lock()
            .unwrap()
            .objects
            .get(&(K::kind_name(), key.clone()))
            .cloned()
    }

    pub fn object<K: ManagedKind>(&self, key: &ObjectKey) -> Option<K> {
        self.inner
            .lock()
            .unwrap()
            .objects
            .get(&(K::kind_name(), key.clone()))
            .map(|v| serde_json::from_value(v.clone()).expect("stored object"))
    }

    pub fn keys<K: ManagedKind>(&self) -> Vec<ObjectKey> {
        let kind = K::kind_name();
        self.inner
            .lock()
            .unwrap()
            .objects
            .keys()
            .filter(|(k, _)| *k == kind)
            .map(|(_, key)| key.clone())
            .collect()
    }

    pub fn fail_on(&self, op: Op, kind: &str, name: &str) {
        self.inner
            .lock()
            .unwrap()
            .failures
            .insert((op, kind.to_string(), name.to_string()));
    }

    pub fn clear_failures(&self) {
        self.inner.lock().unwrap().failures.clear();
    }

    pub fn clear_calls(&self) {
        self.inner.lock().unwrap().calls.clear();
    }

    pub fn count(&self, op: Op) -> usize {
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(o, _, _)| *o == op)
            .count()
    }

    /// Calls of `op` against the object `name` of `kind`.
    pub fn count_on(&self, op: Op, kind: &str, name: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(o, k, n)| *o == op && k == kind && n == name)
            .count()
    }

    /// Number of create, replace, patch and delete calls.
    pub fn writes(&self) -> usize {
        self.count(Op::Create)
            + self.count(Op::Replace)
            + self.count(Op::Patch)
            + self.count(Op::Delete)
    }

    fn enter(&self, op: Op, kind: &str, name: &str) -> Result<(), kube::Error> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push((op, kind.to_string(), name.to_string()));
        if inner
            .failures
            .contains(&(op, kind.to_string(), name.to_string()))
        {
            return Err(api_error(
                500,
                "InternalError",
                format!("injected {op:?} failure for {kind} {name}"),
            ));
        }
        Ok(())
    }

    fn store<K: ManagedKind>(&self, mut obj: K) -> K {
        let mut inner = self.inner.lock().unwrap();
        inner.next_version += 1;
        obj.meta_mut().resource_version = Some(inner.next_version.to_string());
        let value = serde_json::to_value(&obj).expect("serializable object");
        inner
            .objects
            .insert((K::kind_name(), ObjectKey::of(&obj)), value);
        obj
    }

    fn exists<K: ManagedKind>(&self, key: &ObjectKey) -> bool {
        self.inner
            .lock()
            .unwrap()
            .objects
            .contains_key(&(K::kind_name(), key.clone()))
    }
}

#[async_trait]
impl<K: ManagedKind> ObjectStore<K> for MemoryStore {
    async fn get(&self, key: &ObjectKey) -> Result<Option<K>, kube::Error> {
        self.enter(Op::Get, &K::kind_name(), &key.name)?;
        Ok(self.object(key))
    }

    async fn create(&self, obj: &K) -> Result<K, kube::Error> {
        let key = ObjectKey::of(obj);
        let kind = K::kind_name();
        self.enter(Op::Create, &kind, &key.name)?;
        if self.exists::<K>(&key) {
            return Err(api_error(
                409,
                "AlreadyExists",
                format!("{kind} {key} already exists"),
            ));
        }
        let mut obj = obj.clone();
        obj.meta_mut().uid = Some(format!("uid-{kind}-{key}"));
        Ok(self.store(obj))
    }

    async fn replace(&self, obj: &K) -> Result<K, kube::Error> {
        let key = ObjectKey::of(obj);
        let kind = K::kind_name();
        self.enter(Op::Replace, &kind, &key.name)?;
        if !self.exists::<K>(&key) {
            return Err(api_error(
                404,
                "NotFound",
                format!("{kind} {key} not found"),
            ));
        }
        Ok(self.store(obj.clone()))
    }

    async fn set_owners(
        &self,
        key: &ObjectKey,
        owners: &[OwnerReference],
    ) -> Result<(), kube::Error> {
        let kind = K::kind_name();
        self.enter(Op::Patch, &kind, &key.name)?;
        let mut inner = self.inner.lock().unwrap();
        inner.next_version += 1;
        let version = inner.next_version.to_string();
        let Some(value) = inner.objects.get_mut(&(kind.clone(), key.clone())) else {
            return Err(api_error(
                404,
                "NotFound",
                format!("{kind} {key} not found"),
            ));
        };
        value["metadata"]["ownerReferences"] =
            serde_json::to_value(owners).expect("serializable owners");
        value["metadata"]["resourceVersion"] = version.into();
        Ok(())
    }

    async fn delete(&self, key: &ObjectKey) -> Result<(), kube::Error> {
        let kind = K::kind_name();
        self.enter(Op::Delete, &kind, &key.name)?;
        self.inner
            .lock()
            .unwrap()
            .objects
            .remove(&(kind, key.clone()));
        Ok(())
    }

    async fn list(&self, namespace: Option<&str>) -> Result<Vec<K>, kube::Error> {
        let kind = K::kind_name();
        self.enter(Op::List, &kind, namespace.unwrap_or_default())?;
        Ok(self
            .keys::<K>()
            .into_iter()
            .filter(|k| namespace.is_none() || k.namespace.as_deref() == namespace)
            .filter_map(|k| self.object(&k))
            .collect())
    }
}

/// A persisted tenant named `name` with uid `uid-<name>`.
pub fn tenant(name: &str) -> Paas {
    let mut paas = Paas::new(name, PaasSpec::default());
    paas.metadata.uid = Some(format!("uid-{name}"));
    paas
}
