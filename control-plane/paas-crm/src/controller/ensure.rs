use std::collections::BTreeSet;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::ResourceExt;
use tracing::{debug, info, trace};

use crate::crd::Paas;
use crate::crd::paas::set_controller_reference;

use super::ReconcileErr;
use super::status::{StatusRecorder, Step};
use super::store::{ManagedKind, ObjectKey, ObjectStore};

fn target<K: ManagedKind>(key: &ObjectKey) -> String {
    format!("{}/{}", K::kind_name(), key)
}

fn owner_of(paas: &Paas) -> Result<OwnerReference, ReconcileErr> {
    paas.owner_reference()
        .ok_or_else(|| ReconcileErr::MissingOwner(paas.name_any()))
}

async fn lookup<K, S>(
    store: &S,
    key: &ObjectKey,
    rec: &mut StatusRecorder,
) -> Result<Option<K>, ReconcileErr>
where
    K: ManagedKind,
    S: ObjectStore<K> + ?Sized,
{
    store.get(key).await.map_err(|e| {
        rec.error(Step::Find, target::<K>(key), e.to_string());
        e.into()
    })
}

/// Bring `desired` into existence under `paas`.
///
/// Absent objects are created with a controller reference. Objects owned by
/// someone else are claimed, and overwritten unless the kind only takes over
/// ownership. Owned objects are rewritten only when they drifted from
/// `desired`.
pub async fn ensure<K, S>(
    store: &S,
    paas: &Paas,
    mut desired: K,
    rec: &mut StatusRecorder,
) -> Result<(), ReconcileErr>
where
    K: ManagedKind,
    S: ObjectStore<K> + ?Sized,
{
    let owner = owner_of(paas)?;
    let key = ObjectKey::of(&desired);
    let kind = K::kind_name();
    let target = target::<K>(&key);

    let Some(mut current) = lookup::<K, S>(store, &key, rec).await? else {
        set_controller_reference(desired.meta_mut(), owner);
        return match store.create(&desired).await {
            Ok(_) => {
                info!(%kind, %key, "created");
                rec.info(Step::Create, target, "succeeded");
                Ok(())
            }
            Err(e) => {
                rec.error(Step::Create, target, e.to_string());
                Err(e.into())
            }
        };
    };

    let message = if !paas.is_controller_of(current.meta()) {
        info!(%kind, %key, "claiming ownership");
        set_controller_reference(current.meta_mut(), owner);
        if !K::rewrite_on_claim() {
            let owners =
                current.meta().owner_references.clone().unwrap_or_default();
            return match store.set_owners(&key, &owners).await {
                Ok(()) => {
                    rec.info(Step::Update, target, "claimed ownership");
                    Ok(())
                }
                Err(e) => {
                    rec.error(Step::Update, target, e.to_string());
                    Err(e.into())
                }
            };
        }
        "claimed ownership"
    } else if K::in_sync(&current, &desired) {
        debug!(%kind, %key, "in sync");
        rec.info(Step::Update, target, "unchanged");
        return Ok(());
    } else {
        "succeeded"
    };

    K::overwrite(&mut current, &desired);
    match store.replace(&current).await {
        Ok(_) => {
            info!(%kind, %key, "updated");
            rec.info(Step::Update, target, message);
            Ok(())
        }
        Err(e) => {
            rec.error(Step::Update, target, e.to_string());
            Err(e.into())
        }
    }
}

/// Remove the object at `key`. Absence is success and ownership is not
/// checked: the key comes from the tenant's own naming scheme.
pub async fn finalize<K, S>(
    store: &S,
    key: &ObjectKey,
    rec: &mut StatusRecorder,
) -> Result<(), ReconcileErr>
where
    K: ManagedKind,
    S: ObjectStore<K> + ?Sized,
{
    if lookup::<K, S>(store, key, rec).await?.is_none() {
        debug!(kind = %K::kind_name(), %key, "already absent");
        return Ok(());
    }
    delete::<K, S>(store, key, rec).await
}

async fn delete<K, S>(
    store: &S,
    key: &ObjectKey,
    rec: &mut StatusRecorder,
) -> Result<(), ReconcileErr>
where
    K: ManagedKind,
    S: ObjectStore<K> + ?Sized,
{
    match store.delete(key).await {
        Ok(()) => {
            info!(kind = %K::kind_name(), %key, "deleted");
            rec.info(Step::Delete, target::<K>(key), "succeeded");
            Ok(())
        }
        Err(e) => {
            rec.error(Step::Delete, target::<K>(key), e.to_string());
            Err(e.into())
        }
    }
}

/// Ensure every object in `desired`, then finalize every key of `possible`
/// that is not desired. Stops at the first error.
pub async fn reconcile_set<K, S>(
    store: &S,
    paas: &Paas,
    desired: Vec<K>,
    possible: &BTreeSet<ObjectKey>,
    rec: &mut StatusRecorder,
) -> Result<(), ReconcileErr>
where
    K: ManagedKind,
    S: ObjectStore<K> + ?Sized,
{
    let wanted: BTreeSet<ObjectKey> = desired.iter().map(ObjectKey::of).collect();
    for obj in desired {
        ensure(store, paas, obj, rec).await?;
    }
    for key in possible.difference(&wanted) {
        finalize::<K, S>(store, key, rec).await?;
    }
    Ok(())
}

/// Delete the objects in `namespace` controlled by `paas` whose key is not
/// in `wanted`. Objects owned by anyone else are left alone.
pub async fn prune_owned<K, S>(
    store: &S,
    paas: &Paas,
    namespace: &str,
    wanted: &BTreeSet<ObjectKey>,
    rec: &mut StatusRecorder,
) -> Result<(), ReconcileErr>
where
    K: ManagedKind,
    S: ObjectStore<K> + ?Sized,
{
    let kind = K::kind_name();
    let existing = store.list(Some(namespace)).await.map_err(|e| {
        rec.error(Step::Find, format!("{kind}/{namespace}"), e.to_string());
        ReconcileErr::from(e)
    })?;

    for obj in existing {
        let key = ObjectKey::of(&obj);
        if !paas.is_controller_of(obj.meta()) {
            trace!(%kind, %key, "not owned by tenant; skipping");
            continue;
        }
        if wanted.contains(&key) {
            continue;
        }
        delete::<K, S>(store, &key, rec).await?;
    }
    Ok(())
}

/// Create `desired` when nothing exists at its key. An existing object is
/// left untouched, whoever owns it.
pub async fn create_if_absent<K, S>(
    store: &S,
    paas: &Paas,
    mut desired: K,
    rec: &mut StatusRecorder,
) -> Result<(), ReconcileErr>
where
    K: ManagedKind,
    S: ObjectStore<K> + ?Sized,
{
    let owner = owner_of(paas)?;
    let key = ObjectKey::of(&desired);
    if lookup::<K, S>(store, &key, rec).await?.is_some() {
        debug!(kind = %K::kind_name(), %key, "exists");
        rec.info(Step::Find, target::<K>(&key), "exists");
        return Ok(());
    }
    set_controller_reference(desired.meta_mut(), owner);
    match store.create(&desired).await {
        Ok(_) => {
            info!(kind = %K::kind_name(), %key, "created");
            rec.info(Step::Create, target::<K>(&key), "succeeded");
            Ok(())
        }
        Err(e) => {
            rec.error(Step::Create, target::<K>(&key), e.to_string());
            Err(e.into())
        }
    }
}
