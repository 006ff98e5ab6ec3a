use std::collections::{BTreeMap, BTreeSet};

use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::ResourceExt;
use tracing::instrument;

use crate::crd::{Paas, PaasConfigSpec, PaasNS, PaasNSSpec};

use super::ReconcileErr;
use super::ensure::{create_if_absent, ensure, prune_owned};
use super::status::StatusRecorder;
use super::store::{ObjectKey, ObjectStore};

/// Namespaces the tenant is entitled to: its root, the extra namespaces it
/// lists and one per enabled capability.
pub fn desired_namespaces(paas: &Paas) -> BTreeSet<String> {
    let mut names = BTreeSet::from([paas.name_any()]);
    names.extend(paas.spec.namespaces.iter().cloned());
    names.extend(paas.enabled_capabilities());
    names
}

fn with_label(
    mut labels: BTreeMap<String, String>,
    key: &str,
    value: &str,
) -> BTreeMap<String, String> {
    if !key.is_empty() {
        labels.insert(key.to_string(), value.to_string());
    }
    labels
}

fn root_namespace(paas: &Paas, config: &PaasConfigSpec) -> Namespace {
    let tenant = paas.name_any();
    let labels = with_label(
        with_label(
            paas.cloned_labels(),
            &config.requestor_label,
            &paas.spec.requestor,
        ),
        &config.quota_label,
        &tenant,
    );
    Namespace {
        metadata: ObjectMeta {
            name: Some(tenant),
            labels: Some(labels),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn descriptor(paas: &Paas, name: &str, config: &PaasConfigSpec) -> PaasNS {
    let tenant = paas.name_any();
    PaasNS {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(tenant.clone()),
            labels: Some(with_label(
                paas.cloned_labels(),
                &config.requestor_label,
                &paas.spec.requestor,
            )),
            ..Default::default()
        },
        spec: PaasNSSpec {
            paas: tenant,
            groups: paas.group_names(),
            ssh_secrets: paas.namespace_secrets(name),
        },
    }
}

pub fn desired_descriptors(paas: &Paas, config: &PaasConfigSpec) -> Vec<PaasNS> {
    desired_namespaces(paas)
        .iter()
        .map(|name| descriptor(paas, name, config))
        .collect()
}

/// Ensure the root namespace and one descriptor per entitled namespace, then
/// prune descriptors this tenant owns but no longer wants.
#[instrument(skip_all, fields(tenant = %paas.name_any()))]
pub async fn reconcile_paas_ns<S>(
    store: &S,
    paas: &Paas,
    config: &PaasConfigSpec,
    rec: &mut StatusRecorder,
) -> Result<(), ReconcileErr>
where
    S: ObjectStore<Namespace> + ObjectStore<PaasNS> + ?Sized,
{
    let tenant = paas.name_any();
    create_if_absent(store, paas, root_namespace(paas, config), rec).await?;

    let desired = desired_descriptors(paas, config);
    let wanted: BTreeSet<ObjectKey> = desired.iter().map(ObjectKey::of).collect();
    for obj in desired {
        ensure(store, paas, obj, rec).await?;
    }
    prune_owned::<PaasNS, S>(store, paas, &tenant, &wanted, rec).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::memory::{MemoryStore, tenant};
    use crate::crd::paas::{PaasCapability, PaasGroup};

    fn config() -> PaasConfigSpec {
        PaasConfigSpec {
            quota_label: "clusterquotagroup".into(),
            requestor_label: "requestor".into(),
            ..Default::default()
        }
    }

    fn acme() -> Paas {
        let mut paas = tenant("acme");
        paas.spec.requestor = "team-blue".into();
        paas.spec.namespaces = vec!["tools".into()];
        paas.spec.groups = BTreeMap::from([
            ("admins".to_string(), PaasGroup::default()),
            ("devs".to_string(), PaasGroup::default()),
        ]);
        paas.spec.ssh_secrets =
            BTreeMap::from([("ssh://git/a".to_string(), "enc-a".to_string())]);
        for (cap, enabled) in [("build", true), ("sso", false)] {
            paas.spec.capabilities.insert(
                cap.into(),
                PaasCapability {
                    enabled,
                    ..Default::default()
                },
            );
        }
        paas
    }

    #[test]
    fn entitled_namespaces() {
        assert_eq!(
            desired_namespaces(&acme()).into_iter().collect::<Vec<_>>(),
            vec!["acme", "build", "tools"]
        );
    }

    #[test]
    fn descriptor_carries_groups_secrets_and_requestor() {
        let d = descriptor(&acme(), "build", &config());
        assert_eq!(d.namespace().as_deref(), Some("acme"));
        assert_eq!(d.spec.paas, "acme");
        assert_eq!(d.spec.groups, vec!["admins", "devs"]);
        assert_eq!(d.spec.ssh_secrets["ssh://git/a"], "enc-a");
        assert_eq!(d.labels()["requestor"], "team-blue");
    }

    #[test]
    fn root_namespace_is_selected_by_base_quota() {
        let ns = root_namespace(&acme(), &config());
        assert_eq!(ns.labels()["clusterquotagroup"], "acme");
        assert_eq!(ns.labels()["requestor"], "team-blue");
    }

    #[tokio::test]
    async fn stale_descriptor_fields_are_replaced() {
        let store = MemoryStore::default();
        let mut paas = acme();
        let mut rec = StatusRecorder::new();
        reconcile_paas_ns(&store, &paas, &config(), &mut rec)
            .await
            .unwrap();

        paas.spec.groups.remove("devs");
        paas.spec.ssh_secrets.clear();
        reconcile_paas_ns(&store, &paas, &config(), &mut rec)
            .await
            .unwrap();

        let d: PaasNS = store
            .object(&ObjectKey::namespaced("acme", "build"))
            .unwrap();
        assert_eq!(d.spec.groups, vec!["admins"]);
        assert!(d.spec.ssh_secrets.is_empty());
    }

    #[tokio::test]
    async fn removed_namespace_descriptor_is_pruned() {
        let store = MemoryStore::default();
        let mut paas = acme();
        let mut rec = StatusRecorder::new();
        reconcile_paas_ns(&store, &paas, &config(), &mut rec)
            .await
            .unwrap();

        paas.spec.namespaces.clear();
        if let Some(build) = paas.spec.capabilities.get_mut("build") {
            build.enabled = false;
        }
        reconcile_paas_ns(&store, &paas, &config(), &mut rec)
            .await
            .unwrap();

        assert_eq!(
            store.keys::<PaasNS>(),
            vec![ObjectKey::namespaced("acme", "acme")]
        );
        assert_eq!(store.keys::<Namespace>(), vec![ObjectKey::cluster("acme")]);
    }
}
