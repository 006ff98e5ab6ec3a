use std::collections::{BTreeMap, BTreeSet};

use k8s_openapi::api::core::v1::ResourceQuotaSpec;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::ResourceExt;
use tracing::instrument;

use crate::crd::quota::ClusterResourceQuotaSelector;
use crate::crd::{
    ClusterResourceQuota, ClusterResourceQuotaSpec, Paas, PaasConfigSpec, Quota,
};

use super::capabilities::effective_quotas;
use super::ensure::reconcile_set;
use super::status::StatusRecorder;
use super::store::{ObjectKey, ObjectStore};
use super::ReconcileErr;

/// `<tenant>` for the base quota, `<tenant>-<capability>` otherwise.
pub fn quota_name(tenant: &str, capability: Option<&str>) -> String {
    match capability {
        Some(cap) => format!("{tenant}-{cap}"),
        None => tenant.to_string(),
    }
}

fn build_quota(
    paas: &Paas,
    name: String,
    hard: Quota,
    config: &PaasConfigSpec,
) -> ClusterResourceQuota {
    ClusterResourceQuota {
        metadata: ObjectMeta {
            name: Some(name.clone()),
            labels: Some(paas.cloned_labels()),
            ..Default::default()
        },
        spec: ClusterResourceQuotaSpec {
            selector: ClusterResourceQuotaSelector {
                labels: Some(LabelSelector {
                    match_labels: Some(BTreeMap::from([(
                        config.quota_label.clone(),
                        name,
                    )])),
                    ..Default::default()
                }),
                annotations: None,
            },
            quota: ResourceQuotaSpec {
                hard: Some(hard),
                ..Default::default()
            },
        },
    }
}

/// Base quota plus one effective quota per enabled capability.
pub fn desired_quotas(
    paas: &Paas,
    config: &PaasConfigSpec,
) -> Vec<ClusterResourceQuota> {
    let tenant = paas.name_any();
    let enabled = paas.enabled_capabilities();
    let mut desired = vec![build_quota(
        paas,
        quota_name(&tenant, None),
        paas.spec.quota.clone(),
        config,
    )];
    desired.extend(
        effective_quotas(paas, config)
            .into_iter()
            .filter(|(cap, _)| enabled.contains(cap))
            .map(|(cap, hard)| {
                build_quota(paas, quota_name(&tenant, Some(&cap)), hard, config)
            }),
    );
    desired
}

/// Every quota name the tenant could own: the base plus one per configured
/// capability and per capability named in the tenant.
pub fn possible_quota_keys(
    paas: &Paas,
    config: &PaasConfigSpec,
) -> BTreeSet<ObjectKey> {
    let tenant = paas.name_any();
    config
        .capabilities
        .keys()
        .chain(paas.spec.capabilities.keys())
        .map(|cap| ObjectKey::cluster(quota_name(&tenant, Some(cap))))
        .chain(std::iter::once(ObjectKey::cluster(quota_name(&tenant, None))))
        .collect()
}

#[instrument(skip_all, fields(tenant = %paas.name_any()))]
pub async fn reconcile_quotas<S>(
    store: &S,
    paas: &Paas,
    config: &PaasConfigSpec,
    rec: &mut StatusRecorder,
) -> Result<(), ReconcileErr>
where
    S: ObjectStore<ClusterResourceQuota> + ?Sized,
{
    reconcile_set(
        store,
        paas,
        desired_quotas(paas, config),
        &possible_quota_keys(paas, config),
        rec,
    )
    .await
}
