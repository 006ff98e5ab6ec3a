use std::collections::BTreeMap;

use crate::crd::paas::Paas;
use crate::crd::{PaasConfigSpec, Quota};

/// Status key holding the tenant base quota.
pub const DEFAULT_QUOTA_KEY: &str = "default";

/// Key-wise union of `defaults` and `overrides`; overrides win.
pub fn quota_with_defaults(overrides: &Quota, defaults: &Quota) -> Quota {
    let mut merged = defaults.clone();
    merged.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// Effective quota of every capability the tenant lists, enabled or not.
pub fn effective_quotas(
    paas: &Paas,
    defaults: &PaasConfigSpec,
) -> BTreeMap<String, Quota> {
    paas.spec
        .capabilities
        .iter()
        .map(|(name, cap)| {
            (
                name.clone(),
                quota_with_defaults(&cap.quota, &defaults.default_quota(name)),
            )
        })
        .collect()
}

/// Quota map published in the tenant status: the base quota under
/// [`DEFAULT_QUOTA_KEY`] plus one entry per enabled capability. A capability
/// named like the base key takes its place.
pub fn quota_status(
    paas: &Paas,
    defaults: &PaasConfigSpec,
) -> BTreeMap<String, Quota> {
    let enabled = paas.enabled_capabilities();
    let mut status =
        BTreeMap::from([(DEFAULT_QUOTA_KEY.to_string(), paas.spec.quota.clone())]);
    status.extend(
        effective_quotas(paas, defaults)
            .into_iter()
            .filter(|(name, _)| enabled.contains(name)),
    );
    status
}
