use std::collections::{BTreeMap, BTreeSet};

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{
    ObjectMeta, OwnerReference,
};
use kube::{CustomResource, Resource};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::Quota;

/// Stripped when tenant labels are copied onto derived resources.
pub const INSTANCE_LABEL: &str = "app.kubernetes.io/instance";

#[derive(
    CustomResource, Deserialize, Serialize, Clone, Debug, Default, JsonSchema,
)]
#[kube(
    group = "cpet.belastingdienst.nl",
    version = "v1alpha1",
    kind = "Paas",
    plural = "paas",
    status = "PaasStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct PaasSpec {
    /// Team or person accountable for this tenant
    #[serde(default)]
    pub requestor: String,
    /// Base quota for the tenant root namespace
    #[serde(default)]
    pub quota: Quota,
    #[serde(default)]
    pub capabilities: BTreeMap<String, PaasCapability>,
    #[serde(default)]
    pub groups: BTreeMap<String, PaasGroup>,
    /// Additional plain namespaces the tenant is entitled to
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub namespaces: Vec<String>,
    /// Encrypted secrets made available in every tenant namespace
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ssh_secrets: BTreeMap<String, String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaasCapability {
    #[serde(default)]
    pub enabled: bool,
    /// Per-resource overrides merged over the configured defaults
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub quota: Quota,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_fields: BTreeMap<String, String>,
    /// Encrypted secrets only made available in this capability's namespace
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ssh_secrets: BTreeMap<String, String>,
    #[serde(default)]
    pub extra_permissions: bool,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaasGroup {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<String>,
    /// Group-membership query; takes precedence over `users` when both are set
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub query: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaasStatus {
    /// Outcome of every step of the latest reconciliation pass
    #[serde(default)]
    pub messages: Vec<PaasStatusMessage>,
    /// Effective quota per enabled capability, plus `default` for the base
    #[serde(default)]
    pub quota: BTreeMap<String, Quota>,
}

#[derive(
    Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq, Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct PaasStatusMessage {
    pub level: String,
    pub action: String,
    pub target: String,
    pub message: String,
}

impl Paas {
    /// Tenant labels as they are copied onto derived resources.
    pub fn cloned_labels(&self) -> BTreeMap<String, String> {
        let mut labels = self.metadata.labels.clone().unwrap_or_default();
        labels.remove(INSTANCE_LABEL);
        labels
    }

    /// Controller owner reference pointing at this tenant. `None` when the
    /// tenant has not been persisted yet (no uid).
    pub fn owner_reference(&self) -> Option<OwnerReference> {
        self.controller_owner_ref(&())
    }

    /// Whether `meta` names this tenant as its controlling owner.
    pub fn is_controller_of(&self, meta: &ObjectMeta) -> bool {
        let Some(uid) = self.metadata.uid.as_deref() else {
            return false;
        };
        meta.owner_references.iter().flatten().any(|o| {
            o.controller == Some(true)
                && o.uid == uid
                && o.kind == Self::kind(&())
        })
    }

    /// Enabled capability names. An absent capability entry is disabled.
    pub fn enabled_capabilities(&self) -> BTreeSet<String> {
        self.spec
            .capabilities
            .iter()
            .filter(|(_, c)| c.enabled)
            .map(|(n, _)| n.clone())
            .collect()
    }

    /// Secret references for namespace `ns`: the tenant-wide secrets
    /// overlaid with those of the capability named `ns`, if any.
    pub fn namespace_secrets(&self, ns: &str) -> BTreeMap<String, String> {
        let mut secrets = self.spec.ssh_secrets.clone();
        if let Some(cap) = self.spec.capabilities.get(ns) {
            secrets.extend(
                cap.ssh_secrets.iter().map(|(k, v)| (k.clone(), v.clone())),
            );
        }
        secrets
    }

    pub fn group_names(&self) -> Vec<String> {
        self.spec.groups.keys().cloned().collect()
    }
}

/// Attach `owner` as the controlling owner of `meta`, replacing any other
/// controller reference and any stale reference to the same owner.
pub fn set_controller_reference(meta: &mut ObjectMeta, owner: OwnerReference) {
    let refs = meta.owner_references.get_or_insert_with(Vec::new);
    refs.retain(|o| o.controller != Some(true) && o.uid != owner.uid);
    refs.push(owner);
}
