use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::Quota;

/// Operator-wide defaults. A single named instance is watched and swapped in
/// as a whole whenever it changes.
#[derive(
    CustomResource, Deserialize, Serialize, Clone, Debug, Default, JsonSchema,
    PartialEq,
)]
#[kube(
    group = "cpet.belastingdienst.nl",
    version = "v1alpha1",
    kind = "PaasConfig",
    plural = "paasconfigs"
)]
#[serde(rename_all = "camelCase")]
pub struct PaasConfigSpec {
    #[serde(default)]
    pub capabilities: BTreeMap<String, ConfigCapability>,
    /// Label key a ClusterResourceQuota selects its namespaces by
    #[serde(default = "default_quota_label")]
    pub quota_label: String,
    /// Label key carrying the tenant requestor
    #[serde(default = "default_requestor_label")]
    pub requestor_label: String,
    /// Namespace hosting the delivery-pipeline projects
    #[serde(default = "default_argo_namespace")]
    pub argo_namespace: String,
    /// Regexes per resource kind and field, e.g. `paas.groupName`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub validations: BTreeMap<String, BTreeMap<String, String>>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigCapability {
    /// ApplicationSet that deploys this capability
    #[serde(default)]
    pub app_set: String,
    #[serde(default)]
    pub quotas: ConfigQuotaSettings,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_fields: BTreeMap<String, ConfigCustomField>,
    /// Extra permissions granted when a tenant asks for them
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_permissions: BTreeMap<String, Vec<String>>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigQuotaSettings {
    #[serde(default)]
    pub defaults: Quota,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigCustomField {
    /// Regex the value must match; empty means anything goes
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub validation: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default: String,
    #[serde(default)]
    pub required: bool,
}

fn default_quota_label() -> String {
    "clusterquotagroup".into()
}

fn default_requestor_label() -> String {
    "requestor".into()
}

fn default_argo_namespace() -> String {
    "argocd".into()
}

impl PaasConfigSpec {
    /// Default quota of a capability; empty when the capability is not
    /// configured.
    pub fn default_quota(&self, capability: &str) -> Quota {
        self.capabilities
            .get(capability)
            .map(|c| c.quotas.defaults.clone())
            .unwrap_or_default()
    }

    /// Configured validation regex for `kind.field`, if any.
    pub fn validation(&self, kind: &str, field: &str) -> Option<&str> {
        self.validations
            .get(kind)
            .and_then(|f| f.get(field))
            .map(String::as_str)
            .filter(|re| !re.is_empty())
    }
}
