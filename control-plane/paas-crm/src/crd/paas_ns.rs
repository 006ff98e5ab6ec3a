use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Namespace descriptor, living in the tenant root namespace. Its name is the
/// namespace name (a capability name, an extra namespace or the root itself).
#[derive(
    CustomResource, Deserialize, Serialize, Clone, Debug, Default, JsonSchema,
    PartialEq,
)]
#[kube(
    group = "cpet.belastingdienst.nl",
    version = "v1alpha1",
    kind = "PaasNS",
    plural = "paasns",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct PaasNSSpec {
    /// Name of the owning tenant
    pub paas: String,
    /// Tenant group names, in order
    #[serde(default)]
    pub groups: Vec<String>,
    /// Encrypted secret references relevant to this namespace
    #[serde(default)]
    pub ssh_secrets: BTreeMap<String, String>,
}
