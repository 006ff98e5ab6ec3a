use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Argo CD project scoping the tenant's delivery pipeline.
#[derive(
    CustomResource, Deserialize, Serialize, Clone, Debug, Default, JsonSchema,
    PartialEq,
)]
#[kube(
    group = "argoproj.io",
    version = "v1alpha1",
    kind = "AppProject",
    plural = "appprojects",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct AppProjectSpec {
    #[serde(default)]
    pub cluster_resource_whitelist: Vec<GroupKind>,
    #[serde(default)]
    pub destinations: Vec<ApplicationDestination>,
    #[serde(default)]
    pub source_repos: Vec<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema, PartialEq)]
pub struct GroupKind {
    pub group: String,
    pub kind: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema, PartialEq)]
pub struct ApplicationDestination {
    pub namespace: String,
    pub server: String,
}

impl AppProjectSpec {
    /// Allow everything: the project is only a namespace-scoping boundary.
    pub fn wildcard() -> Self {
        Self {
            cluster_resource_whitelist: vec![GroupKind {
                group: "*".into(),
                kind: "*".into(),
            }],
            destinations: vec![ApplicationDestination {
                namespace: "*".into(),
                server: "*".into(),
            }],
            source_repos: vec!["*".into()],
        }
    }
}
