pub mod app_project;
pub mod paas;
pub mod paas_config;
pub mod paas_ns;
pub mod quota;

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

/// Resource name (e.g. `limits.cpu`) to quantity.
pub type Quota = BTreeMap<String, Quantity>;

pub use app_project::{AppProject, AppProjectSpec};
pub use paas::{Paas, PaasSpec, PaasStatus};
pub use paas_config::{PaasConfig, PaasConfigSpec};
pub use paas_ns::{PaasNS, PaasNSSpec};
pub use quota::{ClusterResourceQuota, ClusterResourceQuotaSpec};
