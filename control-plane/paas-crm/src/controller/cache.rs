use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::crd::PaasStatus;

/// Last published status per tenant name.
#[derive(Clone, Default)]
pub struct StatusCache(pub Arc<RwLock<HashMap<String, PaasStatus>>>);

impl StatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert(&self, tenant: String, status: PaasStatus) {
        let mut w = self.0.write().await;
        w.insert(tenant, status);
    }

    pub async fn remove(&self, tenant: &str) {
        let mut w = self.0.write().await;
        w.remove(tenant);
    }

    pub async fn get(&self, tenant: &str) -> Option<PaasStatus> {
        let r = self.0.read().await;
        r.get(tenant).cloned()
    }

    pub async fn tenants(&self) -> Vec<String> {
        let r = self.0.read().await;
        let mut names: Vec<String> = r.keys().cloned().collect();
        names.sort();
        names
    }
}
