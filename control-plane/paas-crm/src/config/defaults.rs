use std::sync::Arc;

use tokio::sync::RwLock;

use crate::crd::PaasConfigSpec;

/// One immutable generation of the operator defaults.
#[derive(Clone, Debug, PartialEq)]
pub struct VersionedDefaults {
    pub version: u64,
    pub spec: PaasConfigSpec,
}

/// Shared handle to the current defaults. Readers take a snapshot per pass;
/// writers replace the whole value.
#[derive(Clone, Debug)]
pub struct DefaultsProvider(Arc<RwLock<Arc<VersionedDefaults>>>);

impl DefaultsProvider {
    pub fn new(spec: PaasConfigSpec) -> Self {
        Self(Arc::new(RwLock::new(Arc::new(VersionedDefaults {
            version: 1,
            spec,
        }))))
    }

    pub async fn snapshot(&self) -> Arc<VersionedDefaults> {
        self.0.read().await.clone()
    }

    /// Swap in `spec` and return the new version. Identical specs keep the
    /// current version.
    pub async fn replace(&self, spec: PaasConfigSpec) -> u64 {
        let mut w = self.0.write().await;
        if w.spec == spec {
            return w.version;
        }
        let version = w.version + 1;
        *w = Arc::new(VersionedDefaults { version, spec });
        version
    }
}
