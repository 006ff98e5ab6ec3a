#![allow(dead_code)]

use std::future::Future;
use std::time::Duration;

use envconfig::Envconfig;
use kube::{Api, Client};
use paas_crm::config::{CrmConfig, DefaultsProvider};
use paas_crm::controller::{ControllerContext, StatusCache, run_controller};
use paas_crm::crd::Paas;
use tokio::task::JoinHandle;

// DNS-1123 safe numeric suffix for unique names
pub const DIGITS: [char; 10] =
    ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9'];
pub fn uniq(prefix: &str) -> String {
    format!("{prefix}-{}", nanoid::nanoid!(6, &DIGITS))
}

// Env guard utilities
pub struct EnvGuard {
    key: &'static str,
    old: Option<String>,
}
impl Drop for EnvGuard {
    fn drop(&mut self) {
        unsafe {
            if let Some(ref v) = self.old {
                std::env::set_var(self.key, v);
            } else {
                std::env::remove_var(self.key);
            }
        }
    }
}
pub fn set_env(key: &'static str, val: &str) -> EnvGuard {
    let old = std::env::var(key).ok();
    unsafe {
        std::env::set_var(key, val);
    }
    EnvGuard { key, old }
}

/// Poll `check` once a second until it holds or `secs` elapse.
pub async fn eventually<F, Fut>(secs: u64, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..secs {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
    false
}

/// Run the tenant controller in the background with env config.
pub fn spawn_controller(client: Client) -> (JoinHandle<()>, StatusCache) {
    let cfg = CrmConfig::init_from_env()
        .expect("config from env")
        .apply_profile_defaults();
    let cache = StatusCache::new();
    let defaults = DefaultsProvider::new(cfg.bootstrap.to_spec());
    let ctx =
        ControllerContext::new(client, cfg, defaults, cache.clone());
    let handle = tokio::spawn(async move {
        let _ = run_controller(ctx, None).await;
    });
    (handle, cache)
}

// RAII guard to ensure controller abort + tenant deletion
pub struct TenantGuard {
    name: String,
    client: Client,
    ctrl: Option<JoinHandle<()>>,
}

impl TenantGuard {
    pub fn new(name: &str, client: Client) -> Self {
        Self {
            name: name.to_string(),
            client,
            ctrl: None,
        }
    }
    pub fn with_controller(mut self, ctrl: JoinHandle<()>) -> Self {
        self.ctrl = Some(ctrl);
        self
    }
}

impl Drop for TenantGuard {
    fn drop(&mut self) {
        if let Some(ref handle) = self.ctrl {
            handle.abort();
        }
        let name = self.name.clone();
        let client = self.client.clone();
        // Derived resources follow through owner references.
        let _ = tokio::spawn(async move {
            let api: Api<Paas> = Api::all(client);
            let _ = api.delete(&name, &Default::default()).await;
        });
    }
}
