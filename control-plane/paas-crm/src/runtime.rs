use std::net::SocketAddr;

use futures_util::future::pending;
use kube::Client;
use tokio::{select, sync::mpsc, task::JoinHandle};
use tracing::info;

use crate::{
    config::{CrmConfig, DefaultsProvider},
    controller::{
        ControllerContext, StatusCache, config_watch::watch_config,
        run_controller,
    },
    web::{AppState, run_http_server},
};

/// Compute the HTTP bind address based on config.
pub fn compute_http_addr(cfg: &CrmConfig) -> SocketAddr {
    ([0, 0, 0, 0], cfg.http_port).into()
}

/// Spawn the tenant controller loop.
pub fn spawn_controller(
    ctx: ControllerContext,
    reload: Option<mpsc::Receiver<()>>,
) -> JoinHandle<anyhow::Result<()>> {
    tokio::spawn(async move { run_controller(ctx, reload).await })
}

/// Spawn the PaasConfig watcher feeding `provider`.
pub fn spawn_config_watch(
    client: Client,
    cfg: &CrmConfig,
    provider: DefaultsProvider,
    reload: mpsc::Sender<()>,
) -> JoinHandle<anyhow::Result<()>> {
    let name = cfg.config_name.clone();
    tokio::spawn(async move { watch_config(client, name, provider, reload).await })
}

pub fn spawn_http(
    addr: SocketAddr,
    state: AppState,
) -> JoinHandle<anyhow::Result<()>> {
    tokio::spawn(async move { run_http_server(addr, state).await })
}

/// Parks forever; stands in for a disabled service.
fn spawn_idle() -> JoinHandle<anyhow::Result<()>> {
    tokio::spawn(async { pending::<anyhow::Result<()>>().await })
}

/// Start the controller, the config watcher and the HTTP surface and wait
/// until any of them finishes.
pub async fn run_all(client: Client, cfg: CrmConfig) -> anyhow::Result<()> {
    let defaults = DefaultsProvider::new(cfg.bootstrap.to_spec());
    let status_cache = StatusCache::new();

    let (watch, reload) = if cfg.config_watch_enabled() {
        let (tx, rx) = mpsc::channel(8);
        (
            spawn_config_watch(client.clone(), &cfg, defaults.clone(), tx),
            Some(rx),
        )
    } else {
        info!("config watch disabled; using bootstrap defaults");
        (spawn_idle(), None)
    };

    let http = if cfg.http_enabled() {
        spawn_http(
            compute_http_addr(&cfg),
            AppState {
                defaults: defaults.clone(),
                status_cache: status_cache.clone(),
            },
        )
    } else {
        spawn_idle()
    };

    let ctx = ControllerContext::new(client, cfg, defaults, status_cache);
    let controller = spawn_controller(ctx, reload);

    select! {
        res = controller => res?,
        res = watch => res?,
        res = http => res?,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use envconfig::Envconfig;
    use std::collections::HashMap;

    #[test]
    fn http_addr_binds_all_interfaces() {
        let cfg = CrmConfig::init_from_hashmap(&HashMap::from([(
            "HTTP_PORT".to_string(),
            "9090".to_string(),
        )]))
        .unwrap();
        assert_eq!(compute_http_addr(&cfg).to_string(), "0.0.0.0:9090");
    }
}
