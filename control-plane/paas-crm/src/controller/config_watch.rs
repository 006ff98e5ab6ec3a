use futures_util::StreamExt;
use kube::runtime::{WatchStreamExt, watcher};
use kube::{Api, Client};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::DefaultsProvider;
use crate::crd::{PaasConfig, PaasConfigSpec};

/// Swap in `spec` and ask for a full re-reconcile when it changed anything.
/// Returns the new version, or `None` when the defaults were unchanged.
pub async fn apply_config(
    provider: &DefaultsProvider,
    reload: &mpsc::Sender<()>,
    spec: PaasConfigSpec,
) -> Option<u64> {
    let before = provider.snapshot().await.version;
    let version = provider.replace(spec).await;
    if version == before {
        debug!(version, "defaults unchanged");
        return None;
    }
    info!(version, "defaults replaced; reconciling all tenants");
    if reload.send(()).await.is_err() {
        warn!("controller stopped; reload dropped");
    }
    Some(version)
}

/// Follow the `PaasConfig` named `name` for as long as the stream lives.
pub async fn watch_config(
    client: Client,
    name: String,
    provider: DefaultsProvider,
    reload: mpsc::Sender<()>,
) -> anyhow::Result<()> {
    let api: Api<PaasConfig> = Api::all(client);
    let cfg = watcher::Config::default().fields(&format!("metadata.name={name}"));
    info!(config = %name, "watching defaults");

    let mut events = watcher(api, cfg)
        .default_backoff()
        .applied_objects()
        .boxed();
    while let Some(ev) = events.next().await {
        match ev {
            Ok(config) => {
                apply_config(&provider, &reload, config.spec).await;
            }
            Err(e) => warn!(error = %e, "defaults watch error"),
        }
    }
    Ok(())
}
