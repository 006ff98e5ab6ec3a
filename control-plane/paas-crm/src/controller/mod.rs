use std::sync::Arc;

use futures_util::StreamExt;
use kube::runtime::events::{Recorder, Reporter};
use kube::{
    Client,
    api::Api,
    runtime::{Controller, controller::Action, watcher::Config},
};
use tokio::sync::mpsc;
use tokio::time::Duration;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info, warn};

use crate::config::{CrmConfig, DefaultsProvider};
use crate::crd::{AppProject, ClusterResourceQuota, Paas, PaasNS};

mod app_project;
pub mod cache;
pub mod capabilities;
pub mod config_watch;
mod ensure;
pub mod events;
mod paas_ns;
mod quotas;
pub mod reconcile;
pub mod status;
pub mod store;

#[cfg(test)]
mod memory;

pub use cache::StatusCache;
pub use ensure::{create_if_absent, ensure, finalize, prune_owned, reconcile_set};
pub use reconcile::run_pass;
pub use status::{Level, StatusRecorder, Step};
pub use store::{KubeStore, ManagedKind, ObjectKey, ObjectStore, TenantStore};

#[derive(thiserror::Error, Debug)]
pub enum ReconcileErr {
    #[error("kube error: {0}")]
    Kube(#[from] kube::Error),
    #[error("tenant {0} has no uid; cannot own derived resources")]
    MissingOwner(String),
}

#[derive(Clone)]
pub struct ControllerContext {
    pub client: Client,
    pub cfg: CrmConfig,
    pub store: KubeStore,
    pub defaults: DefaultsProvider,
    pub status_cache: StatusCache,
    pub recorder: Option<Recorder>,
}

impl ControllerContext {
    pub fn new(
        client: Client,
        cfg: CrmConfig,
        defaults: DefaultsProvider,
        status_cache: StatusCache,
    ) -> Self {
        let recorder = cfg.events_enabled().then(|| {
            Recorder::new(
                client.clone(),
                Reporter {
                    controller: cfg.field_manager.clone(),
                    instance: std::env::var("HOSTNAME").ok(),
                },
            )
        });
        Self {
            store: KubeStore::new(client.clone(), cfg.field_manager.clone()),
            client,
            cfg,
            defaults,
            status_cache,
            recorder,
        }
    }
}

/// Run the tenant controller until shutdown. Every `()` received on
/// `reload` re-reconciles all tenants.
pub async fn run_controller(
    ctx: ControllerContext,
    reload: Option<mpsc::Receiver<()>>,
) -> anyhow::Result<()> {
    let client = ctx.client.clone();
    let tenants: Api<Paas> = Api::all(client.clone());

    let mut controller = Controller::new(tenants, Config::default())
        .owns(Api::<ClusterResourceQuota>::all(client.clone()), Config::default())
        .owns(Api::<PaasNS>::all(client.clone()), Config::default())
        .owns(Api::<AppProject>::all(client), Config::default());
    if let Some(rx) = reload {
        controller = controller.reconcile_all_on(ReceiverStream::new(rx));
    }

    info!(
        profile = %ctx.cfg.profile,
        events = ctx.cfg.events_enabled(),
        "starting tenant controller"
    );
    controller
        .shutdown_on_signal()
        .run(reconcile::reconcile, error_policy, Arc::new(ctx))
        .for_each(|res| async move {
            match res {
                Ok((obj_ref, action)) => {
                    info!(tenant = %obj_ref.name, ?action, "reconciled")
                }
                Err(e) => error!(error = ?e, "reconcile error"),
            }
        })
        .await;

    Ok(())
}

fn error_policy(
    obj: Arc<Paas>,
    error: &ReconcileErr,
    ctx: Arc<ControllerContext>,
) -> Action {
    warn!(
        tenant = %kube::ResourceExt::name_any(obj.as_ref()),
        %error,
        "pass failed; requeueing"
    );
    Action::requeue(Duration::from_secs(ctx.cfg.error_requeue_secs))
}
