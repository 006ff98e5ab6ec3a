use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use kube::api::{Api, Patch, PatchParams};
use kube::runtime::controller::Action;
use kube::{Resource, ResourceExt};
use serde_json::json;
use tracing::{debug, info, instrument, trace, warn};

use crate::config::VersionedDefaults;
use crate::crd::{Paas, PaasConfigSpec, PaasStatus, Quota};

use super::app_project::reconcile_app_project;
use super::capabilities::quota_status;
use super::events::emit_pass_event;
use super::paas_ns::reconcile_paas_ns;
use super::quotas::reconcile_quotas;
use super::status::{StatusRecorder, build_status};
use super::store::TenantStore;
use super::{ControllerContext, ReconcileErr};

/// Result of one pass: the status to publish and the first error, if any.
#[derive(Debug)]
pub struct PassOutcome {
    pub status: PaasStatus,
    pub result: Result<(), ReconcileErr>,
}

async fn run_stages<S>(
    store: &S,
    paas: &Paas,
    config: &PaasConfigSpec,
    rec: &mut StatusRecorder,
    quota: &mut BTreeMap<String, Quota>,
) -> Result<(), ReconcileErr>
where
    S: TenantStore + ?Sized,
{
    reconcile_quotas(store, paas, config, rec).await?;
    *quota = quota_status(paas, config);
    reconcile_paas_ns(store, paas, config, rec).await?;
    reconcile_app_project(store, paas, config, rec).await
}

/// One reconciliation pass for `paas`: quotas, then namespace descriptors,
/// then the pipeline project. The first failing stage ends the pass; the
/// quota status then keeps its previously published value.
#[instrument(skip_all, fields(tenant = %paas.name_any(), defaults = defaults.version))]
pub async fn run_pass<S>(
    store: &S,
    paas: &Paas,
    defaults: &VersionedDefaults,
) -> PassOutcome
where
    S: TenantStore + ?Sized,
{
    let mut rec = StatusRecorder::new();
    let mut quota = paas
        .status
        .as_ref()
        .map(|s| s.quota.clone())
        .unwrap_or_default();

    let result =
        run_stages(store, paas, &defaults.spec, &mut rec, &mut quota).await;
    match &result {
        Ok(()) => debug!(steps = rec.len(), "pass complete"),
        Err(e) => warn!(error = %e, steps = rec.len(), "pass aborted"),
    }
    PassOutcome {
        status: build_status(&rec, quota),
        result,
    }
}

fn should_patch_status(current: Option<&PaasStatus>, desired: &PaasStatus) -> bool {
    match current {
        None => true,
        Some(cur) => cur != desired,
    }
}

async fn publish_status(
    ctx: &ControllerContext,
    paas: &Paas,
    status: &PaasStatus,
) -> Result<(), ReconcileErr> {
    let name = paas.name_any();
    if !should_patch_status(paas.status.as_ref(), status) {
        trace!(tenant = %name, "status unchanged; skipping patch");
        return Ok(());
    }
    let api: Api<Paas> = Api::all(ctx.client.clone());
    let patch = json!({
        "apiVersion": Paas::api_version(&()),
        "kind": Paas::kind(&()),
        "status": status,
    });
    api.patch_status(
        &name,
        &PatchParams::apply(&ctx.cfg.field_manager).force(),
        &Patch::Apply(&patch),
    )
    .await?;
    Ok(())
}

#[instrument(skip_all, fields(tenant = %obj.name_any()))]
pub async fn reconcile(
    obj: Arc<Paas>,
    ctx: Arc<ControllerContext>,
) -> Result<Action, ReconcileErr> {
    let name = obj.name_any();

    // Derived resources carry owner references; the garbage collector
    // removes them once the tenant is gone.
    if obj.meta().deletion_timestamp.is_some() {
        info!(tenant = %name, "tenant deleting; leaving cleanup to garbage collection");
        ctx.status_cache.remove(&name).await;
        return Ok(Action::await_change());
    }

    let defaults = ctx.defaults.snapshot().await;
    let PassOutcome { status, result } =
        run_pass(&ctx.store, &obj, &defaults).await;

    let published = publish_status(&ctx, &obj, &status).await;
    ctx.status_cache.upsert(name.clone(), status).await;

    if let Some(recorder) = &ctx.recorder {
        let error = result.as_ref().err().map(ToString::to_string);
        emit_pass_event(recorder, &obj, error).await;
    }

    result?;
    published?;
    info!(tenant = %name, defaults = defaults.version, "reconcile: pass succeeded");
    Ok(Action::requeue(Duration::from_secs(ctx.cfg.requeue_secs)))
}
