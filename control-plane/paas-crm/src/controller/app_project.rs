use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::ResourceExt;
use tracing::instrument;

use crate::crd::{AppProject, AppProjectSpec, Paas, PaasConfigSpec};

use super::ReconcileErr;
use super::ensure::ensure;
use super::status::StatusRecorder;
use super::store::ObjectStore;

pub fn desired_project(paas: &Paas, config: &PaasConfigSpec) -> AppProject {
    AppProject {
        metadata: ObjectMeta {
            name: Some(paas.name_any()),
            namespace: Some(config.argo_namespace.clone()),
            labels: Some(paas.cloned_labels()),
            ..Default::default()
        },
        spec: AppProjectSpec::wildcard(),
    }
}

/// One project per tenant. Removal happens through garbage collection of the
/// tenant, never here.
#[instrument(skip_all, fields(tenant = %paas.name_any()))]
pub async fn reconcile_app_project<S>(
    store: &S,
    paas: &Paas,
    config: &PaasConfigSpec,
    rec: &mut StatusRecorder,
) -> Result<(), ReconcileErr>
where
    S: ObjectStore<AppProject> + ?Sized,
{
    ensure(store, paas, desired_project(paas, config), rec).await
}
