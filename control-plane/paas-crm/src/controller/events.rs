use kube::Resource;
use kube::runtime::events::{Event, EventType, Recorder};
use tracing::warn;

use crate::crd::Paas;

pub const REASON_RECONCILED: &str = "Reconciled";
pub const REASON_FAILED: &str = "ReconcileFailed";

/// Event describing the outcome of a pass.
pub fn pass_event(error: Option<String>) -> Event {
    match error {
        None => Event {
            type_: EventType::Normal,
            reason: REASON_RECONCILED.into(),
            note: Some("derived resources in sync".into()),
            action: "Reconcile".into(),
            secondary: None,
        },
        Some(err) => Event {
            type_: EventType::Warning,
            reason: REASON_FAILED.into(),
            note: Some(err),
            action: "Reconcile".into(),
            secondary: None,
        },
    }
}

pub async fn emit_pass_event(
    recorder: &Recorder,
    paas: &Paas,
    error: Option<String>,
) {
    if let Err(e) = recorder
        .publish(&pass_event(error), &paas.object_ref(&()))
        .await
    {
        warn!(error = %e, "failed to publish event");
    }
}
