use scalegate_core::ScalingRequest;

use super::{Context, print_json};

pub async fn propose(
    ctx: &Context,
    namespace: Option<String>,
    deployment: String,
    replicas: u32,
    reason: Option<String>,
    utilization: Option<f64>,
) -> anyhow::Result<bool> {
    let mut request = ScalingRequest::new(ctx.workload(namespace, deployment), replicas);
    if let Some(reason) = reason {
        request = request.with_justification(reason);
    }
    if let Some(pct) = utilization {
        request = request.with_utilization(pct);
    }

    let outcome = ctx.guardrail.scale(&request).await;
    print_json(&outcome.to_json())?;
    Ok(outcome.success())
}
