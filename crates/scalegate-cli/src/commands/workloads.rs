use super::{Context, print_json};

pub async fn workloads(ctx: &Context, namespace: Option<String>) -> anyhow::Result<bool> {
    let namespace = namespace.unwrap_or_else(|| ctx.config.control_plane.namespace.clone());
    let workloads = ctx.guardrail.list_workloads(&namespace).await?;

    let total_replicas: u32 = workloads.iter().map(|w| w.replicas).sum();
    let total_ready: u32 = workloads.iter().map(|w| w.ready_replicas).sum();
    print_json(&serde_json::json!({
        "namespace": namespace,
        "deployments": workloads,
        "total_deployments": workloads.len(),
        "total_replicas": total_replicas,
        "total_ready_replicas": total_ready,
    }))?;
    Ok(true)
}
