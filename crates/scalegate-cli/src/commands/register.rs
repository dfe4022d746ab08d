use super::{Context, print_json};

pub fn register(
    ctx: &Context,
    namespace: Option<String>,
    deployment: String,
    replicas: u32,
) -> anyhow::Result<bool> {
    let key = ctx.workload(namespace, deployment);
    let workload = ctx.plane.register(&key, replicas)?;
    print_json(&serde_json::to_value(&workload)?)?;
    Ok(true)
}
