use super::{Context, print_json};

pub async fn rollback(ctx: &Context, reason: &str) -> anyhow::Result<bool> {
    let outcomes = ctx.guardrail.rollback(reason).await;
    if outcomes.is_empty() {
        print_json(&serde_json::json!({
            "success": false,
            "message": "No snapshot recorded yet; nothing to roll back",
        }))?;
        return Ok(false);
    }

    let success = outcomes.iter().all(|o| o.success());
    print_json(&serde_json::json!({
        "success": success,
        "outcomes": outcomes.iter().map(|o| o.to_json()).collect::<Vec<_>>(),
    }))?;
    Ok(success)
}
