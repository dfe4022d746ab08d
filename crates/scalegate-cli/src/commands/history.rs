use super::{Context, print_json};

pub fn history(ctx: &Context, limit: usize) -> anyhow::Result<bool> {
    let entries = ctx.guardrail.recent_history(limit);
    print_json(&serde_json::json!({
        "count": entries.len(),
        "entries": entries,
    }))?;
    Ok(true)
}
