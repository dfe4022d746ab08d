use super::{Context, print_json};

pub fn snapshot(ctx: &Context, all: bool) -> anyhow::Result<bool> {
    if all {
        let snapshots = ctx.guardrail.snapshot_history();
        print_json(&serde_json::json!({
            "count": snapshots.len(),
            "snapshots": snapshots,
        }))?;
        return Ok(true);
    }

    match ctx.guardrail.last_snapshot() {
        Some(snapshot) => {
            print_json(&serde_json::to_value(&snapshot)?)?;
            Ok(true)
        }
        None => {
            print_json(&serde_json::json!({ "message": "No snapshot recorded yet" }))?;
            Ok(false)
        }
    }
}
