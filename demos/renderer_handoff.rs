// Renderer handoff demo - a headless run suspending at a document renderer
// This is the starter-brick adapter's side of the "headless" pattern:
// the run never returns a value; the payload is redirected to a panel.
// Run with: cargo run --example renderer_handoff

use std::sync::Arc;

use serde_json::json;

use brick_runtime::{
    BrickPipeline, BrickRegistry, InitialValues, PipelineReducer, RendererPayload, RunOptions,
    RunOutcome,
};

/// Stand-in for the sidebar panel surface: in the extension this lives on
/// the other side of the messaging boundary.
fn show_in_panel(payload: RendererPayload) {
    println!("🖼️  Panel received renderer payload:");
    println!("    brick: {}", payload.brick_id);
    println!(
        "    args:  {}",
        serde_json::to_string_pretty(&payload.args).unwrap()
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "brick_runtime=debug".into()),
        )
        .init();

    println!("🧱 Brick Runtime - Renderer Handoff Demo");
    println!("========================================");
    println!();

    let pipeline = BrickPipeline::from_yaml(
        r#"
- id: "@bricks/identity"
  config:
    headline:
      __type__: nunjucks
      __value__: "{{ input.count }} open issues"
  outputKey: summary

- id: "@bricks/document"
  config:
    body:
      - type: header
        config:
          title:
            __type__: var
            __value__: "@summary.headline"
        children: []
      - type: button
        config:
          label: "Refresh"
          onClick:
            __type__: pipeline
            __value__:
              - id: "@bricks/identity"
                config: { action: "refresh" }
        children: []
"#,
    )?;

    let reducer = PipelineReducer::new(Arc::new(BrickRegistry::with_builtin_bricks()));
    let options = RunOptions {
        headless: true,
        ..RunOptions::default()
    };

    println!("▶️  Running headless...");
    let outcome = reducer
        .reduce_pipeline(
            &pipeline,
            InitialValues::with_input(json!({"count": 7})),
            &options,
        )
        .await?;

    println!();
    match outcome {
        // The adapter's branch: redirect the payload to the UI surface
        RunOutcome::Suspended(payload) => show_in_panel(payload),
        RunOutcome::Completed(value) => {
            println!("Unexpected completion (no renderer ran): {}", value)
        }
    }

    Ok(())
}
