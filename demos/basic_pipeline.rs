// Basic pipeline demo - YAML-defined pipeline with expressions and tracing
// Run with: cargo run --example basic_pipeline

use std::sync::Arc;

use serde_json::json;

use brick_runtime::{
    BrickPipeline, BrickRegistry, InMemoryTraceSink, InitialValues, PipelineReducer, RunOptions,
    StepOutcome, TraceSink,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "brick_runtime=debug".into()),
        )
        .init();

    println!("🧱 Brick Runtime - Basic Pipeline Demo");
    println!("======================================");
    println!();

    // 1. The pipeline as it would be stored inside a mod definition
    let pipeline = BrickPipeline::from_yaml(
        r#"
- id: "@bricks/identity"
  config:
    greeting:
      __type__: nunjucks
      __value__: "Hello, {{ input.user.name }}!"
  outputKey: message

- id: "@bricks/for-each"
  config:
    elements:
      __type__: var
      __value__: "@input.items"
    body:
      __type__: pipeline
      __value__:
        - id: "@bricks/identity"
          config:
            item:
              __type__: var
              __value__: "@element.label"
            banner:
              __type__: var
              __value__: "@message.greeting"
  outputKey: rows

- id: "@bricks/identity"
  if:
    __type__: var
    __value__: "@input.verbose"
  config:
    note: "only present on verbose runs"
"#,
    )?;

    // 2. A registry with just the built-in bricks, a reducer over it
    let registry = Arc::new(BrickRegistry::with_builtin_bricks());
    let reducer = PipelineReducer::new(registry);

    // 3. Run with tracing enabled
    let sink = Arc::new(InMemoryTraceSink::new());
    let options = RunOptions {
        trace: Some(Arc::clone(&sink) as Arc<dyn TraceSink>),
        ..RunOptions::default()
    };

    let initial = InitialValues::with_input(json!({
        "user": {"name": "Ada"},
        "items": [{"label": "first"}, {"label": "second"}],
        "verbose": false
    }));

    println!("▶️  Running pipeline ({} steps)...", pipeline.len());
    let outcome = reducer
        .reduce_pipeline(&pipeline, initial, &options)
        .await?;

    println!();
    println!("✅ Result:");
    println!("{}", serde_json::to_string_pretty(&outcome.into_value()?)?);

    // 4. What the developer console would show for this run
    println!();
    println!("📊 Trace:");
    for record in sink.for_run(options.run_id).await {
        let status = match &record.outcome {
            StepOutcome::Completed { .. } => "completed",
            StepOutcome::Skipped => "skipped",
            StepOutcome::Suspended => "suspended",
            StepOutcome::Failed { .. } => "failed",
        };
        println!("  {:<10} {} ({})", status, record.position, record.brick_id);
    }

    Ok(())
}
