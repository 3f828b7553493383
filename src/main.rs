use anyhow::{Context, Result};
use healthflow::cli::commands::{CompileCommand, ExecCommand, ListCommand, RunCommand, ValidateCommand};
use healthflow::cli::output::*;
use healthflow::cli::{Cli, Command};
use healthflow::components::{ensure_parent, BuiltinStep, Invocation};
use healthflow::core::{PipelineDefinition, PipelineGraph, Settings, TaskState};
use healthflow::execution::{ExecutionEngine, ExecutionEvent, LocalExecutor};
use healthflow::pipelines::PipelineKind;
use healthflow::{Compiler, PipelineRun};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, error};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set logging subscriber")?;

    let settings = Settings::load(cli.config.as_deref())?;

    // Execute command
    match &cli.command {
        None => compile_default(&settings),
        Some(Command::Compile(cmd)) => compile_pipeline(cmd, &settings),
        Some(Command::Run(cmd)) => run_pipeline(cmd, &settings).await,
        Some(Command::Exec(cmd)) => exec_step(cmd, &settings).await,
        Some(Command::Validate(cmd)) => validate_pipeline(cmd, &settings),
        Some(Command::List(cmd)) => list_pipelines(cmd),
    }
}

/// Bare invocation: compile the healthcare pipeline to its default file
fn compile_default(settings: &Settings) -> Result<()> {
    println!("Starting pipeline compilation...");
    match compile_pipeline(&CompileCommand::default(), settings) {
        Ok(()) => {
            println!("Pipeline compiled successfully!");
            Ok(())
        }
        Err(e) => {
            println!("Pipeline compilation failed: {:#}", e);
            Err(e)
        }
    }
}

/// Graph and default workflow file for `--pipeline` or `--file`
fn resolve_graph(
    pipeline: Option<PipelineKind>,
    file: Option<&Path>,
    settings: &Settings,
) -> Result<(PipelineGraph, PathBuf)> {
    if let Some(path) = file {
        let definition = PipelineDefinition::from_file(path)?;
        let graph = definition
            .to_graph(settings)
            .with_context(|| format!("Invalid pipeline definition {}", path.display()))?;
        let package_path = PathBuf::from(format!("{}.yaml", graph.name));
        return Ok((graph, package_path));
    }

    let kind = pipeline.unwrap_or(PipelineKind::Healthcare);
    let graph = kind
        .build(settings)
        .with_context(|| format!("Failed to assemble {}", kind))?;
    Ok((graph, PathBuf::from(kind.default_package_path())))
}

fn compile_pipeline(cmd: &CompileCommand, settings: &Settings) -> Result<()> {
    let (graph, default_path) = resolve_graph(cmd.pipeline, cmd.file.as_deref(), settings)?;
    let package_path = cmd.output.clone().unwrap_or(default_path);

    Compiler::from_settings(settings).compile(&graph, &package_path)?;

    println!(
        "{} Compiled {} to {}",
        CHECK,
        style(&graph.name).bold(),
        style(package_path.display()).cyan()
    );
    Ok(())
}

async fn run_pipeline(cmd: &RunCommand, settings: &Settings) -> Result<()> {
    // With --json, stdout carries only the summary document
    let json = cmd.json;
    let report = move |line: String| {
        if json {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    };

    let (graph, _) = resolve_graph(cmd.pipeline, cmd.file.as_deref(), settings)?;
    report(format!("{} Loaded pipeline: {}", INFO, style(&graph.name).bold()));

    // Apply parameter overrides
    let overrides: BTreeMap<String, String> = cmd.params.iter().cloned().collect();
    for (key, value) in &overrides {
        report(format!("{} Parameter: {} = {}", INFO, style(key).cyan(), style(value).dim()));
    }

    let work_dir = cmd.work_dir.clone().unwrap_or_else(|| settings.work_dir.clone());
    let mut run = PipelineRun::new(graph, &overrides, &work_dir)?;
    debug!("Run directory: {}", run.run_dir.display());

    let executor = LocalExecutor::new(settings.forest.clone(), settings.container_timeout_secs);
    let mut engine = ExecutionEngine::new(executor, cmd.strategy.to_strategy(cmd.max_parallel));

    // Console output goes through the progress bar so the two don't interleave
    let progress = create_progress_bar(run.graph.tasks().len());
    let bar = progress.clone();
    engine.add_event_handler(move |event| {
        if matches!(
            event,
            ExecutionEvent::TaskCompleted { .. } | ExecutionEvent::TaskFailed { .. } | ExecutionEvent::TaskSkipped { .. }
        ) {
            bar.inc(1);
        }
        if let ExecutionEvent::TaskStarted { task_id } = &event {
            bar.set_message(task_id.clone());
        }
        if json {
            bar.suspend(|| eprintln!("{}", format_execution_event(&event)));
        } else {
            bar.println(format_execution_event(&event));
        }
    });

    let result = engine.execute(&mut run).await;
    progress.finish_and_clear();

    report(format!("\n{}", format_run_summary(&run)));
    if json {
        println!("{}", serde_json::to_string_pretty(&run_summary_json(&run))?);
    }

    match result {
        Ok(()) => {
            report(format!(
                "\n{} {} completed {}",
                CHECK,
                style(&run.graph.name).bold(),
                style("successfully").green()
            ));
            Ok(())
        }
        Err(e) => {
            report(format!("\n{} {} {}", CROSS, style(&run.graph.name).bold(), style("failed").red()));
            error!("{}", e);
            Err(e.into())
        }
    }
}

fn run_summary_json(run: &PipelineRun) -> serde_json::Value {
    let tasks: Vec<serde_json::Value> = run
        .graph
        .tasks()
        .iter()
        .map(|task| {
            let state = run.task_state(&task.id);
            serde_json::json!({
                "id": task.id,
                "step": task.step.name,
                "state": state,
                "outputs": match state {
                    Some(TaskState::Completed { outputs, .. }) => serde_json::json!(outputs),
                    _ => serde_json::Value::Null,
                },
            })
        })
        .collect();

    serde_json::json!({
        "run": run.state,
        "pipeline": run.graph.name,
        "parameters": run.parameters,
        "run_dir": run.run_dir,
        "tasks": tasks,
    })
}

/// Entrypoint of compiled workflow containers
async fn exec_step(cmd: &ExecCommand, settings: &Settings) -> Result<()> {
    let step = BuiltinStep::from_name(&cmd.step).with_context(|| {
        let known: Vec<&str> = BuiltinStep::ALL.iter().map(|s| s.name()).collect();
        format!("Unknown step '{}' (expected one of: {})", cmd.step, known.join(", "))
    })?;
    let spec = step.spec();

    let mut invocation = Invocation::new();
    for (name, value) in &cmd.inputs {
        if spec.input(name).is_none() {
            anyhow::bail!("Step {} has no input named '{}'", step, name);
        }
        invocation = invocation.with_input(name, value.as_str());
    }

    // String outputs are written to the given file after the step returns
    let mut value_files = BTreeMap::new();
    for (name, path) in &cmd.outputs {
        match spec.output(name) {
            Some(port) if port.port_type.is_artifact() => {
                invocation = invocation.with_output(name, path.as_str());
            }
            Some(_) => {
                value_files.insert(name.clone(), PathBuf::from(path));
            }
            None => anyhow::bail!("Step {} has no output named '{}'", step, name),
        }
    }

    debug!("Executing {} with {:?}", step, invocation);
    if !cmd.forest.is_empty() && !step.uses_forest() {
        anyhow::bail!("Step {} takes no forest parameters", step);
    }
    let forest = settings.forest.with_overrides(&cmd.forest)?;
    let values = tokio::task::spawn_blocking(move || step.run(&invocation, &forest))
        .await
        .context("Step worker stopped unexpectedly")??;

    for (name, value) in &values {
        match value_files.get(name) {
            Some(path) => {
                ensure_parent(path)?;
                std::fs::write(path, value)
                    .with_context(|| format!("Failed to write output {} to {}", name, path.display()))?;
            }
            None => println!("{}", value),
        }
    }

    Ok(())
}

fn validate_pipeline(cmd: &ValidateCommand, settings: &Settings) -> Result<()> {
    println!("{} Validating pipeline...", INFO);

    let result = PipelineDefinition::from_file(&cmd.file)
        .and_then(|definition| definition.to_graph(settings).map(|graph| (definition, graph)));

    match result {
        Ok((definition, graph)) => {
            println!("{} Pipeline definition is valid!", CHECK);
            println!("  Name: {}", style(&graph.name).bold());
            println!("  Tasks: {}", style(graph.tasks().len()).cyan());
            println!("  Parameters: {}", style(graph.parameters.len()).cyan());
            println!("  Order: {}", style(graph.execution_order().join(" -> ")).dim());

            if cmd.json {
                let json = serde_json::to_string_pretty(&definition)?;
                println!("\n{}", json);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(&e).red());
            Err(e.into())
        }
    }
}

fn list_pipelines(cmd: &ListCommand) -> Result<()> {
    if cmd.json {
        let pipelines: Vec<serde_json::Value> = PipelineKind::ALL
            .iter()
            .map(|kind| {
                serde_json::json!({
                    "id": kind,
                    "name": kind.pipeline_name(),
                    "package_path": kind.default_package_path(),
                })
            })
            .collect();
        let steps: Vec<serde_json::Value> = BuiltinStep::ALL
            .iter()
            .map(|step| {
                let spec = step.spec();
                serde_json::json!({
                    "name": step.name(),
                    "description": spec.description,
                    "inputs": spec.inputs.iter().map(|p| &p.name).collect::<Vec<_>>(),
                    "outputs": spec.outputs.iter().map(|p| &p.name).collect::<Vec<_>>(),
                })
            })
            .collect();
        let data = serde_json::json!({ "pipelines": pipelines, "steps": steps });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    println!("{} Pipelines:", INFO);
    for kind in PipelineKind::ALL {
        let id = serde_json::to_value(kind)?;
        println!(
            "  {} {} ({})",
            style(id.as_str().unwrap_or_default()).bold(),
            kind.pipeline_name(),
            style(kind.default_package_path()).dim()
        );
    }

    println!("{} Steps:", INFO);
    for step in BuiltinStep::ALL {
        let spec = step.spec();
        println!(
            "  {} {}",
            style(step.name()).bold(),
            style(spec.description.unwrap_or_default()).dim()
        );
    }

    Ok(())
}
