//! Palette CLI - conversational React/Tailwind/shadcn component generator

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use palette_core::config::{API_KEY_ENV, Config};
use palette_core::conversation::{ConversationEngine, ConversationHistory, ExecutionMode};
use palette_core::cost::CostTracker;
use palette_core::domain::feature_plan::{Complexity, FeaturePlan, FeaturePlanner, PlanOptions};
use palette_core::generation::{
    ComponentGenerator, GeneratedCode, MultiStepGenerator, StepProgress, WriteOptions, WrittenFile,
    write_files,
};
use palette_core::llm::{LlmProvider, build_provider};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{debug, warn};

#[derive(Parser)]
#[command(name = "palette")]
#[command(author, version, about = "Generate React/Tailwind/shadcn components from prompts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, Debug, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(clap::Args, Debug, Default)]
struct PlanArgs {
    /// Override the detected complexity (simple, moderate, complex)
    #[arg(long)]
    complexity: Option<Complexity>,

    /// Always add test steps
    #[arg(long, conflicts_with = "no_tests")]
    tests: bool,

    /// Never add test steps
    #[arg(long)]
    no_tests: bool,
}

impl PlanArgs {
    fn options(&self) -> PlanOptions {
        PlanOptions {
            complexity: self.complexity,
            include_tests: if self.tests {
                Some(true)
            } else if self.no_tests {
                Some(false)
            } else {
                None
            },
        }
    }
}

#[derive(clap::Args, Debug, Default)]
struct OutputArgs {
    /// Directory generated files are written to (defaults to generation.output_dir)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Dry run (don't write files)
    #[arg(short, long)]
    dry_run: bool,

    /// Replace existing files
    #[arg(long)]
    overwrite: bool,
}

impl OutputArgs {
    fn root(&self, config: &Config) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(&config.generation.output_dir))
    }

    fn write_options(&self) -> WriteOptions {
        WriteOptions {
            dry_run: self.dry_run,
            overwrite: self.overwrite,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Plan a feature without calling the LLM
    Plan {
        /// Feature request, e.g. "user authentication with login and signup"
        request: String,
        #[command(flatten)]
        plan: PlanArgs,
        /// Save the plan as JSON for `palette build --plan-file`
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// Plan a feature and generate every step
    Build {
        /// Feature request
        #[arg(required_unless_present = "plan_file")]
        request: Option<String>,
        /// Execute a plan saved with `palette plan --save`
        #[arg(long, conflicts_with = "request")]
        plan_file: Option<PathBuf>,
        #[command(flatten)]
        plan: PlanArgs,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Generate a single component
    Generate {
        /// Component request, e.g. "a pricing card with a monthly/yearly toggle"
        request: String,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Start an interactive session
    Chat {
        /// Execution mode for confirmed plans (step or batch)
        #[arg(long)]
        mode: Option<ExecutionMode>,
        /// Load and save the conversation history at this path
        #[arg(long)]
        history: Option<PathBuf>,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Run health check
    Doctor,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// List all configuration values
    List,
    /// Reset configuration to defaults
    Reset,
    /// Show config file path
    Path,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("palette=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        report_error(&err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    let quiet = cli.quiet;

    match cli.command {
        Commands::Plan {
            request,
            plan,
            save,
        } => cmd_plan(&request, &plan, save.as_deref(), format, quiet),

        Commands::Build {
            request,
            plan_file,
            plan,
            output,
        } => {
            cmd_build(
                request.as_deref(),
                plan_file.as_deref(),
                &plan,
                &output,
                format,
                quiet,
            )
            .await
        }

        Commands::Generate { request, output } => {
            cmd_generate(&request, &output, format, quiet).await
        }

        Commands::Chat {
            mode,
            history,
            output,
        } => cmd_chat(mode, history.as_deref(), &output, quiet).await,

        Commands::Config { action } => cmd_config(action, quiet),

        Commands::Doctor => cmd_doctor(quiet),
    }
}

/// Print an error with its code and suggestion when it comes from the library
fn report_error(err: &anyhow::Error) {
    match err.downcast_ref::<palette_core::Error>() {
        Some(e) => {
            eprintln!("Error [{}]: {}", e.code(), e);
            if let Some(suggestion) = e.suggestion() {
                eprintln!("  Try: {}", suggestion);
            }
        }
        None => eprintln!("Error: {:#}", err),
    }
}

/// Provider and cost tracker from the saved configuration
fn connect(config: &Config) -> anyhow::Result<(Arc<dyn LlmProvider>, Arc<CostTracker>)> {
    let tracker = Arc::new(CostTracker::from_config(&config.cost));
    let provider = build_provider(&config.llm, Some(tracker.clone()))?;
    debug!(provider = %provider.kind(), model = provider.default_model(), "Provider ready");
    Ok((provider, tracker))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_written(written: &[WrittenFile], quiet: bool) {
    if quiet {
        return;
    }
    for file in written {
        println!("  {} ({})", file.path.display(), file.action);
    }
}

fn print_cost(tracker: &CostTracker, quiet: bool) {
    if quiet {
        return;
    }
    if let Some(summary) = tracker.today_summary() {
        println!(
            "\nCost: ${:.4} ({} call(s), {} tokens). Remaining today: ${:.2}",
            summary.total_cost_usd,
            summary.call_count,
            summary.total_input_tokens + summary.total_output_tokens,
            tracker.remaining_budget()
        );
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

fn cmd_plan(
    request: &str,
    args: &PlanArgs,
    save: Option<&Path>,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    let config = Config::load()?;
    let plan = FeaturePlanner::new().create_plan_with(request, &config.project, args.options())?;

    if let Some(path) = save {
        std::fs::write(path, plan.to_json()?)?;
    }

    match format {
        OutputFormat::Json => print_json(&plan)?,
        OutputFormat::Text => {
            print!("{}", plan.summary());
            if !quiet {
                match save {
                    Some(path) => println!(
                        "\nSaved to {}. Run `palette build --plan-file {}` to generate it.",
                        path.display(),
                        path.display()
                    ),
                    None => println!("\nRun `palette build \"{}\"` to generate it.", request),
                }
            }
        }
    }

    Ok(())
}

async fn cmd_build(
    request: Option<&str>,
    plan_file: Option<&Path>,
    plan_args: &PlanArgs,
    output: &OutputArgs,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    let config = Config::load()?;
    let (provider, tracker) = connect(&config)?;
    let generator = MultiStepGenerator::from_config(provider, &config);

    let mut plan = match (plan_file, request) {
        (Some(path), _) => FeaturePlan::from_json(&std::fs::read_to_string(path)?)?,
        (None, Some(request)) => generator.create_plan_with(request, plan_args.options())?,
        (None, None) => anyhow::bail!("Provide a feature request or --plan-file"),
    };

    let text = format == OutputFormat::Text && !quiet;
    if text {
        println!("{}", plan.summary());
    }

    let report = generator
        .execute_all(&mut plan, |event| {
            if !text {
                return;
            }
            match event {
                StepProgress::StepStarted {
                    index, total, name, ..
                } => println!("[{}/{}] Generating {}...", index, total, name),
                StepProgress::StepFinished { outcome, .. } => match &outcome.error {
                    Some(error) => println!("      failed: {}", error),
                    None => println!("      done"),
                },
            }
        })
        .await?;

    let written = write_files(&report.files, &output.root(&config), output.write_options())?;

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "plan": plan,
            "report": report,
            "written": written,
        }))?,
        OutputFormat::Text => {
            if !quiet {
                println!();
                print!("{}", report.summary());
            }
            print_written(&written, quiet);
            print_cost(&tracker, quiet);
        }
    }

    if !report.is_success() {
        warn!(failed = report.failed.len(), "Some steps failed");
    }
    Ok(())
}

async fn cmd_generate(
    request: &str,
    output: &OutputArgs,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    let config = Config::load()?;
    let (provider, tracker) = connect(&config)?;
    let generator = ComponentGenerator::new(provider, config.project.clone());

    let code = generator.generate(request).await?;
    let written = write_files(
        std::slice::from_ref(&code),
        &output.root(&config),
        output.write_options(),
    )?;

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "file": code,
            "written": written,
        }))?,
        OutputFormat::Text => {
            if output.dry_run && !quiet {
                println!("```{}\n{}\n```", code.language, code.code);
            }
            print_written(&written, quiet);
            print_cost(&tracker, quiet);
        }
    }
    Ok(())
}

async fn cmd_chat(
    mode: Option<ExecutionMode>,
    history_path: Option<&Path>,
    output: &OutputArgs,
    quiet: bool,
) -> anyhow::Result<()> {
    let config = Config::load()?;
    let (provider, tracker) = connect(&config)?;

    let mut engine = ConversationEngine::from_config(provider, &config);
    if let Some(mode) = mode {
        engine.set_mode(mode);
    }
    if let Some(path) = history_path
        && path.exists()
    {
        engine = engine.with_history(ConversationHistory::load_json(path)?);
    }

    let root = output.root(&config);
    let mut editor = DefaultEditor::new()?;

    if !quiet {
        println!("Palette chat ({} mode). Type \"help\" for examples, \"exit\" to quit.", engine.mode());
    }

    loop {
        let line = match editor.readline("palette> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input, "exit" | "quit" | "/exit" | "/quit") {
            break;
        }
        let _ = editor.add_history_entry(input);

        if let Some(mode) = input.strip_prefix("/mode ") {
            match mode.parse::<ExecutionMode>() {
                Ok(mode) => {
                    engine.set_mode(mode);
                    println!("Execution mode: {}", mode);
                }
                Err(e) => println!("{}", e),
            }
            continue;
        }

        match engine.process_message(input).await {
            Ok(reply) => {
                println!("{}\n", reply.message);
                write_reply_files(&reply.files, &root, output.write_options(), quiet);
            }
            Err(e) => {
                eprintln!("Error [{}]: {}", e.code(), e);
                if let Some(suggestion) = e.suggestion() {
                    eprintln!("  Try: {}", suggestion);
                }
            }
        }

        if let Some(path) = history_path
            && let Err(e) = engine.history().save_json(path)
        {
            warn!(error = %e, "Failed to save conversation history");
        }
    }

    print_cost(&tracker, quiet);
    Ok(())
}

fn write_reply_files(files: &[GeneratedCode], root: &Path, options: WriteOptions, quiet: bool) {
    if files.is_empty() {
        return;
    }
    match write_files(files, root, options) {
        Ok(written) => print_written(&written, quiet),
        Err(e) => eprintln!("Could not write files: {}", e),
    }
}

fn cmd_config(action: ConfigAction, quiet: bool) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(&key)?;
            println!("{}", value);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            if !quiet {
                println!("Set {} = {}", key, value);
            }
        }
        ConfigAction::List => {
            let config = Config::load()?;
            let items = config.list()?;
            for (key, value) in items {
                println!("{} = {}", key, value);
            }
        }
        ConfigAction::Reset => {
            Config::reset()?;
            if !quiet {
                println!("Configuration reset to defaults.");
            }
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

fn cmd_doctor(quiet: bool) -> anyhow::Result<()> {
    if !quiet {
        println!("Palette Health Check");
        println!("====================");
        println!();
    }

    let mut all_ok = true;

    match Config::load() {
        Ok(config) => {
            if !quiet {
                println!("[OK] Configuration: Valid");
                println!(
                    "[OK] Provider: {} (model {})",
                    config.llm.provider, config.llm.default_model
                );
            }

            match config.llm.resolved_api_key() {
                Ok(Some(_)) => {
                    if !quiet {
                        let redacted = config.llm.redacted_api_key()?.unwrap_or_default();
                        println!("[OK] API Key: Configured ({})", redacted);
                    }
                }
                Ok(None) => {
                    all_ok = false;
                    if !quiet {
                        println!("[!!] API Key: Not configured");
                        println!(
                            "     Set {} or {} environment variable",
                            API_KEY_ENV,
                            config.llm.provider.api_key_env()
                        );
                    }
                }
                Err(e) => {
                    all_ok = false;
                    if !quiet {
                        println!("[!!] API Key: Error - {}", e);
                    }
                }
            }

            if !quiet {
                println!(
                    "[OK] Project: {} with {} and {}",
                    config.project.framework, config.project.styling, config.project.ui_library
                );
                println!(
                    "[OK] Budget: ${:.2} per day (alert at {:.0}%)",
                    config.cost.daily_limit_usd,
                    config.cost.alert_threshold * 100.0
                );
            }
        }
        Err(e) => {
            all_ok = false;
            if !quiet {
                println!("[!!] Configuration: Error - {:#}", e);
            }
        }
    }

    if !quiet {
        match Config::config_path() {
            Ok(path) => {
                if path.exists() {
                    println!("[OK] Config file: {}", path.display());
                } else {
                    println!("[--] Config file: {} (using defaults)", path.display());
                }
            }
            Err(e) => {
                println!("[!!] Config file: Error - {}", e);
            }
        }

        println!();
        if all_ok {
            println!("All checks passed.");
        } else {
            println!("Some checks need attention.");
        }
    }

    Ok(())
}
