use clap::Parser;
use colored::*;
use eyre::{Context, Result, bail};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod cli;

use cli::{Cli, Commands};
use specloop::codegen::{ApiInfo, CodeGenerator, GenerationReport};
use specloop::config::Config;
use specloop::document::SpecDocument;
use specloop::llm::AnthropicClient;
use specloop::pipeline::{Pipeline, PipelineStatus};
use specloop::refine::{CancelToken, LlmGenerator, RefineContext, RefineOptions, Refiner};
use specloop::requirements::{Interviewer, StdinOperator};
use specloop::research::{self, AtlasStore, GeminiClient, ResearchService, VectorStore};
use specloop::store::SpecStore;
use specloop::validation::{self, DocumentValidator, ValidationOutcome};

type DefinitionRefiner = Refiner<LlmGenerator<AnthropicClient>, dyn DocumentValidator>;

fn setup_logging(config: &Config) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("specloop")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("specloop.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    let level = config.log_level.as_deref().unwrap_or("info");
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Interview { output } => handle_interview_command(output.as_deref(), config).await,
        Commands::Refine {
            requirements,
            document,
            max_iterations,
            save,
        } => handle_refine_command(requirements, document.as_deref(), *max_iterations, *save, config).await,
        Commands::Validate { file } => handle_validate_command(file, config).await,
        Commands::Generate { spec } => handle_generate_command(spec, config).await,
        Commands::Build { requirements } => handle_build_command(requirements, config).await,
        Commands::Serve { host, port } => handle_serve_command(host.as_deref(), *port, config).await,
        Commands::Ingest { file } => handle_ingest_command(file, config).await,
    }
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn spec_store(config: &Config) -> SpecStore {
    SpecStore::new(&config.storage.requirements_dir)
}

/// Refiner over the Anthropic generator and the configured validator
fn build_refiner(config: &Config, options: RefineOptions) -> Result<DefinitionRefiner> {
    let llm = AnthropicClient::from_config(&config.llm).context("Failed to create LLM client")?;
    let generator = LlmGenerator::new(Arc::new(llm), config.llm.max_tokens);
    let validator: Arc<dyn DocumentValidator> = Arc::from(validation::from_config(&config.refine));
    info!("Validating with: {}", validator.description());

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("{}", "Interrupted, stopping after the current step...".yellow());
            on_interrupt.cancel();
        }
    });

    Ok(Refiner::new(Arc::new(generator), validator, options).with_cancel(cancel))
}

fn print_reports(reports: &[GenerationReport]) {
    for report in reports {
        let status = if report.is_success() { "ok".green() } else { "failed".red() };
        println!(
            "[{}] {} ({}): {}",
            status, report.component, report.framework, report.message
        );
        if let Some(path) = &report.path {
            println!("    {}", path);
        }
    }
}

async fn handle_interview_command(output: Option<&Path>, config: &Config) -> Result<()> {
    info!("Starting requirements interview");
    let llm = AnthropicClient::from_config(&config.llm).context("Failed to create LLM client")?;
    let interviewer = Interviewer::new(
        Arc::new(llm),
        Arc::new(StdinOperator),
        config.interview.max_turns,
        config.llm.max_tokens,
    );

    let requirements = interviewer.run(None).await.context("Interview failed")?;

    match output {
        Some(path) => {
            fs::write(path, &requirements.markdown)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{} {}", "Requirements saved:".green(), path.display());
        }
        None => {
            let url = spec_store(config)
                .save_requirements(&requirements.markdown)
                .context("Failed to save requirements")?;
            println!("{} {}", "Requirements saved:".green(), url);
        }
    }
    Ok(())
}

async fn handle_refine_command(
    requirements: &Path,
    document: Option<&Path>,
    max_iterations: Option<u32>,
    save: bool,
    config: &Config,
) -> Result<()> {
    info!("Refining definition for {}", requirements.display());
    let requirements = read_file(requirements)?;
    let mut context = RefineContext::new(requirements);
    if let Some(path) = document {
        context = context.with_document(SpecDocument::new(read_file(path)?));
    }

    let mut options = RefineOptions::from(&config.refine);
    if let Some(n) = max_iterations {
        options.max_iterations = n;
    }

    let refiner = build_refiner(config, options)?;
    let refinement = refiner.refine(context).await.context("Refinement aborted")?;
    let iterations = refinement.iterations();

    match refinement.into_valid() {
        Ok(document) => {
            println!("{}", document);
            println!(
                "{} valid after {} attempt(s)",
                "Definition:".green(),
                iterations
            );
            if save {
                let info = ApiInfo::from_document(&document)?;
                let path = spec_store(config)
                    .save_definition(&info.name, &document)
                    .context("Failed to save definition")?;
                println!("{} {}", "Saved:".green(), path.display());
            }
            Ok(())
        }
        Err(exhausted) => {
            println!("{}", exhausted.document);
            println!("{} {}", "Last validation error:".red(), exhausted.reason);
            bail!("No valid definition after {} attempt(s)", exhausted.iterations)
        }
    }
}

async fn handle_validate_command(file: &Path, config: &Config) -> Result<()> {
    info!("Validating {}", file.display());
    let document = SpecDocument::new(read_file(file)?);
    let validator = validation::from_config(&config.refine);

    match validator.validate(&document).await.context("Validator could not run")? {
        ValidationOutcome::Valid => {
            println!("{} {}", "Valid:".green(), file.display());
            Ok(())
        }
        ValidationOutcome::Invalid(reason) => {
            println!("{} {}", "Invalid:".red(), reason);
            bail!("{} is not a valid definition", file.display())
        }
    }
}

async fn handle_generate_command(spec: &Path, config: &Config) -> Result<()> {
    info!("Generating code from {}", spec.display());
    let document = SpecDocument::new(read_file(spec)?);
    let info = ApiInfo::from_document(&document)?;

    let codegen = CodeGenerator::from_config(&config.codegen, &config.storage.requirements_dir);
    println!("{} {} v{}", "Generating:".cyan(), info.name, info.version);
    let reports = codegen.generate_all(spec, &info, &config.codegen).await;
    print_reports(&reports);

    let failed = reports.iter().filter(|r| !r.is_success()).count();
    if failed > 0 {
        bail!("{} of {} generator run(s) failed", failed, reports.len());
    }
    Ok(())
}

async fn handle_build_command(requirements: &Path, config: &Config) -> Result<()> {
    info!("Building API from {}", requirements.display());
    let requirements = read_file(requirements)?;

    let refiner = build_refiner(config, RefineOptions::from(&config.refine))?;
    let store = spec_store(config);
    let codegen = CodeGenerator::from_config(&config.codegen, store.root());
    let pipeline = Pipeline::new(refiner, store, codegen, config.codegen.clone());

    let report = pipeline.build(&requirements).await.context("Build aborted")?;
    print!("{}", report.summary());

    match report.status {
        PipelineStatus::Built if report.failed_components() == 0 => Ok(()),
        PipelineStatus::Built => bail!("{} generator run(s) failed", report.failed_components()),
        PipelineStatus::Invalid => bail!("No valid definition after {} attempt(s)", report.iterations),
    }
}

async fn research_backends(config: &Config) -> Result<(Arc<GeminiClient>, Arc<AtlasStore>)> {
    let genai = GeminiClient::from_config(&config.research).context("Failed to create GenAI client")?;
    let store = AtlasStore::from_config(&config.research)
        .await
        .context("Failed to connect to MongoDB")?;
    Ok((Arc::new(genai), Arc::new(store)))
}

async fn handle_serve_command(host: Option<&str>, port: Option<u16>, config: &Config) -> Result<()> {
    let host = host.unwrap_or(&config.research.host);
    let port = port.unwrap_or(config.research.port);

    let (genai, store) = research_backends(config).await?;
    let service = ResearchService::new(genai, store, config.research.limit);

    println!("{} http://{}:{}", "Serving research API on".cyan(), host, port);
    research::serve(host, port, Arc::new(service))
        .await
        .context("Research service failed")?;
    Ok(())
}

async fn handle_ingest_command(file: &Path, config: &Config) -> Result<()> {
    info!("Ingesting {}", file.display());
    let (genai, store) = research_backends(config).await?;
    store.ping().await.context("MongoDB is not reachable")?;
    println!("{}", "Connected to MongoDB".green());

    let input = tokio::fs::File::open(file)
        .await
        .with_context(|| format!("Failed to open {}", file.display()))?;
    let summary = research::ingest(
        tokio::io::BufReader::new(input),
        genai.as_ref(),
        store.as_ref(),
        config.research.ingest_batch_size,
    )
    .await
    .context("Ingest failed")?;

    println!(
        "{} {} paper(s) in {} batch(es), {} line(s) skipped",
        "Stored:".green(),
        summary.stored,
        summary.batches,
        summary.skipped
    );
    if summary.stopped_early {
        println!("{}", "Stopped early after a failed insert, see the log".yellow());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(&config).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
