mod display;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use clauselens_ai::classify_intent;
use clauselens_core::config::EngineConfig;
use clauselens_core::model::Tone;
use clauselens_engine::{ContractEngine, ContractEngineBuilder, PipelineRequest};
use clauselens_rewrite::{HttpRewriter, RewriteConfig};
use clauselens_store::MemoryStore;

#[derive(Parser, Debug)]
#[command(name = "clauselens", version, about = "Evidence-gated contract questions and risk review")]
struct Cli {
    /// TOML file overriding engine defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for per-contract memory logs.
    #[arg(long, global = true, env = "CLAUSELENS_MEMORY_DIR")]
    memory_dir: Option<PathBuf>,

    /// Directory holding model.onnx and tokenizer.json.
    #[cfg(feature = "onnx")]
    #[arg(long, global = true, env = "CLAUSELENS_MODEL_DIR")]
    model_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask a question about a contract file.
    Analyze {
        /// Plain-text contract.
        #[arg(long)]
        contract: PathBuf,
        #[arg(long, short)]
        question: String,
        #[arg(long, default_value = "executive")]
        tone: Tone,
        /// Probe score below which factual questions are refused.
        #[arg(long)]
        threshold: Option<f32>,
        /// Force an intent (fact_summary, qa, clause_extraction, risk_analysis, executive_review).
        #[arg(long)]
        intent: Option<String>,
        /// Score every domain regardless of the question.
        #[arg(long)]
        all_agents: bool,
        #[arg(long)]
        contract_id: Option<String>,
        /// Print the full result as JSON instead of the report.
        #[arg(long)]
        json: bool,
        /// Neither read nor write memory for this run.
        #[arg(long)]
        no_memory: bool,
    },
    /// Print the intent a question would be classified as.
    Intent { question: String },
    /// Print the stored records for a contract.
    Memory {
        contract_id: String,
        #[arg(long)]
        json: bool,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(dir) = &cli.memory_dir {
        config.memory_dir = Some(dir.clone());
    }
    Ok(config)
}

#[cfg(feature = "onnx")]
fn with_embedder(builder: ContractEngineBuilder, cli: &Cli) -> ContractEngineBuilder {
    let Some(dir) = &cli.model_dir else {
        return builder;
    };
    match clauselens_ai::OnnxEmbedder::load(dir) {
        Ok(embedder) => builder.embedder(Arc::new(embedder)),
        Err(e) => {
            tracing::warn!(model_dir = %dir.display(), error = %e, "model unavailable, using hashing embedder");
            builder
        }
    }
}

#[cfg(not(feature = "onnx"))]
fn with_embedder(builder: ContractEngineBuilder, _cli: &Cli) -> ContractEngineBuilder {
    builder
}

fn with_rewriter(builder: ContractEngineBuilder) -> anyhow::Result<ContractEngineBuilder> {
    let config = RewriteConfig::from_env().context("reading rewrite settings")?;
    Ok(match HttpRewriter::from_config(&config)? {
        Some(rewriter) => {
            tracing::info!(provider = %config.provider, "bullet rewriting enabled");
            builder.rewriter(Arc::new(rewriter))
        }
        None => builder,
    })
}

fn read_contract(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading contract {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!("clauselens v{}", env!("CARGO_PKG_VERSION"));

    match &cli.command {
        Command::Analyze {
            contract,
            question,
            tone,
            threshold,
            intent,
            all_agents,
            contract_id,
            json,
            no_memory,
        } => {
            let mut config = load_config(&cli)?;
            if *no_memory {
                config.memory_dir = None;
            }
            let builder = with_embedder(ContractEngine::builder().config(config), &cli);
            let engine = with_rewriter(builder)?.build();

            let request = PipelineRequest {
                contract_text: read_contract(contract)?,
                question: question.clone(),
                tone: *tone,
                contract_id: contract_id.clone(),
                no_evidence_threshold: *threshold,
                intent_override: intent.clone(),
                run_all_agents: *all_agents,
            };
            let (result, report) = engine.run_pipeline(request).await?;

            if *json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                display::print_result(&result, &report);
            }
        }
        Command::Intent { question } => {
            println!("{}", classify_intent(question));
        }
        Command::Memory { contract_id, json } => {
            let config = load_config(&cli)?;
            let Some(dir) = config.memory_dir else {
                bail!("no memory directory: pass --memory-dir or set CLAUSELENS_MEMORY_DIR");
            };
            let records = MemoryStore::new(dir).load(contract_id).await?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                display::print_memory(contract_id, &records);
            }
        }
    }

    Ok(())
}
