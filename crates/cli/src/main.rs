use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "repowiki", about = "Ask cited questions about a source repository", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build or refresh the full-text index for a repository
    Index {
        /// Repository root (default: current directory)
        #[arg(default_value = ".")]
        repo: PathBuf,
    },
    /// Ask a question about a repository; prints a cited markdown answer
    Ask {
        /// The question to ask
        question: String,
        /// Repository root (default: current directory)
        #[arg(short, long, default_value = ".")]
        repo: PathBuf,
        /// Print the step-by-step trace as JSON to stderr
        #[arg(long)]
        steps: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("repowiki=info".parse()?),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Index { repo } => run_index(&repo).await,
        Commands::Ask { question, repo, steps } => run_ask(&question, &repo, steps).await,
    }
}

async fn run_index(repo: &PathBuf) -> Result<()> {
    let repo = repo.canonicalize().with_context(|| format!("repository not found: {}", repo.display()))?;
    let config = repowiki_config::Config::load(&repo)?;
    let db_path = config.index_db_path(&repo);

    let index = repowiki_index::RepoIndex::open(&db_path)?;
    let stats = index.index_repository(&repo)?;
    index.close()?;

    println!(
        "Indexed {} in {} ({} indexed, {} skipped)",
        repo.display(),
        db_path.display(),
        stats.indexed,
        stats.skipped
    );
    Ok(())
}

async fn run_ask(question: &str, repo: &PathBuf, print_steps: bool) -> Result<()> {
    let repo = repo.canonicalize().with_context(|| format!("repository not found: {}", repo.display()))?;
    let config = repowiki_config::Config::load(&repo)?;
    let db_path = config.index_db_path(&repo);

    if !db_path.exists() {
        anyhow::bail!(
            "no index found at {}; run `repowiki index {}` first",
            db_path.display(),
            repo.display()
        );
    }
    let index = Arc::new(repowiki_index::RepoIndex::open(&db_path)?);

    let api_key = std::env::var(&config.provider.api_key_env).ok();
    if api_key.is_none() {
        tracing::warn!(
            env = %config.provider.api_key_env,
            "no API key found in environment; requests will likely be rejected by the provider"
        );
    }
    let base_url = config
        .provider
        .base_url
        .clone()
        .unwrap_or_else(|| "https://api.openai.com/v1".to_string());
    let provider = repowiki_provider::OpenAiCompatibleProvider::new(base_url, config.provider.model.clone(), api_key);

    let registry = repowiki_core::default_registry();
    let agent_config = repowiki_core::AgentConfig::from(config.budgets);

    let result = repowiki_core::run_agent(&repo, question, &provider, &registry, index, agent_config).await?;

    println!("{}", result.answer_markdown);

    if print_steps {
        eprintln!("{}", serde_json::to_string_pretty(&result.steps)?);
    }

    if !result.verified {
        eprintln!(
            "warning: citations could not be verified{}",
            result.error.as_deref().map(|e| format!(": {e}")).unwrap_or_default()
        );
    }

    Ok(())
}
