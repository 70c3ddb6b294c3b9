use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use facecheck_core::{
    cosine_similarity, EmbeddingSource, FaceVerifier, MatchPolicy, TemplateStore,
};
use facecheck_vault::{FileVault, VaultKey};
use tracing_subscriber::EnvFilter;

mod config;
mod source;

use config::Config;
use source::JsonEmbeddingSource;

#[derive(Parser)]
#[command(name = "facecheck", about = "Face embedding enrollment and verification")]
struct Cli {
    /// Config file (TOML); defaults to $FACECHECK_CONFIG
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Scope the template to this user identity
    #[arg(short, long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store an embedding as the enrolled template, replacing any previous one
    Register {
        /// JSON embedding file, or `-` for stdin
        #[arg(short, long)]
        embedding: PathBuf,
    },
    /// Compare an embedding against the enrolled template
    Verify {
        /// JSON embedding file, or `-` for stdin
        #[arg(short, long)]
        embedding: PathBuf,
    },
    /// Delete the enrolled template
    Clear,
    /// Show enrollment status
    Status,
    /// Compare two embedding files directly, without touching the store
    Compare { first: PathBuf, second: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let policy = MatchPolicy::with_threshold(config.threshold)
        .context("threshold must be a positive number")?;

    match cli.command {
        Commands::Register { embedding } => {
            let captured = JsonEmbeddingSource::new(embedding).capture()?;
            let mut verifier = open_verifier(&config, cli.user.as_deref(), policy).await?;
            verifier.register(&captured).await.context("registering face")?;
            print_json(&serde_json::json!({
                "registered": true,
                "dimension": captured.dim(),
            }))?;
        }
        Commands::Verify { embedding } => {
            let captured = JsonEmbeddingSource::new(embedding).capture()?;
            let mut verifier = open_verifier(&config, cli.user.as_deref(), policy).await?;
            let result = verifier.verify(&captured).context("verifying face")?;
            print_json(&result)?;
        }
        Commands::Clear => {
            let mut verifier = open_verifier(&config, cli.user.as_deref(), policy).await?;
            verifier.clear().await.context("clearing template")?;
            print_json(&serde_json::json!({ "cleared": true }))?;
        }
        Commands::Status => {
            let verifier = open_verifier(&config, cli.user.as_deref(), policy).await?;
            print_json(&serde_json::json!({
                "version": env!("CARGO_PKG_VERSION"),
                "registered": verifier.has_registered_face(),
                "dimension": verifier.template().map(|t| t.dim()),
                "threshold": verifier.policy().threshold(),
                "key": verifier.templates().key(),
                "store_dir": config.store_dir.display().to_string(),
            }))?;
        }
        Commands::Compare { first, second } => compare(first, second, &policy)?,
    }

    Ok(())
}

async fn open_verifier(
    config: &Config,
    user: Option<&str>,
    policy: MatchPolicy,
) -> Result<FaceVerifier<FileVault>> {
    let vault = open_vault(config).await?;
    let templates = match user {
        Some(user) => TemplateStore::for_user(vault, user),
        None => TemplateStore::new(vault),
    };
    let mut verifier = FaceVerifier::open(templates, policy)
        .await
        .context("loading enrolled template")?;
    if let Some(dim) = config.dimension {
        verifier = verifier.with_expected_dim(dim);
    }
    Ok(verifier)
}

async fn open_vault(config: &Config) -> Result<FileVault> {
    let key = match &config.passphrase {
        Some(passphrase) => VaultKey::from_passphrase(passphrase)?,
        None => VaultKey::load_or_create(&config.key_file)
            .await
            .context("loading vault key")?,
    };
    tracing::debug!(dir = %config.store_dir.display(), "vault opened");
    Ok(FileVault::new(config.store_dir.clone(), &key))
}

fn compare(first: PathBuf, second: PathBuf, policy: &MatchPolicy) -> Result<()> {
    let a = JsonEmbeddingSource::new(first).capture()?.normalize()?;
    let b = JsonEmbeddingSource::new(second).capture()?.normalize()?;
    let (distance, matched) = policy.evaluate(&a, &b)?;
    let cosine = cosine_similarity(a.as_slice(), b.as_slice())?;
    print_json(&serde_json::json!({
        "euclidean_distance": distance,
        "cosine_similarity": cosine,
        "threshold": policy.threshold(),
        "match": matched,
    }))
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
