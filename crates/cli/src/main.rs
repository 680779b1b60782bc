//! Command-line tools for reelgate: signed link issuing and video uploads.

mod link;
mod upload;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use link::LinkArgs;
use reelgate_core::config::AppConfig;
use reelgate_core::{SystemClock, content_type_for};
use reelgate_signer::Ttl;
use reelgate_storage::ObjectStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use upload::{UploadJob, UploadOutcome};

#[derive(Parser)]
#[command(name = "reelgatectl")]
#[command(about = "Signed link and upload tool for reelgate")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(
        long,
        global = true,
        env = "REELGATE_CONFIG",
        default_value = "config/reelgate.toml"
    )]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a signed URL for an object
    Link {
        /// Object path, e.g. video/intro.mp4
        path: String,
        /// Link lifetime: 1h, 6h, 1d, 7d, 30d or plain seconds
        ttl: Option<Ttl>,
        /// Public base URL of the proxy
        base_url: Option<String>,
        /// Signing secret
        secret: Option<String>,
        /// Print only the URL
        #[arg(long, default_value_t = false)]
        url_only: bool,
    },
    /// Upload video files to object storage
    Upload {
        /// Upload a single file instead of scanning a folder
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,
        /// Folder to scan, or the object key when --file is given
        target: String,
        /// Key prefix for folder uploads (default from config)
        prefix: Option<String>,
        /// Re-upload objects that already exist
        #[arg(long, default_value_t = false)]
        force: bool,
        /// Number of concurrent uploads (default from config)
        #[arg(long)]
        concurrency: Option<usize>,
    },
}

fn load_config(path: &Path) -> Result<AppConfig> {
    let mut figment = Figment::new();

    if path.exists() {
        tracing::debug!(config_path = %path.display(), "Loading configuration from file");
        figment = figment.merge(Toml::file(path));
    }

    figment
        .merge(Env::prefixed("REELGATE_").split("__"))
        .extract()
        .context("failed to load configuration")
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays clean for `--url-only`.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let Cli { config, command } = Cli::parse();
    let config = load_config(&config)?;

    match command {
        Commands::Link {
            path,
            ttl,
            base_url,
            secret,
            url_only,
        } => handle_link_command(
            LinkArgs {
                path,
                ttl,
                base_url,
                secret,
            },
            url_only,
            &config,
        ),
        Commands::Upload {
            file,
            target,
            prefix,
            force,
            concurrency,
        } => match file {
            Some(file) => {
                if prefix.is_some() {
                    bail!("a prefix cannot be combined with --file; pass the full object key");
                }
                handle_single_upload(&file, &target, &config).await
            }
            None => {
                handle_folder_upload(Path::new(&target), prefix, force, concurrency, &config).await
            }
        },
    }
}

fn handle_link_command(args: LinkArgs, url_only: bool, config: &AppConfig) -> Result<()> {
    let settings = link::resolve_settings(&args, config)?;
    for warning in &settings.warnings {
        eprintln!("Warning: {warning}");
    }

    let signed = link::generate(&settings, &args.path, Arc::new(SystemClock))?;
    if url_only {
        println!("{}", signed.url);
    } else {
        print!("{}", link::render(&signed, settings.ttl));
    }
    Ok(())
}

async fn open_store(config: &AppConfig) -> Result<Arc<dyn ObjectStore>> {
    let store = reelgate_storage::from_config(&config.storage)
        .await
        .context("failed to initialize storage")?;
    tracing::debug!(backend = store.backend_name(), "Storage backend initialized");
    Ok(store)
}

async fn handle_single_upload(file: &Path, key: &str, config: &AppConfig) -> Result<()> {
    if !file.is_file() {
        bail!("file not found: {}", file.display());
    }

    let store = open_store(config).await?;
    let job = UploadJob {
        source: file.to_path_buf(),
        key: key.trim_start_matches('/').to_string(),
    };

    println!("Uploading {} as {} ({})", file.display(), job.key, content_type_for(&job.key));
    match upload::upload_one(store.as_ref(), &job, false).await {
        UploadOutcome::Uploaded { bytes } => {
            println!("Uploaded: {} ({bytes} bytes)", job.key);
            Ok(())
        }
        UploadOutcome::Skipped => Ok(()),
        UploadOutcome::Failed(error) => bail!("upload of {} failed: {error}", job.key),
    }
}

async fn handle_folder_upload(
    folder: &Path,
    prefix: Option<String>,
    force: bool,
    concurrency: Option<usize>,
    config: &AppConfig,
) -> Result<()> {
    if !folder.is_dir() {
        bail!("folder not found: {}", folder.display());
    }

    let prefix = prefix.unwrap_or_else(|| config.upload.prefix.clone());
    let concurrency = concurrency.unwrap_or(config.upload.concurrency);
    let skip_existing = config.upload.skip_existing && !force;

    let jobs = upload::plan_jobs(folder, &prefix)?;
    if jobs.is_empty() {
        println!("No video files found in {}", folder.display());
        return Ok(());
    }
    println!(
        "Found {} video file(s) in {}, uploading with prefix {prefix:?}",
        jobs.len(),
        folder.display()
    );

    let store = open_store(config).await?;
    let summary = upload::run_batch(store, jobs, concurrency, skip_existing).await;

    println!();
    print!("{}", summary.render());
    if summary.failed > 0 {
        bail!("{} upload(s) failed", summary.failed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use reelgate_core::config::StorageConfig;
    use tempfile::tempdir;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn link_arguments_are_positional() {
        let cli = Cli::try_parse_from([
            "reelgatectl",
            "link",
            "video/a.mp4",
            "6h",
            "https://cdn.example.com",
            "secret-value",
            "--url-only",
        ])
        .unwrap();
        match cli.command {
            Commands::Link {
                path,
                ttl,
                base_url,
                secret,
                url_only,
            } => {
                assert_eq!(path, "video/a.mp4");
                assert_eq!(ttl.map(|t| t.as_secs()), Some(21_600));
                assert_eq!(base_url.as_deref(), Some("https://cdn.example.com"));
                assert_eq!(secret.as_deref(), Some("secret-value"));
                assert!(url_only);
            }
            Commands::Upload { .. } => panic!("expected link"),
        }
    }

    #[test]
    fn invalid_ttl_is_rejected_by_the_parser() {
        assert!(Cli::try_parse_from(["reelgatectl", "link", "a.mp4", "soon"]).is_err());
        assert!(Cli::try_parse_from(["reelgatectl", "link", "a.mp4", "0"]).is_err());
    }

    #[test]
    fn upload_accepts_file_mode() {
        let cli = Cli::try_parse_from([
            "reelgatectl",
            "upload",
            "--file",
            "clip.mp4",
            "video/clip.mp4",
        ])
        .unwrap();
        match cli.command {
            Commands::Upload { file, target, .. } => {
                assert_eq!(file, Some(PathBuf::from("clip.mp4")));
                assert_eq!(target, "video/clip.mp4");
            }
            Commands::Link { .. } => panic!("expected upload"),
        }
    }

    #[test]
    fn load_config_reads_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("reelgate.toml");
        std::fs::write(
            &path,
            r#"
[link]
base_url = "https://cdn.example.com"

[upload]
prefix = "media/"
concurrency = 5

[storage]
type = "filesystem"
path = "/srv/videos"
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.link.base_url.as_deref(), Some("https://cdn.example.com"));
        assert_eq!(config.upload.prefix, "media/");
        assert_eq!(config.upload.concurrency, 5);
        assert!(matches!(config.storage, StorageConfig::Filesystem { .. }));
    }

    #[test]
    fn load_config_without_file_uses_defaults() {
        let config = load_config(Path::new("/nonexistent/reelgate.toml")).unwrap();
        assert_eq!(config.upload.prefix, "video/");
        assert_eq!(config.link.default_ttl_secs, 3600);
    }
}
