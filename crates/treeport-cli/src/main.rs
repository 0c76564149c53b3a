//! Treeport - fetch files and directory trees from code hosts
//!
//! Usage:
//!   treeport file --code-host-id 7 --owner acme --repo charts --path svc/values.yaml --branch main
//!   treeport tree --repo-link https://github.com/acme/charts/tree/main/svc --chart-name --out ./out
//!   treeport ls   --code-host-id 7 --owner acme --repo charts --path svc --format json

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use treeport_core::codehost::{CodeHostDirectory, FileDirectory, StaticDirectory};
use treeport_core::config::{default_config_path, load_config, ResolverConfig};
use treeport_core::source::{chart_name_deriver, RootNameDeriver, SourceRequest, SourceResolver};
use treeport_core::vfs::{hash_tree, write_to_dir};

#[derive(Parser)]
#[command(name = "treeport")]
#[command(about = "Fetch files and directory trees from code hosts", long_about = None)]
struct Cli {
    /// Path to treeport.toml (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a single file
    File {
        #[command(flatten)]
        source: SourceArgs,

        /// Write to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Fetch a directory tree
    Tree {
        #[command(flatten)]
        source: SourceArgs,

        /// Rename the tree root to this name
        #[arg(long, conflicts_with = "chart_name")]
        root_name: Option<String>,

        /// Rename the tree root after the Helm chart it contains
        #[arg(long)]
        chart_name: bool,

        /// Export the tree into this directory
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// List the nodes of a directory tree
    #[command(alias = "list")]
    Ls {
        #[command(flatten)]
        source: SourceArgs,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Args, Debug, Clone, Default)]
struct SourceArgs {
    /// Registered code host id
    #[arg(long)]
    code_host_id: Option<i64>,

    /// Public repository link (takes precedence over --code-host-id)
    #[arg(long)]
    repo_link: Option<String>,

    /// Repository owner or group
    #[arg(long)]
    owner: Option<String>,

    /// Repository name
    #[arg(long)]
    repo: Option<String>,

    /// Path inside the repository
    #[arg(long)]
    path: Option<String>,

    /// Branch, tag or commit
    #[arg(short, long)]
    branch: Option<String>,
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// One node per line
    #[default]
    Text,
    /// JSON array
    Json,
}

impl SourceArgs {
    /// Build the request; values taken from `--repo-link` are overridden by
    /// explicit flags.
    fn to_request(&self) -> Result<SourceRequest> {
        let mut request = match self.repo_link.as_deref() {
            Some(link) => SourceRequest::from_repo_link(link)?,
            None => {
                let id = self
                    .code_host_id
                    .context("either --code-host-id or --repo-link is required")?;
                SourceRequest {
                    code_host_id: Some(id),
                    ..Default::default()
                }
            }
        };
        if request.code_host_id.is_none() {
            request.code_host_id = self.code_host_id;
        }
        if let Some(owner) = &self.owner {
            request.owner = owner.clone();
        }
        if let Some(repo) = &self.repo {
            request.repo = repo.clone();
        }
        if let Some(path) = &self.path {
            request.path = path.clone();
        }
        if let Some(branch) = &self.branch {
            request.branch = branch.clone();
        }

        anyhow::ensure!(!request.owner.is_empty(), "--owner is required");
        anyhow::ensure!(!request.repo.is_empty(), "--repo is required");
        anyhow::ensure!(
            !request.branch.is_empty(),
            "--branch is required unless --repo-link names a ref (/tree/<ref>)"
        );
        Ok(request)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "treeport=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let directory = code_host_directory(cli.config.as_ref(), &config)?;
    let resolver = SourceResolver::from_config(directory, &config);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted, cancelling");
            on_interrupt.cancel();
        }
    });

    match cli.command {
        Commands::File { source, out } => {
            let request = source.to_request()?;
            let bytes = resolver.fetch_file(&request, &cancel).await?;
            match out {
                Some(path) => std::fs::write(&path, &bytes)
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => std::io::stdout()
                    .write_all(&bytes)
                    .context("Failed to write to stdout")?,
            }
        }
        Commands::Tree {
            source,
            root_name,
            chart_name,
            out,
        } => {
            let request = source.to_request()?;
            let deriver = root_name_deriver(root_name, chart_name);
            let fs = resolver.fetch_tree(&request, &*deriver, &cancel).await?;
            match out {
                Some(dir) => {
                    write_to_dir(&fs, &dir)?;
                    println!("✓ Wrote {} files to {}", fs.file_count(), dir.display());
                }
                None => {
                    for (path, bytes) in fs.files() {
                        println!("{:>10}  {}", bytes.len(), path);
                    }
                }
            }
            println!("{}", hash_tree(&fs));
        }
        Commands::Ls { source, format } => {
            let request = source.to_request()?;
            let nodes = resolver.list_tree(&request, &cancel).await?;
            match format {
                OutputFormat::Text => {
                    for node in &nodes {
                        let marker = if node.is_dir { "d" } else { "f" };
                        println!("{} {}", marker, node.path);
                    }
                }
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&nodes)?);
                }
            }
        }
    }

    Ok(())
}

/// Directory backed by the config file when one exists, else the loaded
/// `[[codehost]]` tables.
fn code_host_directory(
    explicit: Option<&PathBuf>,
    config: &ResolverConfig,
) -> Result<Arc<dyn CodeHostDirectory>> {
    let path = match explicit {
        Some(path) => path.clone(),
        None => default_config_path()?,
    };
    if path.exists() {
        return Ok(Arc::new(FileDirectory::new(path)));
    }
    Ok(Arc::new(StaticDirectory::from_hosts(config.codehost.clone())))
}

fn root_name_deriver(root_name: Option<String>, chart_name: bool) -> Box<RootNameDeriver> {
    match (root_name, chart_name) {
        (Some(name), _) => Box::new(move |_| Ok(name.clone())),
        (None, true) => Box::new(chart_name_deriver),
        (None, false) => Box::new(|_| Ok(String::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use treeport_core::vfs::MemoryFs;

    #[test]
    fn cli_parses_tree_command() {
        let cli = Cli::try_parse_from([
            "treeport",
            "tree",
            "--code-host-id",
            "7",
            "--owner",
            "acme",
            "--repo",
            "charts",
            "--path",
            "svc",
            "--branch",
            "main",
            "--chart-name",
        ])
        .unwrap();
        let Commands::Tree {
            source, chart_name, ..
        } = cli.command
        else {
            panic!("expected tree command");
        };
        assert!(chart_name);
        let request = source.to_request().unwrap();
        assert_eq!(request.code_host_id, Some(7));
        assert_eq!(request.path, "svc");
    }

    #[test]
    fn root_name_conflicts_with_chart_name() {
        let result = Cli::try_parse_from([
            "treeport",
            "tree",
            "--repo-link",
            "https://github.com/acme/charts",
            "--root-name",
            "x",
            "--chart-name",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn repo_link_fills_request_and_flags_override() {
        let args = SourceArgs {
            repo_link: Some("https://github.com/acme/charts/tree/main/svc".into()),
            branch: Some("release".into()),
            ..Default::default()
        };
        let request = args.to_request().unwrap();
        assert_eq!(request.owner, "acme");
        assert_eq!(request.path, "svc");
        assert_eq!(request.branch, "release");
        assert!(request.public_link().is_some());
    }

    #[test]
    fn link_without_ref_needs_branch() {
        let args = SourceArgs {
            repo_link: Some("https://github.com/acme/charts".into()),
            ..Default::default()
        };
        let err = args.to_request().unwrap_err();
        assert!(err.to_string().contains("--branch"));

        let args = SourceArgs {
            branch: Some("main".into()),
            ..args
        };
        assert_eq!(args.to_request().unwrap().branch, "main");
    }

    #[test]
    fn request_needs_host_or_link() {
        let args = SourceArgs {
            owner: Some("acme".into()),
            repo: Some("charts".into()),
            ..Default::default()
        };
        assert!(args.to_request().is_err());
    }

    #[test]
    fn fixed_root_name_ignores_tree() {
        let deriver = root_name_deriver(Some("my-service".into()), false);
        assert_eq!(deriver(&MemoryFs::new()).unwrap(), "my-service");
        let none = root_name_deriver(None, false);
        assert_eq!(none(&MemoryFs::new()).unwrap(), "");
    }
}
