//! Driverator CLI - Command line interface for a single Drive file.
//!
//! Every command builds a handle from the global options, initializes it,
//! runs one operation, and prints the resulting record as JSON.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use driverator::{Handle, HandleConfig};
use driverator_common::{FileId, Role};

#[derive(Parser)]
#[command(name = "driverator")]
#[command(about = "Driverator - Manage a Google Drive file by name or id")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    target: TargetArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Options that describe the handle.
#[derive(Args)]
struct TargetArgs {
    /// JSON configuration file; other options override its fields.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Service account key file.
    #[arg(short, long)]
    key_file: Option<PathBuf>,

    /// Remote file id.
    #[arg(long)]
    file_id: Option<String>,

    /// Remote file name.
    #[arg(long)]
    file_name: Option<String>,

    /// Remote folder id.
    #[arg(long)]
    folder_id: Option<String>,

    /// Remote folder name (created when missing).
    #[arg(long)]
    folder_name: Option<String>,

    /// Folder under which folder names are resolved.
    #[arg(long)]
    parent_folder_id: Option<String>,

    /// Metadata cache directory.
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Cache lifetime in days.
    #[arg(long)]
    ttl_days: Option<u32>,

    /// Drop the cached record before initializing.
    #[arg(long)]
    clear_cache: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the file record.
    Info,

    /// Check whether the file exists and is not trashed.
    Exists,

    /// Upload a local file as a new remote object.
    Upload {
        /// Local file to upload.
        path: PathBuf,
    },

    /// Replace the remote content with a local file.
    Update {
        /// Local file with the new content.
        path: PathBuf,
    },

    /// Download the remote content.
    Download {
        /// Destination file path.
        path: PathBuf,
    },

    /// Rename the remote file.
    Rename {
        /// New name.
        name: String,
    },

    /// Move the file to another folder.
    Move {
        /// Target folder id.
        #[arg(long)]
        to_folder_id: Option<String>,

        /// Target folder name (created when missing).
        #[arg(long)]
        to_folder_name: Option<String>,
    },

    /// Trash the file, or delete it permanently.
    Delete {
        /// Skip the trash.
        #[arg(long)]
        permanent: bool,
    },

    /// Share the file with one or more users.
    Share {
        /// User emails.
        #[arg(required = true)]
        emails: Vec<String>,

        /// Role to grant: reader, commenter, writer, ...
        #[arg(short, long, default_value = "reader")]
        role: Role,
    },

    /// Grant access to anyone with the link.
    Public {
        /// Role to grant.
        #[arg(short, long, default_value = "reader")]
        role: Role,
    },

    /// List the file's permissions.
    Permissions,

    /// Revoke the permission held by a user.
    Revoke {
        /// User email.
        email: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = build_config(&cli.target).await?;
    let mut handle = Handle::new(config).context("Invalid handle configuration")?;
    handle
        .initialize()
        .await
        .context("Failed to initialize handle")?;

    match cli.command {
        Commands::Info => {}

        Commands::Exists => println!("{}", handle.exists().await),

        Commands::Upload { path } => cmd_upload(&mut handle, &path).await?,

        Commands::Update { path } => cmd_update(&mut handle, &path).await?,

        Commands::Download { path } => cmd_download(&handle, &path).await?,

        Commands::Rename { name } => handle
            .rename(&name)
            .await
            .context("Failed to rename file")?,

        Commands::Move {
            to_folder_id,
            to_folder_name,
        } => cmd_move(&mut handle, to_folder_id, to_folder_name.as_deref()).await?,

        Commands::Delete { permanent } => handle
            .delete(permanent)
            .await
            .context("Failed to delete file")?,

        Commands::Share { emails, role } => cmd_share(&mut handle, &emails, role).await?,

        Commands::Public { role } => {
            let permission = handle
                .set_anyone_access(role)
                .await
                .context("Failed to grant public access")?;
            println!("Public access granted: {} ({})", permission.role, permission.id);
        }

        Commands::Permissions => cmd_permissions(&handle).await?,

        Commands::Revoke { email } => {
            handle
                .remove_permission(&email)
                .await
                .context("Failed to revoke permission")?;
            println!("Permission revoked: {}", email);
        }
    }

    print_record(&handle)
}

/// Merge the config file (if any) with command line overrides.
async fn build_config(args: &TargetArgs) -> Result<HandleConfig> {
    let mut config = match (&args.config, &args.key_file) {
        (Some(path), _) => HandleConfig::from_file(path)
            .await
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        (None, Some(key_file)) => HandleConfig::new(key_file),
        (None, None) => anyhow::bail!("Either --config or --key-file is required"),
    };

    if let Some(key_file) = &args.key_file {
        config.service_account_file = key_file.clone();
    }
    if let Some(file_id) = &args.file_id {
        config = config.with_file_id(file_id);
    }
    if let Some(file_name) = &args.file_name {
        config = config.with_file_name(file_name);
    }
    if let Some(folder_id) = &args.folder_id {
        config = config.with_folder_id(folder_id);
    }
    if let Some(folder_name) = &args.folder_name {
        config = config.with_folder_name(folder_name);
    }
    if let Some(parent) = &args.parent_folder_id {
        config = config.with_parent_folder_id(parent);
    }
    if let Some(cache_dir) = &args.cache_dir {
        config = config.with_cache_dir(cache_dir);
    }
    if let Some(ttl_days) = args.ttl_days {
        config = config.with_ttl_days(ttl_days);
    }
    if args.clear_cache {
        config = config.with_clear_cache(true);
    }

    Ok(config)
}

/// Upload a local file.
async fn cmd_upload(handle: &mut Handle, path: &Path) -> Result<()> {
    info!("Uploading {}", path.display());

    handle
        .upload(path)
        .await
        .with_context(|| format!("Failed to upload {}", path.display()))?;

    println!("File uploaded: {}", handle.url().unwrap_or_default());
    Ok(())
}

/// Replace remote content.
async fn cmd_update(handle: &mut Handle, path: &Path) -> Result<()> {
    info!("Updating content from {}", path.display());

    handle
        .update(path)
        .await
        .with_context(|| format!("Failed to update from {}", path.display()))?;

    println!("File updated ({} bytes)", handle.size().unwrap_or_default());
    Ok(())
}

/// Download remote content.
async fn cmd_download(handle: &Handle, path: &Path) -> Result<()> {
    let written = handle
        .download(path)
        .await
        .with_context(|| format!("Failed to download to {}", path.display()))?;

    println!("File downloaded: {} ({} bytes)", path.display(), written);
    Ok(())
}

/// Move to a folder by id or name.
async fn cmd_move(
    handle: &mut Handle,
    folder_id: Option<String>,
    folder_name: Option<&str>,
) -> Result<()> {
    let folder_id = folder_id
        .map(FileId::new)
        .transpose()
        .context("Invalid folder id")?;

    handle
        .move_to(folder_id, folder_name)
        .await
        .context("Failed to move file")?;

    println!(
        "File moved to folder {}",
        handle.folder_id().map(FileId::as_str).unwrap_or_default()
    );
    Ok(())
}

/// Share with users.
async fn cmd_share(handle: &mut Handle, emails: &[String], role: Role) -> Result<()> {
    info!("Sharing with {} user(s) as {}", emails.len(), role);

    let granted = handle
        .share(emails, role)
        .await
        .context("Failed to share file")?;

    for permission in granted {
        println!(
            "  {} {} ({})",
            permission.role,
            permission.email_address.unwrap_or_default(),
            permission.id
        );
    }
    Ok(())
}

/// List permissions.
async fn cmd_permissions(handle: &Handle) -> Result<()> {
    let permissions = handle
        .list_permissions()
        .await
        .context("Failed to list permissions")?;

    if permissions.is_empty() {
        println!("No permissions.");
    } else {
        println!("Permissions:");
        for permission in permissions {
            println!(
                "  [{}] {} {} ({})",
                permission.kind,
                permission.role,
                permission.email_address.unwrap_or_default(),
                permission.id
            );
        }
    }
    Ok(())
}

fn print_record(handle: &Handle) -> Result<()> {
    let json = serde_json::to_string_pretty(&handle.record()).context("Failed to render record")?;
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_share() {
        let cli = Cli::parse_from([
            "driverator",
            "--key-file",
            "key.json",
            "--file-name",
            "a.txt",
            "share",
            "x@example.com",
            "y@example.com",
            "--role",
            "writer",
        ]);

        match cli.command {
            Commands::Share { emails, role } => {
                assert_eq!(emails, vec!["x@example.com", "y@example.com"]);
                assert_eq!(role, Role::Writer);
            }
            _ => panic!("expected share"),
        }
    }

    #[test]
    fn test_unknown_role_rejected() {
        let result = Cli::try_parse_from([
            "driverator", "--key-file", "k.json", "public", "--role", "emperor",
        ]);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_build_config_overrides() {
        let cli = Cli::parse_from([
            "driverator",
            "--key-file",
            "key.json",
            "--folder-name",
            "Reports",
            "--ttl-days",
            "3",
            "--clear-cache",
            "info",
        ]);

        let config = build_config(&cli.target).await.unwrap();
        assert_eq!(config.service_account_file, PathBuf::from("key.json"));
        assert_eq!(config.folder_name.as_deref(), Some("Reports"));
        assert_eq!(config.ttl_days, 3);
        assert!(config.clear_cache);
    }

    #[tokio::test]
    async fn test_build_config_requires_key_or_config() {
        let cli = Cli::parse_from(["driverator", "info"]);
        assert!(build_config(&cli.target).await.is_err());
    }
}
