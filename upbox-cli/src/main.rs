use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use upbox_core::{spawn_task, OverwritePolicy, Pattern, SyncTarget};
use upbox_remote_dropbox::{authorize_interactively, Credentials, DropboxRemote};

#[derive(Parser)]
#[command(name = "upbox", version, about = "upbox – watch a directory and upload changes to Dropbox")]
struct Cli {
    /// Local directory to upload
    #[arg(long, env = "UPBOX_ROOTDIR", default_value = "~/Downloads")]
    rootdir: String,
    /// Folder name in your Dropbox
    #[arg(short, long, env = "UPBOX_FOLDER", default_value = "")]
    folder: String,
    /// Application key
    #[arg(long, env = "UPBOX_APP_KEY")]
    app_key: String,
    /// Application secret
    #[arg(long, env = "UPBOX_APP_SECRET")]
    app_secret: String,
    /// Refresh token; obtained interactively when not set
    #[arg(long, env = "UPBOX_REFRESH_TOKEN", default_value = "")]
    refresh_token: String,
    /// Seconds between reconciliation passes
    #[arg(short, long, env = "UPBOX_INTERVAL", default_value_t = 10)]
    interval: u64,
    /// File-name patterns to upload
    #[arg(long, default_value = "*.mkv")]
    include: Vec<String>,
    /// Overwrite remote copies from local files during the startup pass
    #[arg(long, conflicts_with = "from_dropbox")]
    from_local: bool,
    /// Keep remote copies authoritative; uploads never clobber
    #[arg(long)]
    from_dropbox: bool,
    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let rootdir = expand_home(&cli.rootdir);
    if !rootdir.exists() {
        return Err(anyhow!(
            "{} does not exist on your filesystem",
            rootdir.display()
        ));
    }
    if !rootdir.is_dir() {
        return Err(anyhow!(
            "{} is not a folder on your filesystem",
            rootdir.display()
        ));
    }

    // The only fatal startup path: no refresh token and the interactive
    // exchange fails.
    let refresh_token = if cli.refresh_token.is_empty() {
        info!("refresh token not set, starting one-time authorization");
        let token = authorize_interactively(&cli.app_key, &cli.app_secret).await?;
        info!("refresh token retrieved: '{token}' (keep it for the next run)");
        token
    } else {
        cli.refresh_token
    };

    let remote = DropboxRemote::new(Credentials {
        app_key: cli.app_key,
        app_secret: cli.app_secret,
        refresh_token,
    });

    let overwrite = if cli.from_dropbox {
        OverwritePolicy::PreferRemote
    } else if cli.from_local {
        OverwritePolicy::PreferLocal
    } else {
        OverwritePolicy::None
    };

    let target = SyncTarget {
        local_root: rootdir,
        remote_folder: cli.folder,
        interval_secs: cli.interval,
        overwrite,
        include: cli.include.into_iter().map(Pattern).collect(),
    };
    info!(folder = %target.remote_folder, root = %target.local_root.display(), "server started");

    let handle = spawn_task(target, Arc::new(remote));
    tokio::signal::ctrl_c().await?;
    info!("stopping");
    handle.stop().await;
    Ok(())
}
