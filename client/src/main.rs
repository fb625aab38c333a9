//! Clipwatch CLI - upload a video for processing and follow its progress
//!
//! # Commands
//!
//! ```bash
//! clipwatch upload pigs.mp4                      # Upload and watch progress
//! clipwatch upload pigs.mp4 --download out.mp4   # ...and save the result
//! clipwatch upload pigs.mp4 --json               # Events as JSON lines
//! clipwatch check pigs.mp4                       # Validate only
//! clipwatch config                               # Show effective settings
//! ```
//!
//! Settings come from `CLIPWATCH_*` environment variables (a `.env` file is
//! honoured); command-line flags take precedence. Set `RUST_LOG` to see the
//! library's log output on stderr.

use clap::{Parser, Subcommand};
use clipwatch::{
    ConsoleRenderer, EventBroadcaster, FileValidator, HttpTransport, UploadConfig,
    UploadCoordinator, VideoFile,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Parser)]
#[command(name = "clipwatch")]
#[command(about = "Upload videos to a processing server and track their progress", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate, upload and monitor a video until processing finishes
    Upload {
        /// Video file to upload
        file: PathBuf,

        /// Processing server base URL
        #[arg(short, long)]
        server: Option<String>,

        /// Save the processed video to this path
        #[arg(short, long)]
        download: Option<PathBuf>,

        /// Print events as JSON lines
        #[arg(long)]
        json: bool,

        /// Progress poll interval in milliseconds
        #[arg(long)]
        poll_interval_ms: Option<u64>,

        /// Consecutive failed polls tolerated before giving up
        #[arg(long)]
        max_retries: Option<u32>,
    },

    /// Check whether a file would be accepted, without uploading it
    Check {
        /// Video file to check
        file: PathBuf,
    },

    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    // Library logs go through `log`; the subscriber bridges them.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("clipwatch=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Upload {
            file,
            server,
            download,
            json,
            poll_interval_ms,
            max_retries,
        } => {
            cmd_upload(
                &file,
                server,
                download.as_deref(),
                json,
                poll_interval_ms,
                max_retries,
            )
            .await
        }

        Commands::Check { file } => cmd_check(&file),

        Commands::Config => cmd_config(),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn cmd_upload(
    file: &Path,
    server: Option<String>,
    download: Option<&Path>,
    json: bool,
    poll_interval_ms: Option<u64>,
    max_retries: Option<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = UploadConfig::from_env()?;
    if let Some(server) = server {
        config = config.with_server_url(server);
    }
    if let Some(ms) = poll_interval_ms {
        config = config.with_poll_interval(Duration::from_millis(ms.max(1)));
    }
    if let Some(max_retries) = max_retries {
        config = config.with_max_retries(max_retries);
    }

    let video = VideoFile::from_path(file)?;
    let transport = HttpTransport::new(&config)?;
    eprintln!("🌐 Server: {}", transport.server_url());

    let events = Arc::new(EventBroadcaster::new());
    let console = tokio::spawn(ConsoleRenderer::new(json, config.error_display).run(events.subscribe()));

    let mut coordinator = UploadCoordinator::new(config, transport, events.clone());

    let teardown = coordinator.teardown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        eprintln!("\n🛑 Interrupted, cancelling upload (press Ctrl-C again to force quit)");
        teardown.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("🛑 Forced quit");
            std::process::exit(130);
        }
    });

    let outcome = run_session(&mut coordinator, video, download).await;

    // Closing the channel lets the console drain and finish
    drop(coordinator);
    drop(events);
    let _ = console.await;

    outcome
}

async fn run_session(
    coordinator: &mut UploadCoordinator<HttpTransport, Arc<EventBroadcaster>>,
    video: VideoFile,
    download: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let job = coordinator.process(video).await?;

    eprintln!("🎬 Result: {}", coordinator.transport().artifact_url(&job));

    if let Some(dest) = download {
        let teardown = coordinator.teardown_handle();
        let bytes = coordinator
            .transport()
            .download_until_cancelled(&job, dest, &teardown)
            .await?;
        eprintln!("💾 Saved {:.1} MB to {}", bytes as f64 / BYTES_PER_MB, dest.display());
    }

    coordinator.acknowledge().await?;
    eprintln!("\n✨ Done!");

    Ok(())
}

fn cmd_check(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("✔️  Checking: {}", file.display());

    let config = UploadConfig::from_env()?;
    let video = VideoFile::from_path(file)?;
    eprintln!("   Type: {}", video.mime_type);
    eprintln!("   Size: {:.1} MB", video.size as f64 / BYTES_PER_MB);

    FileValidator::from_config(&config).validate(&video)?;

    eprintln!("✅ {} can be uploaded", video.name);
    Ok(())
}

fn cmd_config() -> Result<(), Box<dyn std::error::Error>> {
    let config = UploadConfig::from_env()?;

    println!("⚙️  Effective configuration:");
    println!("   Server:           {}", config.server_url);
    println!("   Upload path:      {}", config.upload_path);
    println!("   Progress path:    {}", config.progress_path);
    println!("   Accepted types:   {}", config.accepted_types.join(", "));
    println!(
        "   Max file size:    {:.0} MB",
        config.max_file_size as f64 / BYTES_PER_MB
    );
    println!("   Poll interval:    {:?}", config.poll_interval);
    println!("   Max retries:      {}", config.max_retries);
    println!("   Error display:    {:?}", config.error_display);
    println!("   ETA horizon:      {:?}", config.max_eta);
    println!("   Completion grace: {:?}", config.completion_grace);
    println!("   Poll timeout:     {:?}", config.poll_timeout);
    println!("   Submit timeout:   {:?}", config.submit_timeout);
    println!("   Connect timeout:  {:?}", config.connect_timeout);

    Ok(())
}
