use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use axum::Router;
use clap::{Parser, Subcommand};
use http::{
    Method,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use tokio::net::TcpListener;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use anyhow::anyhow;

use newscast_audio::{
    PipelineConfig, PipelineError,
    core::merge::{AudioMerger, FfmpegTranscoder, Transcoder},
    core::mp3,
    core::script::NewscastScript,
    core::synthesis::{
        MANIFEST_FILE_NAME, SpeechSynthesizer, SynthesisManifest, TracingProgressSink,
    },
    core::tts::ContentType,
    handlers, routes,
    state::AppState,
};

/// Newscast audio pipeline - speech synthesis and audio merging
#[derive(Parser, Debug)]
#[command(name = "newscast-audio")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Subcommand to run (defaults to `serve`)
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Synthesize every spoken line of a script
    Synthesize {
        /// Script JSON file
        #[arg(short = 's', long = "script", value_name = "FILE")]
        script: PathBuf,

        /// Output directory (clips land in its audio folder)
        #[arg(short = 'o', long = "output", value_name = "DIR")]
        output: PathBuf,
    },

    /// Merge synthesized clips into a single program
    Merge {
        /// Manifest written by `synthesize`
        #[arg(short = 'm', long = "manifest", value_name = "FILE", conflicts_with = "topic")]
        manifest: Option<PathBuf>,

        /// Topic directory laid out by `synthesize`
        #[arg(short = 't', long = "topic", value_name = "DIR")]
        topic: Option<PathBuf>,

        /// Output directory (defaults to the topic or the manifest's topic)
        #[arg(short = 'o', long = "output", value_name = "DIR")]
        output: Option<PathBuf>,
    },

    /// Synthesize a script and merge the result
    Run {
        /// Script JSON file
        #[arg(short = 's', long = "script", value_name = "FILE")]
        script: PathBuf,

        /// Topic output directory
        #[arg(short = 'o', long = "output", value_name = "DIR")]
        output: PathBuf,
    },

    /// List the built-in voices
    Voices {
        /// Also query the provider's voice list
        #[arg(long)]
        remote: bool,

        /// Print the host lineup for a content type (newscast, report, analysis, entertainment)
        #[arg(long)]
        content: Option<ContentType>,
    },

    /// Describe the first frame header of an MP3 file
    Inspect {
        /// MP3 file
        file: PathBuf,
    },

    /// Start the HTTP server
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    // Load configuration from file or environment
    let config = if let Some(config_path) = cli.config {
        info!("Loading configuration from {}", config_path.display());
        PipelineConfig::from_file(&config_path).map_err(|e| anyhow!(e.to_string()))?
    } else {
        PipelineConfig::from_env().map_err(|e| anyhow!(e.to_string()))?
    };

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Synthesize { script, output } => {
            warn_if_transcoder_missing(&config).await;
            let synthesizer = build_synthesizer(&config).await?;
            let manifest = synthesize(&synthesizer, &script, &output).await?;
            print_manifest_summary(&manifest);
        }
        Commands::Merge {
            manifest,
            topic,
            output,
        } => {
            let merger = AudioMerger::from_config(&config)
                .with_progress_sink(Arc::new(TracingProgressSink));
            let result = match (manifest, topic) {
                (Some(manifest), _) => {
                    let output = output.unwrap_or_else(|| topic_of_manifest(&manifest));
                    merger.merge_manifest_file(&manifest, &output).await
                }
                (None, Some(topic)) => match output {
                    Some(output) => {
                        let manifest = topic
                            .join(&config.output.audio_folder)
                            .join(MANIFEST_FILE_NAME);
                        merger.merge_manifest_file(&manifest, &output).await
                    }
                    None => merger.merge_topic(&topic).await,
                },
                (None, None) => {
                    anyhow::bail!("Either --manifest or --topic is required");
                }
            }
            .map_err(pipeline_error)?;
            println!(
                "Merged {} clips into {} ({}, {})",
                result.input_files,
                result.output_file,
                result.final_duration_formatted,
                result.file_size_formatted
            );
        }
        Commands::Run { script, output } => {
            let synthesizer = build_synthesizer(&config).await?;
            let manifest = synthesize(&synthesizer, &script, &output).await?;
            print_manifest_summary(&manifest);

            let merger = AudioMerger::from_config(&config)
                .with_progress_sink(Arc::new(TracingProgressSink));
            let result = merger.merge_topic(&output).await.map_err(pipeline_error)?;
            println!(
                "Merged {} clips into {} ({}, {})",
                result.input_files,
                output.join(&result.output_file).display(),
                result.final_duration_formatted,
                result.file_size_formatted
            );
        }
        Commands::Voices { remote, content } => {
            let state = AppState::new(config);
            if let Some(content) = content {
                let hosts = state.catalog.for_content(content).map_err(pipeline_error)?;
                println!("{content}:");
                for host in [&hosts.host1, &hosts.host2] {
                    println!("  {:<28} {:<8} {}", host.voice_model, host.name, host.gender);
                }
                return Ok(());
            }
            for voice in state.catalog.iter() {
                println!(
                    "{:<28} {:<8} {:<6} {} ({})",
                    voice.voice_id,
                    voice.display_name,
                    voice.gender.as_str(),
                    voice.role,
                    voice.description
                );
            }
            if remote {
                let synthesizer = state.synthesizer().map_err(pipeline_error)?;
                let voices = synthesizer.list_voices().await.map_err(pipeline_error)?;
                println!("\nProvider voices ({}):", voices.len());
                for voice in voices {
                    println!(
                        "{:<40} {:<8} {}",
                        voice.name,
                        voice.ssml_gender.unwrap_or_default(),
                        voice.language_codes.join(",")
                    );
                }
            }
        }
        Commands::Inspect { file } => {
            let bytes = tokio::fs::read(&file)
                .await
                .map_err(|e| anyhow!("Failed to read {}: {}", file.display(), e))?;
            println!("{}: {}", file.display(), mp3::describe(&bytes));
        }
        Commands::Serve => serve(config).await?,
    }

    Ok(())
}

async fn build_synthesizer(config: &PipelineConfig) -> anyhow::Result<SpeechSynthesizer> {
    let synthesizer = SpeechSynthesizer::from_config(config)
        .map_err(pipeline_error)?
        .with_progress_sink(Arc::new(TracingProgressSink));

    // soft check: synthesis still runs and reports per-segment failures
    if !synthesizer.validate_credentials().await {
        warn!("API credentials could not be verified, continuing anyway");
    }
    Ok(synthesizer)
}

/// Synthesis runs without ffmpeg; only the later merge needs it
async fn warn_if_transcoder_missing(config: &PipelineConfig) {
    let transcoder = FfmpegTranscoder::new(&config.transcoder, &config.output);
    if let Err(e) = transcoder.version().await {
        warn!(error = %e, "Transcoder not available, merging will fail until it is installed");
    }
}

async fn synthesize(
    synthesizer: &SpeechSynthesizer,
    script: &Path,
    output: &Path,
) -> anyhow::Result<SynthesisManifest> {
    let script = NewscastScript::from_file(script).map_err(pipeline_error)?;
    synthesizer
        .synthesize_script(&script, output)
        .await
        .map_err(pipeline_error)
}

fn print_manifest_summary(manifest: &SynthesisManifest) {
    println!(
        "{}: {} generated, {} failed, {} music skipped ({} success rate)",
        manifest.title,
        manifest.generated_audio_files,
        manifest.failed_audio_files,
        manifest.skipped_music_files,
        manifest.metadata.success_rate
    );
    for failure in &manifest.failures {
        println!(
            "  #{:03} [{}] {}",
            failure.sequence, failure.error_kind, failure.message
        );
    }
}

/// `<topic>/<audio>/audio-files.json` -> `<topic>`
fn topic_of_manifest(manifest: &Path) -> PathBuf {
    manifest
        .parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn pipeline_error(err: PipelineError) -> anyhow::Error {
    anyhow!("[{}] {}", err.code(), err.user_message())
}

async fn serve(config: PipelineConfig) -> anyhow::Result<()> {
    let address = config.server.address();
    let rate_limit_rps = config.server.rate_limit_requests_per_second;
    let rate_limit_burst = config.server.rate_limit_burst_size;
    info!("Starting server on {address}");

    if config.server.auth_required {
        info!("Authentication enabled for /v1 routes");
    }
    let app_state = AppState::new(config);

    // Protected API routes; auth is skipped inside the middleware when disabled
    let api_routes = routes::api::create_protected_router(app_state.clone());

    // Create public health check route
    let public_routes = Router::new().route("/", axum::routing::get(handlers::api::health_check));

    // Configure rate limiting (disabled when rate >= 100000)
    let governor_layer = if rate_limit_rps < 100000 {
        let governor_config = GovernorConfigBuilder::default()
            .per_second(rate_limit_rps as u64)
            .burst_size(rate_limit_burst)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow!("Invalid rate limiter configuration"))?;
        Some(GovernorLayer::new(governor_config))
    } else {
        info!("Rate limiting disabled (rate >= 100000/s)");
        None
    };

    let cors_layer = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(false);

    // Security headers
    let security_headers = tower::ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            http::header::X_CONTENT_TYPE_OPTIONS,
            http::HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            http::header::X_FRAME_OPTIONS,
            http::HeaderValue::from_static("DENY"),
        ));

    let app = public_routes
        .merge(api_routes)
        .with_state(app_state)
        .layer(cors_layer)
        .layer(tower::util::option_layer(governor_layer))
        .layer(security_headers);

    let socket_addr: SocketAddr = address
        .parse()
        .map_err(|e| anyhow!("Invalid server address '{}': {}", address, e))?;

    info!("Server listening on http://{}", socket_addr);

    let listener = TcpListener::bind(&socket_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
