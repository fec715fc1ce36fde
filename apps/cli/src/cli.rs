// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context as _};
use ccapi_core::cache::RequestCache;
use ccapi_core::{CredentialResolver, CredentialSource, SystemClock, TokioSleeper};
use ccapi_nodes::containers::{from_container_bytes, to_wav_bytes, ContainerHint};
use ccapi_nodes::fallback::HandlerPolicy;
use ccapi_nodes::image::{aspect_ratio_fit, decode_image_bytes, to_png_bytes, SizeBounds};
use ccapi_nodes::providers::seedream::{PPIO_MODEL_PATH, VOLCENGINE_ENDPOINT};
use ccapi_nodes::providers::tts::{
    minimax_speech, MinimaxSpeechRequest, MINIMAX_SPEECH_MODEL, MINIMAX_TTS_ENDPOINT,
};
use ccapi_nodes::providers::voice_clone::{
    MINIMAX_UPLOAD_ENDPOINT, MINIMAX_VOICE_CLONE_ENDPOINT, PURPOSE_VOICE_CLONE,
};
use ccapi_nodes::providers::{
    clone_voice, upload_reference_audio, PpioClient, SeedreamBackend, SeedreamClient,
    SeedreamRequest, SeedreamSize, SpeechFormat, VoiceCloneRequest,
};
use ccapi_nodes::transport::{HttpSettings, HttpTransport, ReqwestTransport};
use clap::{Parser, Subcommand, ValueEnum};
use schemars::schema_for;
use tracing::{info, warn};

use crate::config;

type LogInitFn = fn(
    &config::LogConfig,
)
    -> Result<Option<tracing_appender::non_blocking::WorkerGuard>, Box<dyn std::error::Error>>;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Remote generation APIs from the command line",
    long_about = None
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "ccapi.toml")]
    pub config: String,

    /// API key; overrides the environment and the credentials file
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Submit a PPIO video job and wait for the result
    Video {
        /// Model path, e.g. wan-2.5-t2v-preview
        #[arg(short, long)]
        model: String,
        /// JSON file with the request payload
        payload: PathBuf,
        /// Download the video to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print the task id and exit without polling
        #[arg(long)]
        no_wait: bool,
    },
    /// Query the current state of a PPIO task once
    Task {
        task_id: String,
    },
    /// Generate images with Seedream 4.0
    Image {
        #[arg(short, long)]
        prompt: String,
        /// Reference images (JPEG or PNG)
        #[arg(short, long)]
        reference: Vec<PathBuf>,
        #[arg(short, long, value_enum, default_value_t = Backend::Volcengine)]
        backend: Backend,
        /// Preset such as 2K, or WIDTHxHEIGHT; defaults to the first reference's aspect ratio
        #[arg(short, long)]
        size: Option<String>,
        /// Ask for an image sequence of up to this many images
        #[arg(long)]
        max_images: Option<u32>,
        /// Directory for the generated PNG files
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Synthesize speech with MiniMax and write a WAV file
    Speech {
        #[arg(short, long)]
        text: String,
        #[arg(short, long)]
        voice_id: String,
        #[arg(long, default_value_t = 32_000)]
        sample_rate: u32,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Clone a voice from a 10 s to 5 min recording
    CloneVoice {
        /// Reference recording (WAV, MP3, FLAC or OGG)
        audio: PathBuf,
        /// Id to register the cloned voice under
        #[arg(short, long)]
        voice_id: String,
        /// Text for a demo clip of the cloned voice
        #[arg(long)]
        preview_text: Option<String>,
    },
    /// Compute the provider-conforming size for a reference resolution
    Fit {
        width: u32,
        height: u32,
        #[arg(short, long, value_enum, default_value_t = BoundsPreset::Seedream)]
        preset: BoundsPreset,
    },
    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Generate a default config file and print it to stdout
    Default,
    /// Generate a JSON schema for the config and print it to stdout
    Schema,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Volcengine,
    Ppio,
}

impl From<Backend> for SeedreamBackend {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Volcengine => Self::Volcengine,
            Backend::Ppio => Self::Ppio,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsPreset {
    Seedream,
    Ppio,
    Fal,
}

impl From<BoundsPreset> for SizeBounds {
    fn from(preset: BoundsPreset) -> Self {
        match preset {
            BoundsPreset::Seedream => Self::seedream(),
            BoundsPreset::Ppio => Self::ppio_seedream(),
            BoundsPreset::Fal => Self::fal_seedream(),
        }
    }
}

/// `WIDTHxHEIGHT` becomes a custom size, anything else is passed through as a preset.
pub fn parse_size(value: &str) -> SeedreamSize {
    let custom = value
        .split_once(['x', 'X', '*'])
        .and_then(|(w, h)| Some((w.trim().parse().ok()?, h.trim().parse().ok()?)));
    match custom {
        Some((width, height)) => SeedreamSize::Custom { width, height },
        None => SeedreamSize::Preset(value.trim().to_string()),
    }
}

/// Everything a provider command needs, built once from the loaded configuration.
struct Context {
    config: config::Config,
    api_key: Option<String>,
    resolver: CredentialResolver,
    transport: Arc<dyn HttpTransport>,
}

impl Context {
    fn new(config: config::Config, api_key: Option<String>) -> anyhow::Result<Self> {
        let settings = HttpSettings {
            request_timeout: Duration::from_secs(config.http.request_timeout_secs),
            connect_timeout: Duration::from_secs(config.http.connect_timeout_secs),
        };
        let transport = ReqwestTransport::new(settings).context("Failed to build HTTP client")?;
        let resolver = CredentialResolver::from_process(config.credentials.file.clone());
        Ok(Self { config, api_key, resolver, transport: Arc::new(transport) })
    }

    fn credential(&self, source: &CredentialSource) -> anyhow::Result<ccapi_core::Credential> {
        Ok(self.resolver.resolve(self.api_key.as_deref(), source)?)
    }

    fn policy(&self) -> HandlerPolicy {
        self.config.on_error
    }

    fn ppio(&self) -> PpioClient {
        PpioClient::new(self.transport.clone(), Arc::new(TokioSleeper), &self.config.ppio.base_url)
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

// Allow println for CLI output to stdout (intentional)
#[allow(clippy::disallowed_macros)]
async fn handle_video_command(
    ctx: &Context,
    model: &str,
    payload_path: &Path,
    output: Option<&Path>,
    no_wait: bool,
) -> anyhow::Result<()> {
    let payload = tokio::fs::read_to_string(payload_path)
        .await
        .with_context(|| format!("Failed to read {}", payload_path.display()))?;
    let payload: serde_json::Value =
        serde_json::from_str(&payload).context("Payload file is not valid JSON")?;
    let credential = ctx.credential(&CredentialSource::ppio())?;
    let client = ctx.ppio();

    if no_wait {
        let task_id = client.tasks().submit(&client.endpoint(model), &payload, &credential).await?;
        println!("{task_id}");
        return Ok(());
    }

    let url =
        client.generate_video(model, &payload, &credential, &ctx.config.poll.policy()).await?;
    println!("{url}");

    if let Some(output) = output {
        let bytes = client.download(&url).await?;
        write_file(output, &bytes).await?;
        info!(path = %output.display(), bytes = bytes.len(), "Saved video");
    }
    Ok(())
}

// Allow println for CLI output to stdout (intentional)
#[allow(clippy::disallowed_macros)]
async fn handle_task_command(ctx: &Context, task_id: &str) -> anyhow::Result<()> {
    let credential = ctx.credential(&CredentialSource::ppio())?;
    let query = ctx.ppio().query_task(task_id, &credential).await?;
    println!("{}", serde_json::to_string_pretty(&query.raw)?);
    Ok(())
}

struct ImageArgs<'a> {
    prompt: &'a str,
    references: &'a [PathBuf],
    backend: Backend,
    size: Option<&'a str>,
    max_images: Option<u32>,
    out_dir: &'a Path,
}

// Allow println for CLI output to stdout (intentional)
#[allow(clippy::disallowed_macros)]
async fn handle_image_command(ctx: &Context, args: ImageArgs<'_>) -> anyhow::Result<()> {
    let backend = SeedreamBackend::from(args.backend);
    let (source, endpoint) = match backend {
        SeedreamBackend::Volcengine => {
            (CredentialSource::volcengine(), VOLCENGINE_ENDPOINT.to_string())
        },
        SeedreamBackend::Ppio => (
            CredentialSource::ppio(),
            format!("{}/{PPIO_MODEL_PATH}", ctx.config.ppio.base_url.trim_end_matches('/')),
        ),
    };
    let credential = ctx.credential(&source)?;

    let mut request = SeedreamRequest::new(args.prompt);
    for path in args.references {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        request.reference_images.push(decode_image_bytes(&bytes)?);
    }
    if let Some(size) = args.size {
        request.size = parse_size(size);
    }
    if let Some(max_images) = args.max_images {
        request.sequential = true;
        request.max_images = max_images;
    }

    let cache = Arc::new(RequestCache::new(ctx.config.cache.policy(), Arc::new(SystemClock)));
    let client = SeedreamClient::new(ctx.transport.clone(), cache, backend, endpoint);
    let images = ctx.policy().images(client.generate(&request, &credential).await)?;

    tokio::fs::create_dir_all(args.out_dir).await?;
    for (index, image) in images.iter().enumerate() {
        let path = args.out_dir.join(format!("seedream_{index:02}.png"));
        write_file(&path, &to_png_bytes(image)?).await?;
        println!("{}", path.display());
    }
    Ok(())
}

async fn handle_speech_command(
    ctx: &Context,
    text: &str,
    voice_id: &str,
    sample_rate: u32,
    output: &Path,
) -> anyhow::Result<()> {
    let credential = ctx.credential(&CredentialSource::minimax())?;
    let mut request = MinimaxSpeechRequest::new(text, voice_id);
    request.audio.format = SpeechFormat::Pcm;
    request.audio.sample_rate = sample_rate;

    let result =
        minimax_speech(ctx.transport.as_ref(), MINIMAX_TTS_ENDPOINT, &credential, &request).await;
    let audio = ctx.policy().audio(result, sample_rate)?;
    write_file(output, &to_wav_bytes(&audio)?).await?;
    info!(path = %output.display(), duration_secs = audio.duration_secs(), "Saved speech");
    Ok(())
}

// Allow println for CLI output to stdout (intentional)
#[allow(clippy::disallowed_macros)]
async fn handle_clone_voice_command(
    ctx: &Context,
    audio_path: &Path,
    voice_id: &str,
    preview_text: Option<&str>,
) -> anyhow::Result<()> {
    let credential = ctx.credential(&CredentialSource::minimax())?;
    let bytes = tokio::fs::read(audio_path)
        .await
        .with_context(|| format!("Failed to read {}", audio_path.display()))?;
    let hint: ContainerHint = audio_path
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or(ContainerHint::Unknown, |ext| ext.parse().unwrap_or(ContainerHint::Unknown));
    let audio = from_container_bytes(&bytes, hint)?;

    let transport = ctx.transport.as_ref();
    let file_id = upload_reference_audio(
        transport,
        MINIMAX_UPLOAD_ENDPOINT,
        &credential,
        &audio,
        PURPOSE_VOICE_CLONE,
    )
    .await?;

    let request = VoiceCloneRequest {
        file_id,
        voice_id: voice_id.to_string(),
        prompt: None,
        preview: preview_text.map(|text| (text.to_string(), MINIMAX_SPEECH_MODEL.to_string())),
        noise_reduction: false,
        volume_normalization: false,
    };
    let demo = clone_voice(transport, MINIMAX_VOICE_CLONE_ENDPOINT, &credential, &request).await?;
    println!("{voice_id}");
    if let Some(url) = demo {
        println!("{url}");
    }
    Ok(())
}

// Allow println for CLI output to stdout (intentional)
#[allow(clippy::disallowed_macros)]
fn handle_fit_command(width: u32, height: u32, preset: BoundsPreset) -> anyhow::Result<()> {
    let (w, h) = aspect_ratio_fit(width, height, &SizeBounds::from(preset))?;
    println!("{w}x{h}");
    Ok(())
}

/// Handle the "config default" command - print default config to stdout
// Allow println for CLI output to stdout (intentional)
#[allow(clippy::disallowed_macros)]
fn handle_config_default_command() -> anyhow::Result<()> {
    let toml_string = config::generate_default().context("Failed to generate default config")?;
    println!("# Default ccapi configuration file");
    println!("{toml_string}");
    Ok(())
}

/// Handle the "config schema" command - print JSON schema to stdout
// Allow println for CLI output to stdout (intentional)
#[allow(clippy::disallowed_macros)]
fn handle_config_schema_command() -> anyhow::Result<()> {
    let schema = schema_for!(config::Config);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

/// Runs one CLI command.
///
/// Logging is initialized here, after the configuration is loaded, except for the `config`
/// subcommands which only print to stdout.
///
/// # Errors
///
/// Returns the first configuration, credential, provider or I/O error the command hits.
pub async fn handle_command(cli: &Cli, init_logging: LogInitFn) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Config(ConfigCommands::Default) => return handle_config_default_command(),
        Commands::Config(ConfigCommands::Schema) => return handle_config_schema_command(),
        Commands::Fit { width, height, preset } => {
            return handle_fit_command(*width, *height, *preset)
        },
        _ => {},
    }

    let loaded = config::load(&cli.config).context("Failed to load configuration")?;
    let _log_guard = match init_logging(&loaded.config.log) {
        Ok(guard) => guard,
        Err(e) => bail!("Failed to initialize logging: {e}"),
    };
    if let Some(missing_file) = &loaded.file_missing {
        warn!(config_path = %missing_file, "Config file not found, using defaults");
    }

    let ctx = Context::new(loaded.config, cli.api_key.clone())?;
    match &cli.command {
        Commands::Video { model, payload, output, no_wait } => {
            handle_video_command(&ctx, model, payload, output.as_deref(), *no_wait).await
        },
        Commands::Task { task_id } => handle_task_command(&ctx, task_id).await,
        Commands::Image { prompt, reference, backend, size, max_images, out_dir } => {
            let args = ImageArgs {
                prompt,
                references: reference,
                backend: *backend,
                size: size.as_deref(),
                max_images: *max_images,
                out_dir,
            };
            handle_image_command(&ctx, args).await
        },
        Commands::Speech { text, voice_id, sample_rate, output } => {
            handle_speech_command(&ctx, text, voice_id, *sample_rate, output).await
        },
        Commands::CloneVoice { audio, voice_id, preview_text } => {
            handle_clone_voice_command(&ctx, audio, voice_id, preview_text.as_deref()).await
        },
        Commands::Fit { .. } | Commands::Config(_) => Ok(()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("2048x1152"), SeedreamSize::Custom { width: 2048, height: 1152 });
        assert_eq!(parse_size("1280*720"), SeedreamSize::Custom { width: 1280, height: 720 });
        assert_eq!(parse_size("2K"), SeedreamSize::Preset("2K".to_string()));
        assert_eq!(parse_size("axb"), SeedreamSize::Preset("axb".to_string()));
    }

    #[test]
    fn test_cli_parses_video_command() {
        let cli = Cli::try_parse_from([
            "ccapi",
            "--api-key",
            "k",
            "video",
            "--model",
            "wan-2.5-t2v-preview",
            "payload.json",
            "-o",
            "out.mp4",
        ])
        .unwrap();
        assert_eq!(cli.api_key.as_deref(), Some("k"));
        match cli.command {
            Commands::Video { model, payload, output, no_wait } => {
                assert_eq!(model, "wan-2.5-t2v-preview");
                assert_eq!(payload, PathBuf::from("payload.json"));
                assert_eq!(output, Some(PathBuf::from("out.mp4")));
                assert!(!no_wait);
            },
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parses_fit_preset() {
        let cli = Cli::try_parse_from(["ccapi", "fit", "4000", "500", "--preset", "ppio"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Fit { width: 4000, height: 500, preset: BoundsPreset::Ppio }
        ));
    }

    #[test]
    fn test_preset_bounds() {
        assert_eq!(SizeBounds::from(BoundsPreset::Fal), SizeBounds::fal_seedream());
        assert_eq!(SeedreamBackend::from(Backend::Ppio), SeedreamBackend::Ppio);
    }
}
