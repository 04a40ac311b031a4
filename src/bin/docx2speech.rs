//! CLI binary for docx2speech.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `NarrationConfig`, then either converts one document or serves the web
//! upload form.

use anyhow::{Context, Result};
use clap::Parser;
use docx2speech::{
    convert_to_file, extract_document, rewrite_document, server, NarrationConfig,
    NarrationProgressCallback, PipelineState, ProgressCallback, SpeechBackend, AUDIO_FILE_NAME,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner that names the current stage and logs one line per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Narrating");
        bar.set_message("Opening document…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl NarrationProgressCallback for CliProgressCallback {
    fn on_state_change(&self, _from: PipelineState, to: PipelineState) {
        match to {
            PipelineState::Done | PipelineState::Failed => self.bar.finish_and_clear(),
            _ => self.bar.set_message(format!("{to}…")),
        }
    }

    fn on_stage_complete(&self, stage: PipelineState, elapsed_ms: u64) {
        self.bar.println(format!(
            "  {} {:<20} {}",
            green("✓"),
            stage.to_string(),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
    }

    fn on_stage_error(&self, stage: PipelineState, error: &str) {
        let first_line = error.lines().next().unwrap_or(error);
        self.bar.println(format!(
            "  {} {:<20} {}",
            red("✗"),
            stage.to_string(),
            red(first_line)
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Narrate a document (writes lecture.mp3, prints the rewritten text)
  docx2speech lecture.docx

  # Choose the output file
  docx2speech lecture.docx -o audio/lecture.mp3

  # Narrate a document from a URL
  docx2speech https://example.org/notes.docx -o notes.mp3

  # Only show what would be read aloud (no speech call)
  docx2speech --text-only lecture.docx

  # Only extract the text (no API key needed)
  docx2speech --extract-only lecture.docx

  # British accent via the Google endpoint
  docx2speech --tld co.uk lecture.docx

  # OpenAI speech with a specific voice
  docx2speech --speech openai --voice nova lecture.docx

  # Start the upload form
  docx2speech --serve --bind 127.0.0.1:8501

ENVIRONMENT VARIABLES (also read from .env):
  OPENAI_API_KEY          OpenAI API key (completion and OpenAI speech)
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
"#;

/// Narrate Word documents: rewrite notation into prose and synthesize MP3 speech.
#[derive(Parser, Debug)]
#[command(
    name = "docx2speech",
    version,
    about = "Narrate Word documents as MP3, with maths, tables and images read as prose",
    long_about = "Extract the text of a .docx document, let a language model rewrite \
formulas, tables and image references into spoken-friendly prose, and synthesize \
the result as an MP3. Also serves a small web upload form.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local .docx file path or HTTP/HTTPS URL.
    #[arg(required_unless_present = "serve")]
    input: Option<String>,

    /// Write the MP3 here. Default: input file name with an .mp3 extension.
    #[arg(short, long, env = "DOCX2SPEECH_OUTPUT")]
    output: Option<PathBuf>,

    /// Serve the upload form instead of converting a single file.
    #[arg(long, conflicts_with_all = ["text_only", "extract_only"])]
    serve: bool,

    /// Address for --serve.
    #[arg(long, env = "DOCX2SPEECH_BIND", default_value = "127.0.0.1:8501")]
    bind: SocketAddr,

    /// LLM model ID for the rewrite (default: gpt-3.5-turbo).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_LLM_PROVIDER")]
    provider: Option<String>,

    /// LLM temperature (0.0–2.0). Provider default when unset.
    #[arg(long, env = "DOCX2SPEECH_TEMPERATURE")]
    temperature: Option<f32>,

    /// Max completion tokens. Provider default when unset.
    #[arg(long, env = "DOCX2SPEECH_MAX_TOKENS")]
    max_tokens: Option<usize>,

    /// Speech service.
    #[arg(long, env = "DOCX2SPEECH_SPEECH", value_enum, default_value = "google")]
    speech: SpeechArg,

    /// Narration language.
    #[arg(long, env = "DOCX2SPEECH_LANGUAGE", default_value = "en")]
    language: String,

    /// Google Translate host suffix (com, co.uk, com.au, ca, co.in…).
    #[arg(long, env = "DOCX2SPEECH_TLD", default_value = "com")]
    tld: String,

    /// OpenAI speech voice.
    #[arg(long, env = "DOCX2SPEECH_VOICE", default_value = "alloy")]
    voice: String,

    /// OpenAI speech model.
    #[arg(long, env = "DOCX2SPEECH_SPEECH_MODEL", default_value = "tts-1")]
    speech_model: String,

    /// Base URL of the OpenAI-compatible speech endpoint.
    #[arg(long, env = "DOCX2SPEECH_SPEECH_URL", default_value = "https://api.openai.com/v1")]
    speech_url: String,

    /// API key for the OpenAI speech endpoint.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    speech_api_key: Option<String>,

    /// Directory for per-run scratch workspaces.
    #[arg(long, env = "DOCX2SPEECH_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,

    /// Print the rewritten text without synthesizing speech.
    #[arg(long, conflicts_with = "extract_only")]
    text_only: bool,

    /// Print the extracted text only; no network calls.
    #[arg(long)]
    extract_only: bool,

    /// Output structured JSON (NarrationOutput) on stdout.
    #[arg(long, env = "DOCX2SPEECH_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "DOCX2SPEECH_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOCX2SPEECH_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOCX2SPEECH_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds (URL inputs).
    #[arg(long, env = "DOCX2SPEECH_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Completion call timeout in seconds.
    #[arg(long, env = "DOCX2SPEECH_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// Speech request timeout in seconds.
    #[arg(long, env = "DOCX2SPEECH_SPEECH_TIMEOUT")]
    speech_timeout: Option<u64>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum SpeechArg {
    Google,
    Openai,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before clap reads env-backed flags.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner replaces INFO logs for single conversions; the server
    // logs requests at INFO.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.serve;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Serve mode ───────────────────────────────────────────────────────
    if cli.serve {
        let config = build_config(&cli, None)?;
        if !cli.quiet {
            eprintln!("{} Upload form at {}", green("◆"), bold(&format!("http://{}", cli.bind)));
        }
        server::serve(config, cli.bind)
            .await
            .context("Web server failed")?;
        return Ok(());
    }

    let input = cli
        .input
        .as_deref()
        .context("An input document is required unless --serve is given")?;

    // ── Extract-only mode ────────────────────────────────────────────────
    if cli.extract_only {
        let config = build_config(&cli, None)?;
        let text = extract_document(input, &config)
            .await
            .context("Failed to extract text")?;
        print_text(&text)?;
        return Ok(());
    }

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn NarrationProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Text-only mode ───────────────────────────────────────────────────
    if cli.text_only {
        let text = rewrite_document(input, &config)
            .await
            .context("Failed to rewrite document")?;
        print_text(&text)?;
        return Ok(());
    }

    // ── Full narration ───────────────────────────────────────────────────
    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(input));

    let output = convert_to_file(input, &output_path, &config)
        .await
        .context("Conversion failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else {
        print_text(&output.narration_text)?;
    }

    if !cli.quiet {
        eprintln!(
            "{}  {} paragraphs  {}ms  →  {}",
            green("✔"),
            output.stats.paragraph_count,
            output.stats.total_ms,
            bold(&output_path.display().to_string()),
        );
        eprintln!(
            "   {} tokens in  /  {} tokens out  /  {} bytes of audio",
            dim(&output.stats.input_tokens.to_string()),
            dim(&output.stats.output_tokens.to_string()),
            dim(&output.stats.audio_bytes.to_string()),
        );
    }

    Ok(())
}

/// Map CLI args to `NarrationConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<NarrationConfig> {
    let speech = match cli.speech {
        SpeechArg::Google => SpeechBackend::google(cli.tld.as_str()),
        SpeechArg::Openai => SpeechBackend::OpenAi {
            base_url: cli.speech_url.clone(),
            model: cli.speech_model.clone(),
            voice: cli.voice.clone(),
            api_key: cli.speech_api_key.clone().unwrap_or_default(),
        },
    };

    let mut builder = NarrationConfig::builder()
        .language(cli.language.as_str())
        .speech(speech)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref model) = cli.model {
        builder = builder.model(model.as_str());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.as_str());
    }
    if let Some(t) = cli.temperature {
        builder = builder.temperature(t);
    }
    if let Some(n) = cli.max_tokens {
        builder = builder.max_tokens(n);
    }
    if let Some(ref dir) = cli.scratch_dir {
        builder = builder.scratch_root(dir);
    }
    if let Some(secs) = cli.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }
    if let Some(secs) = cli.speech_timeout {
        builder = builder.speech_timeout_secs(secs);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// `lecture.docx` → `lecture.mp3`; URLs and odd names fall back to `final.mp3`.
fn default_output_path(input: &str) -> PathBuf {
    if input.starts_with("http://") || input.starts_with("https://") {
        return PathBuf::from(AUDIO_FILE_NAME);
    }
    Path::new(input)
        .file_stem()
        .map(|stem| PathBuf::from(stem).with_extension("mp3"))
        .unwrap_or_else(|| PathBuf::from(AUDIO_FILE_NAME))
}

fn print_text(text: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(text.as_bytes())
        .context("Failed to write to stdout")?;
    if !text.ends_with('\n') {
        handle.write_all(b"\n").ok();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn provider_env_matches_help_and_resolution() {
        let cmd = Cli::command();
        let provider = cmd
            .get_arguments()
            .find(|a| a.get_id() == "provider")
            .unwrap();
        assert_eq!(
            provider.get_env().and_then(|v| v.to_str()),
            Some("EDGEQUAKE_LLM_PROVIDER")
        );
        assert!(AFTER_HELP.contains("EDGEQUAKE_LLM_PROVIDER"));
    }

    #[test]
    fn output_defaults_to_input_stem() {
        assert_eq!(default_output_path("notes/lecture.docx"), PathBuf::from("lecture.mp3"));
        assert_eq!(
            default_output_path("https://example.com/a.docx"),
            PathBuf::from(AUDIO_FILE_NAME)
        );
    }
}
