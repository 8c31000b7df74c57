//! CLI binary for snaptex.
//!
//! Runs the HTTP service by default; the other subcommands drive the same
//! pipeline once from the terminal.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use snaptex::pipeline::ingress::ImagePayload;
use snaptex::{ExtractorKind, OutputStyle, Pipeline, ServiceConfig};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"ENVIRONMENT:
  OPENAI_API_KEY          Credential for the default provider
  ANTHROPIC_API_KEY       Credential when --provider anthropic
  GEMINI_API_KEY          Credential when --provider gemini
  RUST_LOG                Overrides -v / -q (e.g. snaptex=debug,tower_http=debug)

  Variables may also be placed in a .env file in the working directory.

EXAMPLES:
  snaptex                              Serve on 0.0.0.0:8000
  snaptex ocr notes.jpg                Print the LaTeX version of a photo
  snaptex ocr notes.jpg --json         Print raw + cleaned text as JSON
  snaptex compile notes.tex -o out.pdf
  snaptex status                       Is pdflatex installed?
"#;

/// Turn photos of notes into LaTeX and compile LaTeX to PDF.
#[derive(Parser, Debug)]
#[command(
    name = "snaptex",
    version,
    about = "Turn photos of notes into LaTeX and compile LaTeX to PDF",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Interface to bind.
    #[arg(long, global = true, env = "SNAPTEX_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to bind.
    #[arg(long, global = true, env = "PORT", default_value_t = 8000)]
    port: u16,

    /// Where OCR runs: a local tesseract binary or a hosted vision model.
    #[arg(long, global = true, env = "SNAPTEX_EXTRACTOR", value_enum, default_value = "local")]
    extractor: ExtractorArg,

    /// Shape of the cleaned text.
    #[arg(long, global = true, env = "SNAPTEX_OUTPUT_STYLE", value_enum, default_value = "latex")]
    style: StyleArg,

    /// LLM provider: openai, anthropic, gemini, mistral, openrouter, xai, ollama.
    #[arg(long, global = true, env = "SNAPTEX_PROVIDER")]
    provider: Option<String>,

    /// Model used for normalization.
    #[arg(long, global = true, env = "SNAPTEX_MODEL")]
    model: Option<String>,

    /// Model used for remote extraction (defaults to --model).
    #[arg(long, global = true, env = "SNAPTEX_OCR_MODEL")]
    ocr_model: Option<String>,

    /// Environment variable holding the provider credential.
    #[arg(long, global = true, env = "SNAPTEX_API_KEY_VAR")]
    api_key_var: Option<String>,

    /// LaTeX compiler binary.
    #[arg(long, global = true, env = "SNAPTEX_PDFLATEX", default_value = "pdflatex")]
    pdflatex: PathBuf,

    /// Tesseract binary.
    #[arg(long, global = true, env = "SNAPTEX_TESSERACT", default_value = "tesseract")]
    tesseract: PathBuf,

    /// Tesseract language pack(s), e.g. eng or eng+deu.
    #[arg(long, global = true, env = "SNAPTEX_TESSERACT_LANG", default_value = "eng")]
    lang: String,

    /// Seconds before a LaTeX compile is killed.
    #[arg(long, global = true, env = "SNAPTEX_COMPILE_TIMEOUT", default_value_t = 120)]
    compile_timeout: u64,

    /// Largest accepted upload, in bytes.
    #[arg(long, global = true, env = "SNAPTEX_MAX_UPLOAD_BYTES", default_value_t = 10 * 1024 * 1024)]
    max_upload_bytes: usize,

    /// Comma-separated browser origins allowed by CORS.
    #[arg(long, global = true, env = "SNAPTEX_CORS_ORIGINS", value_delimiter = ',')]
    cors_origins: Vec<String>,

    /// Debug-level logs.
    #[arg(short, long, global = true, env = "SNAPTEX_VERBOSE")]
    verbose: bool,

    /// Errors only.
    #[arg(short, long, global = true, env = "SNAPTEX_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service (default).
    Serve,

    /// OCR one image and print the cleaned result.
    Ocr {
        /// Image file (png, jpeg, gif, webp, bmp, tiff).
        image: PathBuf,

        /// Print `{raw_text, beautified_text, error}` as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Compile a .tex file to PDF.
    Compile {
        /// LaTeX source file.
        input: PathBuf,

        /// Destination PDF.
        #[arg(short, long, default_value = "document.pdf")]
        output: PathBuf,
    },

    /// Report whether the LaTeX compiler is available.
    Status,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ExtractorArg {
    Local,
    Remote,
}

impl From<ExtractorArg> for ExtractorKind {
    fn from(v: ExtractorArg) -> Self {
        match v {
            ExtractorArg::Local => ExtractorKind::Local,
            ExtractorArg::Remote => ExtractorKind::Remote,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum StyleArg {
    Latex,
    Prose,
}

impl From<StyleArg> for OutputStyle {
    fn from(v: StyleArg) -> Self {
        match v {
            StyleArg::Latex => OutputStyle::Latex,
            StyleArg::Prose => OutputStyle::Prose,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Missing .env is fine; a malformed one is reported once logging is up.
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    if let Err(e) = dotenv {
        if !e.not_found() {
            tracing::warn!("Ignoring .env file: {}", e);
        }
    }

    let config = build_config(&cli)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => snaptex::serve(config).await.context("Server failed"),
        Command::Ocr { image, json } => run_ocr(&config, &image, json).await,
        Command::Compile { input, output } => run_compile(&config, &input, &output).await,
        Command::Status => {
            let status = Pipeline::from_config(&config).latex_status().await;
            println!("{}", status.message);
            if !status.latex_installed {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

fn build_config(cli: &Cli) -> Result<ServiceConfig> {
    let mut builder = ServiceConfig::builder()
        .host(cli.host.clone())
        .port(cli.port)
        .extractor(cli.extractor.into())
        .output_style(cli.style.into())
        .compiler_program(cli.pdflatex.clone())
        .compile_timeout_secs(cli.compile_timeout)
        .tesseract_path(cli.tesseract.clone())
        .tesseract_lang(cli.lang.clone())
        .max_upload_bytes(cli.max_upload_bytes);

    if let Some(ref provider) = cli.provider {
        builder = builder.provider(provider.clone());
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref model) = cli.ocr_model {
        builder = builder.ocr_model(model.clone());
    }
    if let Some(ref var) = cli.api_key_var {
        builder = builder.api_key_var(var.clone());
    }
    if !cli.cors_origins.is_empty() {
        builder = builder.cors_origins(cli.cors_origins.iter().map(|o| o.trim().to_string()));
    }

    builder.build().context("Invalid configuration")
}

async fn run_ocr(config: &ServiceConfig, path: &Path, json: bool) -> Result<()> {
    let media_type = image::ImageFormat::from_path(path)
        .map(|f| f.to_mime_type())
        .with_context(|| format!("Cannot tell the image type of {}", path.display()))?;
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let payload = ImagePayload::new(bytes, media_type)?;

    let output = Pipeline::from_config(config)
        .convert_image(&payload)
        .await
        .context("OCR failed")?;

    if json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }

    let text = match output.error {
        Some(ref e) => {
            eprintln!("warning: {e}; printing the raw transcript");
            &output.raw_text
        }
        None => &output.beautified_text,
    };
    let mut handle = io::stdout().lock();
    handle.write_all(text.as_bytes()).context("Failed to write to stdout")?;
    if !text.ends_with('\n') {
        writeln!(handle).context("Failed to write to stdout")?;
    }
    Ok(())
}

async fn run_compile(config: &ServiceConfig, input: &Path, output: &Path) -> Result<()> {
    let source = tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    if source.trim().is_empty() {
        bail!("{} is empty", input.display());
    }

    let pdf = Pipeline::from_config(config)
        .compile_latex(&source)
        .await
        .context("Compilation failed")?;

    tokio::fs::write(output, &pdf)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;
    eprintln!("Wrote {} ({} bytes)", output.display(), pdf.len());
    Ok(())
}
