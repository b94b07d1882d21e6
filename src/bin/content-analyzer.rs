//! CLI binary for edgequake-content-analyzer.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `AnalysisConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_content_analyzer::{
    analyze_stream, write_report, AnalysisConfig, AnalysisProgressCallback, AnalysisReport,
    AnalysisResult, AnalyzeError, ExtractionMethod, ProgressCallback,
};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
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
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar counting finished files plus a log
/// line per stage event. Works when files finish out of order.
struct CliProgressCallback {
    bar: ProgressBar,
    retries: AtomicUsize,
}

impl CliProgressCallback {
    fn new(total: usize) -> Arc<Self> {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:32.green/238}] {pos}/{len} files  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        let bar = ProgressBar::new(total as u64);
        bar.set_style(style);
        bar.set_prefix("Analysing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            retries: AtomicUsize::new(0),
        })
    }

    /// One file left the pipeline, whatever its outcome.
    fn file_done(&self) {
        self.bar.inc(1);
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
        let retries = self.retries.load(Ordering::SeqCst);
        if retries > 0 {
            eprintln!("{}", dim(&format!("{retries} rate-limit retries")));
        }
    }
}

impl AnalysisProgressCallback for CliProgressCallback {
    fn on_analysis_start(&self, name: &str, size: u64, enrich: bool) {
        let mode = if enrich { "deep" } else { "basic" };
        self.bar.set_message(format!("{name} ({size} bytes, {mode})"));
    }

    fn on_extraction_complete(&self, name: &str, method: ExtractionMethod, chars: usize) {
        let how = match method {
            ExtractionMethod::Ocr => green("OCR"),
            ExtractionMethod::SizeHeuristic(band) => yellow(&format!("size band: {band:?}")),
        };
        self.bar.println(format!(
            "  {} {}  {}  {}",
            cyan("◆"),
            name,
            how,
            dim(&format!("{chars} chars"))
        ));
    }

    fn on_enrichment_attempt(&self, name: &str, attempt: u32, model: &str) {
        self.bar
            .set_message(format!("{name}: deep analysis #{attempt} via {model}"));
    }

    fn on_enrichment_retry(&self, name: &str, attempt: u32, delay_ms: u64, status: u16) {
        self.retries.fetch_add(1, Ordering::SeqCst);
        let why = if status == 0 {
            "timed out".to_string()
        } else {
            format!("HTTP {status}")
        };
        self.bar.println(format!(
            "  {} {}  attempt {} {}, retrying in {}ms",
            yellow("↻"),
            name,
            attempt,
            why,
            delay_ms
        ));
    }

    fn on_analysis_complete(&self, name: &str, enriched: bool) {
        let mark = if enriched { green("✓") } else { dim("✓") };
        self.bar.println(format!("  {mark} {name}"));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Heuristic analysis of an image (OCR needs OCR_SPACE_API_KEY)
  content-analyzer flyer.png

  # Add the AI deep analysis
  content-analyzer --deep flyer.png

  # Several files, JSON on stdout
  content-analyzer --json deck.pdf post.jpg

  # Save the downloadable report
  content-analyzer --deep flyer.png -o flyer-analysis.json

  # Several reports into one directory
  content-analyzer --deep *.png -o reports/

  # Model fallback list, tried in order on rate limits
  content-analyzer --deep --model deepseek/deepseek-r1-0528:free \
      --model meta-llama/llama-3.3-70b-instruct:free flyer.png

ENVIRONMENT VARIABLES:
  OPENROUTER_API_KEY       OpenRouter API key (also read from .env.local)
  OCR_SPACE_API_KEY        OCR.space API key; without it images use the size band
  SITE_URL                 Sent as HTTP-Referer
  CONTENT_ANALYZER_*       Any flag below, e.g. CONTENT_ANALYZER_DEEP=true
"#;

/// Analyse PDFs and images for social-media content quality.
#[derive(Parser, Debug)]
#[command(
    name = "content-analyzer",
    version,
    about = "Analyse PDFs and images for social-media content quality",
    long_about = "Extract text from PDFs and images, score it with content heuristics, and \
optionally ask a language model (via OpenRouter) for a deep strategic analysis.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF, PNG or JPEG files to analyse.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Run the AI deep analysis as well.
    #[arg(long, env = "CONTENT_ANALYZER_DEEP")]
    deep: bool,

    /// Write the JSON report here (a directory when several files are given).
    #[arg(short, long, env = "CONTENT_ANALYZER_OUTPUT")]
    output: Option<PathBuf>,

    /// Print results as JSON instead of a summary.
    #[arg(long, env = "CONTENT_ANALYZER_JSON")]
    json: bool,

    /// OpenRouter API key.
    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// dotenv files searched for OPENROUTER_API_KEY, in order.
    #[arg(
        long = "env-file",
        env = "CONTENT_ANALYZER_ENV_FILES",
        value_delimiter = ',',
        default_value = ".env.local"
    )]
    env_files: Vec<PathBuf>,

    /// OCR.space API key.
    #[arg(long, env = "OCR_SPACE_API_KEY", hide_env_values = true)]
    ocr_api_key: Option<String>,

    /// OCR endpoint.
    #[arg(long, env = "CONTENT_ANALYZER_OCR_ENDPOINT")]
    ocr_endpoint: Option<String>,

    /// Chat-completions endpoint.
    #[arg(long, env = "CONTENT_ANALYZER_ENDPOINT")]
    endpoint: Option<String>,

    /// Model for each attempt; repeat for a fallback list.
    #[arg(long = "model", env = "CONTENT_ANALYZER_MODELS", value_delimiter = ',')]
    models: Vec<String>,

    /// Total deep-analysis attempts.
    #[arg(long, env = "CONTENT_ANALYZER_MAX_ATTEMPTS", default_value_t = 3)]
    max_attempts: u32,

    /// Base backoff after HTTP 429, doubled each attempt.
    #[arg(long, env = "CONTENT_ANALYZER_RETRY_BACKOFF_MS", default_value_t = 800)]
    retry_backoff_ms: u64,

    /// Per-call timeout for the deep analysis, in seconds.
    #[arg(long, env = "CONTENT_ANALYZER_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Per-call timeout for OCR, in seconds.
    #[arg(long, env = "CONTENT_ANALYZER_OCR_TIMEOUT", default_value_t = 30)]
    ocr_timeout: u64,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "CONTENT_ANALYZER_TEMPERATURE", default_value_t = 0.7)]
    temperature: f32,

    /// Max completion tokens.
    #[arg(long, env = "CONTENT_ANALYZER_MAX_TOKENS", default_value_t = 2000)]
    max_tokens: u32,

    /// Largest accepted file, in bytes.
    #[arg(long, env = "CONTENT_ANALYZER_MAX_FILE_SIZE", default_value_t = 10 * 1024 * 1024)]
    max_file_size: u64,

    /// Sent as HTTP-Referer.
    #[arg(long, env = "SITE_URL")]
    site_url: Option<String>,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "CONTENT_ANALYZER_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Fail instead of returning a placeholder when the deep analysis fails.
    #[arg(long, env = "CONTENT_ANALYZER_STRICT")]
    strict: bool,

    /// Files analysed at once.
    #[arg(short, long, env = "CONTENT_ANALYZER_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Disable progress bar.
    #[arg(long, env = "CONTENT_ANALYZER_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "CONTENT_ANALYZER_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "CONTENT_ANALYZER_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar carries the per-stage feedback, so library INFO logs
    // are suppressed while it is active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    // ── Build config ─────────────────────────────────────────────────────
    let progress = show_progress.then(|| CliProgressCallback::new(cli.files.len()));
    let config = build_config(
        &cli,
        progress.clone().map(|cb| cb as ProgressCallback),
    )
    .await?;

    // ── Run analysis ─────────────────────────────────────────────────────
    let mut stream = analyze_stream(cli.files.clone(), cli.deep, &config, cli.concurrency)
        .context("Analysis failed")?;
    let mut items: Vec<(PathBuf, std::result::Result<AnalysisResult, AnalyzeError>)> =
        Vec::with_capacity(cli.files.len());
    while let Some(item) = stream.next().await {
        if let Some(ref cb) = progress {
            cb.file_done();
        }
        items.push(item);
    }
    if let Some(ref cb) = progress {
        cb.finish();
    }

    // Report in the order the files were given.
    items.sort_by_key(|(path, _)| cli.files.iter().position(|f| f == path));

    let mut results = Vec::new();
    let mut failures = 0usize;
    for (path, outcome) in items {
        match outcome {
            Ok(result) => results.push(result),
            Err(e) => {
                failures += 1;
                let label = if e.is_bad_input() { "rejected" } else { "failed" };
                eprintln!("{} {} {}: {}", red("✘"), path.display(), label, e);
            }
        }
    }

    // ── Output ───────────────────────────────────────────────────────────
    if cli.json {
        let json = if results.len() == 1 && cli.files.len() == 1 {
            serde_json::to_string_pretty(&results[0])
        } else {
            serde_json::to_string_pretty(&results)
        }
        .context("Failed to serialise results")?;
        println!("{json}");
    } else if !cli.quiet {
        for result in &results {
            print_summary(result);
        }
    }

    if let Some(ref output) = cli.output {
        for result in &results {
            let path = report_path(output, cli.files.len(), result);
            write_report(result, &path)
                .await
                .with_context(|| format!("Failed to write report for {}", result.file_name))?;
            if !cli.quiet {
                eprintln!("{} report → {}", green("✔"), bold(&path.display().to_string()));
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {} files could not be analysed", cli.files.len());
    }
    Ok(())
}

/// Map CLI args to `AnalysisConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<AnalysisConfig> {
    let mut builder = AnalysisConfig::builder()
        .max_file_size(cli.max_file_size)
        .ocr_timeout_secs(cli.ocr_timeout)
        .max_attempts(cli.max_attempts)
        .retry_backoff_ms(cli.retry_backoff_ms)
        .api_timeout_secs(cli.api_timeout)
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .credential_files(cli.env_files.clone())
        .strict_enrichment(cli.strict);

    if !cli.models.is_empty() {
        builder = builder.models(cli.models.clone());
    }
    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key.clone());
    }
    if let Some(ref key) = cli.ocr_api_key {
        builder = builder.ocr_api_key(key.clone());
    }
    if let Some(ref url) = cli.ocr_endpoint {
        builder = builder.ocr_endpoint(url.clone());
    }
    if let Some(ref url) = cli.endpoint {
        builder = builder.enrichment_endpoint(url.clone());
    }
    if let Some(ref url) = cli.site_url {
        builder = builder.site_url(url.clone());
    }
    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    let config = builder.build().context("Invalid configuration")?;
    if cli.deep {
        config
            .resolve_credential()
            .context("Deep analysis needs an OpenRouter API key")?;
    }
    Ok(config)
}

/// Where the report for `result` goes: `output` itself for a single file,
/// otherwise a file inside the `output` directory.
fn report_path(output: &Path, file_count: usize, result: &AnalysisResult) -> PathBuf {
    if file_count == 1 {
        output.to_path_buf()
    } else {
        output.join(AnalysisReport::from_result(result).suggested_file_name())
    }
}

fn print_summary(result: &AnalysisResult) {
    let a = &result.analysis;
    println!("{} {}", cyan("◆"), bold(&format!("{} ({})", result.file_name, result.file_type)));
    println!(
        "  {} words · {} characters · readability {}/100",
        a.word_count, a.character_count, a.readability_score
    );
    println!("  {}", dim(&truncate(&result.extracted_text, 160)));
    println!("  {}", bold("Suggestions"));
    for tip in &a.suggestions {
        println!("    • {tip}");
    }

    if let Some(ref deep) = result.deep_analysis {
        println!("  {}", bold("Deep analysis"));
        if let Some(ref e) = result.enrichment_error {
            println!("    {} {}", yellow("⚠"), truncate(&e.to_string(), 120));
        }
        println!(
            "    quality {}/100 · engagement {}/100",
            deep.content_quality_score, deep.engagement_potential_score
        );
        println!("    voice: {}", deep.brand_voice);
        println!("    audience: {}", deep.target_audience);
        let p = &deep.platform_recommendations;
        println!("    twitter: {}", p.twitter);
        println!("    instagram: {}", p.instagram);
        println!("    linkedin: {}", p.linkedin);
        println!("    facebook: {}", p.facebook);
        if !deep.hashtag_strategy.is_empty() {
            println!("    hashtags: {}", deep.hashtag_strategy.join(" "));
        }
        if !deep.optimal_posting_times.is_empty() {
            println!("    post at: {}", deep.optimal_posting_times.join(", "));
        }
        for tip in &deep.improvement_suggestions {
            println!("    • {tip}");
        }
        println!("    competition: {}", deep.competitive_analysis);
        println!("    ROI: {}", deep.roi_potential);
        if let Some(ref raw) = deep.raw_analysis {
            println!("    raw: {}", truncate(raw, 400));
        }
    }
    println!();
}

/// Shorten to `max` characters on a char boundary.
fn truncate(s: &str, max: usize) -> String {
    let flat = s.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > max {
        let cut: String = flat.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}\u{2026}")
    } else {
        flat
    }
}
