use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{ArgGroup, Parser};
use config::{Config, File};
use serde::Deserialize;
use shared_types::RawMessage;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use extractors::{HeuristicExtractor, PlatformClassifier};
use staysync_agents::llm::gemini::{DEFAULT_GEMINI_ENDPOINT, DEFAULT_GEMINI_MODEL};
use staysync_agents::{GeminiClient, LlmClient, ReservationExtractorAgent};

#[derive(Parser, Debug)]
#[command(
    name = "reservation-extractor",
    about = "Run heuristic and AI reservation extraction on one email"
)]
#[command(group(
    ArgGroup::new("input")
        .required(true)
        .args(["eml_path", "email_body"]),
))]
struct Cli {
    /// Path to a .eml file
    #[arg(long, value_name = "PATH", group = "input")]
    eml_path: Option<PathBuf>,

    /// Raw email body text
    #[arg(long, group = "input")]
    email_body: Option<String>,

    /// Subject (used with --email-body)
    #[arg(long)]
    subject: Option<String>,

    /// Sender address (used with --email-body)
    #[arg(long)]
    from: Option<String>,

    /// Call the AI extractor even when heuristics are sufficient
    #[arg(long)]
    force_ai: bool,

    /// Override the Gemini model ID
    #[arg(long)]
    model: Option<String>,

    /// Reference date for year resolution (defaults to today)
    #[arg(long, value_name = "YYYY-MM-DD")]
    reference: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Clone, Default)]
struct ApiConfig {
    api_keys: Option<ApiKeysConfig>,
    llm: Option<LlmConfig>,
}

#[derive(Debug, Deserialize, Clone)]
struct ApiKeysConfig {
    gemini_api_key: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
struct LlmConfig {
    model: Option<String>,
    endpoint: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let reference = cli.reference.unwrap_or_else(|| Local::now().date_naive());

    let message = match (&cli.eml_path, &cli.email_body) {
        (Some(path), None) => load_email_from_eml(path)?,
        (None, Some(body)) => RawMessage {
            id: "cli".to_string(),
            thread_id: None,
            from: cli.from.clone().unwrap_or_default(),
            subject: cli.subject.clone().unwrap_or_default(),
            body: body.clone(),
            date: None,
        },
        _ => unreachable!("clap enforces exactly one input"),
    };

    let (channel, platform) = PlatformClassifier::new().classify(&message);
    let extraction = HeuristicExtractor::new().extract(&message, channel, platform, reference);
    tracing::info!(
        channel = channel.label(),
        platform = platform.storage_label(),
        sufficient = extraction.is_sufficient(),
        "Heuristic extraction finished"
    );

    let ai = if cli.force_ai || !extraction.is_sufficient() {
        let (config, config_path) = load_api_config().context("Failed to load staysync config")?;
        let api_key = config
            .api_keys
            .as_ref()
            .and_then(|keys| keys.gemini_api_key.as_ref())
            .cloned()
            .ok_or_else(|| {
                anyhow::anyhow!("Missing gemini_api_key in config at {:?}", config_path)
            })?;

        let llm = config.llm.clone();
        let model = cli
            .model
            .clone()
            .or_else(|| llm.as_ref().and_then(|l| l.model.clone()))
            .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());
        let endpoint = llm
            .and_then(|l| l.endpoint)
            .unwrap_or_else(|| DEFAULT_GEMINI_ENDPOINT.to_string());

        let llm_client: Arc<dyn LlmClient> = Arc::new(
            GeminiClient::new(api_key)?
                .with_model(model)
                .with_endpoint(endpoint),
        );
        ReservationExtractorAgent::new(llm_client)
            .extract(platform, &message.subject, &extraction.cleaned_text, reference)
            .await
    } else {
        None
    };

    let output = serde_json::json!({
        "channel": channel,
        "platform": platform,
        "heuristic_sufficient": extraction.is_sufficient(),
        "missing_field": extraction.missing_field(),
        "subject": {
            "guest_name": extraction.subject.guest_name,
            "reservation_number": extraction.subject.reservation_number,
            "nights": extraction.subject.nights,
        },
        "body": {
            "guest_name": extraction.candidate.guest_name_str(),
            "reservation_number": extraction.candidate.reservation_number,
            "property": extraction.candidate.property_raw,
        },
        "ai": ai,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_api_config() -> Result<(ApiConfig, PathBuf)> {
    let config_path = get_config_path();
    if !config_path.exists() {
        return Err(anyhow::anyhow!(
            "Config file not found at {:?}. Run staysync once or create it.",
            config_path
        ));
    }

    let builder = Config::builder()
        .add_source(File::from(config_path.clone()))
        .build()?;

    let config: ApiConfig = builder.try_deserialize()?;
    Ok((config, config_path))
}

fn get_config_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        config_dir.join("staysync").join("api.toml")
    } else {
        PathBuf::from("api.toml")
    }
}

fn load_email_from_eml(path: &Path) -> Result<RawMessage> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read .eml file at {:?}", path))?;
    let parser = mail_parser::MessageParser::default();
    let parsed = parser
        .parse(&bytes)
        .ok_or_else(|| anyhow::anyhow!("Failed to parse .eml file"))?;

    let subject = parsed.subject().map(|s| s.to_string()).unwrap_or_default();
    let from = parsed
        .from()
        .and_then(|addrs| addrs.first())
        .and_then(|addr| addr.address())
        .map(|s| s.to_string())
        .unwrap_or_default();
    let body = parsed
        .body_text(0)
        .map(|s| s.to_string())
        .or_else(|| parsed.body_html(0).map(|s| s.to_string()))
        .ok_or_else(|| anyhow::anyhow!("Email has no body text or HTML"))?;
    let id = parsed
        .message_id()
        .map(|s| s.to_string())
        .unwrap_or_else(|| path.display().to_string());

    Ok(RawMessage {
        thread_id: None,
        id,
        from,
        subject,
        body,
        date: parsed.date().map(|d| d.to_rfc3339()),
    })
}
