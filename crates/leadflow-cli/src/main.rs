//! Leadflow command line entry point
//!
//! Thin shell over `leadflow-core`: every subcommand reads JSON or HTML from a
//! file (or `-` for stdin) and writes its result to stdout or a file.

use anyhow::{bail, Context};
use clap::{Arg, ArgAction, ArgMatches, Command};
use leadflow_core::{
    services::engagement::{aggregate_window, daily_trend, window_start},
    ApolloClient, EmailTracker, EngagementRates, InvoiceRenderer, LeadSearchFilters,
    LeadSearchProvider, LeadflowConfig, NotificationComposer,
};
use leadflow_types::{InvoiceData, SentEmail, TrackingEvent, WorkflowExecutionSummary};
use serde::de::DeserializeOwned;
use std::io::Read;
use std::path::Path;

fn cli() -> Command {
    Command::new("leadflow")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Lead search, outreach tracking and billing tools")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("FILE")
                .help("JSON configuration file; LEADFLOW__SECTION__KEY variables override it")
                .global(true),
        )
        .subcommand(
            Command::new("search")
                .about("Search Apollo for organizations and print them as leads")
                .arg(Arg::new("query").required(true).help("Natural-language search, e.g. \"companies that need automation\""))
                .arg(
                    Arg::new("size")
                        .long("size")
                        .value_name("BUCKET")
                        .action(ArgAction::Append)
                        .help("Company-size bucket such as 51-200 (repeatable)"),
                )
                .arg(
                    Arg::new("location")
                        .long("location")
                        .value_name("LOCATION")
                        .action(ArgAction::Append)
                        .help("Location filter (repeatable)"),
                )
                .arg(
                    Arg::new("page")
                        .long("page")
                        .value_parser(clap::value_parser!(u32)),
                )
                .arg(
                    Arg::new("per-page")
                        .long("per-page")
                        .value_parser(clap::value_parser!(u32)),
                ),
        )
        .subcommand(
            Command::new("instrument")
                .about("Rewrite links and embed the open pixel in an email body")
                .arg(Arg::new("html").required(true).value_name("FILE").help("HTML body, or - for stdin"))
                .arg(
                    Arg::new("email-id")
                        .long("email-id")
                        .required(true)
                        .value_parser(clap::value_parser!(i64)),
                )
                .arg(
                    Arg::new("lead-id")
                        .long("lead-id")
                        .value_parser(clap::value_parser!(i64)),
                ),
        )
        .subcommand(
            Command::new("invoice")
                .about("Render an invoice JSON document to PDF")
                .arg(Arg::new("input").required(true).value_name("FILE").help("Invoice JSON, or - for stdin"))
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .required(true)
                        .value_name("FILE"),
                ),
        )
        .subcommand(
            Command::new("notify")
                .about("Compose the notification email for a workflow execution summary")
                .arg(Arg::new("input").required(true).value_name("FILE").help("Summary JSON, or - for stdin")),
        )
        .subcommand(
            Command::new("engagement")
                .about("Aggregate tracking events into engagement rates")
                .arg(Arg::new("sent").long("sent").required(true).value_name("FILE").help("JSON array of sent emails"))
                .arg(Arg::new("events").long("events").required(true).value_name("FILE").help("JSON array of tracking events"))
                .arg(
                    Arg::new("days")
                        .long("days")
                        .default_value("30")
                        .help("Window length in days (1-3650)")
                        .value_parser(clap::value_parser!(u32).range(1..=3650)),
                )
                .arg(
                    Arg::new("trend")
                        .long("trend")
                        .help("Also print one bucket per day")
                        .action(ArgAction::SetTrue),
                ),
        )
}

fn read_input(path: &str) -> anyhow::Result<String> {
    if path == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).context("Failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))
}

fn read_json<T: DeserializeOwned>(path: &str) -> anyhow::Result<T> {
    let content = read_input(path)?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_search(config: &LeadflowConfig, matches: &ArgMatches) -> anyhow::Result<()> {
    let strings = |id: &str| -> Vec<String> {
        matches
            .get_many::<String>(id)
            .map(|values| values.cloned().collect())
            .unwrap_or_default()
    };

    let filters = LeadSearchFilters {
        query: matches.get_one::<String>("query").cloned().unwrap_or_default(),
        company_sizes: strings("size"),
        locations: strings("location"),
        page: matches.get_one::<u32>("page").copied(),
        per_page: matches.get_one::<u32>("per-page").copied(),
    };

    let client = ApolloClient::new(config.apollo.clone())?;
    let page = client.search(&filters).await?;
    log::info!("Found {} of {} leads", page.leads.len(), page.total_entries);
    print_json(&page)
}

fn run_instrument(config: &LeadflowConfig, matches: &ArgMatches) -> anyhow::Result<()> {
    let html = read_input(matches.get_one::<String>("html").map(String::as_str).unwrap_or("-"))?;
    let email_id = matches.get_one::<i64>("email-id").copied().context("--email-id is required")?;
    let lead_id = matches.get_one::<i64>("lead-id").copied();

    let tracker = EmailTracker::new(config.tracking.clone());
    let instrumented = tracker.instrument(&html, email_id, lead_id);
    for link in &instrumented.links {
        log::info!("Tracking link: {}", link);
    }
    print!("{}", instrumented.html);
    Ok(())
}

async fn run_invoice(config: &LeadflowConfig, matches: &ArgMatches) -> anyhow::Result<()> {
    let input = matches.get_one::<String>("input").map(String::as_str).unwrap_or("-");
    let output = matches.get_one::<String>("output").context("--output is required")?;
    let invoice: InvoiceData = read_json(input)?;

    let renderer = InvoiceRenderer::new(config.invoice.clone());
    let pdf = renderer.render_async(invoice).await?;
    if !renderer.validate_pdf(&pdf) {
        bail!("Rendered document is not a valid PDF");
    }

    std::fs::write(output, &pdf).with_context(|| format!("Failed to write {}", output))?;
    log::info!("Wrote {} bytes to {}", pdf.len(), output);
    Ok(())
}

fn run_notify(config: &LeadflowConfig, matches: &ArgMatches) -> anyhow::Result<()> {
    let input = matches.get_one::<String>("input").map(String::as_str).unwrap_or("-");
    let summary: WorkflowExecutionSummary = read_json(input)?;

    let composed = NotificationComposer::new(config.notification.clone()).compose(&summary);
    print_json(&composed)
}

fn run_engagement(matches: &ArgMatches) -> anyhow::Result<()> {
    let sent: Vec<SentEmail> = read_json(matches.get_one::<String>("sent").map(String::as_str).unwrap_or("-"))?;
    let events: Vec<TrackingEvent> =
        read_json(matches.get_one::<String>("events").map(String::as_str).unwrap_or("-"))?;
    let days = matches.get_one::<u32>("days").copied().unwrap_or(30);

    let now = chrono::Utc::now();
    let start = window_start(now, days);
    let window = aggregate_window(&sent, &events, start, now);
    let rates = EngagementRates::from(&window);

    let mut report = serde_json::json!({ "window": window, "rates": rates });
    if matches.get_flag("trend") {
        report["trend"] = serde_json::to_value(daily_trend(&sent, &events, start, now))?;
    }
    print_json(&report)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with INFO as default if RUST_LOG not set
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = cli().get_matches();

    let config_path = matches.get_one::<String>("config").map(Path::new);
    let config = LeadflowConfig::load_layered(config_path)?;
    match config_path {
        Some(path) => log::info!("Loaded configuration from {}", path.display()),
        None => log::info!("Loaded configuration from environment"),
    }

    match matches.subcommand() {
        Some(("search", sub)) => run_search(&config, sub).await,
        Some(("instrument", sub)) => run_instrument(&config, sub),
        Some(("invoice", sub)) => run_invoice(&config, sub).await,
        Some(("notify", sub)) => run_notify(&config, sub),
        Some(("engagement", sub)) => run_engagement(sub),
        Some((other, _)) => bail!("Unknown command: {}", other),
        None => bail!("No command given"),
    }
}
