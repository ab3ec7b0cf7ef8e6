use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "secvest-cli")]
#[command(about = "Command-line client for the Secvest bridge API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:8080")]
    url: String,

    #[arg(short, long, env = "SECVEST_API_KEY")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bridge and circuit breaker status
    Status,
    /// Latest panel snapshot
    Snapshot,
    /// Known zones
    Zones,
    /// Rendered entity states
    Entities,
    /// Re-read zones from the panel
    RefreshZones,
    /// Arm in home (part set) mode
    ArmHome,
    /// Arm in away (set) mode
    ArmAway,
    /// Disarm the panel
    Disarm,
    /// Send a raw mode: set, partset or unset
    Mode { mode: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let (method, path, body) = match cli.command {
        Commands::Status => (Method::GET, "/api/status", None),
        Commands::Snapshot => (Method::GET, "/api/snapshot", None),
        Commands::Zones => (Method::GET, "/api/zones", None),
        Commands::Entities => (Method::GET, "/api/entities", None),
        Commands::RefreshZones => (Method::POST, "/api/zones/refresh", None),
        Commands::ArmHome => (Method::POST, "/api/alarm/arm_home", None),
        Commands::ArmAway => (Method::POST, "/api/alarm/arm_away", None),
        Commands::Disarm => (Method::POST, "/api/alarm/disarm", None),
        Commands::Mode { mode } => (Method::POST, "/api/mode", Some(json!({ "mode": mode }))),
    };

    let url = format!("{}{}", cli.url.trim_end_matches('/'), path);
    let mut request = client.request(method, url).headers(headers);
    if let Some(body) = body {
        request = request.json(&body);
    }

    let res = request.send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await.unwrap_or_default();
    let pretty = match serde_json::from_str::<Value>(&text) {
        Ok(json) => serde_json::to_string_pretty(&json)?,
        Err(_) => text,
    };

    if !status.is_success() {
        if !pretty.is_empty() {
            eprintln!("{}", pretty);
        }
        return Err(format!("bridge API returned status {}", status).into());
    }

    if !pretty.is_empty() {
        println!("{}", pretty);
    }
    Ok(())
}
