use clap::{Parser, Subcommand, ValueEnum};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "health-cli")]
#[command(about = "Management CLI for the tunnel health daemon", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, default_value = "CHANGE_ME")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check daemon status
    Status,
    /// Show overall health and per-metric debounce state
    Health,
    /// List tracers created within a window
    Tracers {
        #[arg(short, long)]
        window_secs: Option<u64>,
    },
    /// Show a single tracer
    Tracer { id: String },
    /// Inject tracer packets through the pipeline
    Inject {
        #[arg(short, long, default_value_t = 1)]
        times: usize,
    },
    /// Drop every tracer from the registry
    ClearTracers,
    /// Pretend the throughput metric is good or bad
    Simulate {
        #[arg(value_enum)]
        state: SimulatedState,
    },
    /// Toggle the bad-health notification
    Notifications {
        #[arg(value_enum)]
        toggle: Toggle,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SimulatedState {
    Good,
    Bad,
    /// Back to live sampling
    Off,
}

#[derive(Clone, Copy, ValueEnum)]
enum Toggle {
    On,
    Off,
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

    let base = cli.url.trim_end_matches('/');
    let request = match cli.command {
        Commands::Status => client.get(format!("{}/admin/status", base)),
        Commands::Health => client.get(format!("{}/admin/health", base)),
        Commands::Tracers { window_secs } => {
            let mut req = client.get(format!("{}/admin/tracers", base));
            if let Some(window_secs) = window_secs {
                req = req.query(&[("window_secs", window_secs)]);
            }
            req
        }
        Commands::Tracer { id } => client.get(format!("{}/admin/tracers/{}", base, id)),
        Commands::Inject { times } => client
            .post(format!("{}/admin/tracers/inject", base))
            .query(&[("times", times)]),
        Commands::ClearTracers => client.delete(format!("{}/admin/tracers", base)),
        Commands::Simulate { state } => {
            let state = match state {
                SimulatedState::Good => json!("good"),
                SimulatedState::Bad => json!("bad"),
                SimulatedState::Off => Value::Null,
            };
            client
                .post(format!("{}/admin/simulate", base))
                .json(&json!({ "state": state }))
        }
        Commands::Notifications { toggle } => client
            .post(format!("{}/admin/notifications", base))
            .json(&json!({ "enabled": matches!(toggle, Toggle::On) })),
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await?;
    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            if !text.is_empty() {
                eprintln!("Response: {}", text);
            }
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
