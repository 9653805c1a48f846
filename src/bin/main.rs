use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "moviweb-server")]
#[command(about = "Personal movie list web application", long_about = None)]
struct Args {
    /// Path to the YAML config file (default: moviweb-server.yaml if present)
    #[arg(short, long)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Log as JSON lines instead of human-readable text
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let default_filter = if args.debug {
        "moviweb_rs=debug,tower_http=debug"
    } else {
        "moviweb_rs=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(args.json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!args.json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    if let Err(e) = moviweb_rs::run(args.config.as_deref(), args.debug).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
