use clap::{Parser, Subcommand};
use std::path::PathBuf;

const DEFAULT_CHAT_URL: &str = "http://127.0.0.1:10000/chat";

#[derive(Parser)]
#[command(name = "snare")]
#[command(about = "Snare CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Write a default configuration file if none exists.
    Init {
        /// Config file path (default: SNARE_CONFIG_PATH or ~/.snare/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Run the honeypot gateway (POST /chat). Needs API_SECRET_KEY unless bound to loopback.
    Serve {
        /// Config file path (default: SNARE_CONFIG_PATH or ~/.snare/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// HTTP port (default from config or 10000)
        #[arg(long, short)]
        port: Option<u16>,

        /// Bind address (default from config or 0.0.0.0)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Extract intelligence from a piece of text and print it as JSON.
    Scan {
        /// Text to scan
        text: String,
    },

    /// Send one scammer message to a running gateway and print the reply.
    Send {
        /// Chat endpoint URL
        #[arg(long, default_value = DEFAULT_CHAT_URL)]
        url: String,

        /// Value for the x-api-key header (default: API_SECRET_KEY env)
        #[arg(long)]
        key: Option<String>,

        /// Session id to report under
        #[arg(long, default_value = "test-123")]
        session: String,

        /// Scammer message text
        text: String,
    },

    /// List text-generation models available to the configured backend.
    Models {
        /// Config file path (default: SNARE_CONFIG_PATH or ~/.snare/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let env_file = snare::config::load_env_file(None);
    let cli = Cli::parse();

    let default_filter = match cli.command {
        Some(Commands::Serve { .. }) => "info",
        _ => "warn",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();
    match env_file {
        Ok(Some(path)) => log::debug!("loaded environment from {}", path.display()),
        Ok(None) => log::debug!("no .env file found"),
        Err(e) => log::warn!("{:#}", e),
    }

    let result = match cli.command {
        Some(Commands::Version) => {
            println!("snare {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(Commands::Init { config }) => run_init(config),
        Some(Commands::Serve { config, port, bind }) => run_serve(config, port, bind).await,
        Some(Commands::Scan { text }) => run_scan(&text),
        Some(Commands::Send {
            url,
            key,
            session,
            text,
        }) => run_send(&url, key, &session, &text).await,
        Some(Commands::Models { config }) => run_models(config).await,
        None => {
            println!("Run with --help for usage");
            Ok(())
        }
    };

    if let Err(e) = result {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run_init(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(snare::config::default_config_path);
    if snare::config::write_default_config(&path)? {
        println!("wrote default configuration to {}", path.display());
    } else {
        println!("configuration already exists at {}", path.display());
    }
    Ok(())
}

async fn run_serve(
    config_path: Option<PathBuf>,
    port: Option<u16>,
    bind: Option<String>,
) -> anyhow::Result<()> {
    let (mut config, path) = snare::config::load_config(config_path)?;
    if let Some(p) = port {
        config.server.port = p;
    }
    if let Some(b) = bind {
        config.server.bind = b;
    }
    log::info!("starting gateway on {}:{}", config.server.bind, config.server.port);
    snare::gateway::run_gateway(config, path).await
}

fn run_scan(text: &str) -> anyhow::Result<()> {
    let found = snare::intel::extract(text);
    println!("{}", serde_json::to_string_pretty(&found)?);
    Ok(())
}

async fn run_send(url: &str, key: Option<String>, session: &str, text: &str) -> anyhow::Result<()> {
    let key = key.or_else(|| std::env::var("API_SECRET_KEY").ok());
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0);
    let body = snare::gateway::ChatRequest {
        session_id: session.to_string(),
        message: snare::gateway::Message {
            sender: "scammer".to_string(),
            text: text.to_string(),
            timestamp,
        },
        conversation_history: Vec::new(),
        metadata: None,
    };

    let client = reqwest::Client::new();
    let mut req = client.post(url).json(&body);
    if let Some(ref k) = key {
        req = req.header(snare::auth::API_KEY_HEADER, k);
    }
    let res = req.send().await?;
    let status = res.status();
    if !status.is_success() {
        let text = res.text().await.unwrap_or_default();
        anyhow::bail!("{} {}", status, text);
    }
    let reply: snare::gateway::ChatReply = res.json().await?;
    println!("< {}", reply.reply.trim());
    Ok(())
}

async fn run_models(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let (config, _) = snare::config::load_config(config_path)?;
    let generator = snare::llm::build_generator(&config)?;
    let models = generator.list_models().await?;
    if models.is_empty() {
        println!("no models available on {}", generator.backend());
    }
    for m in models {
        println!("{}", m.name);
    }
    Ok(())
}
