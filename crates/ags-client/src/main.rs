use ags_client::identity::DEFAULT_WORKER_PREFIX;
use ags_client::{
    ClientConfig, ConnectionState, ConsoleView, EscrowClient, HttpTransport, RelayClient, WorkerId,
};
use ags_proto::EscrowBlob;
use anyhow::{anyhow, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tokio::{signal, time};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "AGS relay and time-based escrow client", long_about = None)]
struct Cli {
    /// Base URL both endpoints hang off (overrides AGS_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,
    #[arg(long, global = true)]
    relay_path: Option<String>,
    #[arg(long, global = true)]
    escrow_path: Option<String>,
    /// Timeout for one-shot requests; the relay poll never times out
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Long-poll message relay
    Relay {
        #[command(subcommand)]
        command: RelayCommand,
    },
    /// Time-based escrow
    Escrow {
        #[command(subcommand)]
        command: EscrowCommand,
    },
}

#[derive(Subcommand, Debug)]
enum RelayCommand {
    /// Connect and print incoming messages until Ctrl-C
    Listen {
        #[command(flatten)]
        worker: WorkerArgs,
    },
    /// Send one message
    Send {
        #[command(flatten)]
        worker: WorkerArgs,
        /// Comma-separated recipients
        #[arg(long, default_value = "")]
        to: String,
        #[arg(long)]
        message: String,
    },
    /// Show waiter and queued message counts
    Stats,
}

#[derive(Subcommand, Debug)]
enum EscrowCommand {
    /// Fetch a signed timestamp and verify it
    Timestamp,
    /// Seal data until a point in time; prints the blob
    Deposit {
        #[command(flatten)]
        when: When,
        #[arg(long)]
        data: String,
    },
    /// Fetch the key for a time and decrypt a blob with it
    Unlock {
        /// Blob JSON as printed by `deposit`
        #[arg(long)]
        blob: String,
        #[command(flatten)]
        when: When,
    },
}

#[derive(Args, Debug)]
struct WorkerArgs {
    /// Worker id; generated as <prefix>-<n> when omitted
    #[arg(long)]
    worker: Option<String>,
    #[arg(long, default_value = DEFAULT_WORKER_PREFIX)]
    prefix: String,
}

impl WorkerArgs {
    fn resolve(&self) -> Result<WorkerId> {
        match &self.worker {
            Some(id) => Ok(WorkerId::new(id.clone())?),
            None => Ok(WorkerId::generate(&self.prefix)),
        }
    }
}

#[derive(Args, Debug)]
struct When {
    /// Absolute time in epoch milliseconds
    #[arg(long, conflicts_with = "in_secs")]
    time: Option<i64>,
    /// Seconds from now
    #[arg(long)]
    in_secs: Option<i64>,
}

impl When {
    fn resolve(&self) -> Result<Option<i64>> {
        if self.time.is_some() {
            return Ok(self.time);
        }
        let Some(secs) = self.in_secs else {
            return Ok(None);
        };
        secs.checked_mul(1000)
            .and_then(|ms| Utc::now().timestamp_millis().checked_add(ms))
            .map(Some)
            .ok_or_else(|| anyhow!("--in-secs {secs} is out of range"))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let transport = Arc::new(HttpTransport::new(&config)?);
    match cli.command {
        Commands::Relay { command } => relay_command(transport, command).await,
        Commands::Escrow { command } => escrow_command(transport, command).await,
    }
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = match &cli.base_url {
        Some(url) => ClientConfig {
            base_url: ClientConfig::new(url)?.base_url,
            ..ClientConfig::from_env()?
        },
        None => ClientConfig::from_env()?,
    };
    if let Some(path) = &cli.relay_path {
        config.relay_path = path.clone();
    }
    if let Some(path) = &cli.escrow_path {
        config.escrow_path = path.clone();
    }
    if let Some(secs) = cli.timeout_secs {
        config.request_timeout = Some(Duration::from_secs(secs));
    }
    info!(base_url = %config.base_url, "using endpoints");
    Ok(config)
}

async fn relay_command(transport: Arc<HttpTransport>, command: RelayCommand) -> Result<()> {
    match command {
        RelayCommand::Listen { worker } => {
            let worker = worker.resolve()?;
            println!("worker {worker}");
            let client = RelayClient::new(transport, Arc::new(ConsoleView), worker);
            client.connect()?;

            let ctrl_c = signal::ctrl_c();
            tokio::pin!(ctrl_c);
            let mut ticker = time::interval(Duration::from_millis(250));
            loop {
                tokio::select! {
                    res = &mut ctrl_c => {
                        res?;
                        break;
                    }
                    _ = ticker.tick() => {
                        if client.state() == ConnectionState::Idle {
                            return Err(anyhow!("relay connection lost"));
                        }
                    }
                }
            }
            client.disconnect().await;
            Ok(())
        }
        RelayCommand::Send {
            worker,
            to,
            message,
        } => {
            let worker = worker.resolve()?;
            let client = RelayClient::new(transport, Arc::new(ConsoleView), worker);
            client.send(&to, &message).await?;
            Ok(())
        }
        RelayCommand::Stats => {
            let client = RelayClient::new(
                transport,
                Arc::new(ConsoleView),
                WorkerId::generate(DEFAULT_WORKER_PREFIX),
            );
            let stats = client.stats().await?;
            println!("waiters: {} messages: {}", stats.waiters, stats.messages);
            Ok(())
        }
    }
}

async fn escrow_command(transport: Arc<HttpTransport>, command: EscrowCommand) -> Result<()> {
    let client = EscrowClient::new(transport, Arc::new(ConsoleView));
    match command {
        EscrowCommand::Timestamp => {
            let check = client.check_timestamp().await?;
            if !check.verification.is_verified() {
                return Err(anyhow!("timestamp {}", check.verification));
            }
            Ok(())
        }
        EscrowCommand::Deposit { when, data } => {
            let time = when
                .resolve()?
                .ok_or_else(|| anyhow!("--time or --in-secs is required"))?;
            let deposit = client.request_escrow(time, &data).await?;
            println!("{}", serde_json::to_string(&deposit.blob)?);
            Ok(())
        }
        EscrowCommand::Unlock { blob, when } => {
            let blob = EscrowBlob::parse(&blob)?;
            let time = when
                .resolve()?
                .or_else(|| blob.time())
                .ok_or_else(|| anyhow!("--time or --in-secs is required"))?;
            client.unlock(time, &blob).await?;
            Ok(())
        }
    }
}
