use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use mocknet::automation::{self, Client, ConnectOutcome, Credentials};
use mocknet::config::Config;
use mocknet::state::SearchQuery;
use mocknet::storage::{self, Repositories};
use mocknet::{logging, server};

#[derive(Parser)]
#[command(name = "mocknet")]
#[command(
    about = "Educational automation PoC against the bundled local mock social network",
    long_about = None
)]
#[command(version)]
struct Cli {
    /// Path to a YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the local mock social network server
    Serve {
        #[arg(short, long)]
        port: Option<u16>,

        /// Route logins through the checkpoint interstitial
        #[arg(long)]
        checkpoint: bool,
    },

    /// Log in (or reuse the saved session) and persist the cookies
    Login,

    /// Search profiles
    Search {
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long, default_value = "")]
        company: String,
        #[arg(long, default_value = "")]
        location: String,
        #[arg(long, default_value = "")]
        keywords: String,
        #[arg(long, default_value_t = 10)]
        per: usize,
    },

    /// Send a connection request to a profile
    Connect {
        profile_id: String,
        #[arg(long, default_value = "")]
        note: String,
    },

    /// Simulate the counterparty accepting a pending request
    Accept { profile_id: String },

    /// Send a message to an accepted connection
    Message { profile_id: String, body: String },

    /// List conversation threads, or one conversation
    Inbox {
        #[arg(long)]
        profile: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let mut cfg = Config::load(cli.config.as_deref())?;
    logging::init(&cfg.logging);

    match cli.command {
        Commands::Serve { port, checkpoint } => {
            if let Some(p) = port {
                cfg.mocknet.port = p;
            }
            if checkpoint {
                cfg.mocknet.checkpoint = true;
            }
            server::run(&cfg).await
        }
        cmd => automate(cmd, &cfg).await,
    }
}

/// Wraps every automation command in a recorded run with a deadline.
async fn automate(cmd: Commands, cfg: &Config) -> anyhow::Result<()> {
    let pool = storage::open(&cfg.storage.sqlite_path).await?;
    let repos = Repositories::new(pool);
    let client = Client::new(&cfg.mocknet.base_url)?;
    let creds = Credentials {
        username: cfg.auth.username.clone(),
        password: cfg.auth.password.clone(),
    };

    let run_id = repos.runs.start().await?;
    tracing::info!(%run_id, "run started");

    let deadline = Duration::from_secs(cfg.run.timeout_secs);
    match tokio::time::timeout(deadline, run_command(&cmd, &client, &repos, &creds, &run_id)).await
    {
        Ok(Ok(counters)) => {
            repos.runs.finish(&run_id, "ok", &counters).await?;
            tracing::info!(%run_id, "run finished");
            Ok(())
        }
        Ok(Err(e)) => {
            repos
                .runs
                .finish(&run_id, "error", &serde_json::json!({ "error": e.to_string() }))
                .await?;
            Err(e)
        }
        Err(_) => {
            repos
                .runs
                .finish(&run_id, "timeout", &serde_json::json!({}))
                .await?;
            anyhow::bail!("run timed out after {}s", cfg.run.timeout_secs)
        }
    }
}

async fn run_command(
    cmd: &Commands,
    client: &Client,
    repos: &Repositories,
    creds: &Credentials,
    run_id: &str,
) -> anyhow::Result<serde_json::Value> {
    let authed = automation::ensure_authed(client, repos, creds).await?;

    match cmd {
        Commands::Serve { .. } => unreachable!("handled in main"),

        Commands::Login => {
            repos
                .runs
                .record_action(run_id, "login", &authed.username, &serde_json::json!({}))
                .await?;
            println!("Authenticated as: {}", authed.username);
            println!(
                "Session saved key: {}",
                automation::session_key(client.base_url(), &authed.username)
            );
            Ok(serde_json::json!({ "logins": 1 }))
        }

        Commands::Search {
            title,
            company,
            location,
            keywords,
            per,
        } => {
            let query = SearchQuery {
                title: title.clone(),
                company: company.clone(),
                location: location.clone(),
                keywords: keywords.clone(),
            };
            let results = automation::search(client, &authed.cookies, &query, *per).await?;
            repos
                .runs
                .record_action(
                    run_id,
                    "search",
                    "",
                    &serde_json::json!({ "results": results.len() }),
                )
                .await?;
            for r in &results {
                println!("{}\t{}\t{}", r.profile_id, r.name, r.meta);
            }
            println!("{} result(s)", results.len());
            Ok(serde_json::json!({ "results": results.len() }))
        }

        Commands::Connect { profile_id, note } => {
            let outcome =
                automation::send_connection_request(client, &authed.cookies, profile_id, note)
                    .await?;
            let outcome_str = match outcome {
                ConnectOutcome::Sent => "sent",
                ConnectOutcome::AlreadyRequested => "already_requested",
            };
            repos
                .runs
                .record_action(
                    run_id,
                    "connect",
                    profile_id,
                    &serde_json::json!({ "outcome": outcome_str }),
                )
                .await?;
            match outcome {
                ConnectOutcome::Sent => println!("Connection request sent to {profile_id}"),
                ConnectOutcome::AlreadyRequested => {
                    println!("Connection already requested for {profile_id}")
                }
            }
            Ok(serde_json::json!({ "requests": 1 }))
        }

        Commands::Accept { profile_id } => {
            automation::accept_connection(client, &authed.cookies, profile_id).await?;
            repos
                .runs
                .record_action(run_id, "accept", profile_id, &serde_json::json!({}))
                .await?;
            println!("Accepted connection for {profile_id}");
            Ok(serde_json::json!({ "accepted": 1 }))
        }

        Commands::Message { profile_id, body } => {
            automation::send_message(client, &authed.cookies, profile_id, body).await?;
            repos
                .runs
                .record_action(run_id, "message", profile_id, &serde_json::json!({}))
                .await?;
            println!("Message sent to {profile_id}");
            Ok(serde_json::json!({ "messages": 1 }))
        }

        Commands::Inbox { profile } => match profile {
            Some(profile_id) => {
                let msgs = automation::conversation(client, &authed.cookies, profile_id).await?;
                for m in &msgs {
                    println!("[{}] {}: {}", m.sent_at, m.from, m.body);
                }
                println!("{} message(s)", msgs.len());
                Ok(serde_json::json!({ "messages_read": msgs.len() }))
            }
            None => {
                let names = automation::inbox(client, &authed.cookies).await?;
                for n in &names {
                    println!("{n}");
                }
                println!("{} thread(s)", names.len());
                Ok(serde_json::json!({ "threads": names.len() }))
            }
        },
    }
}
