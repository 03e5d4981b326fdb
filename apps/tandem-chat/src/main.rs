//! # Tandem Chat
//!
//! A two-user chat room. One process runs the board server; each user runs a
//! client that reads the board freely and appends to it only while holding
//! the distributed lock negotiated with the other client.
//!
//! ```text
//!  client 1 ──REQUEST/REPLY/RELEASE──▶ client 2
//!     │        ◀──────────────────────     │
//!     └──── VIEW / POST ──▶ board ◀────────┘
//! ```
//!
//! Start the server, then both clients in any order:
//!
//! ```text
//! tandem-chat server --bind 0.0.0.0:7000 --file chat.txt
//! tandem-chat client --user alice --self-id 1 --peer-id 2 --listen 0.0.0.0:8001 --peer 127.0.0.1:8002
//! tandem-chat client --user bob   --self-id 2 --peer-id 1 --listen 0.0.0.0:8002 --peer 127.0.0.1:8001
//! ```

mod repl;

use std::error::Error;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use colored::*;
use tandem_board::{Board, BoardServer, TcpBoard};
use tandem_dme::telemetry::init_tracing;
use tandem_dme::{DmeError, Engine, EngineConfigBuilder};
use tandem_net::{ChannelSink, RetryPolicy};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use repl::{format_entry, Command};

type BoxError = Box<dyn Error + Send + Sync>;

// ─── CLI ───────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "tandem-chat")]
#[command(about = "Two-user chat room coordinated by Ricart-Agrawala mutual exclusion")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the shared chat file
    Server {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:7000")]
        bind: String,
        /// Chat file, created if missing
        #[arg(long, default_value = "chat.txt")]
        file: String,
    },
    /// Join the chat as one of the two peers
    Client(ClientArgs),
}

#[derive(Args)]
struct ClientArgs {
    /// Name shown next to posted messages
    #[arg(long, default_value = "User")]
    user: String,
    /// This node's id
    #[arg(long, default_value_t = 1)]
    self_id: u32,
    /// The other node's id
    #[arg(long, default_value_t = 2)]
    peer_id: u32,
    /// Where the other client listens
    #[arg(long, default_value = "127.0.0.1:8002")]
    peer: String,
    /// Where this client listens for the peer
    #[arg(long, default_value = "0.0.0.0:8001")]
    listen: String,
    /// Board server address
    #[arg(long, default_value = "127.0.0.1:7000")]
    server: String,
    /// Give up on the lock after this many seconds without a REPLY
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,
}

// ─── Pretty printing ──────────────────────────────────────────────────────

fn header(text: &str) {
    let bar = "═".repeat(60);
    println!("\n{}", bar.bright_cyan());
    println!("  {}", text.bold().bright_white());
    println!("{}", bar.bright_cyan());
}

fn step(text: &str) {
    println!("  {} {}", "•".bright_green(), text);
}

fn problem(text: &str) {
    println!("  {} {}", "!".bright_red(), text);
}

fn print_commands() {
    println!();
    println!("  {}", "Commands:".bold().underline());
    println!(
        "    {}                 Show the whole board",
        "view".bright_cyan()
    );
    println!(
        "    {} <count>         Show the last entries",
        "view -n".bright_cyan()
    );
    println!(
        "    {} <text>             Append a message (takes the lock)",
        "post".bright_cyan()
    );
    println!(
        "    {}               Show lock state as JSON",
        "status".bright_cyan()
    );
    println!("    {}                 Exit", "quit".bright_cyan());
    println!();
}

// ─── Server ───────────────────────────────────────────────────────────────

async fn run_server(bind: &str, file: &str) -> Result<(), BoxError> {
    let server = BoardServer::bind(bind, file).await?;
    header(&format!("BOARD SERVER on {}", server.local_addr()?));
    step(&format!("Chat file: {}", server.path().display()));

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => info!("shutting down"),
    }
    Ok(())
}

// ─── Client ───────────────────────────────────────────────────────────────

type ChatEngine = Engine<ChannelSink>;

async fn run_client(args: ClientArgs) -> Result<(), BoxError> {
    let config = EngineConfigBuilder::new()
        .self_id(args.self_id)
        .peer_id(args.peer_id)
        .acquire_timeout(Duration::from_secs(args.timeout_secs))
        .build();
    // Fail before waiting on the peer.
    config.validate()?;

    // Listen before dialing so the peer can reach us while we wait for it.
    let listener = tandem_net::bind(&args.listen).await?;
    step(&format!("Listening for peer on {}", args.listen));

    println!(
        "  {} Connecting to peer at {} (retrying every 2s)...",
        "…".bright_yellow(),
        args.peer
    );
    let stream = tandem_net::connect_with_retry(&args.peer, &RetryPolicy::default()).await?;
    step(&format!("Connected to peer {}", args.peer));

    // Redials the peer if the link drops, e.g. when the other client restarts.
    let (sink, writer) =
        tandem_net::spawn_reconnecting_writer(stream, args.peer.clone(), RetryPolicy::default());
    let engine = Arc::new(Engine::new(config, sink)?);
    let inbound = tokio::spawn(tandem_net::serve(listener, engine.clone()));

    let board = TcpBoard::new(args.server.clone());
    header(&format!(
        "TANDEM CHAT · {} (self={}, peer={})",
        args.user, args.self_id, args.peer_id
    ));
    print_commands();
    let result = user_loop(&args.user, &engine, &board).await;

    inbound.abort();
    writer.abort();
    result
}

async fn user_loop(user: &str, engine: &ChatEngine, board: &TcpBoard) -> Result<(), BoxError> {
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{}", "tandem> ".bright_cyan().bold());
        std::io::stdout().flush()?;

        let Some(line) = input.next_line().await? else {
            break;
        };

        match Command::parse(&line) {
            Ok(None) => continue,
            Ok(Some(Command::Quit)) => break,
            Ok(Some(Command::Help)) => print_commands(),
            Ok(Some(Command::View { last })) => view(board, last).await,
            Ok(Some(Command::Post(text))) => post(user, &text, engine, board).await,
            Ok(Some(Command::Status)) => {
                println!("{}", serde_json::to_string_pretty(&engine.snapshot())?)
            }
            Err(usage) => problem(usage),
        }
    }

    step("Bye");
    Ok(())
}

async fn view(board: &TcpBoard, last: Option<usize>) {
    match board.view(last).await {
        Ok(content) if content.is_empty() => println!("{}", "(board is empty)".dimmed()),
        Ok(content) => print!("{}", content),
        Err(e) if e.is_unreachable() => problem("Server unreachable"),
        Err(e) => problem(&format!("Server error: {}", e)),
    }
}

async fn post(user: &str, text: &str, engine: &ChatEngine, board: &TcpBoard) {
    let section = match engine.enter().await {
        Ok(section) => section,
        Err(DmeError::AcquireTimeout { .. }) => {
            problem("Could not acquire lock (peer unresponsive)");
            return;
        }
        Err(e) => {
            problem(&e.to_string());
            return;
        }
    };

    let entry = format_entry(&chrono::Local::now(), user, text);
    let result = board.post(&entry).await;
    section.exit();

    match result {
        Ok(()) => step("(posted)"),
        Err(e) if e.is_unreachable() => problem("Server unreachable"),
        Err(e) => problem(&format!("POST failed: {}", e)),
    }
}

// ─── Main ─────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Server { bind, file } => run_server(&bind, &file).await,
        Commands::Client(args) => run_client(args).await,
    }
}
