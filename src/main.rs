//! mcdash - terminal dashboard for a running game server
//!
//! Polls the status endpoint, shows player details and drives the admin console.

mod config;
mod console;

use anyhow::{Context, Result};
use config::{DashboardConfig, DEFAULT_CONFIG_PATH};
use console::Input;
use mcdash_client::{
    DashboardClient, HubConfig, HubConnection, HubHandle, LoginError, StatusPoller, StatusReport,
};
use std::env;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::info;

const PASSWORD_ENV: &str = "MCDASH_PASSWORD";

const USAGE: &str = "usage: mcdash [--config PATH] [--server URL] [--no-color] <command>

commands:
  status           print the current player list
  watch            keep printing the player list as it changes
  player <id>      show one player's details and skin
  login            exchange the admin password for a session key
  console          open the admin console
  init             write the current settings to the config file";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Status,
    Watch,
    Player(u32),
    Login,
    Console,
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with WARN level by default (can be overridden via RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting mcdash v{}", env!("CARGO_PKG_VERSION"));

    let cli = CliOptions::parse(env::args().skip(1));
    let config_path = cli
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let mut config = DashboardConfig::load_from_path(&config_path);
    if let Some(url) = cli.server_url.clone() {
        config.server_url = url;
    }

    let Some(command) = cli.command.clone() else {
        println!("{USAGE}");
        anyhow::bail!("no command given");
    };

    let client = DashboardClient::new(config.server_url.clone(), config.request_timeout())?;
    match command {
        Command::Status => run_status(&client, cli.color).await,
        Command::Watch => run_watch(client, &config, cli.color).await,
        Command::Player(id) => run_player(&client, id, cli.color).await,
        Command::Login => run_login(&client, &config, cli.password.clone()).await,
        Command::Console => run_console(&client, &config, cli.color).await,
        Command::Init => run_init(&config, &config_path),
    }
}

fn run_init(config: &DashboardConfig, path: &Path) -> Result<()> {
    config
        .save_to_path(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

async fn run_status(client: &DashboardClient, color: bool) -> Result<()> {
    let report = StatusReport::from_fetch(client.fetch_status_bytes().await);
    for line in console::status_lines(&report, color) {
        println!("{line}");
    }
    Ok(())
}

async fn run_watch(client: DashboardClient, config: &DashboardConfig, color: bool) -> Result<()> {
    let poller = StatusPoller::new(client, config.poll_interval());
    let (tx, mut rx) = watch::channel(StatusReport::Offline);
    let task = tokio::spawn(poller.run(tx));

    let mut last: Option<StatusReport> = None;
    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let report = rx.borrow_and_update().clone();
                if last.as_ref() != Some(&report) {
                    println!("--- {}", chrono::Local::now().format("%H:%M:%S"));
                    for line in console::status_lines(&report, color) {
                        println!("{line}");
                    }
                    last = Some(report);
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    drop(rx);
    task.await.context("Status poller panicked")?;
    Ok(())
}

async fn run_player(client: &DashboardClient, id: u32, color: bool) -> Result<()> {
    let detail = client.fetch_player(id).await?;
    let online = StatusReport::from_fetch(client.fetch_status_bytes().await).has_player(id);
    for line in console::player_lines(&detail, online, color) {
        println!("{line}");
    }
    Ok(())
}

async fn run_login(
    client: &DashboardClient,
    config: &DashboardConfig,
    password: Option<String>,
) -> Result<()> {
    let password = match password.or_else(|| env::var(PASSWORD_ENV).ok()) {
        Some(password) => password,
        None => anyhow::bail!("login needs --password or {PASSWORD_ENV}"),
    };
    match client.login(&password).await {
        Ok(key) => {
            config.store_session_key(&key)?;
            println!(
                "Logged in; key stored at {}",
                config.session_key_path.display()
            );
            Ok(())
        }
        Err(LoginError::WrongPassword) => anyhow::bail!("wrong password"),
        Err(LoginError::LimitReached) => {
            anyhow::bail!("the server has reached its session limit, try again later")
        }
        Err(err) => Err(err).context("login failed"),
    }
}

async fn run_console(client: &DashboardClient, config: &DashboardConfig, color: bool) -> Result<()> {
    let session_key = config.read_session_key();
    if session_key.is_none() {
        tracing::warn!("No session key stored; run `mcdash login` first");
    }
    let mut hub_config = HubConfig::new(client.hub_url());
    hub_config.session_key = session_key;
    hub_config.limits = config.session_limits();
    hub_config.reconnect_delay = config.reconnect_delay();
    let (connection, handle, mut updates) = HubConnection::new(hub_config);
    let driver = tokio::spawn(connection.run());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Some(update) => {
                    if let Some(line) = console::update_line(&update, chrono::Local::now(), color) {
                        println!("{line}");
                    }
                }
                None => break,
            },
            line = lines.next_line() => match line.context("Failed to read stdin")? {
                Some(line) => {
                    if !handle_input(&handle, &line, color).await? {
                        break;
                    }
                }
                None => break,
            },
        }
    }

    drop(handle);
    driver.await.context("Hub connection panicked")?;
    Ok(())
}

/// Act on one console line; `false` ends the session.
async fn handle_input(handle: &HubHandle, line: &str, color: bool) -> Result<bool> {
    let view = match Input::parse(line) {
        Input::Empty => return Ok(true),
        Input::Quit => return Ok(false),
        Input::Command(command) => {
            if let Err(err) = handle.issue(command).await {
                println!("! {err}");
            }
            return Ok(true);
        }
        view => view,
    };
    let snapshot = handle.snapshot().await?;
    let lines = match view {
        Input::Worlds => console::world_lines(&snapshot, color),
        Input::Players => console::player_list_lines(&snapshot, color),
        _ => console::pending_lines(&snapshot),
    };
    for line in lines {
        println!("{line}");
    }
    Ok(true)
}

#[derive(Debug, Default)]
struct CliOptions {
    config_path: Option<PathBuf>,
    server_url: Option<String>,
    password: Option<String>,
    color: bool,
    command: Option<Command>,
}

impl CliOptions {
    fn parse<I: Iterator<Item = String>>(mut args: I) -> Self {
        let mut opts = CliOptions {
            color: true,
            ..CliOptions::default()
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    if let Some(path) = args.next() {
                        opts.config_path = Some(PathBuf::from(path));
                    } else {
                        tracing::error!("--config requires a file path");
                    }
                }
                "--server" => {
                    if let Some(url) = args.next() {
                        opts.server_url = Some(url);
                    } else {
                        tracing::error!("--server requires a URL like http://127.0.0.1:8080");
                    }
                }
                "--password" => {
                    if let Some(password) = args.next() {
                        opts.password = Some(password);
                    } else {
                        tracing::error!("--password requires a value");
                    }
                }
                "--no-color" => opts.color = false,
                "status" => opts.command = Some(Command::Status),
                "watch" => opts.command = Some(Command::Watch),
                "login" => opts.command = Some(Command::Login),
                "console" => opts.command = Some(Command::Console),
                "init" => opts.command = Some(Command::Init),
                "player" => {
                    if let Some(raw) = args.next() {
                        match raw.parse::<u32>() {
                            Ok(id) => opts.command = Some(Command::Player(id)),
                            Err(err) => {
                                tracing::error!(%err, value = %raw, "player id must be an integer");
                            }
                        }
                    } else {
                        tracing::error!("player requires an id");
                    }
                }
                other => {
                    tracing::error!(arg = %other, "Unknown argument");
                }
            }
        }

        opts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliOptions {
        CliOptions::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn flags_and_command() {
        let opts = parse(&["--server", "http://host:1", "--no-color", "player", "12"]);
        assert_eq!(opts.server_url.as_deref(), Some("http://host:1"));
        assert!(!opts.color);
        assert_eq!(opts.command, Some(Command::Player(12)));
    }

    #[test]
    fn bad_player_id_leaves_no_command() {
        let opts = parse(&["player", "steve"]);
        assert_eq!(opts.command, None);
    }

    #[test]
    fn init_command() {
        let opts = parse(&["--config", "/tmp/x.toml", "init"]);
        assert_eq!(opts.command, Some(Command::Init));
        assert_eq!(opts.config_path, Some(PathBuf::from("/tmp/x.toml")));
    }

    #[test]
    fn defaults() {
        let opts = parse(&["console"]);
        assert!(opts.color);
        assert!(opts.config_path.is_none());
        assert_eq!(opts.command, Some(Command::Console));
    }
}
