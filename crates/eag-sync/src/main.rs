// # eag-sync - Eero to AdGuard Home client sync
//
// ⚠️ ARCHITECTURAL CONSTRAINTS ⚠️
//
// - This is a THIN integration layer ONLY
// - DO NOT add matching, merging or ordering logic here; it lives in eag-core
// - DO NOT retry failed registry calls; a re-run converges
//
// The binary is responsible for:
// 1. Reading flags (with environment fallbacks) and prompting for what is missing
// 2. Logging in to Eero and AdGuard Home
// 3. Asking for confirmation before destructive runs
// 4. Running the sync engine and printing its progress and report
//
// ## Commands
//
// - `eag-sync sync`: reconcile the AdGuard Home client list with an Eero network
// - `eag-sync clear`: delete cached Eero credentials
//
// ## Example
//
// ```bash
// export EAG_ADGUARD_HOST=http://192.168.4.2:3000
// export EAG_ADGUARD_USER=admin
// export EAG_ADGUARD_PASSWORD=secret
//
// eag-sync sync --delete --confirm
// ```

mod prompt;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use eag_core::config::{EngineConfig, SessionStoreConfig, SourceConfig, SyncConfig, TargetConfig};
use eag_core::{
    ApplyReport, Error, FileSessionStore, MemorySessionStore, RunOptions, SessionStore, Side,
    SyncEngine, SyncEvent,
};
use eag_source_eero::{EeroClient, EeroSource, Network, select_network};
use eag_target_adguard::AdGuardTarget;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

/// Session file name inside the data directory
const SESSION_FILE: &str = "sessions.json";

/// Exit codes for different termination scenarios
///
/// - 0: Success
/// - 1: Configuration or startup error
/// - 2: Runtime error (a registry call failed)
/// - 3: Aborted at a confirmation prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncExitCode {
    Success = 0,
    ConfigError = 1,
    RuntimeError = 2,
    Aborted = 3,
}

impl From<SyncExitCode> for ExitCode {
    fn from(code: SyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

impl SyncExitCode {
    /// Exit code for a failed run
    fn for_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<Error>() {
            Some(Error::Config(_) | Error::InvalidInput(_)) => SyncExitCode::ConfigError,
            _ => SyncExitCode::RuntimeError,
        }
    }
}

/// How a command ended when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Completed,
    Aborted,
}

/// Sync Eero DHCP clients into AdGuard Home
#[derive(Parser, Debug)]
#[command(name = "eag-sync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory for cached credentials
    #[arg(long, global = true, env = "EAG_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        long,
        global = true,
        env = "EAG_LOG_LEVEL",
        default_value = "warn",
        value_parser = ["trace", "debug", "info", "warn", "error"]
    )]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reconcile the AdGuard Home client list with an Eero network
    Sync(SyncArgs),

    /// Delete all locally cached credentials
    Clear {
        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        confirm: bool,
    },
}

#[derive(Args, Debug, Clone, Default)]
struct SyncArgs {
    /// AdGuard Home host or URL
    #[arg(long, env = "EAG_ADGUARD_HOST")]
    adguard_host: Option<String>,

    /// AdGuard Home username
    #[arg(long, env = "EAG_ADGUARD_USER")]
    adguard_user: Option<String>,

    /// AdGuard Home password
    #[arg(long, env = "EAG_ADGUARD_PASSWORD", hide_env_values = true)]
    adguard_password: Option<String>,

    /// Eero account email address or phone number
    #[arg(long, env = "EAG_EERO_USER")]
    eero_user: Option<String>,

    /// Eero session cookie (skips the interactive login; not cached)
    #[arg(long, env = "EAG_EERO_COOKIE", hide_env_values = true)]
    eero_cookie: Option<String>,

    /// Eero network to sync, by index or name
    #[arg(long, env = "EAG_EERO_NETWORK")]
    network: Option<String>,

    /// Delete AdGuard clients not found in Eero's DHCP list
    #[arg(short = 'd', long)]
    delete: bool,

    /// Skip confirmation prompts
    #[arg(short = 'y', long)]
    confirm: bool,

    /// Delete every AdGuard client, then recreate them from Eero
    #[arg(short = 'o', long)]
    overwrite: bool,

    /// Show what would change without touching AdGuard Home
    #[arg(long)]
    dry_run: bool,

    /// Do not sync the eero nodes themselves
    #[arg(long)]
    skip_network_devices: bool,
}

impl SyncArgs {
    fn run_options(&self) -> RunOptions {
        RunOptions::new(self.delete, self.overwrite, self.confirm)
    }

    /// AdGuard Home settings, prompting for anything not given
    fn target_config(&self) -> eag_core::Result<TargetConfig> {
        let host = match &self.adguard_host {
            Some(host) => host.clone(),
            None => prompt::text("AdGuard Home host", "--adguard-host")?,
        };
        let username = match &self.adguard_user {
            Some(user) => user.clone(),
            None => prompt::text("AdGuard Home username", "--adguard-user")?,
        };
        let password = match &self.adguard_password {
            Some(password) => password.clone(),
            None => prompt::secret("AdGuard Home password", "--adguard-password")?,
        };

        Ok(TargetConfig::Adguard {
            host,
            username,
            password,
        })
    }

    /// Full configuration for one run
    fn config(&self, target: TargetConfig, data_dir: &std::path::Path) -> SyncConfig {
        let session_store = if self.eero_cookie.is_some() {
            SessionStoreConfig::Memory
        } else {
            SessionStoreConfig::File {
                path: data_dir.join(SESSION_FILE),
            }
        };

        SyncConfig {
            source: SourceConfig::Eero {
                user: self.eero_user.clone(),
                network: self.network.clone(),
                include_network_devices: !self.skip_network_devices,
            },
            target,
            session_store,
            engine: EngineConfig {
                dry_run: self.dry_run,
                ..EngineConfig::default()
            },
        }
    }
}

/// Platform data directory, else `./.eag-sync`
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("eag-sync"))
        .unwrap_or_else(|| PathBuf::from(".eag-sync"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return SyncExitCode::ConfigError.into();
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to create tokio runtime: {}", e);
            return SyncExitCode::RuntimeError.into();
        }
    };

    let data_dir = cli.data_dir.unwrap_or_else(default_data_dir);
    let result = rt.block_on(async {
        match cli.command {
            Command::Sync(args) => run_sync(args, data_dir).await,
            Command::Clear { confirm } => run_clear(data_dir, confirm).await,
        }
    });

    match result {
        Ok(Outcome::Completed) => SyncExitCode::Success.into(),
        Ok(Outcome::Aborted) => {
            println!("Aborted");
            SyncExitCode::Aborted.into()
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            SyncExitCode::for_error(&e).into()
        }
    }
}

/// Delete every cached credential
async fn run_clear(data_dir: PathBuf, confirm: bool) -> Result<Outcome> {
    if !confirm && !prompt::confirm("Delete all locally cached credentials?")? {
        return Ok(Outcome::Aborted);
    }

    let store = FileSessionStore::new(data_dir.join(SESSION_FILE)).await?;
    store.clear().await?;
    store.flush().await?;
    info!("Cleared session store at {}", data_dir.display());
    println!("All locally cached credentials deleted");
    Ok(Outcome::Completed)
}

/// One sync run
async fn run_sync(args: SyncArgs, data_dir: PathBuf) -> Result<Outcome> {
    let started = Instant::now();
    let options = args.run_options();

    let target = args.target_config()?;
    let config = args.config(target, &data_dir);
    config.validate()?;

    let sessions: Arc<dyn SessionStore> = match &config.session_store {
        SessionStoreConfig::File { path } => Arc::new(FileSessionStore::new(path).await?),
        SessionStoreConfig::Memory => Arc::new(MemorySessionStore::new()),
    };

    // Eero
    let client = EeroClient::new(sessions)?;
    if let Some(cookie) = &args.eero_cookie {
        client.set_session(cookie).await?;
    }
    eero_login(&client, &args).await?;

    let networks = client.networks().await.context("Failed to list Eero networks")?;
    let network = choose_network(&networks, args.network.as_deref())?;
    println!("Eero network: {}", network.name);
    if !options.confirm && !prompt::confirm("Sync this network?")? {
        return Ok(Outcome::Aborted);
    }

    // AdGuard Home
    let adguard = AdGuardTarget::connect(&config.target)
        .await
        .context("Failed to log in to AdGuard Home")?;
    info!("Connected to AdGuard Home at {}", adguard.base_url());

    let source = EeroSource::new(Arc::new(client), network.clone())
        .with_network_devices(!args.skip_network_devices);
    let (engine, events) = SyncEngine::new(Box::new(source), Box::new(adguard), config.engine)?;
    let printer = tokio::spawn(print_events(events, engine.is_dry_run()));

    let partition = engine.plan().await?;
    if options.overwrite {
        if !options.confirm
            && !prompt::confirm("WARNING: All clients in AdGuard will be deleted, confirm?")?
        {
            return Ok(Outcome::Aborted);
        }
    } else if options.allow_delete
        && !partition.stale.is_empty()
        && !options.confirm
        && !prompt::confirm(&format!(
            "WARNING: Clients in AdGuard not found in Eero's DHCP list will be deleted ({}), confirm?",
            partition.stale.len()
        ))?
    {
        return Ok(Outcome::Aborted);
    }

    let result = engine
        .apply(&partition, options.allow_delete, options.overwrite)
        .await;

    // Closing the channel ends the printer
    drop(engine);
    if let Err(e) = printer.await {
        error!("Event printer failed: {}", e);
    }

    let report = result?;
    print_report(&report);
    println!("Sync complete in {:.2}s", started.elapsed().as_secs_f64());
    Ok(Outcome::Completed)
}

/// Reuse the cached Eero session, or run the two-step login
async fn eero_login(client: &EeroClient, args: &SyncArgs) -> Result<()> {
    if !client.needs_login().await? {
        println!("Using cached Eero credentials");
        return Ok(());
    }

    let user = match &args.eero_user {
        Some(user) => user.clone(),
        None => prompt::text("Eero email address or phone number", "--eero-user")?,
    };
    let token = client
        .login(&user)
        .await
        .context("Failed to start Eero login")?;
    let code = prompt::text("Verification code from email or SMS", "--eero-cookie")?;
    client
        .login_verify(&code, &token)
        .await
        .context("Failed to verify Eero login")?;
    Ok(())
}

/// The requested network, the only network, or the operator's pick
fn choose_network<'a>(networks: &'a [Network], wanted: Option<&str>) -> eag_core::Result<&'a Network> {
    if let Some(wanted) = wanted {
        return select_network(networks, wanted);
    }
    match networks {
        [] => select_network(networks, ""),
        [only] => Ok(only),
        _ => {
            let names: Vec<String> = networks.iter().map(|n| n.name.clone()).collect();
            let index = prompt::select("Choose an Eero network", &names, "--network")?;
            select_network(networks, &index.to_string())
        }
    }
}

/// Print engine progress as it happens
async fn print_events(mut events: mpsc::Receiver<SyncEvent>, dry_run: bool) {
    let prefix = if dry_run { "[dry run] " } else { "" };
    while let Some(event) = events.recv().await {
        match event {
            SyncEvent::Planned {
                new,
                matched,
                stale,
                skipped,
            } => println!(
                "{} new, {} existing, {} not in Eero, {} skipped",
                new, matched, stale, skipped
            ),
            SyncEvent::TargetCleared => println!("{}Deleted all AdGuard clients", prefix),
            SyncEvent::Updated { name, identity } => {
                println!("{}Updated {} ({})", prefix, name, identity)
            }
            SyncEvent::Created { name, identity } => {
                println!("{}Created {} ({})", prefix, name, identity)
            }
            SyncEvent::Deleted { name, identity } => {
                println!("{}Deleted {} ({})", prefix, name, identity)
            }
            SyncEvent::SkippedDuplicate {
                name,
                identity,
                message,
            } => println!("Skipped {} ({}): {}", name, identity, message),
            SyncEvent::Failed { name, error } => eprintln!("Failed on {}: {}", name, error),
            SyncEvent::Finished { .. } => {}
        }
    }
}

fn print_report(report: &ApplyReport) {
    println!("{}", report);

    for skip in &report.skipped_duplicates {
        println!("  duplicate name: {} ({})", skip.name, skip.identity);
    }
    for device in &report.shadowed {
        println!(
            "  duplicate MAC address in AdGuard, left in place: {} ({})",
            device.name, device.identity
        );
    }
    for side in [Side::Authoritative, Side::Target] {
        let registry = match side {
            Side::Authoritative => "Eero",
            Side::Target => "AdGuard",
        };
        for skipped in report.unidentifiable_on(side) {
            println!("  no MAC address in {}: {}", registry, skipped.record.name);
        }
    }
}
