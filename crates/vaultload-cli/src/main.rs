//! `vaultload` CLI: bulk-upload secrets from a CSV file into Vault KV v2.
//!
//! Walks the same steps a user would in a wizard: configure the connection,
//! authenticate, parse and preview the file, upload every secret one at a
//! time, and write a CSV report of what happened.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use vaultload_core::auth::{Session, authenticate};
use vaultload_core::config::{AuthMode, ConfigDraft, VaultConfig};
use vaultload_core::gateway::{ProxyGateway, SecretsGateway, VaultGateway};
use vaultload_core::group::{GroupedSecrets, group_records};
use vaultload_core::parser::{self, SAMPLE_CSV, SAMPLE_FILE_NAME};
use vaultload_core::report::write_report;
use vaultload_core::upload::{RunOutcome, UploadOrchestrator, UploadSnapshot, UploadStatus};

// ── ANSI color helpers ───────────────────────────────────────────────

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const WHITE: &str = "\x1b[37m";

const BANNER_SMALL: &str = "⟐ vaultload";

/// Base path used by `login` when none is given; only validated, never written.
const LOGIN_BASE_PATH: &str = "kv/data/vaultload";

// ── CLI structure ────────────────────────────────────────────────────

/// vaultload: bulk-upload secrets from a CSV file into Vault.
#[derive(Parser)]
#[command(
    name = "vaultload",
    version,
    about = "vaultload CLI — validate, preview, and upload CSV secrets into Vault KV v2",
    long_about = None,
    after_help = format!(
        "{DIM}Environment variables:{RESET}\n  \
         VAULT_ADDR         Vault address (default: http://127.0.0.1:8200)\n  \
         VAULT_NAMESPACE    Enterprise namespace\n  \
         VAULT_TOKEN        Client token\n  \
         VAULT_ROLE_ID      AppRole role ID\n  \
         VAULT_SECRET_ID    AppRole secret ID\n  \
         VAULTLOAD_PROXY    Route calls through a vaultload-server\n\n\
         {DIM}Examples:{RESET}\n  \
         vaultload sample --output secrets.csv\n  \
         vaultload preview secrets.csv\n  \
         vaultload upload secrets.csv --path kv/data/myapp --token hvs.xxx"
    ),
)]
struct Cli {
    /// Vault server address.
    #[arg(long, global = true, env = "VAULT_ADDR", default_value = "http://127.0.0.1:8200")]
    addr: String,

    /// Vault Enterprise namespace.
    #[arg(long, global = true, env = "VAULT_NAMESPACE")]
    namespace: Option<String>,

    /// Send every call through a vaultload-server at this URL.
    #[arg(long, global = true, env = "VAULTLOAD_PROXY")]
    proxy: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, global = true, default_value = "30")]
    timeout_secs: u64,

    /// Log backend calls to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print (or save) a sample input file.
    Sample {
        /// File or directory to write the sample to.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Parse a CSV file and show what would be uploaded.
    Preview {
        /// CSV file with a SECRET_NAME,SECRET_KEY,SECRET_VALUE header.
        file: PathBuf,
    },
    /// Check the credentials against Vault without uploading.
    Login {
        #[command(flatten)]
        auth: AuthArgs,
        /// Base path to validate.
        #[arg(long, env = "VAULTLOAD_PATH")]
        path: Option<String>,
    },
    /// Upload every secret in a CSV file.
    Upload(UploadArgs),
}

#[derive(Args)]
struct AuthArgs {
    /// Client token (token auth).
    #[arg(long, env = "VAULT_TOKEN", hide_env_values = true)]
    token: Option<String>,
    /// AppRole role ID (AppRole auth).
    #[arg(long, env = "VAULT_ROLE_ID")]
    role_id: Option<String>,
    /// AppRole secret ID (AppRole auth).
    #[arg(long, env = "VAULT_SECRET_ID", hide_env_values = true)]
    secret_id: Option<String>,
}

#[derive(Args)]
struct UploadArgs {
    /// CSV file with a SECRET_NAME,SECRET_KEY,SECRET_VALUE header.
    file: PathBuf,
    /// Base path to write under, e.g. kv/data/myapp.
    #[arg(long, env = "VAULTLOAD_PATH")]
    path: String,
    #[command(flatten)]
    auth: AuthArgs,
    /// Directory to write the report into.
    #[arg(long, default_value = ".")]
    report_dir: PathBuf,
    /// Skip writing the report.
    #[arg(long)]
    no_report: bool,
    /// Pause between writes, in milliseconds.
    #[arg(long, default_value = "200")]
    pace_ms: u64,
    /// Exit 0 even when some secrets failed.
    #[arg(long)]
    allow_errors: bool,
}

// ── Pretty output helpers ────────────────────────────────────────────

fn header(icon: &str, title: &str) {
    println!("{BOLD}{CYAN}{icon} {title}{RESET}");
    println!("{DIM}─────────────────────────────────────────{RESET}");
}

fn kv_line(key: &str, value: &str) {
    println!("  {DIM}{key:<20}{RESET} {WHITE}{value}{RESET}");
}

fn success(msg: &str) {
    println!("{GREEN}{BOLD}✓{RESET} {msg}");
}

fn warning(msg: &str) {
    println!("{YELLOW}{BOLD}⚠{RESET} {YELLOW}{msg}{RESET}");
}

fn progress_bar(current: usize, total: usize) -> String {
    let width = 20;
    let filled = if total > 0 {
        (current * width / total).min(width)
    } else {
        0
    };
    let empty = width - filled;
    format!(
        "{CYAN}[{}{DIM}{}]{RESET}",
        "█".repeat(filled),
        "░".repeat(empty)
    )
}

fn print_groups(grouped: &GroupedSecrets) {
    for group in grouped.iter() {
        let keys: Vec<&str> = group.data.keys().collect();
        println!(
            "  {CYAN}•{RESET} {BOLD}{}{RESET} {DIM}({}){RESET}",
            group.name,
            keys.join(", ")
        );
    }
}

/// Print results settled since the last call.
fn print_settled(snapshot: &UploadSnapshot, printed: &mut usize) {
    let settled = snapshot
        .results
        .iter()
        .take_while(|r| r.status != UploadStatus::Pending);
    for (index, result) in settled.enumerate().skip(*printed) {
        let bar = progress_bar(index + 1, snapshot.total);
        let counter = format!("{}/{}", index + 1, snapshot.total);
        match result.status {
            UploadStatus::Success => {
                let full_path = result
                    .attempt
                    .as_ref()
                    .map_or("", |a| a.full_path.as_str());
                println!(
                    "  {bar} {DIM}{counter}{RESET} {GREEN}✓{RESET} {} → {DIM}{full_path}{RESET}",
                    result.secret_name
                );
            }
            UploadStatus::Error => {
                let message = result.message.as_deref().unwrap_or_default();
                println!(
                    "  {bar} {DIM}{counter}{RESET} {RED}✗{RESET} {} — {RED}{message}{RESET}",
                    result.secret_name
                );
            }
            UploadStatus::Pending => {}
        }
        *printed = index + 1;
    }
}

// ── Command dispatch ─────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("  {RED}{BOLD}✗ Error:{RESET} {e:#}");
            eprintln!();
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("VAULTLOAD_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let connection = Connection {
        addr: cli.addr,
        namespace: cli.namespace.unwrap_or_default(),
        proxy: cli.proxy,
        timeout: Duration::from_secs(cli.timeout_secs.max(1)),
    };

    match cli.command {
        Commands::Sample { output } => cmd_sample(output.as_deref()),
        Commands::Preview { file } => cmd_preview(&file),
        Commands::Login { auth, path } => cmd_login(&connection, &auth, path.as_deref()).await,
        Commands::Upload(args) => cmd_upload(&connection, &args).await,
    }
}

/// Connection flags shared by every command that talks to Vault.
struct Connection {
    addr: String,
    namespace: String,
    proxy: Option<String>,
    timeout: Duration,
}

impl Connection {
    fn config(&self, auth: &AuthArgs, base_path: &str) -> Result<VaultConfig> {
        let auth_mode = if auth.role_id.is_some() || auth.secret_id.is_some() {
            AuthMode::AppRole
        } else {
            AuthMode::Token
        };
        let draft = ConfigDraft {
            backend_url: self.addr.clone(),
            namespace: self.namespace.clone(),
            base_path: base_path.to_owned(),
            auth_mode,
            token: auth.token.clone(),
            role_id: auth.role_id.clone(),
            secret_id: auth.secret_id.clone(),
        };
        Ok(draft.finalize()?)
    }

    fn gateway(&self) -> Result<Box<dyn SecretsGateway>> {
        let gateway: Box<dyn SecretsGateway> = match &self.proxy {
            Some(proxy) => {
                debug!(proxy = %proxy, "routing calls through proxy");
                Box::new(ProxyGateway::new(proxy, self.timeout)?)
            }
            None => Box::new(VaultGateway::new(self.timeout)?),
        };
        Ok(gateway)
    }

    async fn session(&self, config: &VaultConfig) -> Result<Session> {
        let gateway = self.gateway()?;
        let session = authenticate(gateway.as_ref(), config)
            .await
            .context("authentication failed")?;
        Ok(session)
    }
}

// ── Commands ─────────────────────────────────────────────────────────

fn cmd_sample(output: Option<&Path>) -> Result<()> {
    let Some(output) = output else {
        println!("{SAMPLE_CSV}");
        return Ok(());
    };

    let target = if output.is_dir() {
        output.join(SAMPLE_FILE_NAME)
    } else {
        output.to_path_buf()
    };
    std::fs::write(&target, format!("{SAMPLE_CSV}\n"))
        .with_context(|| format!("failed to write {}", target.display()))?;
    success(&format!("Wrote sample to {BOLD}{}{RESET}", target.display()));
    Ok(())
}

fn read_csv(file: &Path) -> Result<String> {
    let is_csv = file
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if !is_csv {
        bail!("Please select a CSV file: {}", file.display());
    }
    if !file.exists() {
        bail!("file not found: {}", file.display());
    }
    std::fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))
}

/// Parse the file, report line errors, and return the grouped secrets.
fn load_secrets(file: &Path) -> Result<(Vec<parser::SecretRecord>, GroupedSecrets)> {
    let content = read_csv(file)?;
    let outcome = parser::parse(&content);

    if !outcome.is_clean() {
        warning(&format!("Found {} validation errors", outcome.errors.len()));
        for message in outcome.error_messages() {
            println!("  {DIM}{message}{RESET}");
        }
        println!();
    }
    if outcome.records.is_empty() {
        bail!("no secrets found in {}", file.display());
    }

    let grouped = group_records(&outcome.records);
    Ok((outcome.records, grouped))
}

fn cmd_preview(file: &Path) -> Result<()> {
    println!();
    header("📄", &format!("Preview of {}", file.display()));
    println!();

    let (records, grouped) = load_secrets(file)?;

    kv_line("Rows", &records.len().to_string());
    kv_line("Secrets", &grouped.len().to_string());
    kv_line("Keys", &grouped.key_count().to_string());
    println!();
    print_groups(&grouped);
    println!();
    success(&format!("Successfully parsed {} secrets", records.len()));
    Ok(())
}

async fn cmd_login(connection: &Connection, auth: &AuthArgs, path: Option<&str>) -> Result<()> {
    let config = connection.config(auth, path.unwrap_or(LOGIN_BASE_PATH))?;

    println!();
    println!("  {BANNER_SMALL} {DIM}authenticating...{RESET}");
    println!();

    connection.session(&config).await?;

    header("🔐", "Authentication successful!");
    kv_line("Vault URL", config.backend_url());
    kv_line("Namespace", config.namespace().unwrap_or("(none)"));
    kv_line("Auth method", &config.auth_mode().to_string());
    if path.is_some() {
        kv_line("Base path", config.base_path());
        if let Some(advice) = config.path_warning() {
            warning(advice);
        }
    }
    if connection.proxy.is_some() {
        kv_line("Via proxy", connection.proxy.as_deref().unwrap_or_default());
    }
    println!();
    Ok(())
}

async fn cmd_upload(connection: &Connection, args: &UploadArgs) -> Result<()> {
    let config = connection.config(&args.auth, &args.path)?;
    if let Some(advice) = config.path_warning() {
        warning(advice);
    }

    // Fail on an unreadable file before any network call.
    read_csv(&args.file)?;

    println!();
    println!("  {BANNER_SMALL} {DIM}authenticating...{RESET}");
    let gateway = connection.gateway()?;
    let session = authenticate(gateway.as_ref(), &config)
        .await
        .context("authentication failed")?;
    success("Authentication successful!");
    println!();

    header("📦", &format!("Uploading secrets from {}", args.file.display()));
    let (records, grouped) = load_secrets(&args.file)?;
    kv_line("Vault URL", config.backend_url());
    kv_line("Base path", config.base_path());
    if let Some(ns) = config.namespace() {
        kv_line("Namespace", ns);
    }
    kv_line("Secrets", &grouped.len().to_string());
    println!();

    let mut orchestrator =
        UploadOrchestrator::new(&records).with_pace(Duration::from_millis(args.pace_ms));

    let cancel = CancellationToken::new();
    let ctrl_c = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("  {YELLOW}{BOLD}⚠{RESET} {YELLOW}cancelling after the current secret...{RESET}");
                cancel.cancel();
            }
        }
    });

    let mut snapshots = orchestrator.subscribe();
    let mut printed = 0;
    let summary = {
        let run = orchestrator.run(gateway.as_ref(), &session, &cancel);
        tokio::pin!(run);
        loop {
            tokio::select! {
                summary = &mut run => break summary,
                Ok(()) = snapshots.changed() => {
                    let snapshot = snapshots.borrow_and_update().clone();
                    print_settled(&snapshot, &mut printed);
                }
            }
        }
    };
    ctrl_c.abort();
    print_settled(&orchestrator.snapshot(), &mut printed);
    println!();

    if !args.no_report {
        let date = chrono::Utc::now().date_naive();
        let path = write_report(
            &args.report_dir,
            date,
            orchestrator.results(),
            orchestrator.grouped(),
        )
        .await?;
        success(&format!("Report written to {BOLD}{}{RESET}", path.display()));
    }

    match summary.outcome {
        RunOutcome::AllSucceeded => {
            println!("  {GREEN}{BOLD}✓ {}{RESET}", summary.message);
            println!();
            Ok(())
        }
        RunOutcome::Cancelled => {
            println!("  {YELLOW}{BOLD}⚠ {}{RESET}", summary.message);
            println!();
            bail!("upload cancelled")
        }
        RunOutcome::Partial | RunOutcome::AllFailed => {
            println!("  {YELLOW}{BOLD}⚠ {}{RESET}", summary.message);
            println!();
            if args.allow_errors {
                Ok(())
            } else {
                bail!("{} secrets failed to upload", summary.failed)
            }
        }
    }
}
