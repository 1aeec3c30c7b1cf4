//! `hrgate`: inspect how the authorization engine resolves an employee.
//!
//! # Environment Variables
//!
//! - `HRGATE_DIRECTORY_FIXTURE`: JSON directory fixture (takes precedence over the REST directory)
//! - `HRGATE_DIRECTORY_URL` / `HRGATE_DIRECTORY_KEY`: REST directory endpoint and API key
//! - `HRGATE_DIRECTORY_TIMEOUT_SECS`: per-request timeout for the REST directory (default 10)
//! - `HRGATE_POLICY_PATH`: policy tables (exception rules, position areas, admin roles)
//! - `HRGATE_LOG_FORMAT`: `json` (default) or `pretty`; `RUST_LOG` sets the filter

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde::de::DeserializeOwned;

use hrgate_auth::{
    AccessDenied, Action, AttendanceRecord, EmployeeRecord, ModuleKey, RequestRecord, ScopedRecord,
    explain_authorization,
};
use hrgate_core::{Identity, IdentityId};
use hrgate_events::AuthEvent;
use hrgate_infra::{DirectoryConfig, InMemoryDirectory, InMemoryIdentityProvider, PolicyConfig, RestDirectory};
use hrgate_session::{Directory, SessionManager, SessionSnapshot};

#[derive(Parser, Debug)]
#[command(name = "hrgate")]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory fixture (JSON) to resolve against instead of the REST directory
    #[arg(long, global = true, env = "HRGATE_DIRECTORY_FIXTURE", value_name = "PATH")]
    fixture: Option<PathBuf>,

    /// Policy file (also: HRGATE_POLICY_PATH)
    #[arg(long, global = true, env = "HRGATE_POLICY_PATH", value_name = "PATH")]
    policy: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve the session of an employee and print it
    Resolve {
        email: String,
    },

    /// Explain whether an employee may perform an action on a module
    Check {
        email: String,
        module: String,
        #[arg(value_parser = clap::value_parser!(Action))]
        action: Action,
    },

    /// Print the records of a file the employee is allowed to see
    Filter {
        email: String,
        /// JSON array of records
        #[arg(long, value_name = "PATH")]
        records: PathBuf,
        #[arg(long, value_enum, default_value_t = RecordKind::Employees)]
        kind: RecordKind,
    },
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum RecordKind {
    Employees,
    Attendance,
    Requests,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    hrgate_observability::init();
    let args = Args::parse();

    let policy = match &args.policy {
        Some(path) => PolicyConfig::load(path)?,
        None => PolicyConfig::default(),
    };
    let directory = open_directory(args.fixture.as_deref())?;
    let manager = SessionManager::new(directory, Arc::new(InMemoryIdentityProvider::new()), policy.into_policy());

    match args.command {
        Command::Resolve { email } => {
            let snapshot = sign_in(&manager, &email).await;
            print_json(&*snapshot)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Check { email, module, action } => {
            let snapshot = sign_in(&manager, &email).await;
            let module = ModuleKey::from(module);
            let Some(ctx) = snapshot.context() else {
                let denied = AccessDenied::not_authenticated(&module, action);
                eprintln!("{}", denied.user_message());
                return Ok(ExitCode::FAILURE);
            };

            let explanation = explain_authorization(ctx, &module, action);
            print_json(&explanation)?;
            Ok(if explanation.granted {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Filter { email, records, kind } => {
            sign_in(&manager, &email).await;
            match kind {
                RecordKind::Employees => print_visible::<EmployeeRecord>(&manager, &records)?,
                RecordKind::Attendance => print_visible::<AttendanceRecord>(&manager, &records)?,
                RecordKind::Requests => print_visible::<RequestRecord>(&manager, &records)?,
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn open_directory(fixture: Option<&Path>) -> Result<Arc<dyn Directory>> {
    if let Some(path) = fixture {
        let directory = InMemoryDirectory::load(path)?;
        return Ok(Arc::new(directory));
    }

    match DirectoryConfig::from_env()? {
        Some(config) => {
            tracing::info!(url = %config.base_url, "using REST directory");
            Ok(Arc::new(RestDirectory::new(config)?))
        }
        None => bail!("no directory configured: pass --fixture or set HRGATE_DIRECTORY_URL"),
    }
}

/// Sign `email` in and wait for the resolution. Denials and directory
/// failures still leave a snapshot to report.
async fn sign_in(manager: &SessionManager, email: &str) -> Arc<SessionSnapshot> {
    let identity = Identity::new(IdentityId::new(), email);
    match manager.handle_event(AuthEvent::signed_in(identity)).await {
        Ok(snapshot) => snapshot,
        Err(error) => {
            tracing::warn!(%error, email, "session did not resolve to an authorization");
            manager.snapshot()
        }
    }
}

fn print_visible<R>(manager: &SessionManager, path: &Path) -> Result<()>
where
    R: ScopedRecord + Serialize + DeserializeOwned,
{
    let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let records: Vec<R> =
        serde_json::from_str(&raw).with_context(|| format!("invalid records in {}", path.display()))?;

    let visible = manager.visible(&records);
    tracing::info!(total = records.len(), visible = visible.len(), "records filtered");
    print_json(&visible)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("failed to encode output")?;
    println!("{out}");
    Ok(())
}
