mod commands;
mod display;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use contrack_core::WorkflowPhase;
use contrack_core::coerce::parse_number;
use contrack_sync::{HttpStore, Ledger, StoreConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "contrack", version, about = "Contract measurement tracking")]
struct Cli {
    #[command(flatten)]
    backend: BackendArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct BackendArgs {
    /// Spreadsheet backend endpoint.
    #[arg(long, env = "CONTRACK_ENDPOINT")]
    endpoint: String,

    /// Shared token sent with every request.
    #[arg(long, env = "CONTRACK_TOKEN", hide_env_values = true)]
    token: String,

    /// Request timeout in seconds.
    #[arg(long, env = "CONTRACK_TIMEOUT_SECS", default_value_t = 15)]
    timeout_secs: u64,

    /// How long reads are reused, in seconds (0 disables the cache).
    #[arg(long, env = "CONTRACK_CACHE_TTL_SECS", default_value_t = 60)]
    cache_ttl_secs: u64,
}

impl BackendArgs {
    fn config(&self) -> StoreConfig {
        StoreConfig {
            endpoint: self.endpoint.clone(),
            token: self.token.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Portfolio totals and one financial card per contract.
    Dashboard {
        /// Only show contracts run by this manager.
        #[arg(long)]
        manager: Option<String>,
    },
    /// Item-level drill-down of one contract.
    Report {
        /// Contract number or id.
        #[arg(long)]
        contract: String,
    },
    /// List or register contracts.
    Contracts {
        #[command(subcommand)]
        action: ContractAction,
    },
    /// List, add, edit or delete the items of a contract.
    Items {
        #[command(subcommand)]
        action: ItemAction,
    },
    /// Record a cumulative measurement against an item.
    Measure(MeasureArgs),
    /// Workflow board of current measurements.
    Kanban {
        /// Restrict the board to one contract.
        #[arg(long)]
        contract: Option<String>,
        /// Print one flat table instead of phase sections.
        #[arg(long)]
        table: bool,
    },
    /// Write a contract's items to a CSV file.
    Export {
        #[arg(long)]
        contract: String,
        #[arg(long)]
        out: PathBuf,
        /// Field delimiter (use ';' for spreadsheets with a decimal comma).
        #[arg(long, default_value_t = ',', value_parser = parse_delimiter)]
        delimiter: char,
    },
}

#[derive(Subcommand, Debug)]
enum ContractAction {
    List,
    Add(ContractAddArgs),
}

#[derive(Args, Debug)]
struct ContractAddArgs {
    /// Contract number (e.g. CTT-0042).
    #[arg(long)]
    number: String,
    #[arg(long)]
    supplier: String,
    #[arg(long, default_value = "")]
    client: String,
    #[arg(long)]
    manager: String,
    /// Total contract value.
    #[arg(long, value_parser = parse_amount)]
    total: f64,
    /// Start date (YYYY-MM-DD).
    #[arg(long)]
    start: NaiveDate,
    /// End date (YYYY-MM-DD).
    #[arg(long)]
    end: NaiveDate,
    #[arg(long, default_value = "")]
    status: String,
}

#[derive(Subcommand, Debug)]
enum ItemAction {
    List {
        #[arg(long)]
        contract: String,
    },
    Add {
        #[arg(long)]
        contract: String,
        #[arg(long)]
        description: String,
        #[arg(long, value_parser = parse_amount)]
        unit_value: f64,
        /// Item deadline (YYYY-MM-DD); defaults to the contract end date.
        #[arg(long)]
        deadline: Option<NaiveDate>,
    },
    Edit {
        #[arg(long)]
        contract: String,
        /// Item id or exact description.
        #[arg(long)]
        item: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, value_parser = parse_amount)]
        unit_value: Option<f64>,
    },
    Delete {
        #[arg(long)]
        contract: String,
        #[arg(long)]
        item: String,
    },
}

#[derive(Args, Debug)]
struct MeasureArgs {
    #[arg(long)]
    contract: String,
    /// Item id or exact description.
    #[arg(long)]
    item: String,
    /// Cumulative percentage complete, 0 to 100.
    #[arg(long, value_parser = parse_percent)]
    percent: f64,
    /// Measurement date (YYYY-MM-DD); defaults to today.
    #[arg(long)]
    date: Option<NaiveDate>,
    /// Workflow phase, by label or name (e.g. "Medição lançada", approved).
    #[arg(long, default_value = "in_progress")]
    phase: WorkflowPhase,
    #[arg(long)]
    note: Option<String>,
}

fn parse_amount(s: &str) -> Result<f64, String> {
    match parse_number(s) {
        Some(v) if v >= 0.0 => Ok(v),
        Some(_) => Err("amount must not be negative".into()),
        None => Err(format!("{s:?} is not a number")),
    }
}

/// Percent (0–100) in, fraction (0–1) out.
fn parse_percent(s: &str) -> Result<f64, String> {
    let s = s.trim().trim_end_matches('%');
    match parse_number(s) {
        Some(v) if (0.0..=100.0).contains(&v) => Ok(v / 100.0),
        Some(v) => Err(format!("{v} is outside 0..=100")),
        None => Err(format!("{s:?} is not a number")),
    }
}

fn parse_delimiter(s: &str) -> Result<char, String> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() => Ok(c),
        _ => Err("delimiter must be a single ASCII character".into()),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    tracing::info!("contrack v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let store = HttpStore::new(cli.backend.config()).context("building HTTP client")?;
    tracing::debug!(
        endpoint = %store.config().endpoint,
        timeout = ?store.config().timeout,
        "backend configured"
    );
    let ledger = Ledger::new(store);
    let today = Local::now().date_naive();

    match cli.command {
        Command::Dashboard { manager } => {
            commands::dashboard(&ledger, manager.as_deref(), today).await
        }
        Command::Report { contract } => commands::report(&ledger, &contract, today).await,
        Command::Contracts { action } => match action {
            ContractAction::List => commands::list_contracts(&ledger).await,
            ContractAction::Add(args) => commands::add_contract(&ledger, args.into()).await,
        },
        Command::Items { action } => match action {
            ItemAction::List { contract } => commands::list_items(&ledger, &contract).await,
            ItemAction::Add {
                contract,
                description,
                unit_value,
                deadline,
            } => commands::add_item(&ledger, &contract, description, unit_value, deadline).await,
            ItemAction::Edit {
                contract,
                item,
                description,
                unit_value,
            } => commands::edit_item(&ledger, &contract, &item, description, unit_value).await,
            ItemAction::Delete { contract, item } => {
                commands::delete_item(&ledger, &contract, &item).await
            }
        },
        Command::Measure(args) => {
            commands::measure(
                &ledger,
                commands::MeasureInput {
                    contract: args.contract,
                    item: args.item,
                    fraction: args.percent,
                    date: args.date.unwrap_or(today),
                    phase: args.phase,
                    note: args.note,
                },
            )
            .await
        }
        Command::Kanban { contract, table } => {
            commands::kanban(&ledger, contract.as_deref(), table, Local::now().naive_local())
                .await
        }
        Command::Export {
            contract,
            out,
            delimiter,
        } => commands::export(&ledger, &contract, &out, delimiter as u8, today).await,
    }
}

impl From<ContractAddArgs> for contrack_sync::NewContract {
    fn from(args: ContractAddArgs) -> Self {
        Self {
            number: args.number,
            supplier: args.supplier,
            client: args.client,
            manager: args.manager,
            total_value: args.total,
            start_date: args.start,
            end_date: args.end,
            status: args.status,
        }
    }
}
