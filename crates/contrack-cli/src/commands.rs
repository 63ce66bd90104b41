//! One handler per page: fetch through the ledger, compute, print.

use std::path::Path;

use anyhow::{Context, bail};
use chrono::{NaiveDate, NaiveDateTime};
use contrack_core::{
    BudgetCheck, Contract, Dashboard, Item, ItemPatch, KanbanBoard, WorkflowPhase,
    summarize_contract,
};
use contrack_report::{
    contract_list_batch, dashboard_batch, export_contract_csv, item_list_batch, item_rows_batch,
    kanban_batch,
};
use contrack_sync::{Ledger, NewContract, NewItem, NewMeasurement, TabularStore};
use tracing::debug;

use crate::display;

pub struct MeasureInput {
    pub contract: String,
    pub item: String,
    pub fraction: f64,
    pub date: NaiveDate,
    pub phase: WorkflowPhase,
    pub note: Option<String>,
}

pub async fn dashboard<S: TabularStore>(
    ledger: &Ledger<S>,
    manager: Option<&str>,
    today: NaiveDate,
) -> anyhow::Result<()> {
    let snapshot = ledger.snapshot().await;
    let dashboard = Dashboard::build(&snapshot, manager, today);
    debug!(
        contracts = dashboard.summaries.len(),
        managers = dashboard.managers.len(),
        "dashboard built"
    );

    display::print_totals(&dashboard.totals);
    if dashboard.summaries.is_empty() {
        match manager {
            Some(m) => println!("No contracts managed by {m:?}."),
            None => println!("No contracts registered."),
        }
        if manager.is_some() && !dashboard.managers.is_empty() {
            println!("Managers: {}", dashboard.managers.join(", "));
        }
        return Ok(());
    }

    display::print_table(&dashboard_batch(&dashboard)?)?;
    println!();
    for summary in &dashboard.summaries {
        display::print_contract_card(summary);
    }
    Ok(())
}

pub async fn report<S: TabularStore>(
    ledger: &Ledger<S>,
    contract: &str,
    today: NaiveDate,
) -> anyhow::Result<()> {
    let snapshot = ledger.snapshot().await;
    let contract = resolve_contract(&snapshot.contracts, contract)?;
    let summary = summarize_contract(contract, &snapshot.items, &snapshot.measurements, today);

    display::print_contract_card(&summary);
    if summary.rows.is_empty() {
        println!("No items registered for {}.", contract.number);
        return Ok(());
    }
    display::print_table(&item_rows_batch(&summary.rows)?)?;
    Ok(())
}

pub async fn list_contracts<S: TabularStore>(ledger: &Ledger<S>) -> anyhow::Result<()> {
    let contracts = ledger.contracts().await;
    if contracts.is_empty() {
        println!("No contracts registered.");
        return Ok(());
    }
    display::print_table(&contract_list_batch(&contracts)?)
}

pub async fn add_contract<S: TabularStore>(
    ledger: &Ledger<S>,
    new: NewContract,
) -> anyhow::Result<()> {
    let contract = ledger.create_contract(new).await?;
    println!("Contract {} registered (id {}).", contract.number, contract.id);
    Ok(())
}

pub async fn list_items<S: TabularStore>(ledger: &Ledger<S>, contract: &str) -> anyhow::Result<()> {
    let (contracts, items) = tokio::join!(ledger.contracts(), ledger.items());
    let contract = resolve_contract(&contracts, contract)?;
    let own: Vec<&Item> = items.iter().filter(|i| i.contract_id == contract.id).collect();
    if own.is_empty() {
        println!("No items registered for {}.", contract.number);
    } else {
        display::print_table(&item_list_batch(contract, &own)?)?;
    }
    display::print_budget(&BudgetCheck::for_contract(contract, &items));
    Ok(())
}

pub async fn add_item<S: TabularStore>(
    ledger: &Ledger<S>,
    contract: &str,
    description: String,
    unit_value: f64,
    deadline: Option<NaiveDate>,
) -> anyhow::Result<()> {
    let contracts = ledger.contracts().await;
    let contract = resolve_contract(&contracts, contract)?;
    let receipt = ledger
        .create_item(NewItem {
            contract_id: contract.id.clone(),
            description,
            unit_value,
            deadline,
        })
        .await?;
    println!(
        "Item {:?} added to {} (id {}).",
        receipt.item.description, contract.number, receipt.item.id
    );
    display::print_budget(&receipt.budget);
    Ok(())
}

pub async fn edit_item<S: TabularStore>(
    ledger: &Ledger<S>,
    contract: &str,
    item: &str,
    description: Option<String>,
    unit_value: Option<f64>,
) -> anyhow::Result<()> {
    let patch = ItemPatch {
        description,
        unit_value,
    };
    if patch.is_empty() {
        bail!("nothing to change: pass --description and/or --unit-value");
    }
    let (contracts, items) = tokio::join!(ledger.contracts(), ledger.items());
    let contract = resolve_contract(&contracts, contract)?;
    let item = resolve_item(contract, &items, item)?;

    let receipt = ledger.update_item(&item.id, patch).await?;
    println!("Item {:?} updated.", receipt.item.description);
    display::print_budget(&receipt.budget);
    Ok(())
}

pub async fn delete_item<S: TabularStore>(
    ledger: &Ledger<S>,
    contract: &str,
    item: &str,
) -> anyhow::Result<()> {
    let (contracts, items) = tokio::join!(ledger.contracts(), ledger.items());
    let contract = resolve_contract(&contracts, contract)?;
    let item = resolve_item(contract, &items, item)?;

    ledger
        .delete_item(&item.id)
        .await
        .with_context(|| format!("cannot delete item {:?}", item.description))?;
    println!("Item {:?} deleted from {}.", item.description, contract.number);
    Ok(())
}

pub async fn measure<S: TabularStore>(
    ledger: &Ledger<S>,
    input: MeasureInput,
) -> anyhow::Result<()> {
    let (contracts, items) = tokio::join!(ledger.contracts(), ledger.items());
    let contract = resolve_contract(&contracts, &input.contract)?;
    let item = resolve_item(contract, &items, &input.item)?;

    let receipt = ledger
        .record_measurement(NewMeasurement {
            item_id: item.id.clone(),
            date: input.date,
            fraction: input.fraction,
            phase: input.phase,
            note: input.note,
        })
        .await?;
    display::print_measurement_receipt(item, &receipt);
    Ok(())
}

pub async fn kanban<S: TabularStore>(
    ledger: &Ledger<S>,
    contract: Option<&str>,
    as_table: bool,
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    let snapshot = ledger.snapshot().await;
    let contract_id = match contract {
        Some(key) => Some(resolve_contract(&snapshot.contracts, key)?.id.as_str()),
        None => None,
    };
    let board = KanbanBoard::build(&snapshot.items, &snapshot.measurements, contract_id, now);
    if board.is_empty() {
        println!("No measurements recorded yet.");
        return Ok(());
    }
    if as_table {
        display::print_table(&kanban_batch(&board)?)?;
    } else {
        display::print_kanban(&board);
    }
    Ok(())
}

pub async fn export<S: TabularStore>(
    ledger: &Ledger<S>,
    contract: &str,
    out: &Path,
    delimiter: u8,
    today: NaiveDate,
) -> anyhow::Result<()> {
    let snapshot = ledger.snapshot().await;
    let contract = resolve_contract(&snapshot.contracts, contract)?;
    let summary = summarize_contract(contract, &snapshot.items, &snapshot.measurements, today);
    let rows = export_contract_csv(out, &summary, delimiter)
        .with_context(|| format!("exporting {}", contract.number))?;
    println!("Wrote {rows} items to {}.", out.display());
    Ok(())
}

// ── Lookup ──

/// Find a contract by id or number; the error lists what exists.
fn resolve_contract<'a>(contracts: &'a [Contract], key: &str) -> anyhow::Result<&'a Contract> {
    if let Some(contract) = contracts.iter().find(|c| c.matches(key)) {
        return Ok(contract);
    }
    if contracts.is_empty() {
        bail!("unknown contract {key:?}: no contracts registered");
    }
    let known: Vec<&str> = contracts.iter().map(|c| c.number.as_str()).collect();
    bail!("unknown contract {key:?}; known contracts: {}", known.join(", "))
}

/// Find an item of `contract` by id or description.
fn resolve_item<'a>(
    contract: &Contract,
    items: &'a [Item],
    key: &str,
) -> anyhow::Result<&'a Item> {
    let mut own = items.iter().filter(|i| i.contract_id == contract.id).peekable();
    if own.peek().is_none() {
        bail!("contract {} has no items", contract.number);
    }
    let own: Vec<&Item> = own.collect();
    if let Some(item) = own.iter().copied().find(|i| i.matches(key)) {
        return Ok(item);
    }
    let known: Vec<&str> = own.iter().map(|i| i.description.as_str()).collect();
    bail!(
        "unknown item {key:?} in {}; items: {}",
        contract.number,
        known.join(", ")
    )
}
