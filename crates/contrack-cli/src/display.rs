//! Terminal rendering: pretty-printed tables and vertical cards.
//!
//! Tables go through Arrow's pretty printer; cards are grouped sections of
//! padded `label  value` lines.

use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use contrack_core::{
    BudgetCheck, ContractSummary, Item, KanbanBoard, KanbanCard, PortfolioTotals, Progression,
    RETENTION_RATE, STALE_AFTER_DAYS, format_currency, format_date, format_percent,
};
use contrack_sync::MeasurementReceipt;

const LABEL_WIDTH: usize = 22;
const BAR_WIDTH: usize = 30;

// ── Public API ──

pub fn print_table(batch: &RecordBatch) -> anyhow::Result<()> {
    println!("{}", pretty_format_batches(std::slice::from_ref(batch))?);
    Ok(())
}

pub fn print_totals(totals: &PortfolioTotals) {
    println!("=== Portfolio ===");
    field("Contracted", &format_currency(totals.contracted));
    field("Measured", &format_currency(totals.measured));
    field("Balance", &format_currency(totals.balance));
    println!();
}

/// Financial card of one contract.
pub fn print_contract_card(summary: &ContractSummary) {
    let c = &summary.contract;
    println!(
        "=== {} {} ({}) ===",
        summary.status.signal().symbol(),
        c.number,
        summary.status.as_str()
    );

    section("Contract");
    field("Supplier", or_dash(&c.supplier));
    if !c.client.trim().is_empty() {
        field("Client", &c.client);
    }
    field("Manager", or_dash(&c.manager));
    field(
        "Period",
        &format!("{} to {}", format_date(&c.start_date), format_date(&c.end_date)),
    );
    if !c.status.trim().is_empty() {
        field("Status", &c.status);
    }

    section("Financials");
    let f = &summary.financials;
    field("Contract value", &format_currency(c.total_value));
    field("Gross measured", &format_currency(f.gross));
    field(
        &format!("Retention ({:.0}%)", RETENTION_RATE * 100.0),
        &format!("- {}", format_currency(f.retention)),
    );
    field("Net payable", &format_currency(f.net));
    field("Remaining balance", &format_currency(summary.remaining_balance));
    field(
        "Consumed",
        &format!(
            "{} {}",
            bar(summary.percent_consumed),
            format_percent(summary.percent_consumed)
        ),
    );
    field(
        "Items measured",
        &format!("{} of {}", summary.measured_items(), summary.rows.len()),
    );
    println!();
}

pub fn print_budget(budget: &BudgetCheck) {
    section("Budget");
    field("Itemised", &format_currency(budget.itemized_total));
    field("Contract total", &format_currency(budget.contract_total));
    field(
        "Allocated",
        &format!("{} {}", bar(budget.ratio), format_percent(budget.ratio)),
    );
    if budget.exceeds {
        println!(
            "  ⚠ itemised values exceed the contract total by {}",
            format_currency(-budget.unallocated())
        );
    } else {
        field("Unallocated", &format_currency(budget.unallocated()));
    }
}

/// Board sections in workflow order; empty columns are listed too.
pub fn print_kanban(board: &KanbanBoard) {
    for column in &board.columns {
        println!("── {} ({}) ──", column.phase.label(), column.cards.len());
        for card in &column.cards {
            print_card(card);
        }
        println!();
    }
    if !board.unclassified.is_empty() {
        println!("── Unclassified ({}) ──", board.unclassified.len());
        for card in &board.unclassified {
            print_card(card);
            if !card.phase_label.is_empty() {
                println!("      phase: {:?}", card.phase_label);
            }
        }
        println!();
    }
    let stalled = board.stalled_count();
    if stalled > 0 {
        println!("⚠ {stalled} card(s) not updated in over {STALE_AFTER_DAYS} days");
    }
}

pub fn print_measurement_receipt(item: &Item, receipt: &MeasurementReceipt) {
    let m = &receipt.measurement;
    println!("Measurement recorded for {:?}.", item.description);
    field("Date", &format_date(&m.date));
    field("Cumulative", &format_percent(m.fraction));
    field("Accrued value", &format_currency(m.value));
    field("Phase", &m.phase_label);
    if let Some(note) = &m.note {
        field("Note", note);
    }
    match receipt.progression {
        Progression::First => println!("  first measurement of this item"),
        Progression::Advance { previous } => {
            println!("  up from {}", format_percent(previous))
        }
        Progression::Unchanged => println!("  unchanged since the last measurement"),
        Progression::Regression { previous } => println!(
            "  ⚠ cumulative percentage went down from {}",
            format_percent(previous)
        ),
    }
}

// ── Helpers ──

fn section(header: &str) {
    println!("{header}");
}

fn field(label: &str, value: &str) {
    println!("  {label:<LABEL_WIDTH$} {value}");
}

fn or_dash(s: &str) -> &str {
    if s.trim().is_empty() { "-" } else { s }
}

fn print_card(card: &KanbanCard) {
    let alert = if card.stalled { "  ⚠ stalled" } else { "" };
    println!(
        "  {:<30} {:>8}  {}{alert}",
        card.description,
        format_percent(card.fraction),
        format_currency(card.value)
    );
}

/// Text progress bar for a fraction in `[0, 1]`.
fn bar(fraction: f64) -> String {
    let filled = (fraction.clamp(0.0, 1.0) * BAR_WIDTH as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}
