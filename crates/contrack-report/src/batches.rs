//! Display tables: engine output rendered into Arrow RecordBatches.
//!
//! Every column here is preformatted text (Brazilian currency, dates,
//! status lights) so the CLI can hand the batch straight to a pretty
//! printer. Raw numbers for the export live in [`crate::export`].

use std::sync::Arc;

use arrow::array::{ArrayRef, StringArray};
use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;
use contrack_core::dates::parse_timestamp;
use contrack_core::{
    Contract, Dashboard, Item, ItemRow, KanbanBoard, format_currency, format_date, format_percent,
    tables,
};

use crate::ReportError;

/// Drill-down table of one contract.
pub fn item_rows_batch(rows: &[ItemRow]) -> Result<RecordBatch, ReportError> {
    build(
        tables::item_detail_schema(),
        vec![
            utf8(rows.iter().map(|r| r.item.description.clone())),
            utf8(rows.iter().map(|r| format_currency(r.item.unit_value))),
            utf8(rows.iter().map(|r| format_percent(r.fraction))),
            utf8(rows.iter().map(|r| format_currency(r.value))),
            utf8(rows.iter().map(|r| format_currency(r.balance))),
            utf8(rows.iter().map(|r| {
                r.latest
                    .as_ref()
                    .map_or_else(|| "-".to_string(), |m| format_date(&m.date))
            })),
            opt_utf8(rows.iter().map(|r| {
                r.latest
                    .as_ref()
                    .map(|m| m.phase_label.clone())
                    .filter(|p| !p.is_empty())
            })),
            utf8(rows.iter().map(|r| r.schedule.to_string())),
        ],
    )
}

/// One line per contract, in dashboard order.
pub fn dashboard_batch(dashboard: &Dashboard) -> Result<RecordBatch, ReportError> {
    let s = &dashboard.summaries;
    build(
        tables::dashboard_schema(),
        vec![
            utf8(s.iter().map(|c| {
                format!("{} {}", c.status.signal().symbol(), c.status.as_str())
            })),
            utf8(s.iter().map(|c| c.contract.number.clone())),
            utf8(s.iter().map(|c| c.contract.supplier.clone())),
            utf8(s.iter().map(|c| c.contract.manager.clone())),
            utf8(s.iter().map(|c| format_currency(c.financials.gross))),
            utf8(s.iter().map(|c| format_currency(c.financials.retention))),
            utf8(s.iter().map(|c| format_currency(c.financials.net))),
            utf8(s.iter().map(|c| format_currency(c.remaining_balance))),
            utf8(s.iter().map(|c| format_percent(c.percent_consumed))),
        ],
    )
}

pub fn contract_list_batch(contracts: &[Contract]) -> Result<RecordBatch, ReportError> {
    build(
        tables::contract_list_schema(),
        vec![
            utf8(contracts.iter().map(|c| c.number.clone())),
            utf8(contracts.iter().map(|c| c.supplier.clone())),
            opt_utf8(contracts.iter().map(|c| non_empty(&c.client))),
            utf8(contracts.iter().map(|c| c.manager.clone())),
            utf8(contracts.iter().map(|c| format_currency(c.total_value))),
            utf8(contracts.iter().map(|c| format_date(&c.start_date))),
            utf8(contracts.iter().map(|c| format_date(&c.end_date))),
            opt_utf8(contracts.iter().map(|c| non_empty(&c.status))),
        ],
    )
}

/// Items registered under `contract`; deadlines fall back to its end date.
pub fn item_list_batch(contract: &Contract, items: &[&Item]) -> Result<RecordBatch, ReportError> {
    build(
        tables::item_list_schema(),
        vec![
            utf8(items.iter().map(|i| i.id.clone())),
            utf8(items.iter().map(|i| i.description.clone())),
            utf8(items.iter().map(|i| format_currency(i.unit_value))),
            utf8(items.iter().map(|i| format_date(i.deadline_or(contract)))),
        ],
    )
}

/// Workflow board flattened to one row per card, column by column.
pub fn kanban_batch(board: &KanbanBoard) -> Result<RecordBatch, ReportError> {
    let cards: Vec<(String, &contrack_core::KanbanCard)> = board
        .columns
        .iter()
        .flat_map(|col| col.cards.iter().map(|card| (col.phase.label().to_string(), card)))
        .chain(board.unclassified.iter().map(|card| {
            let label = if card.phase_label.is_empty() {
                "(no phase)".to_string()
            } else {
                card.phase_label.clone()
            };
            (label, card)
        }))
        .collect();

    build(
        tables::kanban_schema(),
        vec![
            utf8(cards.iter().map(|(phase, _)| phase.clone())),
            utf8(cards.iter().map(|(_, c)| c.description.clone())),
            utf8(cards.iter().map(|(_, c)| format_percent(c.fraction))),
            utf8(cards.iter().map(|(_, c)| format_currency(c.value))),
            utf8(cards.iter().map(|(_, c)| format_timestamp(&c.updated_at))),
            opt_utf8(cards.iter().map(|(_, c)| c.stalled.then(|| "⚠ stalled".to_string()))),
        ],
    )
}

// ── Helpers ──

fn build(schema: Schema, columns: Vec<ArrayRef>) -> Result<RecordBatch, ReportError> {
    Ok(RecordBatch::try_new(Arc::new(schema), columns)?)
}

fn utf8<I>(values: I) -> ArrayRef
where
    I: IntoIterator<Item = String>,
{
    Arc::new(StringArray::from_iter_values(values))
}

fn opt_utf8<I>(values: I) -> ArrayRef
where
    I: IntoIterator<Item = Option<String>>,
{
    Arc::new(values.into_iter().collect::<StringArray>())
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn format_timestamp(raw: &str) -> String {
    match parse_timestamp(raw) {
        Some(t) => t.format("%d/%m/%Y %H:%M").to_string(),
        None if raw.trim().is_empty() => "-".to_string(),
        None => raw.to_string(),
    }
}
