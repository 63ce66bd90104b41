pub mod budget;
pub mod coerce;
pub mod dates;
pub mod engine;
pub mod format;
pub mod guard;
pub mod kanban;
pub mod model;
pub mod schema;
pub mod sort_key;

pub use budget::BudgetCheck;
pub use engine::{
    ContractStatus, ContractSummary, Dashboard, Financials, ItemRow, NET_RATE, PortfolioTotals,
    RETENTION_RATE, latest_per_item, summarize_contract,
};
pub use format::{ScheduleStatus, Signal, format_currency, format_date, format_percent, schedule_status};
pub use guard::{GuardError, Progression, ensure_item_deletable};
pub use kanban::{KanbanBoard, KanbanCard, KanbanColumn, STALE_AFTER_DAYS};
pub use model::{Contract, Item, ItemPatch, Measurement, Snapshot, WorkflowPhase};
pub use schema::tables;
pub use sort_key::natural_key;
