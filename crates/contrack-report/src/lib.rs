//! Tabular layer: Arrow RecordBatches for every contrack view, and the CSV export.

mod error;
pub use error::ReportError;

pub mod batches;
pub mod export;

pub use batches::{
    contract_list_batch, dashboard_batch, item_list_batch, item_rows_batch, kanban_batch,
};
pub use export::{DEFAULT_DELIMITER, export_batch, export_contract_csv, write_csv};
