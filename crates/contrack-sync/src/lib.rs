//! Data access: the tabular store seam, the reqwest transport, and the ledger.

pub mod cache;
pub mod ledger;
pub mod store;

#[cfg(feature = "http")]
pub mod http;

pub use ledger::{
    ItemReceipt, Ledger, LedgerError, MeasurementReceipt, NewContract, NewItem, NewMeasurement,
};
pub use store::{StoreConfig, StoreError, Table, TabularStore, WriteOp, WriteRequest};

#[cfg(feature = "http")]
pub use http::HttpStore;
