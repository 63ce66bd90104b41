//! Typed reads and guarded writes on top of a [`TabularStore`].

use chrono::{Local, NaiveDate};
use contrack_core::coerce::decode_records;
use contrack_core::dates::timestamp_text;
use contrack_core::{
    BudgetCheck, Contract, GuardError, Item, ItemPatch, Measurement, Progression, Snapshot,
    WorkflowPhase, ensure_item_deletable, latest_per_item,
};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::store::{StoreError, Table, TabularStore, WriteRequest};

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("backend request failed: {0}")]
    Store(#[from] StoreError),
    #[error(transparent)]
    Guard(#[from] GuardError),
    #[error("unknown contract: {0}")]
    UnknownContract(String),
    #[error("unknown item: {0}")]
    UnknownItem(String),
    #[error("invalid input: {0}")]
    Invalid(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Input for a new contract.
#[derive(Debug, Clone, PartialEq)]
pub struct NewContract {
    pub number: String,
    pub supplier: String,
    pub client: String,
    pub manager: String,
    pub total_value: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: String,
}

/// Input for a new item.
#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    pub contract_id: String,
    pub description: String,
    pub unit_value: f64,
    pub deadline: Option<NaiveDate>,
}

/// Input for a new measurement. The accrued value is derived from the item.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMeasurement {
    pub item_id: String,
    pub date: NaiveDate,
    /// Cumulative fraction complete, 0.0–1.0.
    pub fraction: f64,
    pub phase: WorkflowPhase,
    pub note: Option<String>,
}

/// Result of an item create or update, with the contract's budget position.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemReceipt {
    pub item: Item,
    pub budget: BudgetCheck,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementReceipt {
    pub measurement: Measurement,
    pub progression: Progression,
}

/// Domain operations over the three backend tables.
pub struct Ledger<S> {
    store: S,
}

impl<S: TabularStore> Ledger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn contracts(&self) -> Vec<Contract> {
        decode_records(Table::Contracts.name(), self.store.fetch(Table::Contracts).await)
    }

    pub async fn items(&self) -> Vec<Item> {
        decode_records(Table::Items.name(), self.store.fetch(Table::Items).await)
    }

    pub async fn measurements(&self) -> Vec<Measurement> {
        decode_records(
            Table::Measurements.name(),
            self.store.fetch(Table::Measurements).await,
        )
    }

    /// All three tables, fetched together.
    pub async fn snapshot(&self) -> Snapshot {
        let (contracts, items, measurements) =
            tokio::join!(self.contracts(), self.items(), self.measurements());
        Snapshot {
            contracts,
            items,
            measurements,
        }
    }

    pub async fn create_contract(&self, new: NewContract) -> Result<Contract, LedgerError> {
        let number = required("contract number", &new.number)?;
        non_negative("total value", new.total_value)?;
        if new.end_date < new.start_date {
            return Err(LedgerError::Invalid(format!(
                "end date {} is before start date {}",
                new.end_date, new.start_date
            )));
        }

        let contract = Contract {
            id: new_id(),
            number,
            supplier: new.supplier.trim().to_string(),
            client: new.client.trim().to_string(),
            manager: new.manager.trim().to_string(),
            total_value: new.total_value,
            start_date: new.start_date.format("%Y-%m-%d").to_string(),
            end_date: new.end_date.format("%Y-%m-%d").to_string(),
            status: new.status.trim().to_string(),
        };
        let request = WriteRequest::create(Table::Contracts, serde_json::to_value(&contract)?);
        self.store.write(&request).await?;
        info!(contract_id = %contract.id, number = %contract.number, "contract created");
        Ok(contract)
    }

    pub async fn create_item(&self, new: NewItem) -> Result<ItemReceipt, LedgerError> {
        let description = required("item description", &new.description)?;
        non_negative("unit value", new.unit_value)?;
        let contract = self
            .contracts()
            .await
            .into_iter()
            .find(|c| c.id == new.contract_id)
            .ok_or_else(|| LedgerError::UnknownContract(new.contract_id.clone()))?;

        let item = Item {
            id: new_id(),
            contract_id: contract.id.clone(),
            description,
            unit_value: new.unit_value,
            deadline: new.deadline.map(|d| d.format("%Y-%m-%d").to_string()),
        };
        let request = WriteRequest::create(Table::Items, serde_json::to_value(&item)?);
        self.store.write(&request).await?;

        let mut items = self.items().await;
        if !items.iter().any(|i| i.id == item.id) {
            items.push(item.clone());
        }
        let budget = BudgetCheck::for_contract(&contract, &items);
        if budget.exceeds {
            warn!(
                contract_id = %contract.id,
                itemized = budget.itemized_total,
                total = budget.contract_total,
                "itemised values exceed the contract total"
            );
        }
        info!(item_id = %item.id, contract_id = %contract.id, "item created");
        Ok(ItemReceipt { item, budget })
    }

    /// Change an item's description and/or unit value.
    pub async fn update_item(
        &self,
        item_id: &str,
        patch: ItemPatch,
    ) -> Result<ItemReceipt, LedgerError> {
        if patch.is_empty() {
            return Err(LedgerError::Invalid("nothing to update".into()));
        }
        if let Some(description) = &patch.description {
            required("item description", description)?;
        }
        if let Some(unit_value) = patch.unit_value {
            non_negative("unit value", unit_value)?;
        }

        let mut items = self.items().await;
        let item = items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| LedgerError::UnknownItem(item_id.to_string()))?;
        patch.apply(item);
        let item = item.clone();

        let request = WriteRequest::update(Table::Items, item_id, serde_json::to_value(&patch)?);
        self.store.write(&request).await?;

        let budget = match self
            .contracts()
            .await
            .into_iter()
            .find(|c| c.id == item.contract_id)
        {
            Some(contract) => BudgetCheck::for_contract(&contract, &items),
            None => BudgetCheck::evaluate(0.0, [item.unit_value]),
        };
        info!(item_id, "item updated");
        Ok(ItemReceipt { item, budget })
    }

    /// Delete an item that has never been measured.
    ///
    /// The guard runs before any write is issued, on a read that must
    /// succeed: if the measurements cannot be fetched the delete is refused.
    pub async fn delete_item(&self, item_id: &str) -> Result<(), LedgerError> {
        let (items, measurements) = tokio::join!(
            self.items(),
            self.store.try_fetch(Table::Measurements)
        );
        if !items.iter().any(|i| i.id == item_id) {
            return Err(LedgerError::UnknownItem(item_id.to_string()));
        }
        let measurements: Vec<Measurement> =
            decode_records(Table::Measurements.name(), measurements?);
        ensure_item_deletable(item_id, &measurements)?;

        self.store
            .write(&WriteRequest::delete(Table::Items, item_id))
            .await?;
        info!(item_id, "item deleted");
        Ok(())
    }

    /// Append a measurement. The accrued value is `fraction × unit value`,
    /// fixed now and never re-derived.
    pub async fn record_measurement(
        &self,
        new: NewMeasurement,
    ) -> Result<MeasurementReceipt, LedgerError> {
        if !(0.0..=1.0).contains(&new.fraction) {
            return Err(LedgerError::Invalid(format!(
                "fraction {} is outside 0..=1",
                new.fraction
            )));
        }
        let (items, measurements) = tokio::join!(self.items(), self.measurements());
        let item = items
            .iter()
            .find(|i| i.id == new.item_id)
            .ok_or_else(|| LedgerError::UnknownItem(new.item_id.clone()))?;

        let latest = latest_per_item(&measurements);
        let previous = latest.get(item.id.as_str()).map(|m| m.fraction);
        let progression = Progression::assess(previous, new.fraction);
        if let Progression::Regression { previous } = progression {
            warn!(
                item_id = %item.id,
                previous,
                next = new.fraction,
                "cumulative percentage went down"
            );
        }

        let measurement = Measurement {
            id: new_id(),
            item_id: item.id.clone(),
            date: new.date.format("%Y-%m-%d").to_string(),
            fraction: new.fraction,
            value: new.fraction * item.unit_value,
            phase_label: new.phase.label().to_string(),
            updated_at: timestamp_text(Local::now().naive_local()),
            note: new
                .note
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
        };
        let request =
            WriteRequest::create(Table::Measurements, serde_json::to_value(&measurement)?);
        self.store.write(&request).await?;
        info!(
            item_id = %measurement.item_id,
            fraction = measurement.fraction,
            value = measurement.value,
            "measurement recorded"
        );
        Ok(MeasurementReceipt {
            measurement,
            progression,
        })
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn required(field: &str, value: &str) -> Result<String, LedgerError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(LedgerError::Invalid(format!("{field} must not be empty")));
    }
    Ok(value.to_string())
}

fn non_negative(field: &str, value: f64) -> Result<(), LedgerError> {
    if !value.is_finite() || value < 0.0 {
        return Err(LedgerError::Invalid(format!(
            "{field} must be a non-negative number, got {value}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::{Value, json};

    use crate::store::WriteOp;

    /// In-memory store: creates are appended to the table, every write is
    /// recorded, and writes or reads of one table can be made to fail.
    #[derive(Default)]
    struct MemoryStore {
        tables: Mutex<HashMap<Table, Vec<Value>>>,
        writes: Mutex<Vec<WriteRequest>>,
        fail_writes: bool,
        fail_reads_of: Option<Table>,
    }

    impl MemoryStore {
        fn with(table: Table, rows: Vec<Value>) -> Self {
            let store = Self::default();
            store.tables.lock().unwrap().insert(table, rows);
            store
        }

        fn seed(self, table: Table, rows: Vec<Value>) -> Self {
            self.tables.lock().unwrap().insert(table, rows);
            self
        }

        fn writes(&self) -> Vec<WriteRequest> {
            self.writes.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TabularStore for MemoryStore {
        async fn try_fetch(&self, table: Table) -> Result<Vec<Value>, StoreError> {
            if self.fail_reads_of == Some(table) {
                return Err(StoreError::Server {
                    status: 503,
                    body: "unavailable".into(),
                });
            }
            Ok(self
                .tables
                .lock()
                .unwrap()
                .get(&table)
                .cloned()
                .unwrap_or_default())
        }

        async fn write(&self, request: &WriteRequest) -> Result<(), StoreError> {
            self.writes.lock().unwrap().push(request.clone());
            if self.fail_writes {
                return Err(StoreError::Other("backend unavailable".into()));
            }
            if request.op == WriteOp::Create {
                self.tables
                    .lock()
                    .unwrap()
                    .entry(request.table)
                    .or_default()
                    .push(request.data.clone());
            }
            Ok(())
        }
    }

    fn seeded() -> MemoryStore {
        MemoryStore::with(
            Table::Contracts,
            vec![json!({
                "contract_id": "c-1", "ctt": "CTT-1", "valor_contrato": 10000,
                "data_inicio": "2025-01-01", "data_fim": "2025-06-30"
            })],
        )
        .seed(
            Table::Items,
            vec![
                json!({"item_id": "i-1", "contract_id": "c-1", "descricao_item": "Fundação", "vlr_unit": 10000}),
                json!({"item_id": "i-2", "contract_id": "c-1", "descricao_item": "Pintura", "vlr_unit": "0"}),
            ],
        )
        .seed(
            Table::Measurements,
            vec![json!({
                "measurement_id": "m-1", "item_id": "i-1", "data_medicao": "2025-01-05",
                "percentual_acumulado": 0.5, "valor_acumulado": 5000,
                "fase_workflow": "Em execução", "updated_at": "2025-01-05 10:00:00"
            })],
        )
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[tokio::test]
    async fn snapshot_decodes_all_tables() {
        let ledger = Ledger::new(seeded());
        let snapshot = ledger.snapshot().await;
        assert_eq!(snapshot.contracts.len(), 1);
        assert_eq!(snapshot.items.len(), 2);
        assert_eq!(snapshot.measurements.len(), 1);
        assert_eq!(snapshot.contracts[0].total_value, 10000.0);
    }

    #[tokio::test]
    async fn deleting_a_measured_item_issues_no_write() {
        let ledger = Ledger::new(seeded());
        let err = ledger.delete_item("i-1").await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Guard(GuardError::ItemHasMeasurements { count: 1, .. })
        ));
        assert!(ledger.store().writes().is_empty());
    }

    #[tokio::test]
    async fn unreadable_measurements_block_the_delete() {
        let store = MemoryStore {
            fail_reads_of: Some(Table::Measurements),
            ..seeded()
        };
        let ledger = Ledger::new(store);
        // Plain reads degrade to an empty table; the guard must not.
        assert!(ledger.measurements().await.is_empty());

        let err = ledger.delete_item("i-1").await.unwrap_err();
        assert!(matches!(err, LedgerError::Store(StoreError::Server { status: 503, .. })));
        assert!(ledger.store().writes().is_empty());
    }

    #[tokio::test]
    async fn deleting_an_unmeasured_item_writes_a_keyed_delete() {
        let ledger = Ledger::new(seeded());
        ledger.delete_item("i-2").await.unwrap();
        let writes = ledger.store().writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].op, WriteOp::Delete);
        assert_eq!(writes[0].key, Some(("item_id".into(), "i-2".into())));
    }

    #[tokio::test]
    async fn deleting_an_unknown_item_fails() {
        let ledger = Ledger::new(seeded());
        assert!(matches!(
            ledger.delete_item("nope").await,
            Err(LedgerError::UnknownItem(_))
        ));
        assert!(ledger.store().writes().is_empty());
    }

    #[tokio::test]
    async fn measurement_value_is_fixed_at_entry() {
        let ledger = Ledger::new(seeded());
        let receipt = ledger
            .record_measurement(NewMeasurement {
                item_id: "i-1".into(),
                date: date("2025-01-20"),
                fraction: 0.75,
                phase: WorkflowPhase::MeasurementSubmitted,
                note: Some("  ".into()),
            })
            .await
            .unwrap();
        assert_eq!(receipt.measurement.value, 7500.0);
        assert_eq!(receipt.measurement.phase_label, "Medição lançada");
        assert_eq!(receipt.measurement.date, "2025-01-20");
        assert!(receipt.measurement.note.is_none());
        assert_eq!(receipt.progression, Progression::Advance { previous: 0.5 });

        let writes = ledger.store().writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].table, Table::Measurements);
        assert_eq!(writes[0].data["valor_acumulado"], json!(7500.0));
        assert!(writes[0].data["updated_at"].as_str().is_some());
    }

    #[tokio::test]
    async fn regression_is_advisory() {
        let ledger = Ledger::new(seeded());
        let receipt = ledger
            .record_measurement(NewMeasurement {
                item_id: "i-1".into(),
                date: date("2025-01-20"),
                fraction: 0.25,
                phase: WorkflowPhase::InProgress,
                note: None,
            })
            .await
            .unwrap();
        assert!(receipt.progression.is_regression());
        assert_eq!(ledger.store().writes().len(), 1);
    }

    #[tokio::test]
    async fn fraction_out_of_range_is_rejected() {
        let ledger = Ledger::new(seeded());
        let result = ledger
            .record_measurement(NewMeasurement {
                item_id: "i-1".into(),
                date: date("2025-01-20"),
                fraction: 1.5,
                phase: WorkflowPhase::InProgress,
                note: None,
            })
            .await;
        assert!(matches!(result, Err(LedgerError::Invalid(_))));
        assert!(ledger.store().writes().is_empty());
    }

    #[tokio::test]
    async fn first_measurement_of_an_item() {
        let ledger = Ledger::new(seeded());
        let receipt = ledger
            .record_measurement(NewMeasurement {
                item_id: "i-2".into(),
                date: date("2025-01-20"),
                fraction: 1.0,
                phase: WorkflowPhase::Approved,
                note: Some("entregue".into()),
            })
            .await
            .unwrap();
        assert_eq!(receipt.progression, Progression::First);
        assert_eq!(receipt.measurement.value, 0.0);
        assert_eq!(receipt.measurement.note.as_deref(), Some("entregue"));
    }

    #[tokio::test]
    async fn create_item_flags_budget_overrun() {
        let ledger = Ledger::new(seeded());
        let receipt = ledger
            .create_item(NewItem {
                contract_id: "c-1".into(),
                description: " Telhado ".into(),
                unit_value: 2500.0,
                deadline: Some(date("2025-04-01")),
            })
            .await
            .unwrap();
        assert_eq!(receipt.item.description, "Telhado");
        assert_eq!(receipt.item.deadline.as_deref(), Some("2025-04-01"));
        assert!(receipt.budget.exceeds);
        assert_eq!(receipt.budget.itemized_total, 12500.0);
        assert_eq!(ledger.items().await.len(), 3);
    }

    #[tokio::test]
    async fn create_item_needs_a_known_contract() {
        let ledger = Ledger::new(seeded());
        let result = ledger
            .create_item(NewItem {
                contract_id: "c-404".into(),
                description: "X".into(),
                unit_value: 1.0,
                deadline: None,
            })
            .await;
        assert!(matches!(result, Err(LedgerError::UnknownContract(_))));
    }

    #[tokio::test]
    async fn update_item_sends_only_the_patch() {
        let ledger = Ledger::new(seeded());
        let receipt = ledger
            .update_item(
                "i-2",
                ItemPatch {
                    unit_value: Some(500.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(receipt.item.description, "Pintura");
        assert_eq!(receipt.item.unit_value, 500.0);
        assert_eq!(receipt.budget.itemized_total, 10500.0);

        let writes = ledger.store().writes();
        assert_eq!(writes[0].op, WriteOp::Update);
        assert_eq!(writes[0].data, json!({"vlr_unit": 500.0}));
        assert_eq!(writes[0].key, Some(("item_id".into(), "i-2".into())));
    }

    #[tokio::test]
    async fn empty_patch_is_rejected() {
        let ledger = Ledger::new(seeded());
        let result = ledger.update_item("i-2", ItemPatch::default()).await;
        assert!(matches!(result, Err(LedgerError::Invalid(_))));
    }

    #[tokio::test]
    async fn create_contract_validates_dates() {
        let ledger = Ledger::new(MemoryStore::default());
        let new = NewContract {
            number: "CTT-2".into(),
            supplier: "Acme".into(),
            client: "Prefeitura".into(),
            manager: "Ana".into(),
            total_value: 100.0,
            start_date: date("2025-02-01"),
            end_date: date("2025-01-01"),
            status: "Ativo".into(),
        };
        assert!(matches!(
            ledger.create_contract(new.clone()).await,
            Err(LedgerError::Invalid(_))
        ));

        let contract = ledger
            .create_contract(NewContract {
                end_date: date("2025-12-31"),
                ..new
            })
            .await
            .unwrap();
        assert_eq!(contract.end_date, "2025-12-31");
        assert_eq!(ledger.contracts().await, vec![contract]);
    }

    #[tokio::test]
    async fn failed_write_surfaces_as_store_error() {
        let store = MemoryStore {
            fail_writes: true,
            ..seeded()
        };
        let ledger = Ledger::new(store);
        let result = ledger.delete_item("i-2").await;
        assert!(matches!(result, Err(LedgerError::Store(_))));
    }
}
