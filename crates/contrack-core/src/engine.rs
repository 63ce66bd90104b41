//! Measurement aggregation: latest measurement per item, contract financials,
//! and the dashboard view built from them.
//!
//! Everything here is a pure function of the records passed in plus an
//! explicit `today`, so the same snapshot always yields the same figures.

use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::dates::parse_date;
use crate::format::{ScheduleStatus, Signal, schedule_status};
use crate::model::{Contract, Item, Measurement, Snapshot};
use crate::sort_key::natural_key;

/// Fixed share of the gross measured value held back from each payment.
pub const RETENTION_RATE: f64 = 0.15;

/// Share of the gross value that is payable now.
pub const NET_RATE: f64 = 1.0 - RETENTION_RATE;

/// Pick the current measurement of every item.
///
/// The current measurement is the one with the greatest `updated_at`.
/// Timestamps that do not parse rank below every timestamp that does. When
/// two rows tie, the one appearing later in the input wins; the tie is
/// logged because the backend gives no stronger ordering.
pub fn latest_per_item<'a, I>(measurements: I) -> HashMap<&'a str, &'a Measurement>
where
    I: IntoIterator<Item = &'a Measurement>,
{
    let mut latest: HashMap<&str, (Option<NaiveDateTime>, &Measurement)> = HashMap::new();
    for m in measurements {
        let stamp = m.updated_at();
        match latest.entry(m.item_id.as_str()) {
            Entry::Vacant(e) => {
                e.insert((stamp, m));
            }
            Entry::Occupied(mut e) => {
                let (current, previous) = *e.get();
                if stamp == current {
                    debug!(
                        item_id = %m.item_id,
                        kept = %m.id,
                        dropped = %previous.id,
                        "measurements tie on updated_at; keeping the later row"
                    );
                }
                if stamp >= current {
                    e.insert((stamp, m));
                }
            }
        }
    }
    latest.into_iter().map(|(id, (_, m))| (id, m)).collect()
}

/// Gross measured value split into retention and net payable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Financials {
    pub gross: f64,
    pub retention: f64,
    pub net: f64,
}

impl Financials {
    pub fn from_gross(gross: f64) -> Self {
        Self {
            gross,
            retention: gross * RETENTION_RATE,
            net: gross * NET_RATE,
        }
    }
}

/// Contract-level traffic light.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractStatus {
    /// No item of the contract has been measured yet.
    Pending,
    OnTrack,
    /// Some measured item is incomplete and past its deadline.
    Late,
}

impl ContractStatus {
    pub fn signal(&self) -> Signal {
        match self {
            Self::Pending => Signal::Yellow,
            Self::OnTrack => Signal::Green,
            Self::Late => Signal::Red,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::OnTrack => "on track",
            Self::Late => "late",
        }
    }
}

/// One drill-down row: an item paired with its current measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemRow {
    pub item: Item,
    pub latest: Option<Measurement>,
    pub fraction: f64,
    pub value: f64,
    /// `unit_value - value`.
    pub balance: f64,
    /// Item deadline, or the contract end date when the item has none.
    pub deadline: String,
    pub schedule: ScheduleStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContractSummary {
    pub contract: Contract,
    pub financials: Financials,
    /// `total_value - gross`.
    pub remaining_balance: f64,
    /// `gross / total_value`, 0 when the total is 0.
    pub percent_consumed: f64,
    pub status: ContractStatus,
    pub rows: Vec<ItemRow>,
}

impl ContractSummary {
    pub fn measured_items(&self) -> usize {
        self.rows.iter().filter(|r| r.latest.is_some()).count()
    }
}

/// Compute the financial and schedule summary of one contract.
pub fn summarize_contract(
    contract: &Contract,
    items: &[Item],
    measurements: &[Measurement],
    today: NaiveDate,
) -> ContractSummary {
    let mut contract_items: Vec<&Item> = items
        .iter()
        .filter(|i| i.contract_id == contract.id)
        .collect();
    contract_items.sort_by_cached_key(|i| natural_key(&i.description));

    let ids: HashSet<&str> = contract_items.iter().map(|i| i.id.as_str()).collect();
    let latest = latest_per_item(
        measurements
            .iter()
            .filter(|m| ids.contains(m.item_id.as_str())),
    );

    let mut late = false;
    let mut rows = Vec::with_capacity(contract_items.len());
    for item in contract_items {
        let deadline = item.deadline_or(contract).to_string();
        let current = latest.get(item.id.as_str()).copied();
        let (fraction, value) = current.map_or((0.0, 0.0), |m| (m.fraction, m.value));

        if let Some(m) = current
            && m.fraction < 1.0
            && parse_date(&deadline).is_some_and(|d| d < today)
        {
            late = true;
        }

        let schedule = schedule_status(
            &deadline,
            current.map(|m| m.date.as_str()),
            fraction,
            today,
        );
        rows.push(ItemRow {
            item: item.clone(),
            latest: current.cloned(),
            fraction,
            value,
            balance: item.unit_value - value,
            deadline,
            schedule,
        });
    }

    let gross: f64 = rows.iter().map(|r| r.value).sum();
    let status = if latest.is_empty() {
        ContractStatus::Pending
    } else if late {
        ContractStatus::Late
    } else {
        ContractStatus::OnTrack
    };

    ContractSummary {
        contract: contract.clone(),
        financials: Financials::from_gross(gross),
        remaining_balance: contract.total_value - gross,
        percent_consumed: percent_of(gross, contract.total_value),
        status,
        rows,
    }
}

/// `part / whole`, or 0 when `whole` is 0.
pub fn percent_of(part: f64, whole: f64) -> f64 {
    if whole == 0.0 { 0.0 } else { part / whole }
}

/// Portfolio-wide totals shown at the top of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PortfolioTotals {
    pub contracted: f64,
    pub measured: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    /// Totals across every contract, regardless of the manager filter.
    pub totals: PortfolioTotals,
    /// Distinct non-empty managers, sorted.
    pub managers: Vec<String>,
    pub summaries: Vec<ContractSummary>,
}

impl Dashboard {
    /// Summarise every contract, then keep those run by `manager` (if given).
    pub fn build(snapshot: &Snapshot, manager: Option<&str>, today: NaiveDate) -> Self {
        let mut summaries: Vec<ContractSummary> = snapshot
            .contracts
            .iter()
            .map(|c| summarize_contract(c, &snapshot.items, &snapshot.measurements, today))
            .collect();
        summaries.sort_by_cached_key(|s| natural_key(&s.contract.number));

        let contracted: f64 = summaries.iter().map(|s| s.contract.total_value).sum();
        let measured: f64 = summaries.iter().map(|s| s.financials.gross).sum();
        let totals = PortfolioTotals {
            contracted,
            measured,
            balance: contracted - measured,
        };

        let managers: Vec<String> = snapshot
            .contracts
            .iter()
            .map(|c| c.manager.trim())
            .filter(|m| !m.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect();

        if let Some(wanted) = manager.map(str::trim).filter(|m| !m.is_empty()) {
            summaries.retain(|s| s.contract.manager.trim().eq_ignore_ascii_case(wanted));
        }

        Self {
            totals,
            managers,
            summaries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WorkflowPhase;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn contract(id: &str, total: f64, end: &str) -> Contract {
        Contract {
            id: id.into(),
            number: format!("CTT-{id}"),
            supplier: "Acme".into(),
            client: String::new(),
            manager: "Ana".into(),
            total_value: total,
            start_date: "2025-01-01".into(),
            end_date: end.into(),
            status: String::new(),
        }
    }

    fn item(id: &str, contract_id: &str, unit: f64) -> Item {
        Item {
            id: id.into(),
            contract_id: contract_id.into(),
            description: format!("Item {id}"),
            unit_value: unit,
            deadline: None,
        }
    }

    fn measurement(id: &str, item_id: &str, fraction: f64, unit: f64, updated: &str) -> Measurement {
        Measurement {
            id: id.into(),
            item_id: item_id.into(),
            date: updated.get(..10).unwrap_or_default().to_string(),
            fraction,
            value: fraction * unit,
            phase_label: WorkflowPhase::InProgress.label().into(),
            updated_at: updated.into(),
            note: None,
        }
    }

    #[test]
    fn single_item_half_measured() {
        let c = contract("1", 10_000.0, "2099-12-31");
        let items = vec![item("a", "1", 10_000.0)];
        let ms = vec![measurement("m1", "a", 0.5, 10_000.0, "2025-01-05 10:00:00")];
        let s = summarize_contract(&c, &items, &ms, d("2025-01-06"));
        assert_eq!(s.financials.gross, 5000.0);
        assert_eq!(s.financials.retention, 750.0);
        assert_eq!(s.financials.net, 4250.0);
        assert_eq!(s.remaining_balance, 5000.0);
        assert_eq!(s.percent_consumed, 0.5);
        assert_eq!(s.status, ContractStatus::OnTrack);
        assert_eq!(s.rows[0].balance, 5000.0);
    }

    #[test]
    fn unmeasured_item_is_pending() {
        let c = contract("1", 10_000.0, "2025-01-10");
        let items = vec![item("a", "1", 10_000.0)];
        let s = summarize_contract(&c, &items, &[], d("2025-02-01"));
        assert_eq!(s.financials.gross, 0.0);
        assert_eq!(s.status, ContractStatus::Pending);
        assert_eq!(s.status.signal(), Signal::Yellow);
        assert!(s.rows[0].latest.is_none());
        assert_eq!(s.measured_items(), 0);
    }

    #[test]
    fn latest_wins_regardless_of_order() {
        let older = measurement("m1", "a", 0.8, 100.0, "2025-01-01 09:00:00");
        let newer = measurement("m2", "a", 0.3, 100.0, "2025-01-02 09:00:00");
        let forward = [older.clone(), newer.clone()];
        let backward = [newer.clone(), older.clone()];
        assert_eq!(latest_per_item(&forward)["a"].id, "m2");
        assert_eq!(latest_per_item(&backward)["a"].id, "m2");
    }

    #[test]
    fn ties_go_to_the_later_row() {
        let first = measurement("m1", "a", 0.2, 100.0, "2025-01-01 09:00:00");
        let second = measurement("m2", "a", 0.4, 100.0, "2025-01-01 09:00:00");
        assert_eq!(latest_per_item(&[first.clone(), second.clone()])["a"].id, "m2");
        assert_eq!(latest_per_item(&[second, first])["a"].id, "m1");
    }

    #[test]
    fn unparseable_timestamps_rank_lowest() {
        let broken = measurement("m1", "a", 0.9, 100.0, "garbage");
        let valid = measurement("m2", "a", 0.1, 100.0, "2020-01-01 00:00:00");
        assert_eq!(latest_per_item(&[valid, broken])["a"].id, "m2");
    }

    #[test]
    fn gross_uses_only_latest_rows() {
        let c = contract("1", 1000.0, "2099-01-01");
        let items = vec![item("a", "1", 600.0), item("b", "1", 400.0), item("x", "2", 50.0)];
        let ms = vec![
            measurement("m1", "a", 0.5, 600.0, "2025-01-01 08:00:00"),
            measurement("m2", "a", 1.0, 600.0, "2025-01-03 08:00:00"),
            measurement("m3", "b", 0.25, 400.0, "2025-01-02 08:00:00"),
            measurement("m4", "x", 1.0, 50.0, "2025-01-02 08:00:00"),
        ];
        let s = summarize_contract(&c, &items, &ms, d("2025-01-04"));
        assert_eq!(s.financials.gross, 700.0);
        assert_eq!(s.rows.len(), 2);
        assert_eq!(s.remaining_balance, 300.0);
    }

    #[test]
    fn incomplete_item_past_deadline_turns_contract_red() {
        let c = contract("1", 1000.0, "2025-01-10");
        let items = vec![item("a", "1", 500.0), item("b", "1", 500.0)];
        let ms = vec![
            measurement("m1", "a", 1.0, 500.0, "2025-01-05 08:00:00"),
            measurement("m2", "b", 0.5, 500.0, "2025-01-05 08:00:00"),
        ];
        let s = summarize_contract(&c, &items, &ms, d("2025-01-15"));
        assert_eq!(s.status, ContractStatus::Late);

        let on_time = summarize_contract(&c, &items, &ms, d("2025-01-10"));
        assert_eq!(on_time.status, ContractStatus::OnTrack);
    }

    #[test]
    fn item_deadline_overrides_contract_end() {
        let c = contract("1", 1000.0, "2099-01-01");
        let mut a = item("a", "1", 1000.0);
        a.deadline = Some("2025-01-10".into());
        let ms = vec![measurement("m1", "a", 0.2, 1000.0, "2025-01-05 08:00:00")];
        let s = summarize_contract(&c, &[a], &ms, d("2025-01-15"));
        assert_eq!(s.status, ContractStatus::Late);
        assert_eq!(s.rows[0].schedule.label, "5 days late");
        assert_eq!(s.rows[0].schedule.signal, Signal::Red);
    }

    #[test]
    fn completed_item_reports_days_ahead() {
        let c = contract("1", 1000.0, "2025-01-10");
        let items = vec![item("a", "1", 1000.0)];
        let ms = vec![measurement("m1", "a", 1.0, 1000.0, "2025-01-05 08:00:00")];
        let s = summarize_contract(&c, &items, &ms, d("2025-06-01"));
        assert_eq!(s.rows[0].schedule.label, "5 days ahead");
        assert_eq!(s.status, ContractStatus::OnTrack);
    }

    #[test]
    fn zero_total_contract_reports_zero_consumed() {
        let c = contract("1", 0.0, "2099-01-01");
        let items = vec![item("a", "1", 100.0)];
        let ms = vec![measurement("m1", "a", 1.0, 100.0, "2025-01-05 08:00:00")];
        let s = summarize_contract(&c, &items, &ms, d("2025-01-06"));
        assert_eq!(s.percent_consumed, 0.0);
        assert_eq!(s.remaining_balance, -100.0);
    }

    #[test]
    fn retention_invariant_holds() {
        for gross in [0.0, 0.01, 1.0, 333.33, 5000.0, 123_456.78, 9_999_999.99] {
            let f = Financials::from_gross(gross);
            assert_eq!(f.retention, 0.15 * gross);
            assert_eq!(f.net, 0.85 * gross);
        }
    }

    #[test]
    fn summary_is_deterministic() {
        let c = contract("1", 1000.0, "2025-03-01");
        let items = vec![item("a", "1", 600.0), item("b", "1", 400.0)];
        let ms = vec![
            measurement("m1", "a", 0.5, 600.0, "2025-01-01 08:00:00"),
            measurement("m2", "b", 0.25, 400.0, "2025-01-02 08:00:00"),
        ];
        let first = summarize_contract(&c, &items, &ms, d("2025-02-01"));
        let second = summarize_contract(&c, &items, &ms, d("2025-02-01"));
        assert_eq!(first, second);
    }

    #[test]
    fn dashboard_totals_and_manager_filter() {
        let mut c2 = contract("2", 2000.0, "2099-01-01");
        c2.manager = "Bruno".into();
        let snapshot = Snapshot {
            contracts: vec![c2, contract("1", 1000.0, "2099-01-01")],
            items: vec![item("a", "1", 1000.0), item("b", "2", 2000.0)],
            measurements: vec![
                measurement("m1", "a", 0.5, 1000.0, "2025-01-01 08:00:00"),
                measurement("m2", "b", 0.1, 2000.0, "2025-01-01 08:00:00"),
            ],
        };
        let all = Dashboard::build(&snapshot, None, d("2025-01-02"));
        assert_eq!(all.summaries.len(), 2);
        assert_eq!(all.summaries[0].contract.id, "1");
        assert_eq!(all.totals.contracted, 3000.0);
        assert_eq!(all.totals.measured, 700.0);
        assert_eq!(all.totals.balance, 2300.0);
        assert_eq!(all.managers, vec!["Ana".to_string(), "Bruno".to_string()]);

        let bruno = Dashboard::build(&snapshot, Some("bruno"), d("2025-01-02"));
        assert_eq!(bruno.summaries.len(), 1);
        assert_eq!(bruno.summaries[0].contract.id, "2");
        assert_eq!(bruno.totals, all.totals);
    }
}
