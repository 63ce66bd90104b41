//! Itemised budget versus contract total.

use crate::model::{Contract, Item};

/// How much of a contract's total the registered items already account for.
///
/// Exceeding the total is flagged, never blocked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BudgetCheck {
    pub itemized_total: f64,
    pub contract_total: f64,
    /// `itemized / contract`, clamped to `[0, 1]`.
    pub ratio: f64,
    pub exceeds: bool,
}

impl BudgetCheck {
    pub fn evaluate<I>(contract_total: f64, unit_values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let itemized_total: f64 = unit_values.into_iter().sum();
        let ratio = if contract_total > 0.0 {
            (itemized_total / contract_total).clamp(0.0, 1.0)
        } else if itemized_total > 0.0 {
            1.0
        } else {
            0.0
        };
        Self {
            itemized_total,
            contract_total,
            ratio,
            exceeds: itemized_total > contract_total,
        }
    }

    /// Check the items of `contract` found in `items`.
    pub fn for_contract(contract: &Contract, items: &[Item]) -> Self {
        Self::evaluate(
            contract.total_value,
            items
                .iter()
                .filter(|i| i.contract_id == contract.id)
                .map(|i| i.unit_value),
        )
    }

    /// Contract value not yet assigned to any item (negative when exceeded).
    pub fn unallocated(&self) -> f64 {
        self.contract_total - self.itemized_total
    }
}
