//! Workflow board: current measurements bucketed by approval phase.

use chrono::{Duration, NaiveDateTime};

use crate::engine::latest_per_item;
use crate::model::{Item, Measurement, WorkflowPhase};
use crate::sort_key::natural_key;

/// A card is stalled once its last update is older than this.
pub const STALE_AFTER_DAYS: i64 = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct KanbanCard {
    pub item_id: String,
    pub contract_id: String,
    pub description: String,
    pub fraction: f64,
    pub value: f64,
    /// Phase label exactly as stored.
    pub phase_label: String,
    pub updated_at: String,
    pub stalled: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KanbanColumn {
    pub phase: WorkflowPhase,
    pub cards: Vec<KanbanCard>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KanbanBoard {
    /// One column per phase, in [`WorkflowPhase::ALL`] order.
    pub columns: Vec<KanbanColumn>,
    /// Cards whose phase label matches no known phase.
    pub unclassified: Vec<KanbanCard>,
}

impl KanbanBoard {
    /// Place the current measurement of every item on the board.
    ///
    /// With `contract_id` set, only that contract's items are considered.
    /// Items that were never measured do not appear.
    pub fn build(
        items: &[Item],
        measurements: &[Measurement],
        contract_id: Option<&str>,
        now: NaiveDateTime,
    ) -> Self {
        let latest = latest_per_item(measurements);
        let mut columns: Vec<KanbanColumn> = WorkflowPhase::ALL
            .into_iter()
            .map(|phase| KanbanColumn {
                phase,
                cards: Vec::new(),
            })
            .collect();
        let mut unclassified = Vec::new();

        for item in items {
            if contract_id.is_some_and(|id| item.contract_id != id) {
                continue;
            }
            let Some(m) = latest.get(item.id.as_str()) else {
                continue;
            };
            let card = KanbanCard {
                item_id: item.id.clone(),
                contract_id: item.contract_id.clone(),
                description: item.description.clone(),
                fraction: m.fraction,
                value: m.value,
                phase_label: m.phase_label.clone(),
                updated_at: m.updated_at.clone(),
                stalled: is_stalled(m, now),
            };
            match m
                .phase()
                .and_then(|phase| columns.iter_mut().find(|c| c.phase == phase))
            {
                Some(column) => column.cards.push(card),
                None => unclassified.push(card),
            }
        }

        for column in &mut columns {
            column.cards.sort_by_cached_key(|c| natural_key(&c.description));
        }
        unclassified.sort_by_cached_key(|c| natural_key(&c.description));

        Self {
            columns,
            unclassified,
        }
    }

    pub fn column(&self, phase: WorkflowPhase) -> &[KanbanCard] {
        self.columns
            .iter()
            .find(|c| c.phase == phase)
            .map(|c| c.cards.as_slice())
            .unwrap_or(&[])
    }

    pub fn cards(&self) -> impl Iterator<Item = &KanbanCard> {
        self.columns
            .iter()
            .flat_map(|c| c.cards.iter())
            .chain(self.unclassified.iter())
    }

    pub fn stalled_count(&self) -> usize {
        self.cards().filter(|c| c.stalled).count()
    }

    pub fn is_empty(&self) -> bool {
        self.cards().next().is_none()
    }
}

/// Unparseable timestamps are never reported as stalled.
fn is_stalled(m: &Measurement, now: NaiveDateTime) -> bool {
    m.updated_at()
        .is_some_and(|t| now - t > Duration::days(STALE_AFTER_DAYS))
}
