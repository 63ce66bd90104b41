//! Record types shared by the data-access layer, the engine, and the CLI.
//!
//! Field names on the wire are the backend's column names; the Rust names
//! describe what the column holds. Every field is decoded leniently (see
//! [`crate::coerce`]), so a record never fails to load because one cell is
//! blank or malformed.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coerce::{lenient_f64, lenient_opt_text, lenient_text};
use crate::dates;

/// A top-level agreement with a supplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    #[serde(rename = "contract_id", default, deserialize_with = "lenient_text")]
    pub id: String,
    /// Contract number as shown to users (e.g. `CTT-0042`).
    #[serde(rename = "ctt", default, deserialize_with = "lenient_text")]
    pub number: String,
    #[serde(rename = "fornecedor", default, deserialize_with = "lenient_text")]
    pub supplier: String,
    #[serde(rename = "cliente", default, deserialize_with = "lenient_text")]
    pub client: String,
    #[serde(rename = "gestor", default, deserialize_with = "lenient_text")]
    pub manager: String,
    #[serde(rename = "valor_contrato", default, deserialize_with = "lenient_f64")]
    pub total_value: f64,
    #[serde(rename = "data_inicio", default, deserialize_with = "lenient_text")]
    pub start_date: String,
    #[serde(rename = "data_fim", default, deserialize_with = "lenient_text")]
    pub end_date: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub status: String,
}

impl Contract {
    /// Match by id or contract number, ignoring case and surrounding space.
    pub fn matches(&self, key: &str) -> bool {
        let key = key.trim();
        !key.is_empty() && (self.id == key || self.number.eq_ignore_ascii_case(key))
    }
}

/// A billable line under a contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(rename = "item_id", default, deserialize_with = "lenient_text")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub contract_id: String,
    #[serde(rename = "descricao_item", default, deserialize_with = "lenient_text")]
    pub description: String,
    #[serde(rename = "vlr_unit", default, deserialize_with = "lenient_f64")]
    pub unit_value: f64,
    #[serde(
        rename = "prazo_item",
        default,
        deserialize_with = "lenient_opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub deadline: Option<String>,
}

impl Item {
    /// The item's own deadline, or the contract end date when it has none.
    pub fn deadline_or<'a>(&'a self, contract: &'a Contract) -> &'a str {
        self.deadline.as_deref().unwrap_or(&contract.end_date)
    }

    /// Match by id or exact description (case-insensitive).
    pub fn matches(&self, key: &str) -> bool {
        let key = key.trim();
        !key.is_empty()
            && (self.id == key || self.description.trim().eq_ignore_ascii_case(key))
    }
}

/// Editable item fields. Unset fields are left untouched upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ItemPatch {
    #[serde(rename = "descricao_item", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "vlr_unit", skip_serializing_if = "Option::is_none")]
    pub unit_value: Option<f64>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.unit_value.is_none()
    }

    pub fn apply(&self, item: &mut Item) {
        if let Some(description) = &self.description {
            item.description = description.clone();
        }
        if let Some(unit_value) = self.unit_value {
            item.unit_value = unit_value;
        }
    }
}

/// A timestamped progress record against an item. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    #[serde(rename = "measurement_id", default, deserialize_with = "lenient_text")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub item_id: String,
    #[serde(rename = "data_medicao", default, deserialize_with = "lenient_text")]
    pub date: String,
    /// Cumulative fraction complete, 0.0–1.0.
    #[serde(rename = "percentual_acumulado", default, deserialize_with = "lenient_f64")]
    pub fraction: f64,
    /// Cumulative value, fixed at entry time as `fraction × unit value`.
    #[serde(rename = "valor_acumulado", default, deserialize_with = "lenient_f64")]
    pub value: f64,
    /// Raw workflow phase label; see [`Measurement::phase`].
    #[serde(rename = "fase_workflow", default, deserialize_with = "lenient_text")]
    pub phase_label: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub updated_at: String,
    #[serde(
        rename = "observacao",
        default,
        deserialize_with = "lenient_opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub note: Option<String>,
}

impl Measurement {
    pub fn phase(&self) -> Option<WorkflowPhase> {
        self.phase_label.parse().ok()
    }

    pub fn updated_at(&self) -> Option<NaiveDateTime> {
        dates::parse_timestamp(&self.updated_at)
    }
}

/// Approval phase of a measurement, in board order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WorkflowPhase {
    InProgress,
    AwaitingApproval,
    MeasurementSubmitted,
    Approved,
    Invoiced,
    Paid,
}

impl WorkflowPhase {
    pub const ALL: [WorkflowPhase; 6] = [
        Self::InProgress,
        Self::AwaitingApproval,
        Self::MeasurementSubmitted,
        Self::Approved,
        Self::Invoiced,
        Self::Paid,
    ];

    /// Label stored in the backend and shown to users.
    pub fn label(&self) -> &'static str {
        match self {
            Self::InProgress => "Em execução",
            Self::AwaitingApproval => "Aguardando aprovação",
            Self::MeasurementSubmitted => "Medição lançada",
            Self::Approved => "Aprovado",
            Self::Invoiced => "Faturado",
            Self::Paid => "Pago",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::AwaitingApproval => "awaiting_approval",
            Self::MeasurementSubmitted => "measurement_submitted",
            Self::Approved => "approved",
            Self::Invoiced => "invoiced",
            Self::Paid => "paid",
        }
    }
}

impl fmt::Display for WorkflowPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown workflow phase: {0:?}")]
pub struct UnknownPhase(pub String);

impl FromStr for WorkflowPhase {
    type Err = UnknownPhase;

    /// Accepts the backend label or the snake_case name, ignoring case,
    /// accents, and `_` versus space.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = fold(s);
        Self::ALL
            .into_iter()
            .find(|p| fold(p.label()) == wanted || fold(p.as_str()) == wanted)
            .ok_or_else(|| UnknownPhase(s.to_string()))
    }
}

fn fold(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'Á' | 'À' | 'Â' | 'Ã' => 'a',
            'é' | 'ê' | 'É' | 'Ê' => 'e',
            'í' | 'Í' => 'i',
            'ó' | 'ô' | 'õ' | 'Ó' | 'Ô' | 'Õ' => 'o',
            'ú' | 'Ú' => 'u',
            'ç' | 'Ç' => 'c',
            '_' | '-' => ' ',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

/// Everything one page view needs, fetched together.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub contracts: Vec<Contract>,
    pub items: Vec<Item>,
    pub measurements: Vec<Measurement>,
}

impl Snapshot {
    pub fn contract(&self, key: &str) -> Option<&Contract> {
        self.contracts.iter().find(|c| c.matches(key))
    }

    pub fn items_of<'a>(&'a self, contract: &'a Contract) -> impl Iterator<Item = &'a Item> + 'a {
        self.items.iter().filter(move |i| i.contract_id == contract.id)
    }
}
