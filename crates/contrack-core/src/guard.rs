//! Write-side rules: the item deletion guard and the progress regression policy.

use thiserror::Error;

use crate::model::Measurement;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardError {
    #[error("item {item_id} has {count} measurement(s) and cannot be deleted")]
    ItemHasMeasurements { item_id: String, count: usize },
}

/// Refuse to delete an item that any measurement still references.
pub fn ensure_item_deletable(item_id: &str, measurements: &[Measurement]) -> Result<(), GuardError> {
    let count = measurements.iter().filter(|m| m.item_id == item_id).count();
    if count > 0 {
        return Err(GuardError::ItemHasMeasurements {
            item_id: item_id.to_string(),
            count,
        });
    }
    Ok(())
}

/// How a new cumulative fraction relates to the item's current one.
///
/// Regression is advisory: callers warn, they do not reject.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Progression {
    /// The item had no measurement yet.
    First,
    Advance { previous: f64 },
    Unchanged,
    Regression { previous: f64 },
}

impl Progression {
    pub fn assess(previous: Option<f64>, next: f64) -> Self {
        match previous {
            None => Self::First,
            Some(previous) if next > previous => Self::Advance { previous },
            Some(previous) if next < previous => Self::Regression { previous },
            Some(_) => Self::Unchanged,
        }
    }

    pub fn is_regression(&self) -> bool {
        matches!(self, Self::Regression { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn measurement(item_id: &str) -> Measurement {
        Measurement {
            id: format!("m-{item_id}"),
            item_id: item_id.into(),
            date: "2025-01-01".into(),
            fraction: 0.1,
            value: 10.0,
            phase_label: String::new(),
            updated_at: String::new(),
            note: None,
        }
    }

    #[test]
    fn unmeasured_item_can_be_deleted() {
        let ms = vec![measurement("b")];
        assert_eq!(ensure_item_deletable("a", &ms), Ok(()));
        assert_eq!(ensure_item_deletable("a", &[]), Ok(()));
    }

    #[test]
    fn measured_item_is_blocked() {
        let ms = vec![measurement("a"), measurement("a"), measurement("b")];
        let err = ensure_item_deletable("a", &ms).unwrap_err();
        assert_eq!(
            err,
            GuardError::ItemHasMeasurements {
                item_id: "a".into(),
                count: 2
            }
        );
        assert!(err.to_string().contains("2 measurement(s)"));
    }

    #[test]
    fn progression_cases() {
        assert_eq!(Progression::assess(None, 0.3), Progression::First);
        assert_eq!(
            Progression::assess(Some(0.3), 0.5),
            Progression::Advance { previous: 0.3 }
        );
        assert_eq!(Progression::assess(Some(0.5), 0.5), Progression::Unchanged);
        let regression = Progression::assess(Some(0.5), 0.2);
        assert!(regression.is_regression());
        assert_eq!(regression, Progression::Regression { previous: 0.5 });
    }
}
