//! Spreadsheet-compatible export of a contract's items.
//!
//! One row per item with raw numbers (unit value, cumulative fraction,
//! cumulative value) so a spreadsheet can recompute from them. Written as
//! CSV with a header row through Arrow's CSV writer.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::csv::WriterBuilder;
use arrow::record_batch::RecordBatch;
use contrack_core::{ContractSummary, ItemRow, tables};
use tracing::info;

use crate::ReportError;

pub const DEFAULT_DELIMITER: u8 = b',';

/// Build the export table for a set of item rows.
pub fn export_batch(rows: &[ItemRow]) -> Result<RecordBatch, ReportError> {
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|r| r.item.description.as_str()),
        )),
        Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.item.unit_value))),
        Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.fraction))),
        Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.value))),
    ];
    Ok(RecordBatch::try_new(
        Arc::new(tables::item_export_schema()),
        columns,
    )?)
}

/// Write `batch` as CSV with a header row. Returns the writer.
pub fn write_csv<W: Write>(writer: W, batch: &RecordBatch, delimiter: u8) -> Result<W, ReportError> {
    let mut csv = WriterBuilder::new()
        .with_header(true)
        .with_delimiter(delimiter)
        .build(writer);
    csv.write(batch)?;
    Ok(csv.into_inner())
}

/// Export the items of one summarised contract to `path`.
///
/// Returns the number of rows written. A contract without items is an
/// error rather than an empty file.
pub fn export_contract_csv(
    path: &Path,
    summary: &ContractSummary,
    delimiter: u8,
) -> Result<usize, ReportError> {
    if summary.rows.is_empty() {
        return Err(ReportError::Empty(summary.contract.number.clone()));
    }
    let batch = export_batch(&summary.rows)?;
    let io_err = |source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(io_err)?;
    let mut out = write_csv(BufWriter::new(file), &batch, delimiter)?;
    out.flush().map_err(io_err)?;

    info!(
        path = %path.display(),
        contract = %summary.contract.number,
        rows = batch.num_rows(),
        "exported contract items"
    );
    Ok(batch.num_rows())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use contrack_core::{Contract, Item, Measurement, summarize_contract};

    fn summary(with_items: bool) -> ContractSummary {
        let contract = Contract {
            id: "c-1".into(),
            number: "CTT-1".into(),
            supplier: "Acme".into(),
            client: String::new(),
            manager: "Ana".into(),
            total_value: 10_000.0,
            start_date: "2025-01-01".into(),
            end_date: "2025-12-31".into(),
            status: String::new(),
        };
        let items = if with_items {
            vec![
                Item {
                    id: "i-1".into(),
                    contract_id: "c-1".into(),
                    description: "Fundação".into(),
                    unit_value: 8000.0,
                    deadline: None,
                },
                Item {
                    id: "i-2".into(),
                    contract_id: "c-1".into(),
                    description: "Pintura".into(),
                    unit_value: 2000.0,
                    deadline: None,
                },
            ]
        } else {
            Vec::new()
        };
        let measurements = vec![Measurement {
            id: "m-1".into(),
            item_id: "i-1".into(),
            date: "2025-01-05".into(),
            fraction: 0.5,
            value: 4000.0,
            phase_label: "Aprovado".into(),
            updated_at: "2025-01-05 10:00:00".into(),
            note: None,
        }];
        let today = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        summarize_contract(&contract, &items, &measurements, today)
    }

    #[test]
    fn export_batch_has_one_row_per_item() {
        let s = summary(true);
        let batch = export_batch(&s.rows).unwrap();
        assert_eq!(batch.num_rows(), 2);
        let values = batch
            .column_by_name("valor_acumulado")
            .unwrap()
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert_eq!(values.value(0), 4000.0);
        assert_eq!(values.value(1), 0.0);
    }

    #[test]
    fn csv_has_header_and_rows() {
        let s = summary(true);
        let batch = export_batch(&s.rows).unwrap();
        let bytes = write_csv(Vec::new(), &batch, b';').unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "descricao_item;vlr_unit;percentual_acumulado;valor_acumulado"
        );
        assert!(lines[1].starts_with("Fundação;8000"));
        assert!(lines[2].starts_with("Pintura;2000"));
    }

    #[test]
    fn export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ctt-1.csv");
        let written = export_contract_csv(&path, &summary(true), DEFAULT_DELIMITER).unwrap();
        assert_eq!(written, 2);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("descricao_item,vlr_unit,"));
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn contract_without_items_is_not_exported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        let err = export_contract_csv(&path, &summary(false), DEFAULT_DELIMITER).unwrap_err();
        assert!(matches!(err, ReportError::Empty(_)));
        assert!(!path.exists());
    }

    #[test]
    fn unwritable_path_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.csv");
        let err = export_contract_csv(&path, &summary(true), DEFAULT_DELIMITER).unwrap_err();
        assert!(matches!(err, ReportError::Io { .. }));
    }
}
