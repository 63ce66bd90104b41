/// Arrow schema definitions for the report tables and the spreadsheet export.
pub mod tables {
    use arrow::datatypes::{DataType, Field, Schema};

    /// Export of one contract's items: raw numbers, one row per item.
    ///
    /// Column names match the backend so the file can be pasted back into
    /// the spreadsheet.
    pub fn item_export_schema() -> Schema {
        Schema::new(vec![
            Field::new("descricao_item", DataType::Utf8, false),
            Field::new("vlr_unit", DataType::Float64, false),
            Field::new("percentual_acumulado", DataType::Float64, false),
            Field::new("valor_acumulado", DataType::Float64, false),
        ])
    }

    /// Drill-down rows of one contract, formatted for display.
    pub fn item_detail_schema() -> Schema {
        Schema::new(vec![
            Field::new("Item", DataType::Utf8, false),
            Field::new("Unit value", DataType::Utf8, false),
            Field::new("% cumulative", DataType::Utf8, false),
            Field::new("Measured", DataType::Utf8, false),
            Field::new("Item balance", DataType::Utf8, false),
            Field::new("Measured on", DataType::Utf8, false),
            Field::new("Phase", DataType::Utf8, true),
            Field::new("Deadline", DataType::Utf8, false),
        ])
    }

    /// One line per contract on the dashboard.
    pub fn dashboard_schema() -> Schema {
        Schema::new(vec![
            Field::new("Status", DataType::Utf8, false),
            Field::new("Contract", DataType::Utf8, false),
            Field::new("Supplier", DataType::Utf8, false),
            Field::new("Manager", DataType::Utf8, false),
            Field::new("Gross", DataType::Utf8, false),
            Field::new("Retention (15%)", DataType::Utf8, false),
            Field::new("Net payable", DataType::Utf8, false),
            Field::new("Balance", DataType::Utf8, false),
            Field::new("Consumed", DataType::Utf8, false),
        ])
    }

    /// Registered contracts.
    pub fn contract_list_schema() -> Schema {
        Schema::new(vec![
            Field::new("Contract", DataType::Utf8, false),
            Field::new("Supplier", DataType::Utf8, false),
            Field::new("Client", DataType::Utf8, true),
            Field::new("Manager", DataType::Utf8, false),
            Field::new("Total", DataType::Utf8, false),
            Field::new("Start", DataType::Utf8, false),
            Field::new("End", DataType::Utf8, false),
            Field::new("Status", DataType::Utf8, true),
        ])
    }

    /// Items registered under one contract.
    pub fn item_list_schema() -> Schema {
        Schema::new(vec![
            Field::new("Id", DataType::Utf8, false),
            Field::new("Item", DataType::Utf8, false),
            Field::new("Unit value", DataType::Utf8, false),
            Field::new("Deadline", DataType::Utf8, false),
        ])
    }

    /// Cards of the workflow board, one row per card.
    pub fn kanban_schema() -> Schema {
        Schema::new(vec![
            Field::new("Phase", DataType::Utf8, false),
            Field::new("Item", DataType::Utf8, false),
            Field::new("%", DataType::Utf8, false),
            Field::new("Value", DataType::Utf8, false),
            Field::new("Updated", DataType::Utf8, false),
            Field::new("Alert", DataType::Utf8, true),
        ])
    }
}
