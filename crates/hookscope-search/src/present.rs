use std::sync::Arc;

use hookscope_types::Record;

use crate::console::Console;
use crate::location::parse_code_location;
use crate::store::ExecutionCounts;

/// Label used when the context has no address of its own.
pub const UNKNOWN_THREAD: &str = "unknown thread";

/// Matches beyond this count are only listed in the table, which is also
/// rendered collapsed.
pub const LINE_LIMIT: usize = 10;

pub const TABLE_COLUMNS: [&str; 6] = [
    "name",
    "value",
    "type",
    "function",
    "exec count",
    "exec order",
];

/// One match, prepared for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayRow {
    pub name: String,
    pub value: String,
    pub r#type: String,
    pub function_name: Option<String>,
    pub execution_count: Option<u64>,
    pub exec_order: u64,
    pub address: String,
}

impl DisplayRow {
    pub fn from_record(record: &Record, counts: &ExecutionCounts) -> Self {
        let code = parse_code_location(&record.code_location);
        Self {
            name: record.name.clone(),
            value: record.value.coerce_to_string(),
            r#type: record.r#type.clone(),
            function_name: code.function_name,
            execution_count: counts.get(&record.code_location),
            exec_order: record.exec_order,
            address: code.address,
        }
    }

    fn table_cells(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.value.clone(),
            self.r#type.clone(),
            self.function_name.clone().unwrap_or_default(),
            self.execution_count
                .map(|count| count.to_string())
                .unwrap_or_default(),
            self.exec_order.to_string(),
        ]
    }
}

/// Renders one context's matches to its console.
pub struct Presenter {
    console: Arc<dyn Console>,
    address: Option<String>,
}

impl Presenter {
    pub fn new(console: Arc<dyn Console>, address: Option<String>) -> Self {
        Self { console, address }
    }

    pub fn header_label(&self, match_count: usize) -> String {
        let address = self.address.as_deref().unwrap_or(UNKNOWN_THREAD);
        format!("{address}\tresults: {match_count}")
    }

    /// Emits nothing at all for an empty match list.
    pub fn present(&self, matches: &[Record], counts: &ExecutionCounts) {
        if matches.is_empty() {
            return;
        }
        let rows: Vec<DisplayRow> = matches
            .iter()
            .map(|record| DisplayRow::from_record(record, counts))
            .collect();

        self.console.group(&self.header_label(rows.len()), false);

        self.console.group("table", rows.len() > LINE_LIMIT);
        let cells: Vec<Vec<String>> = rows.iter().map(DisplayRow::table_cells).collect();
        self.console.table(&TABLE_COLUMNS, &cells);
        self.console.group_end();

        for (index, row) in rows.iter().take(LINE_LIMIT).enumerate() {
            self.console.line(
                &format!("{index}."),
                &format!(" {}  code location:  {}", row.name, row.address),
            );
        }
        self.console.group_end();
    }
}
