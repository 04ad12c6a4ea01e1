//! Context-local half of a hookscope query: filter the record store, then
//! show what matched.

use hookscope_types::{Record, RecordField, SearchPattern, UNDEFINED};

mod console;
mod location;
mod matcher;
mod present;
mod store;

pub use console::{Console, ConsoleEvent, MemoryConsole, TextConsole, render_table};
pub use location::{CodeInfo, parse_code_location};
pub use matcher::{Matcher, PatternError, matches};
pub use present::{DisplayRow, LINE_LIMIT, Presenter, TABLE_COLUMNS, UNKNOWN_THREAD};
pub use store::{ExecutionCounts, RecordStore};

/// Records whose `field_name` field, stringified, matches `pattern`.
///
/// An unknown field name compares every record against `"undefined"`.
pub fn search(
    store: &RecordStore,
    field_name: &str,
    pattern: &SearchPattern,
) -> Result<Vec<Record>, PatternError> {
    let matcher = Matcher::compile(pattern)?;
    Ok(search_with(store, field_name, &matcher))
}

pub fn search_with(store: &RecordStore, field_name: &str, matcher: &Matcher) -> Vec<Record> {
    let field = RecordField::parse(field_name);
    if field.is_none() {
        tracing::debug!(field_name, "searching unknown record field");
    }
    store.with_records(|records| {
        records
            .iter()
            .filter(|record| match field {
                Some(field) => matcher.is_match(&record.field(field)),
                None => matcher.is_match(UNDEFINED),
            })
            .cloned()
            .collect()
    })
}
