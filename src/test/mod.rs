//! Factories and instrumented loaders shared by the unit tests.


pub use loaders::CountingLoader;

use crate::{header::Header, table::LookupTable};

// Helper function to create a valid, active Header
pub fn create_header(table_type: &str, id: &str, text: &str) -> Header {
    Header::new(table_type, id, text)
}

// Helper function to create a case-sensitive LookupTable from (id, text) pairs
pub fn create_table(table_type: &str, rows: &[(&str, &str)]) -> LookupTable {
    let headers = rows
        .iter()
        .map(|(id, text)| create_header(table_type, id, text))
        .collect();
    LookupTable::new(table_type, headers, true)
}
