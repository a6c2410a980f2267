#![no_main]

use libfuzzer_sys::fuzz_target;
use lookupcache::{header::FIELD_ID, loader::XmlLoader, LookupCache};
use std::sync::Arc;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data).into_owned();

    // the input doubles as a format template for every loaded header
    let loader = Arc::new(XmlLoader::from_xml(text.clone()));
    let Ok(types) = loader.table_types() else {
        return;
    };

    let cache = LookupCache::new("global", vec![loader]);
    for table_type in types {
        if let Ok(Some(table)) = cache.get_table(&table_type) {
            for header in table.iter() {
                let rendered = header.format(&text);
                let _ = table.lookup_by_format(&text, &rendered);
                let _ = table.lookup_by_format(FIELD_ID, &header.id);
            }
        }
    }
});
