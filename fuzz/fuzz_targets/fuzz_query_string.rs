#![no_main]

use libfuzzer_sys::fuzz_target;
use odata_query::{CompareOp, ODataQuery, QueryDefaults};

fuzz_target!(|data: &[u8]| {
    // Limit input size to avoid OOM on pathological inputs
    if data.len() > 1024 {
        return;
    }
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    let mut query = ODataQuery::with_defaults(&QueryDefaults::default());
    query.select(s);
    query.filter.compare(s, CompareOp::Eq, s);
    query.expand.add(s).select(s);

    // Encoded values never leak separators, so pairs split cleanly on `&`.
    if let (Ok(encoded), Ok(params)) = (query.to_query_string(), query.params()) {
        assert!(!encoded.contains(' '));
        assert_eq!(encoded.split('&').count(), params.len());
    }
});
