#![no_main]

use libfuzzer_sys::fuzz_target;
use odata_query::{Clause, CompareOp, Filter, Operator};

const OPS: [CompareOp; 9] = [
    CompareOp::Eq,
    CompareOp::Ne,
    CompareOp::Gt,
    CompareOp::Ge,
    CompareOp::Lt,
    CompareOp::Le,
    CompareOp::Contains,
    CompareOp::StartsWith,
    CompareOp::EndsWith,
];

enum Cursor<'a> {
    Clause(Clause<'a>),
    Operator(Operator<'a>),
}

// Each byte is one builder call: the low nibble picks the call, the high
// nibble the comparison kind. Scope errors end the sequence early.
fuzz_target!(|data: &[u8]| {
    if data.len() > 512 {
        return;
    }

    let mut filter = Filter::new();
    let mut cursor = Cursor::Clause(Clause::new(&mut filter));
    for &byte in data {
        let op = OPS[usize::from(byte >> 4) % OPS.len()];
        cursor = match (cursor, byte & 0x0f) {
            (Cursor::Clause(c), 0..=3) => Cursor::Operator(c.compare("F", op, i64::from(byte))),
            (Cursor::Clause(c), 4) => Cursor::Clause(c.negate_next()),
            (Cursor::Clause(c), 5) => Cursor::Clause(c.open_group()),
            (Cursor::Clause(c), 6) => Cursor::Clause(c.begin_any("R")),
            (Cursor::Clause(c), 7) => Cursor::Clause(c.begin_all("R")),
            (Cursor::Clause(c), 8) => Cursor::Operator(c.close_group()),
            (Cursor::Clause(c), _) => Cursor::Clause(c.begin_count("R")),
            (Cursor::Operator(o), 0..=2) => Cursor::Clause(o.and()),
            (Cursor::Operator(o), 3..=5) => Cursor::Clause(o.or()),
            (Cursor::Operator(o), 6) => Cursor::Operator(o.end_group()),
            (Cursor::Operator(o), 7..=9) => match o.end_any() {
                Ok(o) => Cursor::Operator(o),
                Err(_) => break,
            },
            (Cursor::Operator(o), 10..=12) => match o.end_all() {
                Ok(o) => Cursor::Operator(o),
                Err(_) => break,
            },
            (Cursor::Operator(o), _) => match o.end_count(op, 1) {
                Ok(o) => Cursor::Operator(o),
                Err(_) => break,
            },
        };
    }

    let rendered = filter.render();
    assert_eq!(rendered, filter.render());
    if rendered.is_ok() {
        assert!(filter.scopes().is_empty());
    }
});
