//! Message shape vector tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::fs;

use qat_rpc_core::protocol::Message;

mod vector_loader;
use vector_loader::TestVector;

fn load(name: &str) -> TestVector {
    let s = fs::read_to_string(format!("tests/vectors/{name}")).unwrap();
    serde_json::from_str(&s).unwrap()
}

#[test]
fn message_vectors() {
    let files = [
        "program_tagged.json",
        "program_legacy.json",
        "program_short.json",
        "program_long.json",
        "program_not_string.json",
        "version.json",
        "qubit_info.json",
        "unknown_kind.json",
        "empty.json",
    ];

    for f in files {
        let v = load(f);
        let res = Message::from_wire(&v.items());

        if let Some(err) = v.expect_error {
            let e = res.expect_err("expected error");
            assert_eq!(e.kind().as_str(), err.code, "vector={}", v.description);
            continue;
        }

        let msg = res.expect("expected ok message");
        let ex = v.expect.expect("missing expect block");

        assert_eq!(msg.kind().as_str(), ex.kind, "vector={}", v.description);
        assert_eq!(msg.is_legacy(), ex.legacy, "vector={}", v.description);
        assert_eq!(Message::from_wire(&msg.to_wire()).unwrap(), msg, "vector={}", v.description);
    }
}
