#![no_main]

use {
    binpack::{Engine, Pack},
    libfuzzer_sys::fuzz_target,
    std::{collections::BTreeMap, time::Duration},
};

include!("../types.rs");

// Whatever decodes must re-encode to bytes that decode to the same value.
fuzz_target!(|data: &[u8]| {
    let engine = Engine::new();
    let mut first = Record::default();
    if engine.decode(data, &mut first).is_err() {
        return;
    }
    let encoded = engine.encode(&first).expect("decoded value failed to encode");
    let mut second = Record::default();
    engine
        .decode(&encoded, &mut second)
        .expect("re-encoded value failed to decode");
    // NaN ratios never compare equal; compare encodings.
    assert_eq!(engine.encode(&second).unwrap(), encoded);
});
