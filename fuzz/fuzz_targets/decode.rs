#![no_main]

use {
    binpack::{Config, Engine, Error, Pack},
    libfuzzer_sys::fuzz_target,
    std::{collections::BTreeMap, sync::LazyLock, time::Duration},
};

include!("../types.rs");

static ENGINE: LazyLock<Engine> =
    LazyLock::new(|| Engine::with_config(Config::new().with_preallocation_size_limit(1 << 16)));

// Arbitrary input must decode or fail cleanly, never panic or reserve past the limit.
fuzz_target!(|data: &[u8]| {
    let mut record = Record::default();
    match ENGINE.decode(data, &mut record) {
        Ok(()) => {
            let mut reread = Record::default();
            ENGINE
                .decode_from(data, &mut reread)
                .expect("stream decode disagrees with slice decode");
            assert_eq!(reread.name, record.name);
            assert_eq!(reread.payload, record.payload);
        }
        Err(Error::Write(e)) => panic!("write error while decoding: {e}"),
        Err(_) => {}
    }

    let mut strings: Vec<String> = Vec::new();
    let _ = ENGINE.decode(data, &mut strings);
    let mut map: BTreeMap<u16, Option<Vec<i8>>> = BTreeMap::new();
    let _ = ENGINE.decode(data, &mut map);
});
