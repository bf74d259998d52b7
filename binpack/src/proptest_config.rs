use proptest::test_runner::{Config, FileFailurePersistence};

/// Shared proptest settings for the crate's property tests.
///
/// Failures are persisted next to the test sources, except under Miri, which also gets a small
/// case count since every case runs interpreted.
pub(crate) fn proptest_cfg() -> Config {
    if cfg!(miri) {
        Config {
            failure_persistence: None,
            ..Config::with_cases(5)
        }
    } else {
        Config {
            failure_persistence: Some(Box::new(FileFailurePersistence::SourceParallel(
                "proptest-regressions",
            ))),
            ..Config::default()
        }
    }
}
