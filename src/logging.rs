use log::LevelFilter;

/// Info-level console logging for the binaries. `RUST_LOG` overrides the level.
pub fn init_logging() {
    env_logger::builder()
        .format_target(false)
        .format_timestamp_secs()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init()
}

/// Like [`init_logging`] but safe to call repeatedly, for tests.
pub fn try_init_logging() -> bool {
    env_logger::builder()
        .is_test(true)
        .filter_level(LevelFilter::Debug)
        .parse_default_env()
        .try_init()
        .is_ok()
}
