use evo_logger::{LevelFilter, Logger, LoggerError};

#[test]
fn init_twice_returns_subscriber_error() {
    let logger = Logger::builder()
        .name("evod-init-twice")
        .level(LevelFilter::INFO)
        .init()
        .expect("first init should succeed");
    assert!(!logger.writes_file(), "console-only logger has no file worker");

    let err = Logger::builder()
        .name("evod-init-twice-second")
        .level(LevelFilter::INFO)
        .init()
        .expect_err("second init should fail");

    assert!(
        matches!(err, LoggerError::Subscriber { .. }),
        "expected subscriber error for second init"
    );
}
