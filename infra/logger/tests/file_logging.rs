use evo_logger::{LevelFilter, Logger};
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn json_file_logging_writes_structured_lines() -> Result<(), Box<dyn std::error::Error>> {
    let tmp_dir = tempdir()?;
    let log_dir = tmp_dir.path().join("logs");

    let logger = Logger::builder()
        .name("evod-file-test")
        .console(false)
        .json(true)
        .level(LevelFilter::INFO)
        .directory(&log_dir)
        .init()?;
    assert!(logger.writes_file());

    tracing::info!(new_level = 3, "Level up");

    std::thread::sleep(Duration::from_millis(30));
    drop(logger);

    let log_file = fs::read_dir(&log_dir)?
        .flatten()
        .map(|entry| entry.path())
        .find(|path| path.extension().and_then(|ext| ext.to_str()) == Some("log"))
        .expect("log file should be created");

    let contents = fs::read_to_string(&log_file)?;
    let line = contents.lines().find(|l| l.contains("Level up")).expect("event should be logged");
    assert!(line.starts_with('{'), "json output expected, got {line}");
    assert!(line.contains("\"new_level\":3"), "structured field expected, got {line}");

    Ok(())
}
