use super::*;

use std::thread;
use std::time::Instant;

use fanlog_plugin::PluginInfo;
use fanlog_protocol::Level;
use fanlog_sinks::NullSyslog;
use tempfile::tempdir;

// =============================================================================
// Helpers
// =============================================================================

fn small_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.workers.count = 1;
    config.queue.capacity = 64;
    config
}

fn record(level: Level, message: &str) -> LogRecord {
    LogRecord::new(level, "engine-test", message)
}

fn wait_for(engine: &Engine, what: &str, mut done: impl FnMut(&EngineStats) -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        if done(&engine.stats()) {
            return;
        }
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(5));
    }
}

struct RecordingSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl PluginSink for RecordingSink {
    fn info(&self) -> PluginInfo {
        PluginInfo::new("recording").with_levels(Levels::all())
    }

    fn write(&self, _level: Level, line: &str) -> Result<()> {
        self.lines.lock().push(line.to_string());
        Ok(())
    }
}

struct TeardownProbe {
    torn_down: Arc<AtomicBool>,
}

impl PluginSink for TeardownProbe {
    fn info(&self) -> PluginInfo {
        PluginInfo::new("teardown-probe")
    }

    fn write(&self, _level: Level, _line: &str) -> Result<()> {
        Ok(())
    }

    fn teardown(&self) {
        self.torn_down.store(true, Ordering::SeqCst);
    }
}

// =============================================================================
// Construction
// =============================================================================

#[test]
fn test_new_rejects_invalid_config() {
    let mut config = EngineConfig::default();
    config.queue.capacity = 0;
    let err = Engine::new(config).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig { .. }));
}

#[test]
fn test_log_without_destinations_is_noop() {
    let engine = Engine::new(small_config()).unwrap();
    engine.log(record(Level::Info, "nobody listening")).unwrap();

    let stats = engine.stats();
    assert_eq!(stats.pipeline.records_submitted, 1);
    assert_eq!(stats.pipeline.jobs_enqueued, 0);
    engine.shutdown();
}

// =============================================================================
// Delivery
// =============================================================================

#[test]
fn test_register_file_and_deliver() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("engine.log");
    let engine = Engine::new(small_config()).unwrap();
    engine.register_file(&path).unwrap();

    engine.log(record(Level::Info, "first line")).unwrap();
    engine.shutdown();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("first line"));
    assert_eq!(engine.stats().pipeline.writes_ok, 1);
}

#[test]
fn test_plugin_sink_receives_trimmed_lines() {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let engine = Engine::new(small_config()).unwrap();
    engine
        .register_plugin_sink(Box::new(RecordingSink {
            lines: Arc::clone(&lines),
        }))
        .unwrap();

    engine
        .log(record(Level::Info, "handed to the plugin"))
        .unwrap();
    engine.shutdown();

    let seen = lines.lock();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].contains("handed to the plugin"));
    assert!(!seen[0].ends_with('\n'));
}

#[test]
fn test_drop_drains_queued_jobs() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("drop.log");
    {
        let engine = Engine::new(small_config()).unwrap();
        engine.register_file(&path).unwrap();
        for i in 0..10 {
            engine
                .log(record(Level::Info, &format!("line-{i}")))
                .unwrap();
        }
    }

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.lines().filter(|l| l.contains("line-")).count(), 10);
}

// =============================================================================
// Destination management
// =============================================================================

#[test]
fn test_unregister_stops_deliveries_to_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("gone.log");
    let engine = Engine::new(small_config()).unwrap();
    let id = engine.register_file(&path).unwrap();

    engine.log(record(Level::Info, "kept")).unwrap();
    wait_for(&engine, "first delivery", |s| s.pipeline.writes_ok == 1);

    engine.unregister(id, Duration::from_secs(2)).unwrap();
    assert_eq!(engine.stats().destinations, 0);

    engine.log(record(Level::Info, "dropped on the floor")).unwrap();
    engine.shutdown();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("kept"));
    assert!(!contents.contains("dropped on the floor"));
    assert_eq!(engine.stats().pipeline.writes_ok, 1);
}

#[test]
fn test_unregister_tears_down_plugin() {
    let torn_down = Arc::new(AtomicBool::new(false));
    let engine = Engine::new(small_config()).unwrap();
    let id = engine
        .register_plugin_sink(Box::new(TeardownProbe {
            torn_down: Arc::clone(&torn_down),
        }))
        .unwrap();

    engine.unregister(id, Duration::from_secs(1)).unwrap();
    assert!(torn_down.load(Ordering::SeqCst));
    engine.shutdown();
}

#[test]
fn test_update_levels_unknown_id_rejected() {
    let engine = Engine::new(small_config()).unwrap();
    let err = engine
        .update_levels(DestinationId::new(7), Levels::all())
        .unwrap_err();
    assert!(matches!(err, Error::InvalidState { .. }));
    engine.shutdown();
}

// =============================================================================
// Stats and shutdown
// =============================================================================

#[test]
fn test_stats_combine_pipeline_cache_and_registry() {
    let dir = tempdir().unwrap();
    let engine = Engine::new(small_config()).unwrap();
    engine.register_file(dir.path().join("stats.log")).unwrap();
    engine.register_syslog(Box::new(NullSyslog)).unwrap();
    assert_eq!(engine.stats().destinations, 2);

    for _ in 0..3 {
        engine.log(record(Level::Warning, "counted")).unwrap();
    }
    engine.shutdown();

    let stats = engine.stats();
    assert_eq!(stats.pipeline.records_submitted, 3);
    assert_eq!(stats.pipeline.writes_ok, 6);
    assert_eq!(stats.cache.opens, 1);
    assert_eq!(stats.quarantined, 0);
    assert_eq!(stats.destinations, 0);
}

#[test]
fn test_shutdown_is_idempotent() {
    let engine = Engine::new(small_config()).unwrap();
    engine.shutdown();
    assert!(!engine.is_running());
    engine.shutdown();
    assert!(!engine.is_running());
}

#[test]
fn test_shutdown_tears_down_plugins() {
    let torn_down = Arc::new(AtomicBool::new(false));
    let engine = Engine::new(small_config()).unwrap();
    engine
        .register_plugin_sink(Box::new(TeardownProbe {
            torn_down: Arc::clone(&torn_down),
        }))
        .unwrap();

    engine.shutdown();
    assert!(torn_down.load(Ordering::SeqCst));
}

#[test]
fn test_operations_rejected_after_shutdown() {
    let dir = tempdir().unwrap();
    let engine = Engine::new(small_config()).unwrap();
    let id = engine.register_file(dir.path().join("late.log")).unwrap();
    engine.shutdown();

    assert!(matches!(
        engine.log(record(Level::Info, "late")),
        Err(Error::InvalidState { .. })
    ));
    assert!(matches!(
        engine.register_stdout(),
        Err(Error::InvalidState { .. })
    ));
    assert!(matches!(
        engine.update_levels(id, Levels::all()),
        Err(Error::InvalidState { .. })
    ));
    assert!(matches!(
        engine.unregister(id, Duration::from_millis(10)),
        Err(Error::InvalidState { .. })
    ));
}
