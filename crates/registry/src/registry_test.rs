use super::*;

use std::thread;

use fanlog_sinks::NullSyslog;

fn file_spec(dir: &tempfile::TempDir, name: &str) -> DestinationSpec {
    DestinationSpec::file(dir.path().join(name))
}

#[test]
fn test_register_assigns_sequential_ids() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = DestinationRegistry::new(5);

    let a = registry.register(file_spec(&dir, "a.log")).expect("register a");
    let b = registry.register(file_spec(&dir, "b.log")).expect("register b");
    let c = registry
        .register(DestinationSpec::syslog(Box::new(NullSyslog)))
        .expect("register c");

    assert_eq!(a.index(), 0);
    assert_eq!(b.index(), 1);
    assert_eq!(c.index(), 2);
    assert_eq!(registry.len(), 3);
}

#[test]
fn test_freed_slot_is_reused() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = DestinationRegistry::new(5);

    registry.register(file_spec(&dir, "a.log")).expect("register a");
    let b = registry.register(file_spec(&dir, "b.log")).expect("register b");
    registry.register(file_spec(&dir, "c.log")).expect("register c");

    registry
        .unregister(b, Duration::from_millis(10))
        .expect("unregister b");
    assert_eq!(registry.len(), 2);

    let d = registry.register(file_spec(&dir, "d.log")).expect("register d");
    assert_eq!(d, b);
    assert_eq!(registry.len(), 3);
}

#[test]
fn test_second_console_destination_rejected() {
    let registry = DestinationRegistry::new(5);

    registry
        .register(DestinationSpec::console_stdout())
        .expect("first stdout");
    let err = registry
        .register(DestinationSpec::console_stdout())
        .unwrap_err();
    assert!(matches!(err, Error::InvalidConfig { .. }), "got {err:?}");

    // The other stream is independent.
    registry
        .register(DestinationSpec::console_stderr())
        .expect("first stderr");
    let err = registry
        .register(DestinationSpec::console_stderr())
        .unwrap_err();
    assert!(matches!(err, Error::InvalidConfig { .. }), "got {err:?}");

    assert_eq!(registry.len(), 2);
}

#[test]
fn test_empty_level_filter_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = DestinationRegistry::new(5);

    let err = registry
        .register(file_spec(&dir, "a.log").with_levels(Levels::empty()))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidConfig { .. }), "got {err:?}");
    assert!(registry.is_empty());
}

#[test]
fn test_unwritable_file_path_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = DestinationRegistry::new(5);

    let path = dir.path().join("no-such-dir").join("app.log");
    let err = registry.register(DestinationSpec::file(path)).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig { .. }), "got {err:?}");
    assert!(registry.is_empty());
}

#[test]
fn test_file_probe_creates_the_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = DestinationRegistry::new(5);

    let path = dir.path().join("probed.log");
    registry
        .register(DestinationSpec::file(&path))
        .expect("register");
    assert!(path.exists());
}

#[test]
fn test_no_header_flag_reaches_file_options() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = DestinationRegistry::new(5);

    let id = registry
        .register(file_spec(&dir, "a.log").with_flags(OutputFlags::NO_HEADER))
        .expect("register");
    let entry = registry.get(id).expect("entry");
    match entry.kind() {
        DestinationKind::File { options, .. } => {
            assert!(!options.header, "NO_HEADER should disable the header line")
        }
        other => panic!("unexpected kind {other:?}"),
    }
}

#[test]
fn test_snapshot_filters_by_level() {
    let registry = DestinationRegistry::new(5);
    registry
        .register(DestinationSpec::console_stdout())
        .expect("stdout");
    registry
        .register(DestinationSpec::console_stderr())
        .expect("stderr");

    let info = registry.snapshot_matching(Level::Info);
    assert_eq!(info.len(), 1);
    assert_eq!(info[0].name(), "stdout");

    let error = registry.snapshot_matching(Level::Error);
    assert_eq!(error.len(), 1);
    assert_eq!(error[0].name(), "stderr");
}

#[test]
fn test_snapshot_excludes_quarantined() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = DestinationRegistry::new(2);
    let id = registry.register(file_spec(&dir, "a.log")).expect("register");
    let entry = registry.get(id).expect("entry");

    registry.note_failure(&entry);
    assert!(!entry.is_quarantined());
    assert_eq!(registry.snapshot_matching(Level::Info).len(), 1);

    registry.note_failure(&entry);
    assert!(entry.is_quarantined());
    assert!(registry.snapshot_matching(Level::Info).is_empty());
    assert_eq!(registry.quarantined_count(), 1);
}

#[test]
fn test_failure_streak_resets_on_success() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = DestinationRegistry::new(3);
    let id = registry.register(file_spec(&dir, "a.log")).expect("register");
    let entry = registry.get(id).expect("entry");

    registry.note_failure(&entry);
    registry.note_failure(&entry);
    assert_eq!(entry.failure_count(), 2);

    registry.note_success(&entry);
    assert_eq!(entry.failure_count(), 0);

    registry.note_failure(&entry);
    registry.note_failure(&entry);
    assert!(!entry.is_quarantined());
}

#[test]
fn test_update_levels_applies_immediately() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = DestinationRegistry::new(5);
    let id = registry.register(file_spec(&dir, "a.log")).expect("register");

    assert_eq!(registry.snapshot_matching(Level::Debug).len(), 1);

    registry
        .update_levels(id, Levels::only(Level::Emergency))
        .expect("update");
    assert!(registry.snapshot_matching(Level::Debug).is_empty());
    assert_eq!(registry.snapshot_matching(Level::Emergency).len(), 1);
}

#[test]
fn test_update_levels_rejects_bad_input() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = DestinationRegistry::new(5);
    let id = registry.register(file_spec(&dir, "a.log")).expect("register");

    let err = registry.update_levels(id, Levels::empty()).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig { .. }), "got {err:?}");

    let err = registry
        .update_levels(DestinationId::new(42), Levels::all())
        .unwrap_err();
    assert!(matches!(err, Error::InvalidState { .. }), "got {err:?}");
}

#[test]
fn test_unregister_missing_id_fails() {
    let registry = DestinationRegistry::new(5);
    let err = registry
        .unregister(DestinationId::new(0), Duration::from_millis(10))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidState { .. }), "got {err:?}");
}

#[test]
fn test_unregister_waits_for_in_flight_delivery() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = DestinationRegistry::new(5);
    let id = registry.register(file_spec(&dir, "a.log")).expect("register");
    let entry = registry.get(id).expect("entry");

    let ticket = entry.gate().issue();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        ticket.complete();
    });

    registry
        .unregister(id, Duration::from_secs(2))
        .expect("unregister");
    handle.join().expect("completer thread panicked");
    assert!(registry.get(id).is_none());
}

#[test]
fn test_unregister_timeout_leaves_destination_active() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = DestinationRegistry::new(5);
    let id = registry.register(file_spec(&dir, "a.log")).expect("register");
    let entry = registry.get(id).expect("entry");

    let ticket = entry.gate().issue();
    let err = registry.unregister(id, Duration::from_millis(20)).unwrap_err();
    assert!(matches!(err, Error::Timeout { .. }), "got {err:?}");

    // The destination reverts to normal service.
    assert!(!entry.is_retiring());
    assert!(registry.get(id).is_some());
    assert_eq!(registry.snapshot_matching(Level::Info).len(), 1);

    drop(ticket);
    registry
        .unregister(id, Duration::from_millis(100))
        .expect("unregister after release");
}

#[test]
fn test_retiring_destination_hidden_while_draining() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = Arc::new(DestinationRegistry::new(5));
    let id = registry.register(file_spec(&dir, "a.log")).expect("register");
    let entry = registry.get(id).expect("entry");

    let ticket = entry.gate().issue();
    let drainer = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || registry.unregister(id, Duration::from_secs(2)))
    };

    // Give the drain time to flip the entry to retiring.
    thread::sleep(Duration::from_millis(50));
    assert!(registry.get(id).is_none());
    assert!(registry.snapshot_matching(Level::Info).is_empty());

    ticket.complete();
    drainer
        .join()
        .expect("drainer thread panicked")
        .expect("unregister failed");
}

#[test]
fn test_concurrent_unregister_of_same_id_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = Arc::new(DestinationRegistry::new(5));
    let id = registry.register(file_spec(&dir, "a.log")).expect("register");
    let entry = registry.get(id).expect("entry");

    let ticket = entry.gate().issue();
    let drainer = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || registry.unregister(id, Duration::from_secs(2)))
    };

    thread::sleep(Duration::from_millis(50));
    let err = registry
        .unregister(id, Duration::from_millis(10))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidState { .. }), "got {err:?}");

    ticket.complete();
    drainer
        .join()
        .expect("drainer thread panicked")
        .expect("unregister failed");
}

#[test]
fn test_snapshot_is_isolated_from_later_mutation() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = DestinationRegistry::new(5);
    let id = registry.register(file_spec(&dir, "a.log")).expect("register");

    let snapshot = registry.snapshot_matching(Level::Info);
    registry
        .unregister(id, Duration::from_millis(10))
        .expect("unregister");

    // The held snapshot still resolves even though the table moved on.
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].name(), "a.log");
    assert!(registry.is_empty());
}

#[test]
fn test_clear_returns_all_entries() {
    let dir = tempfile::tempdir().expect("tempdir");
    let registry = DestinationRegistry::new(5);
    registry.register(file_spec(&dir, "a.log")).expect("register a");
    registry.register(file_spec(&dir, "b.log")).expect("register b");

    let removed = registry.clear();
    assert_eq!(removed.len(), 2);
    assert!(registry.is_empty());
}
