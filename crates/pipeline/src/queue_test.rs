use super::*;

use std::thread;

use fanlog_protocol::{Level, Levels};
use fanlog_registry::{DestinationRegistry, DestinationSpec};
use fanlog_sinks::NullSyslog;

fn config(capacity: usize, policy: BackpressurePolicy) -> QueueConfig {
    QueueConfig {
        capacity,
        backpressure_policy: policy,
        enqueue_timeout: Duration::from_millis(100),
    }
}

fn syslog_target(registry: &DestinationRegistry) -> Arc<DestinationEntry> {
    let id = registry
        .register(DestinationSpec::syslog(Box::new(NullSyslog)).with_levels(Levels::all()))
        .expect("register");
    registry.get(id).expect("entry")
}

fn record(message: &str) -> LogRecord {
    LogRecord::new(Level::Info, "test", message)
}

#[test]
fn test_enqueue_dequeue_round_trip() {
    let registry = DestinationRegistry::new(5);
    let entry = syslog_target(&registry);
    let metrics = Arc::new(EngineMetrics::new());
    let queue = DispatchQueue::new(&config(4, BackpressurePolicy::Block), Arc::clone(&metrics));

    queue
        .enqueue(record("one"), &[Arc::clone(&entry)])
        .expect("enqueue");
    assert_eq!(queue.len(), 1);
    assert_eq!(metrics.queue_depth(), 1);

    let job = match queue.dequeue(Duration::from_millis(10)) {
        Dequeued::Job(job) => job,
        other => panic!("expected a job, got {other:?}"),
    };
    assert_eq!(job.record.message(), "one");
    assert_eq!(job.targets.len(), 1);
    assert_eq!(job.targets[0].id, entry.id());
    assert!(queue.is_empty());
    assert_eq!(metrics.queue_depth(), 0);
}

#[test]
fn test_fifo_order() {
    let registry = DestinationRegistry::new(5);
    let entry = syslog_target(&registry);
    let queue = DispatchQueue::new(
        &config(4, BackpressurePolicy::Block),
        Arc::new(EngineMetrics::new()),
    );

    for message in ["a", "b", "c"] {
        queue
            .enqueue(record(message), &[Arc::clone(&entry)])
            .expect("enqueue");
    }

    for expected in ["a", "b", "c"] {
        match queue.dequeue(Duration::from_millis(10)) {
            Dequeued::Job(job) => assert_eq!(job.record.message(), expected),
            other => panic!("expected a job, got {other:?}"),
        }
    }
}

#[test]
fn test_tickets_follow_queue_order() {
    let registry = DestinationRegistry::new(5);
    let entry = syslog_target(&registry);
    let queue = DispatchQueue::new(
        &config(4, BackpressurePolicy::Block),
        Arc::new(EngineMetrics::new()),
    );

    queue
        .enqueue(record("first"), &[Arc::clone(&entry)])
        .expect("enqueue");
    queue
        .enqueue(record("second"), &[Arc::clone(&entry)])
        .expect("enqueue");
    assert_eq!(entry.gate().in_flight(), 2);

    let first = match queue.dequeue(Duration::from_millis(10)) {
        Dequeued::Job(job) => job,
        other => panic!("expected a job, got {other:?}"),
    };
    let second = match queue.dequeue(Duration::from_millis(10)) {
        Dequeued::Job(job) => job,
        other => panic!("expected a job, got {other:?}"),
    };
    assert!(first.targets[0].ticket.seq() < second.targets[0].ticket.seq());
}

#[test]
fn test_block_policy_waits_for_space() {
    let registry = DestinationRegistry::new(5);
    let entry = syslog_target(&registry);
    let queue = Arc::new(DispatchQueue::new(
        &QueueConfig {
            capacity: 1,
            backpressure_policy: BackpressurePolicy::Block,
            enqueue_timeout: Duration::from_secs(2),
        },
        Arc::new(EngineMetrics::new()),
    ));

    queue
        .enqueue(record("first"), &[Arc::clone(&entry)])
        .expect("enqueue");

    let consumer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            match queue.dequeue(Duration::from_millis(10)) {
                Dequeued::Job(job) => job.record.message().to_string(),
                other => panic!("expected a job, got {other:?}"),
            }
        })
    };

    // Blocks until the consumer frees a slot.
    queue
        .enqueue(record("second"), &[Arc::clone(&entry)])
        .expect("enqueue");

    assert_eq!(consumer.join().expect("consumer panicked"), "first");
    assert_eq!(queue.len(), 1);
}

#[test]
fn test_block_policy_times_out() {
    let registry = DestinationRegistry::new(5);
    let entry = syslog_target(&registry);
    let metrics = Arc::new(EngineMetrics::new());
    let queue = DispatchQueue::new(
        &QueueConfig {
            capacity: 1,
            backpressure_policy: BackpressurePolicy::Block,
            enqueue_timeout: Duration::from_millis(30),
        },
        Arc::clone(&metrics),
    );

    queue
        .enqueue(record("first"), &[Arc::clone(&entry)])
        .expect("enqueue");
    let err = queue
        .enqueue(record("second"), &[Arc::clone(&entry)])
        .unwrap_err();
    assert!(matches!(err, Error::ResourceExhausted { .. }), "got {err:?}");
    assert_eq!(queue.len(), 1);
    assert_eq!(metrics.snapshot().enqueue_timeouts, 1);
}

#[test]
fn test_drop_oldest_evicts_head() {
    let registry = DestinationRegistry::new(5);
    let entry = syslog_target(&registry);
    let metrics = Arc::new(EngineMetrics::new());
    let queue = DispatchQueue::new(
        &config(2, BackpressurePolicy::DropOldest),
        Arc::clone(&metrics),
    );

    for message in ["a", "b", "c"] {
        queue
            .enqueue(record(message), &[Arc::clone(&entry)])
            .expect("enqueue");
    }
    assert_eq!(queue.len(), 2);
    // The evicted head's ticket finished when the job dropped.
    assert_eq!(entry.gate().in_flight(), 2);

    for expected in ["b", "c"] {
        match queue.dequeue(Duration::from_millis(10)) {
            Dequeued::Job(job) => assert_eq!(job.record.message(), expected),
            other => panic!("expected a job, got {other:?}"),
        }
    }

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.jobs_enqueued, 3);
    assert_eq!(snapshot.jobs_dropped_oldest, 1);
    assert_eq!(snapshot.queue_depth, 0);
}

#[test]
fn test_drop_newest_rejects_incoming() {
    let registry = DestinationRegistry::new(5);
    let entry = syslog_target(&registry);
    let metrics = Arc::new(EngineMetrics::new());
    let queue = DispatchQueue::new(
        &config(1, BackpressurePolicy::DropNewest),
        Arc::clone(&metrics),
    );

    queue
        .enqueue(record("kept"), &[Arc::clone(&entry)])
        .expect("enqueue");
    let err = queue
        .enqueue(record("rejected"), &[Arc::clone(&entry)])
        .unwrap_err();
    assert!(
        matches!(err, Error::QueueFull { capacity: 1 }),
        "got {err:?}"
    );

    // The rejected record took no ticket.
    assert_eq!(entry.gate().in_flight(), 1);
    assert_eq!(queue.len(), 1);
    assert_eq!(metrics.snapshot().jobs_rejected, 1);
}

#[test]
fn test_close_wakes_blocked_producer() {
    let registry = DestinationRegistry::new(5);
    let entry = syslog_target(&registry);
    let queue = Arc::new(DispatchQueue::new(
        &QueueConfig {
            capacity: 1,
            backpressure_policy: BackpressurePolicy::Block,
            enqueue_timeout: Duration::from_secs(5),
        },
        Arc::new(EngineMetrics::new()),
    ));

    queue
        .enqueue(record("first"), &[Arc::clone(&entry)])
        .expect("enqueue");

    let closer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            queue.close();
        })
    };

    let err = queue
        .enqueue(record("second"), &[Arc::clone(&entry)])
        .unwrap_err();
    assert!(matches!(err, Error::InvalidState { .. }), "got {err:?}");
    closer.join().expect("closer panicked");

    // Intake stays refused once closed.
    let err = queue
        .enqueue(record("third"), &[Arc::clone(&entry)])
        .unwrap_err();
    assert!(matches!(err, Error::InvalidState { .. }), "got {err:?}");
}

#[test]
fn test_dequeue_drains_after_close() {
    let registry = DestinationRegistry::new(5);
    let entry = syslog_target(&registry);
    let queue = DispatchQueue::new(
        &config(4, BackpressurePolicy::Block),
        Arc::new(EngineMetrics::new()),
    );

    queue
        .enqueue(record("a"), &[Arc::clone(&entry)])
        .expect("enqueue");
    queue
        .enqueue(record("b"), &[Arc::clone(&entry)])
        .expect("enqueue");
    queue.close();
    assert!(queue.is_closed());

    for expected in ["a", "b"] {
        match queue.dequeue(Duration::from_millis(10)) {
            Dequeued::Job(job) => assert_eq!(job.record.message(), expected),
            other => panic!("expected a job, got {other:?}"),
        }
    }
    assert!(matches!(
        queue.dequeue(Duration::from_millis(10)),
        Dequeued::Closed
    ));
}

#[test]
fn test_dequeue_idle_on_timeout() {
    let queue = DispatchQueue::new(
        &config(4, BackpressurePolicy::Block),
        Arc::new(EngineMetrics::new()),
    );

    let started = Instant::now();
    assert!(matches!(
        queue.dequeue(Duration::from_millis(20)),
        Dequeued::Idle
    ));
    assert!(started.elapsed() >= Duration::from_millis(20));

    queue.close();
    assert!(matches!(
        queue.dequeue(Duration::from_millis(20)),
        Dequeued::Closed
    ));
}

#[test]
fn test_concurrent_producers_keep_per_producer_order() {
    let registry = DestinationRegistry::new(5);
    let entry = syslog_target(&registry);
    let queue = Arc::new(DispatchQueue::new(
        &QueueConfig {
            capacity: 4,
            backpressure_policy: BackpressurePolicy::Block,
            enqueue_timeout: Duration::from_secs(5),
        },
        Arc::new(EngineMetrics::new()),
    ));

    let consumer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || {
            let mut seen = Vec::new();
            loop {
                match queue.dequeue(Duration::from_millis(50)) {
                    Dequeued::Job(job) => seen.push(job.record.message().to_string()),
                    Dequeued::Idle => continue,
                    Dequeued::Closed => break,
                }
            }
            seen
        })
    };

    let producers: Vec<_> = (0..4)
        .map(|p| {
            let queue = Arc::clone(&queue);
            let entry = Arc::clone(&entry);
            thread::spawn(move || {
                for i in 0..25 {
                    queue
                        .enqueue(record(&format!("p{p}-{i}")), &[Arc::clone(&entry)])
                        .expect("enqueue");
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().expect("producer panicked");
    }
    queue.close();

    let seen = consumer.join().expect("consumer panicked");
    assert_eq!(seen.len(), 100);

    // Each producer's records come out in its own submission order.
    for p in 0..4 {
        let order: Vec<_> = seen
            .iter()
            .filter(|m| m.starts_with(&format!("p{p}-")))
            .collect();
        let expected: Vec<String> = (0..25).map(|i| format!("p{p}-{i}")).collect();
        assert_eq!(order.len(), 25);
        for (got, want) in order.iter().zip(&expected) {
            assert_eq!(*got, want);
        }
    }
}
