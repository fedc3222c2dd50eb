//! Ordering and concurrency-bound properties of the pool.
//!
//! Tests cover:
//! - Output order matches submission order regardless of completion order
//! - The concurrency limit is never exceeded
//! - Degraded (synchronous) mode
//! - Artifact-callback sinks see complete, ordered, cleaned-up artifacts

mod common;
use common::SharedBuffer;

use anyhow::Result;
use ordered_pool::{DrainStatus, OutputSink, PoolConfig, WorkPool};
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

fn lines_pool(limit: usize, name: &str) -> Result<(WorkPool, SharedBuffer)> {
    let buffer = SharedBuffer::default();
    let config = PoolConfig::builder()
        .concurrency_limit(limit)
        .pool_name(name)
        .build();
    let pool = WorkPool::new(config, OutputSink::lines(buffer.clone()))?;
    Ok((pool, buffer))
}

#[test]
fn test_output_order_survives_out_of_order_completion() -> Result<()> {
    let (mut pool, buffer) = lines_pool(2, "reversed")?;

    // Earlier units sleep longer, so within every concurrent pair the later
    // submission finishes first.
    let labels = ["A", "B", "C", "D", "E"];
    for (i, label) in labels.iter().enumerate() {
        let delay = Duration::from_millis(((labels.len() - i) * 60) as u64);
        let label = label.to_string();
        pool.submit(
            move |(): ()| {
                thread::sleep(delay);
                vec![label]
            },
            (),
        )?;
        pool.drain_once()?;
    }
    pool.shutdown()?;

    assert_eq!(buffer.contents(), "A\nB\nC\nD\nE\n");
    Ok(())
}

#[test]
fn test_randomized_completion_preserves_submission_order() -> Result<()> {
    let (mut pool, buffer) = lines_pool(4, "randomized")?;

    let mut rng = rand::rng();
    let mut expected = String::new();
    for i in 0..12u32 {
        let delay = Duration::from_millis(rng.random_range(0..60));
        for j in 0..2 {
            expected.push_str(&format!("unit {i} line {j}\n"));
        }
        pool.submit(
            move |unit: u32| {
                thread::sleep(delay);
                (0..2).map(move |j| format!("unit {unit} line {j}"))
            },
            i,
        )?;
        pool.drain_once()?;
    }
    pool.shutdown()?;

    assert_eq!(buffer.contents(), expected);
    Ok(())
}

#[test]
fn test_running_units_never_exceed_limit() -> Result<()> {
    let (mut pool, _buffer) = lines_pool(3, "bounded")?;

    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    for i in 0..10u32 {
        let running = running.clone();
        let peak = peak.clone();
        pool.submit(
            move |unit: u32| {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(40));
                running.fetch_sub(1, Ordering::SeqCst);
                vec![format!("{unit}")]
            },
            i,
        )?;
    }
    pool.shutdown()?;

    assert!(
        peak.load(Ordering::SeqCst) <= 3,
        "peak concurrency {} exceeded limit 3",
        peak.load(Ordering::SeqCst)
    );
    Ok(())
}

#[test]
fn test_degraded_mode_runs_synchronously() -> Result<()> {
    let (mut pool, buffer) = lines_pool(1, "degraded")?;

    pool.submit(|(): ()| vec!["first".to_string()], ())?;
    // Synchronous: the output is already in the sink when submit returns.
    assert_eq!(buffer.contents(), "first\n");

    pool.submit(|(): ()| vec!["second".to_string()], ())?;
    assert_eq!(pool.drain_once()?, DrainStatus::Drained);
    pool.shutdown()?;

    assert_eq!(buffer.contents(), "first\nsecond\n");
    Ok(())
}

#[test]
fn test_drain_before_any_publish_reports_pending() -> Result<()> {
    let (mut pool, buffer) = lines_pool(2, "pending")?;

    pool.submit(
        |(): ()| {
            thread::sleep(Duration::from_millis(250));
            vec!["late".to_string()]
        },
        (),
    )?;

    // Nothing published yet: no progress, no error.
    assert_eq!(pool.drain_once()?, DrainStatus::Pending);
    assert_eq!(buffer.contents(), "");

    pool.shutdown()?;
    assert_eq!(buffer.contents(), "late\n");
    Ok(())
}

#[test]
fn test_artifact_callback_sees_complete_ordered_artifacts() -> Result<()> {
    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let paths = Arc::new(Mutex::new(Vec::new()));

    let seen_by_callback = seen.clone();
    let paths_by_callback = paths.clone();
    let sink = OutputSink::artifacts(move |path| {
        // The artifact must be fully published the moment it is visible.
        let content = std::fs::read_to_string(path)?;
        seen_by_callback.lock().unwrap().push(content);
        paths_by_callback.lock().unwrap().push(path.to_path_buf());
        Ok(())
    });

    let config = PoolConfig::builder()
        .concurrency_limit(2)
        .pool_name("callback")
        .build();
    let mut pool = WorkPool::new(config, sink)?;

    for i in 0..4u64 {
        let delay = Duration::from_millis((4 - i) * 40);
        pool.submit(
            move |unit: u64| {
                thread::sleep(delay);
                (0..100).map(move |line| format!("{unit}:{line}"))
            },
            i,
        )?;
    }
    pool.shutdown()?;

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 4);
    for (unit, content) in seen.iter().enumerate() {
        let expected: String = (0..100).map(|line| format!("{unit}:{line}\n")).collect();
        assert_eq!(content, &expected, "unit {unit} artifact incomplete");
    }

    // Consumed artifacts are deleted after the callback returns.
    for path in paths.lock().unwrap().iter() {
        assert!(!path.exists(), "artifact {} not cleaned up", path.display());
    }
    Ok(())
}
