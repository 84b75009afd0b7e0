//! Concurrency tests for the shared engine bootstrap.

use meridian_test_utils::{
    BootstrapError, EngineConfig, SharedEngine, TestEnv, TransactionEngineFactory,
};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, OnceLock};
use std::thread;
use std::time::Duration;

const THREADS: usize = 16;

/// Engine double that records every initialization.
struct RecordingFactory {
    calls: AtomicUsize,
    failures_left: AtomicUsize,
    seen_config: OnceLock<EngineConfig>,
}

impl RecordingFactory {
    fn new(failures: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failures_left: AtomicUsize::new(failures),
            seen_config: OnceLock::new(),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
struct TestEngine {
    id: usize,
}

impl TransactionEngineFactory for RecordingFactory {
    type Handle = TestEngine;
    type Error = io::Error;

    fn name(&self) -> &str {
        "recording"
    }

    fn initialize(&self, config: &EngineConfig) -> Result<TestEngine, io::Error> {
        let id = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = self.seen_config.set(config.clone());

        // Widen the window for racing callers.
        thread::sleep(Duration::from_millis(50));

        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(io::Error::other("log dir not writable"));
        }
        Ok(TestEngine { id })
    }
}

fn run_concurrently(
    engine: &Arc<SharedEngine<RecordingFactory>>,
) -> Vec<Result<Arc<TestEngine>, BootstrapError>> {
    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let engine = Arc::clone(engine);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                engine.get_or_init()
            })
        })
        .collect();

    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

#[test]
fn test_concurrent_callers_share_one_engine() {
    let engine = Arc::new(SharedEngine::new(
        RecordingFactory::new(0),
        EngineConfig::new("base"),
    ));

    let results = run_concurrently(&engine);
    let handles: Vec<_> = results.into_iter().map(Result::unwrap).collect();

    assert_eq!(engine.factory().calls(), 1);
    assert_eq!(handles[0].id, 1);
    for handle in &handles {
        assert!(Arc::ptr_eq(handle, &handles[0]));
    }
}

#[test]
fn test_failed_init_propagates_and_retries() {
    let engine = Arc::new(SharedEngine::new(
        RecordingFactory::new(1),
        EngineConfig::new("base"),
    ));

    let err = engine.get_or_init().unwrap_err();
    assert!(matches!(
        &err,
        BootstrapError::EngineInitFailed { engine, .. } if engine == "recording"
    ));
    assert!(err.to_string().contains("log dir not writable"));
    assert!(engine.get().is_none());

    let results = run_concurrently(&engine);
    assert!(results.iter().all(Result::is_ok));
    assert_eq!(engine.factory().calls(), 2);
}

#[test]
fn test_engine_receives_environment_config() {
    let env = TestEnv {
        base_dir: "./bootstrap-data/test".into(),
        ..TestEnv::default()
    };
    let engine = SharedEngine::for_env(RecordingFactory::new(0), &env);
    engine.get_or_init().unwrap();

    let seen = engine.factory().seen_config.get().unwrap();
    let map = seen.to_map();
    assert_eq!(map["base_dir"], "./bootstrap-data/test");
    assert_eq!(map["transaction_log_dir"], "tlog");
    assert_eq!(map["log_sync_type"], "no_sync");
}

#[test]
fn test_process_wide_static() {
    fn engine() -> &'static SharedEngine<RecordingFactory> {
        static ENGINE: OnceLock<SharedEngine<RecordingFactory>> = OnceLock::new();
        ENGINE.get_or_init(|| {
            SharedEngine::new(RecordingFactory::new(0), EngineConfig::new("static"))
        })
    }

    let ids: Vec<usize> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| s.spawn(|| engine().get_or_init().unwrap().id))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(ids.iter().all(|&id| id == 1));
    assert_eq!(engine().factory().calls(), 1);
}
