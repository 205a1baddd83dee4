//! Cooperative cancellation and wall-clock budgets.
//!
//! Cancellation never poisons an engine: partial automorphism results stay
//! queryable, undecided isomorphism tests surface as errors, and a watchdog
//! that fired clears the token once its call returns.

#![allow(missing_docs)]

use std::sync::Once;
use std::thread;
use std::time::Duration;

use dejavu_gi::{
    CancelToken, Completion, Dejavu, DejavuError, GraphHandle, Result, SearchConfig, Watchdog,
};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn petersen(engine: &Dejavu) -> Result<GraphHandle> {
    let g = engine.create(10)?;
    for i in 0..5 {
        engine.add_edge(g, i, (i + 1) % 5)?;
        engine.add_edge(g, i, i + 5)?;
        engine.add_edge(g, 5 + i, 5 + (i + 2) % 5)?;
    }
    Ok(g)
}

#[test]
fn cancelled_discovery_returns_a_partial_result() -> Result<()> {
    init_tracing();
    let engine = Dejavu::new();
    let g = petersen(&engine)?;
    engine.cancel();
    let r = engine.discover_automorphisms(g, 0.0)?;
    assert_eq!(engine.result_completion(r)?, Completion::Cancelled);
    assert!(engine.group_order_mantissa(r)? >= 1.0);
    assert!(engine.group_order_exponent(r)? >= 0);

    engine.reset_cancel();
    let full = engine.discover_automorphisms(g, 0.0)?;
    assert_eq!(engine.result_completion(full)?, Completion::Complete);
    assert_eq!(engine.group_order_mantissa(full)?, 1.875);
    assert_eq!(engine.group_order_exponent(full)?, 6);
    Ok(())
}

#[test]
fn cancelled_isomorphism_test_is_an_error() -> Result<()> {
    let engine = Dejavu::new();
    let a = petersen(&engine)?;
    let b = petersen(&engine)?;
    engine.cancel_token().cancel();
    for eps in [0.0, 0.1] {
        assert!(matches!(
            engine.are_isomorphic(a, b, eps),
            Err(DejavuError::Cancelled)
        ));
    }
    engine.reset_cancel();
    assert!(engine.are_isomorphic(a, b, 0.0)?);
    Ok(())
}

#[test]
fn cancelled_sampling_is_flagged() -> Result<()> {
    let engine = Dejavu::new();
    let g = petersen(&engine)?;
    engine.cancel();
    let p = engine.sample_paths(g, 4, 8, false)?;
    assert_eq!(engine.path_completion(p)?, Completion::Cancelled);
    assert_eq!(engine.path_count(p)?, 0);
    Ok(())
}

#[test]
fn watchdog_cancels_after_its_budget() -> Result<()> {
    let token = CancelToken::new();
    let watchdog = Watchdog::arm(token.clone(), Duration::from_millis(5))?;
    thread::sleep(Duration::from_millis(100));
    assert!(watchdog.fired());
    assert!(token.is_cancelled());
    assert!(watchdog.disarm());

    let quiet = CancelToken::new();
    let watchdog = Watchdog::arm(quiet.clone(), Duration::from_secs(60))?;
    assert!(!watchdog.disarm());
    assert!(!quiet.is_cancelled());
    Ok(())
}

#[test]
fn timed_out_call_reports_cancellation_and_resets() -> Result<()> {
    init_tracing();
    let engine = Dejavu::new();
    let g = petersen(&engine)?;
    let r = engine.with_timeout(Duration::from_millis(5), |e| {
        thread::sleep(Duration::from_millis(100));
        assert!(e.cancel_token().is_cancelled());
        e.discover_automorphisms(g, 0.0)
    })?;
    assert_eq!(engine.result_completion(r)?, Completion::Cancelled);
    assert!(!engine.cancel_token().is_cancelled());

    let r = engine.with_timeout(Duration::from_secs(60), |e| e.discover_automorphisms(g, 0.0))?;
    assert_eq!(engine.result_completion(r)?, Completion::Complete);
    Ok(())
}

#[test]
fn configured_engine_applies_settings() -> Result<()> {
    let mut config = SearchConfig::default();
    config.threads = 2;
    config.seed = Some(17);
    config.timeout_ms = Some(60_000);
    config.default_max_path_length = 3;
    let engine = Dejavu::from_config(&config)?;
    assert_eq!(engine.threads(), 2);
    let g = petersen(&engine)?;
    let r = engine.discover_automorphisms(g, 0.0)?;
    assert_eq!(engine.result_completion(r)?, Completion::Complete);
    let max_len = engine.default_max_path_length() as i64;
    let p = engine.sample_paths(g, max_len, 4, true)?;
    assert!(engine.path_size(p, 0)? <= 3);

    let mut broken = SearchConfig::default();
    broken.error_bound = -1.0;
    assert!(matches!(
        Dejavu::from_config(&broken),
        Err(DejavuError::Config(_))
    ));
    Ok(())
}
