//! Integration tests for Performic
//!
//! These tests drive a full session through the public API: orchestrated run,
//! GPU handshake, decoding, scoring and report generation.

use performic::{
    BenchmarkOrchestrator, ChannelContext, FpsReporter, GpuOutcome, GpuTestController,
    InlineContext, KernelError, NativeComputeBridge, NoopHooks, OVERHEAT_MESSAGE,
    OrchestratorConfig, OrchestratorState, ReferenceScores, RenderSurface, Report, SessionToken,
    SubScores, composite_score, decode, fraction, generate_csv_report, generate_json_report,
};
use performic_report::{GpuSection, ReportMeta, SystemInfo};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const EXAMPLE_PAYLOAD: &str =
    r#"{"success":true,"singleCore":1200,"multiCore":4300,"ramScore":900,"ramGBs":12.4}"#;

const WAIT: Duration = Duration::from_secs(5);

fn fast_config() -> OrchestratorConfig {
    OrchestratorConfig {
        sample_interval: Duration::from_millis(20),
        join_grace: Duration::from_millis(200),
        max_start_temperature: None,
    }
}

/// Test a full run with a slow kernel and a warming probe
#[test]
fn test_orchestrated_run_end_to_end() {
    let kernel = || {
        thread::sleep(Duration::from_millis(150));
        Ok::<_, KernelError>(EXAMPLE_PAYLOAD.to_string())
    };
    let readings = Arc::new(Mutex::new(40.0f32));
    let probe_readings = Arc::clone(&readings);
    let probe = move || {
        let mut t = probe_readings.lock().unwrap();
        *t += 0.5;
        *t
    };

    let orchestrator = BenchmarkOrchestrator::new(
        NativeComputeBridge::new(Arc::new(kernel)),
        Arc::new(probe),
        Arc::new(NoopHooks),
        fast_config(),
    );

    let (tx, rx) = mpsc::channel();
    let handle = orchestrator
        .start(Arc::new(InlineContext), move |outcome| {
            tx.send(outcome).unwrap();
        })
        .unwrap();
    let session = handle.session();

    let outcome = rx.recv_timeout(WAIT).unwrap();
    handle.join();

    assert_eq!(outcome.session, session);
    assert!(outcome.result.is_success());
    assert_eq!(outcome.result.single_core(), Some(1200.0));
    assert!(outcome.result.single_core_history().is_empty());
    assert!(outcome.result.multi_core_history().is_empty());

    // Sampling ran while the kernel slept
    assert!(outcome.thermal.len() >= 2);
    assert!(
        outcome
            .thermal
            .windows(2)
            .all(|w| w[0].elapsed_ms <= w[1].elapsed_ms)
    );
    assert!(outcome.elapsed >= Duration::from_millis(150));
    assert_eq!(orchestrator.state(), OrchestratorState::Idle);
}

/// Test that a second start is refused while a run is in flight
#[test]
fn test_second_start_rejected() {
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let release_rx = Mutex::new(release_rx);
    let kernel = move || {
        let _ = release_rx.lock().unwrap().recv_timeout(WAIT);
        Ok::<_, KernelError>(EXAMPLE_PAYLOAD.to_string())
    };

    let orchestrator = BenchmarkOrchestrator::new(
        NativeComputeBridge::new(Arc::new(kernel)),
        Arc::new(|| 35.0f32),
        Arc::new(NoopHooks),
        fast_config(),
    );

    let (tx, rx) = mpsc::channel();
    let handle = orchestrator
        .start(Arc::new(InlineContext), move |outcome| {
            tx.send(outcome).unwrap();
        })
        .unwrap();

    assert!(orchestrator.start(Arc::new(InlineContext), |_| {}).is_err());

    release_tx.send(()).unwrap();
    assert!(rx.recv_timeout(WAIT).unwrap().result.is_success());
    handle.join();
    drop(release_tx);

    // Idle again: the next run is accepted
    let handle = orchestrator.start(Arc::new(InlineContext), |_| {}).unwrap();
    handle.join();
}

/// Test that an overheated device never reaches the kernel
#[test]
fn test_overheat_gate() {
    let kernel = || -> Result<String, KernelError> { panic!("kernel must not run") };
    let config = OrchestratorConfig {
        max_start_temperature: Some(45.0),
        ..fast_config()
    };
    let orchestrator = BenchmarkOrchestrator::new(
        NativeComputeBridge::new(Arc::new(kernel)),
        Arc::new(|| 52.0f32),
        Arc::new(NoopHooks),
        config,
    );

    let (tx, rx) = mpsc::channel();
    orchestrator
        .start(Arc::new(InlineContext), move |outcome| {
            tx.send(outcome).unwrap();
        })
        .unwrap()
        .join();

    let outcome = rx.recv_timeout(WAIT).unwrap();
    assert!(!outcome.result.is_success());
    assert_eq!(outcome.result.message(), OVERHEAT_MESSAGE);
    assert!(outcome.thermal.is_empty());
}

/// Test that completions can be delivered on the caller's thread
#[test]
fn test_completion_on_caller_thread() {
    let kernel = || Ok::<_, KernelError>("not json".to_string());
    let orchestrator = BenchmarkOrchestrator::new(
        NativeComputeBridge::new(Arc::new(kernel)),
        Arc::new(|| 30.0f32),
        Arc::new(NoopHooks),
        fast_config(),
    );

    let (context, queue) = ChannelContext::new();
    let caller = thread::current().id();
    let delivered = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&delivered);
    orchestrator
        .start(Arc::new(context), move |outcome| {
            *slot.lock().unwrap() = Some((thread::current().id(), outcome));
        })
        .unwrap();

    assert!(queue.run_next(WAIT));
    let (thread_id, outcome) = delivered.lock().unwrap().take().unwrap();
    assert_eq!(thread_id, caller);
    assert!(!outcome.result.is_success());
    assert!(!outcome.result.message().is_empty());
}

/// Test the example payload through scoring and report generation
#[test]
fn test_example_payload_composite() {
    let result = decode(EXAMPLE_PAYLOAD);
    assert!(result.is_success());
    assert!(result.single_core_history().is_empty());
    assert!(result.multi_core_history().is_empty());

    let scores = SubScores::from_result(&result, Some(2000.0));
    assert!((scores.composite() - 2425.0).abs() < 1e-9);

    let report = Report::new(
        ReportMeta::new(7, 1200, SystemInfo::default()),
        result,
        Vec::new(),
        GpuSection::Completed { score: 2000.0 },
        &ReferenceScores::default(),
    );
    assert!((report.scores.composite - 2425.0).abs() < 1e-9);

    let json = generate_json_report(&report).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["meta"]["session"], 7);
    assert_eq!(value["gpu"]["status"], "completed");

    let csv = generate_csv_report(&report);
    assert_eq!(csv.lines().count(), 1);
}

/// Test composite weighting and fraction clamping
#[test]
fn test_scoring_rules() {
    let scores = SubScores {
        single_core: Some(1000.0),
        multi_core: None,
        ram: None,
        gpu: None,
    };
    assert!((composite_score(&scores) - 200.0).abs() < 1e-9);

    assert_eq!(fraction(4000.0, 2000.0), 1.0);
    assert_eq!(fraction(-10.0, 2000.0), 0.0);
    assert_eq!(fraction(1000.0, 2000.0), 0.5);
}

/// Test malformed and incomplete payloads decode to failures
#[test]
fn test_defensive_decoding() {
    for payload in ["", "{", "[1,2,3]", r#"{"singleCore":1200}"#, r#"{"success":"yes"}"#] {
        let result = decode(payload);
        assert!(!result.is_success(), "accepted {:?}", payload);
        assert!(!result.message().is_empty());
    }

    let failed = decode(r#"{"success":false,"message":"thermal throttling"}"#);
    assert!(!failed.is_success());
    assert_eq!(failed.message(), "thermal throttling");
}

fn fixed_gpu_kernel(_surface: &RenderSurface, fps: &FpsReporter) -> Result<f64, KernelError> {
    fps.report(0);
    fps.report(58);
    Ok(5800.0)
}

/// Test the GPU test starts immediately when bound to a valid surface
#[test]
fn test_gpu_bind_when_valid() {
    let controller = GpuTestController::new(Arc::new(fixed_gpu_kernel), Arc::new(InlineContext));
    let surface = RenderSurface::headless("integration");
    assert!(surface.is_valid());

    let readings = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&readings);
    let listener = move |session: SessionToken, fps: u32| {
        sink.lock().unwrap().push((session, fps));
    };

    let (tx, rx) = mpsc::channel();
    let session = controller.bind(&surface, Arc::new(listener), move |outcome| {
        tx.send(outcome).unwrap();
    });

    let outcome = rx.recv_timeout(WAIT).unwrap();
    assert_eq!(outcome.session(), session);
    assert_eq!(outcome.score(), Some(5800.0));
    assert_eq!(
        *readings.lock().unwrap(),
        vec![(session, 0), (session, 58)]
    );
}

/// Test that a rebind isolates the new session from the old one
#[test]
fn test_gpu_session_isolation() {
    let controller = GpuTestController::new(Arc::new(fixed_gpu_kernel), Arc::new(InlineContext));
    let pending = RenderSurface::new("pending");
    assert!(!pending.is_valid());

    let readings = Arc::new(Mutex::new(Vec::new()));
    let (tx, rx) = mpsc::channel();

    let sink = Arc::clone(&readings);
    let first_tx = tx.clone();
    let first = controller.bind(
        &pending,
        Arc::new(move |session: SessionToken, fps: u32| {
            sink.lock().unwrap().push((session, fps));
        }),
        move |outcome| {
            first_tx.send(outcome).unwrap();
        },
    );

    let ready = RenderSurface::headless("ready");
    let sink = Arc::clone(&readings);
    let second = controller.bind(
        &ready,
        Arc::new(move |session: SessionToken, fps: u32| {
            sink.lock().unwrap().push((session, fps));
        }),
        move |outcome| {
            tx.send(outcome).unwrap();
        },
    );
    assert_ne!(first, second);

    // Making the stale surface valid must not start the superseded session
    pending.mark_valid();

    let mut outcomes = vec![
        rx.recv_timeout(WAIT).unwrap(),
        rx.recv_timeout(WAIT).unwrap(),
    ];
    outcomes.sort_by_key(|o| o.session() != first);

    assert!(matches!(&outcomes[0], GpuOutcome::Aborted { session, .. } if *session == first));
    assert!(matches!(&outcomes[1], GpuOutcome::Completed { session, .. } if *session == second));
    assert!(
        readings
            .lock()
            .unwrap()
            .iter()
            .all(|(session, _)| *session == second)
    );
}
