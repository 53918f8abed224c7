// ABOUTME: Tests for pose model backend selection and memoized initialization
// ABOUTME: Priority order, capability filtering, shared in-flight attempts, and uncached failures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(missing_docs)]

mod common;

use common::{init_test_logging, FakeBackend, ScriptedDetector};
use guided_training::bootstrap::{DeviceCapabilities, PoseModelBootstrap};
use guided_training::config::BootstrapConfig;
use guided_training::errors::ErrorCode;
use guided_training::external::{BackendKind, InferenceBackend};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

fn config(prewarm: bool) -> BootstrapConfig {
    BootstrapConfig {
        prewarm,
        load_timeout_ms: 1_000,
    }
}

fn backends(list: &[&Arc<FakeBackend>]) -> Vec<Arc<dyn InferenceBackend>> {
    list.iter()
        .map(|backend| Arc::clone(*backend) as Arc<dyn InferenceBackend>)
        .collect()
}

#[tokio::test]
async fn test_backends_tried_in_priority_order() {
    init_test_logging();
    let detector = ScriptedDetector::new();
    let cpu = FakeBackend::new(BackendKind::Cpu, &detector);
    let accelerated = FakeBackend::failing(BackendKind::Accelerated, &detector);
    let gpu = FakeBackend::new(BackendKind::Gpu, &detector);
    let bootstrap = PoseModelBootstrap::new(
        backends(&[&cpu, &accelerated, &gpu]),
        DeviceCapabilities::all(),
        config(true),
    );

    assert_eq!(
        bootstrap.candidates(),
        vec![BackendKind::Accelerated, BackendKind::Gpu, BackendKind::Cpu]
    );

    let handle = bootstrap.initialize().await.unwrap();

    assert_eq!(handle.backend, BackendKind::Gpu);
    assert_eq!(accelerated.loads.load(Ordering::SeqCst), 1);
    assert_eq!(cpu.loads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unsupported_backends_are_filtered_out() {
    init_test_logging();
    let detector = ScriptedDetector::new();
    let cpu = FakeBackend::new(BackendKind::Cpu, &detector);
    let gpu = FakeBackend::new(BackendKind::Gpu, &detector);
    let bootstrap = PoseModelBootstrap::new(
        backends(&[&gpu, &cpu]),
        DeviceCapabilities::cpu_only(),
        config(true),
    );

    assert_eq!(bootstrap.candidates(), vec![BackendKind::Cpu]);
    let handle = bootstrap.initialize().await.unwrap();
    assert_eq!(handle.backend, BackendKind::Cpu);
    assert_eq!(gpu.loads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_success_is_memoized() {
    init_test_logging();
    let detector = ScriptedDetector::new();
    let cpu = FakeBackend::new(BackendKind::Cpu, &detector);
    let bootstrap =
        PoseModelBootstrap::new(backends(&[&cpu]), DeviceCapabilities::all(), config(true));

    assert!(!bootstrap.is_ready());
    bootstrap.initialize().await.unwrap();
    bootstrap.initialize().await.unwrap();

    assert!(bootstrap.is_ready());
    assert_eq!(cpu.loads.load(Ordering::SeqCst), 1);
    assert_eq!(cpu.prewarms.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_callers_share_one_attempt() {
    init_test_logging();
    let detector = ScriptedDetector::new();
    let cpu = FakeBackend::new(BackendKind::Cpu, &detector);
    *cpu.load_delay.lock().unwrap() = Some(Duration::from_millis(200));
    let bootstrap =
        PoseModelBootstrap::new(backends(&[&cpu]), DeviceCapabilities::all(), config(false));

    let (first, second) = tokio::join!(bootstrap.initialize(), bootstrap.initialize());

    assert_eq!(first.unwrap().backend, BackendKind::Cpu);
    assert_eq!(second.unwrap().backend, BackendKind::Cpu);
    assert_eq!(cpu.loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_exhausted_backends_fail_without_caching() {
    init_test_logging();
    let detector = ScriptedDetector::new();
    let gpu = FakeBackend::failing(BackendKind::Gpu, &detector);
    let cpu = FakeBackend::failing(BackendKind::Cpu, &detector);
    let bootstrap = PoseModelBootstrap::new(
        backends(&[&gpu, &cpu]),
        DeviceCapabilities::all(),
        config(true),
    );

    let err = bootstrap.initialize().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InitializationFailed);
    assert!(err.message.contains("gpu"));
    assert!(err.message.contains("cpu"));
    assert!(!bootstrap.is_ready());

    cpu.fail_load.store(false, Ordering::SeqCst);
    let handle = bootstrap.initialize().await.unwrap();

    assert_eq!(handle.backend, BackendKind::Cpu);
    assert_eq!(gpu.loads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_prewarm_can_be_disabled() {
    init_test_logging();
    let detector = ScriptedDetector::new();
    let cpu = FakeBackend::new(BackendKind::Cpu, &detector);
    let bootstrap =
        PoseModelBootstrap::new(backends(&[&cpu]), DeviceCapabilities::all(), config(false));

    bootstrap.initialize().await.unwrap();

    assert_eq!(cpu.prewarms.load(Ordering::SeqCst), 0);
    assert_eq!(cpu.loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_prewarm_failure_falls_through() {
    init_test_logging();
    let detector = ScriptedDetector::new();
    let gpu = FakeBackend::new(BackendKind::Gpu, &detector);
    gpu.fail_prewarm.store(true, Ordering::SeqCst);
    let cpu = FakeBackend::new(BackendKind::Cpu, &detector);
    let bootstrap = PoseModelBootstrap::new(
        backends(&[&gpu, &cpu]),
        DeviceCapabilities::all(),
        config(true),
    );

    let handle = bootstrap.initialize().await.unwrap();

    assert_eq!(handle.backend, BackendKind::Cpu);
    assert_eq!(gpu.loads.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_slow_backend_times_out_and_falls_through() {
    init_test_logging();
    let detector = ScriptedDetector::new();
    let accelerated = FakeBackend::new(BackendKind::Accelerated, &detector);
    *accelerated.load_delay.lock().unwrap() = Some(Duration::from_secs(5));
    let gpu = FakeBackend::new(BackendKind::Gpu, &detector);
    let bootstrap = PoseModelBootstrap::new(
        backends(&[&accelerated, &gpu]),
        DeviceCapabilities::all(),
        config(false),
    );

    let handle = bootstrap.initialize().await.unwrap();

    assert_eq!(handle.backend, BackendKind::Gpu);
}
