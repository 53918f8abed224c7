// ABOUTME: Tests for the camera-to-detector pose stream
// ABOUTME: Listener fan-out, failure escalation, focus loss, and in-flight discard on detach
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(missing_docs)]

mod common;

use common::{
    full_body_landmarks, init_test_logging, CameraProbe, Inference, ScriptedCamera,
    ScriptedDetector,
};
use guided_training::config::StreamConfig;
use guided_training::external::PoseDetector;
use guided_training::stream::{
    DetachReason, FrameFailureAdvisory, PoseStreamProcessor, StreamTick,
};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn processor(threshold: u32) -> PoseStreamProcessor {
    init_test_logging();
    PoseStreamProcessor::new(&StreamConfig {
        failure_threshold: threshold,
    })
}

async fn attached(
    threshold: u32,
) -> (PoseStreamProcessor, Arc<CameraProbe>, Arc<ScriptedDetector>) {
    let mut processor = processor(threshold);
    let probe = CameraProbe::new(33);
    let detector = ScriptedDetector::new();
    let as_detector: Arc<dyn PoseDetector> = detector.clone();
    processor
        .attach(ScriptedCamera::boxed(&probe), as_detector)
        .await
        .unwrap();
    (processor, probe, detector)
}

#[tokio::test]
async fn test_frames_reach_listeners_in_registration_order() {
    let (mut processor, _probe, detector) = attached(15).await;
    let seen = Arc::new(Mutex::new(Vec::new()));
    let first = Arc::clone(&seen);
    let second = Arc::clone(&seen);
    processor.subscribe(move |frame| first.lock().unwrap().push(("first", frame.timestamp_ms)));
    processor.subscribe(move |frame| second.lock().unwrap().push(("second", frame.timestamp_ms)));

    detector.push_pose(full_body_landmarks());
    detector.push_pose(full_body_landmarks());
    assert!(matches!(processor.pump().await, StreamTick::Frame(_)));
    assert!(matches!(processor.pump().await, StreamTick::Frame(_)));

    assert_eq!(
        *seen.lock().unwrap(),
        vec![("first", 0), ("second", 0), ("first", 33), ("second", 33)]
    );
}

#[tokio::test]
async fn test_unsubscribed_listener_stops_receiving() {
    let (mut processor, _probe, detector) = attached(15).await;
    let count = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&count);
    let id = processor.subscribe(move |_| *counter.lock().unwrap() += 1);

    detector.set_fallback(Inference::Pose(full_body_landmarks()));
    processor.pump().await;
    assert!(processor.unsubscribe(id));
    assert!(!processor.unsubscribe(id));
    processor.pump().await;

    assert_eq!(*count.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_empty_result_skips_listeners() {
    let (mut processor, _probe, _detector) = attached(15).await;
    let called = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&called);
    processor.subscribe(move |_| *flag.lock().unwrap() = true);

    assert_eq!(processor.pump().await, StreamTick::Empty);
    assert!(!*called.lock().unwrap());
}

#[tokio::test]
async fn test_failures_escalate_once_per_run() {
    let (mut processor, _probe, detector) = attached(3).await;
    detector.set_fallback(Inference::Fail);

    assert_eq!(processor.pump().await, StreamTick::Failed { consecutive: 1 });
    assert_eq!(processor.pump().await, StreamTick::Failed { consecutive: 2 });
    assert_eq!(
        processor.pump().await,
        StreamTick::Advisory(FrameFailureAdvisory {
            consecutive: 3,
            total: 3
        })
    );
    assert_eq!(processor.pump().await, StreamTick::Failed { consecutive: 4 });

    detector.push_pose(full_body_landmarks());
    assert!(matches!(processor.pump().await, StreamTick::Frame(_)));
    assert_eq!(processor.consecutive_failures(), 0);
    assert_eq!(processor.total_failures(), 4);

    // a new run escalates again
    for expected in 1..3 {
        assert_eq!(
            processor.pump().await,
            StreamTick::Failed {
                consecutive: expected
            }
        );
    }
    assert!(matches!(processor.pump().await, StreamTick::Advisory(_)));
}

#[tokio::test]
async fn test_focus_loss_detaches_and_releases_camera() {
    let (mut processor, probe, detector) = attached(15).await;
    probe.focused.store(false, Ordering::SeqCst);

    assert_eq!(
        processor.pump().await,
        StreamTick::Detached(DetachReason::FocusLost)
    );
    assert!(!processor.is_attached());
    assert_eq!(probe.releases.load(Ordering::SeqCst), 1);
    assert_eq!(detector.calls.load(Ordering::SeqCst), 0);
    assert_eq!(processor.pump().await, StreamTick::Idle);

    assert!(processor.detach().is_some());
    assert!(processor.detach().is_none());
}

#[tokio::test]
async fn test_detach_request_from_another_task() {
    let (mut processor, probe, _detector) = attached(15).await;
    let control = processor.control();

    control.request_detach();

    assert_eq!(
        processor.pump().await,
        StreamTick::Detached(DetachReason::Requested)
    );
    assert_eq!(probe.releases.load(Ordering::SeqCst), 1);
    assert!(!control.is_detach_requested());
}

#[tokio::test(start_paused = true)]
async fn test_inference_in_flight_during_detach_is_discarded() {
    let (mut processor, _probe, detector) = attached(15).await;
    detector.set_delay(Duration::from_millis(100));
    detector.set_fallback(Inference::Pose(full_body_landmarks()));
    let control = processor.control();
    let delivered = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&delivered);
    processor.subscribe(move |_| *counter.lock().unwrap() += 1);

    let (tick, ()) = tokio::join!(processor.pump(), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        control.request_detach();
    });

    assert_eq!(tick, StreamTick::Discarded);
    assert_eq!(*delivered.lock().unwrap(), 0);
    assert_eq!(
        processor.pump().await,
        StreamTick::Detached(DetachReason::Requested)
    );
}

#[tokio::test]
async fn test_camera_feed_end_detaches() {
    let (mut processor, probe, _detector) = attached(15).await;
    probe.frame_limit.store(0, Ordering::SeqCst);

    assert_eq!(processor.pump().await, StreamTick::Ended);
    assert!(!processor.is_attached());
}

#[tokio::test]
async fn test_failed_start_hands_camera_back() {
    let mut processor = processor(15);
    let probe = CameraProbe::new(33);
    probe.fail_start.store(true, Ordering::SeqCst);
    let detector: Arc<dyn PoseDetector> = ScriptedDetector::new();

    let result = processor.attach(ScriptedCamera::boxed(&probe), detector).await;

    assert!(result.is_err());
    assert!(!processor.is_attached());
    assert_eq!(probe.releases.load(Ordering::SeqCst), 1);
    assert!(processor.detach().is_some());
}

#[tokio::test]
async fn test_reattach_after_detach_clears_stale_request() {
    let (mut processor, _probe, detector) = attached(15).await;
    processor.control().request_detach();
    processor.pump().await;
    let camera = processor.detach().unwrap();

    let as_detector: Arc<dyn PoseDetector> = detector.clone();
    processor.attach(camera, as_detector).await.unwrap();
    detector.push_pose(full_body_landmarks());

    assert!(matches!(processor.pump().await, StreamTick::Frame(_)));
}
