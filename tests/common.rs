// ABOUTME: Shared fakes and builders for the integration tests
// ABOUTME: Scripted camera and detector, recording speech, in-memory API and photo store
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(
    dead_code,
    missing_docs,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::unwrap_used
)]
//! Shared test utilities for `guided_training`

use async_trait::async_trait;
use bytes::Bytes;
use chrono::NaiveDate;
use guided_training::config::TrainingConfig;
use guided_training::errors::{AppError, AppResult};
use guided_training::external::{
    BackendError, BackendKind, CameraFrame, CameraSource, ExerciseResult, InferenceBackend,
    MediaGallery, MediaPlayer, PermissionStatus, PhotoCamera, PhotoStore, PoseDetector,
    SpeechService, TrainingApi,
};
use guided_training::feedback::{FeedbackKind, SpeechWarmUp};
use guided_training::models::{
    BodyLandmark, BodySide, CapturedPhoto, Exercise, ExerciseTarget, Joint, Landmark,
    MotionProfile, PhotoSide, PoseFrame, ProgressPhoto, SessionReport, TrainingPlan,
};
use guided_training::vision::GyroReading;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use uuid::Uuid;

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// A warm-up guard private to one test
pub fn fresh_warm_up() -> &'static SpeechWarmUp {
    Box::leak(Box::new(SpeechWarmUp::new()))
}

// ============================================================================
// Pose frames
// ============================================================================

/// Every landmark visible and stacked at the center
pub fn full_body_landmarks() -> Vec<Landmark> {
    vec![Landmark::new(0.5, 0.5, 0.0, 0.9); BodyLandmark::ALL.len()]
}

/// A frame where the user fills every silhouette
pub fn full_body_frame(timestamp_ms: u64) -> PoseFrame {
    PoseFrame::new(full_body_landmarks(), timestamp_ms)
}

/// A frame where almost nothing is visible
pub fn hidden_frame(timestamp_ms: u64) -> PoseFrame {
    PoseFrame::new(
        vec![Landmark::new(0.5, 0.5, 0.0, 0.1); BodyLandmark::ALL.len()],
        timestamp_ms,
    )
}

fn bend(landmarks: &mut [Landmark], joint: Joint, side: BodySide, angle_deg: f32) {
    let [outer_a, vertex, outer_c] = joint.triple(side).unwrap();
    let radians = angle_deg.to_radians();
    landmarks[vertex.index()] = Landmark::new(0.5, 0.5, 0.0, 0.9);
    landmarks[outer_a.index()] = Landmark::new(0.5, 0.3, 0.0, 0.9);
    landmarks[outer_c.index()] = Landmark::new(
        0.2f32.mul_add(radians.sin(), 0.5),
        0.2f32.mul_add(-radians.cos(), 0.5),
        0.0,
        0.9,
    );
}

/// Landmarks with `joint` bent to `angle_deg` on `side` (both sides for `Both`)
pub fn landmarks_with_angle(joint: Joint, side: BodySide, angle_deg: f32) -> Vec<Landmark> {
    let mut landmarks = full_body_landmarks();
    match side {
        BodySide::Both => {
            bend(&mut landmarks, joint, BodySide::Left, angle_deg);
            bend(&mut landmarks, joint, BodySide::Right, angle_deg);
        }
        one => bend(&mut landmarks, joint, one, angle_deg),
    }
    landmarks
}

/// A frame with `joint` bent to `angle_deg`
pub fn angle_frame(joint: Joint, side: BodySide, angle_deg: f32, timestamp_ms: u64) -> PoseFrame {
    PoseFrame::new(landmarks_with_angle(joint, side, angle_deg), timestamp_ms)
}

pub const fn portrait(timestamp_ms: u64) -> GyroReading {
    GyroReading {
        tilt_deg: 1.0,
        roll_deg: 0.0,
        timestamp_ms,
    }
}

pub const fn landscape(timestamp_ms: u64) -> GyroReading {
    GyroReading {
        tilt_deg: 1.0,
        roll_deg: 90.0,
        timestamp_ms,
    }
}

// ============================================================================
// Plans and configuration
// ============================================================================

/// Elbow curl profile: contracted at or below 60°, extended at or above 150°
pub const fn curl_profile() -> MotionProfile {
    MotionProfile::new(Joint::Elbow, 60.0, 150.0)
}

pub fn rep_exercise(id: &str, sets: u32, reps: u32, side: BodySide) -> Exercise {
    Exercise {
        id: id.to_owned(),
        name: format!("{id} exercise"),
        sets,
        target: ExerciseTarget::Reps(reps),
        rest_secs: 30,
        is_horizontal: false,
        side,
        video_url: None,
        motion: Some(curl_profile()),
    }
}

pub fn timed_exercise(id: &str, sets: u32, secs: u64) -> Exercise {
    Exercise {
        id: id.to_owned(),
        name: format!("{id} exercise"),
        sets,
        target: ExerciseTarget::DurationSecs(secs),
        rest_secs: 0,
        is_horizontal: false,
        side: BodySide::Both,
        video_url: None,
        motion: None,
    }
}

pub fn plan(exercises: Vec<Exercise>) -> TrainingPlan {
    TrainingPlan {
        session_id: "session-1".to_owned(),
        exercises,
    }
}

/// Defaults with short holds so tests need few frames
pub fn test_config() -> TrainingConfig {
    let mut config = TrainingConfig::default();
    config.analysis.alignment_hold_ms = 200;
    config.analysis.level_hold_ms = 100;
    config.analysis.min_dwell_ms = 100;
    config.feedback.cooldown_ms = 0;
    config
}

// ============================================================================
// Camera and detector
// ============================================================================

/// Shared knobs and counters of a [`ScriptedCamera`]
#[derive(Debug)]
pub struct CameraProbe {
    pub permission_granted: AtomicBool,
    pub fail_start: AtomicBool,
    pub focused: AtomicBool,
    pub starts: AtomicUsize,
    pub releases: AtomicUsize,
    pub frames: AtomicU64,
    pub frame_limit: AtomicU64,
    pub frame_interval_ms: u64,
}

impl CameraProbe {
    pub fn new(frame_interval_ms: u64) -> Arc<Self> {
        Arc::new(Self {
            permission_granted: AtomicBool::new(true),
            fail_start: AtomicBool::new(false),
            focused: AtomicBool::new(true),
            starts: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
            frames: AtomicU64::new(0),
            frame_limit: AtomicU64::new(u64::MAX),
            frame_interval_ms,
        })
    }
}

/// Camera producing blank frames at a fixed interval
pub struct ScriptedCamera {
    probe: Arc<CameraProbe>,
}

impl ScriptedCamera {
    pub fn new(probe: &Arc<CameraProbe>) -> Self {
        Self {
            probe: Arc::clone(probe),
        }
    }

    pub fn boxed(probe: &Arc<CameraProbe>) -> Box<dyn CameraSource> {
        Box::new(Self::new(probe))
    }
}

#[async_trait]
impl CameraSource for ScriptedCamera {
    async fn request_permission(&mut self) -> PermissionStatus {
        if self.probe.permission_granted.load(Ordering::SeqCst) {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        }
    }

    async fn start(&mut self) -> AppResult<()> {
        self.probe.starts.fetch_add(1, Ordering::SeqCst);
        if self.probe.fail_start.load(Ordering::SeqCst) {
            return Err(AppError::internal("camera device busy"));
        }
        Ok(())
    }

    async fn next_frame(&mut self) -> Option<CameraFrame> {
        let index = self.probe.frames.fetch_add(1, Ordering::SeqCst);
        if index >= self.probe.frame_limit.load(Ordering::SeqCst) {
            return None;
        }
        Some(CameraFrame {
            width: 640,
            height: 480,
            timestamp_ms: index * self.probe.frame_interval_ms,
            pixels: Bytes::from_static(&[0u8; 4]),
        })
    }

    fn is_focused(&self) -> bool {
        self.probe.focused.load(Ordering::SeqCst)
    }

    fn release(&mut self) {
        self.probe.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// One scripted detector answer
#[derive(Debug, Clone)]
pub enum Inference {
    Pose(Vec<Landmark>),
    Fail,
}

/// Detector answering from a script, then from a fallback
#[derive(Debug)]
pub struct ScriptedDetector {
    script: Mutex<VecDeque<Inference>>,
    fallback: Mutex<Inference>,
    delay: Mutex<Option<Duration>>,
    pub calls: AtomicUsize,
}

impl ScriptedDetector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(Inference::Pose(Vec::new())),
            delay: Mutex::new(None),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn push(&self, inference: Inference) {
        self.script.lock().unwrap().push_back(inference);
    }

    pub fn push_pose(&self, landmarks: Vec<Landmark>) {
        self.push(Inference::Pose(landmarks));
    }

    pub fn set_fallback(&self, inference: Inference) {
        *self.fallback.lock().unwrap() = inference;
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl PoseDetector for ScriptedDetector {
    async fn estimate(&self, _frame: &CameraFrame) -> AppResult<Vec<Landmark>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        let inference = next.unwrap_or_else(|| self.fallback.lock().unwrap().clone());
        match inference {
            Inference::Pose(landmarks) => Ok(landmarks),
            Inference::Fail => Err(AppError::frame_inference("model returned garbage")),
        }
    }
}

/// Inference backend with scripted failures
pub struct FakeBackend {
    kind: BackendKind,
    pub fail_prewarm: AtomicBool,
    pub fail_load: AtomicBool,
    pub load_delay: Mutex<Option<Duration>>,
    pub prewarms: AtomicUsize,
    pub loads: AtomicUsize,
    detector: Arc<ScriptedDetector>,
}

impl FakeBackend {
    pub fn new(kind: BackendKind, detector: &Arc<ScriptedDetector>) -> Arc<Self> {
        Arc::new(Self {
            kind,
            fail_prewarm: AtomicBool::new(false),
            fail_load: AtomicBool::new(false),
            load_delay: Mutex::new(None),
            prewarms: AtomicUsize::new(0),
            loads: AtomicUsize::new(0),
            detector: Arc::clone(detector),
        })
    }

    pub fn failing(kind: BackendKind, detector: &Arc<ScriptedDetector>) -> Arc<Self> {
        let backend = Self::new(kind, detector);
        backend.fail_load.store(true, Ordering::SeqCst);
        backend
    }
}

#[async_trait]
impl InferenceBackend for FakeBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn prewarm(&self) -> Result<(), BackendError> {
        self.prewarms.fetch_add(1, Ordering::SeqCst);
        if self.fail_prewarm.load(Ordering::SeqCst) {
            return Err(BackendError::Prewarm("context lost".to_owned()));
        }
        Ok(())
    }

    async fn load(&self) -> Result<Arc<dyn PoseDetector>, BackendError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let delay = *self.load_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_load.load(Ordering::SeqCst) {
            return Err(BackendError::Load(format!("{} unavailable", self.kind)));
        }
        let detector: Arc<dyn PoseDetector> = self.detector.clone();
        Ok(detector)
    }
}

// ============================================================================
// Speech and media
// ============================================================================

/// Speech engine recording every cue and utterance
#[derive(Debug, Default)]
pub struct RecordingSpeech {
    pub cues: Mutex<Vec<FeedbackKind>>,
    pub spoken: Mutex<Vec<String>>,
    pub busy: AtomicBool,
    pub warm_ups: AtomicUsize,
    pub fail_warm_up: AtomicBool,
}

impl RecordingSpeech {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn cues(&self) -> Vec<FeedbackKind> {
        self.cues.lock().unwrap().clone()
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechService for RecordingSpeech {
    async fn warm_up(&self) -> AppResult<()> {
        self.warm_ups.fetch_add(1, Ordering::SeqCst);
        if self.fail_warm_up.load(Ordering::SeqCst) {
            return Err(AppError::internal("no voices installed"));
        }
        Ok(())
    }

    async fn speak(&self, text: &str) -> AppResult<()> {
        self.spoken.lock().unwrap().push(text.to_owned());
        Ok(())
    }

    fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    async fn play_cue(&self, kind: FeedbackKind) -> AppResult<()> {
        self.cues.lock().unwrap().push(kind);
        Ok(())
    }
}

/// Media player counting broadcasts
#[derive(Debug, Default)]
pub struct CountingPlayer {
    pub pauses: AtomicUsize,
    pub resumes: AtomicUsize,
    pub releases: AtomicUsize,
}

impl CountingPlayer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn counts(&self) -> (usize, usize, usize) {
        (
            self.pauses.load(Ordering::SeqCst),
            self.resumes.load(Ordering::SeqCst),
            self.releases.load(Ordering::SeqCst),
        )
    }
}

impl MediaPlayer for CountingPlayer {
    fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.resumes.fetch_add(1, Ordering::SeqCst);
    }

    fn release(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Training API
// ============================================================================

/// Training API keeping submissions in memory
#[derive(Debug, Default)]
pub struct InMemoryTrainingApi {
    pub plans: Mutex<HashMap<String, TrainingPlan>>,
    pub results: Mutex<Vec<(String, ExerciseResult)>>,
    pub completions: Mutex<Vec<(String, SessionReport)>>,
    pub fail_submissions: AtomicBool,
}

impl InMemoryTrainingApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_plan(user_id: &str, plan: TrainingPlan) -> Arc<Self> {
        let api = Self::new();
        api.plans.lock().unwrap().insert(user_id.to_owned(), plan);
        api
    }

    pub fn results(&self) -> Vec<ExerciseResult> {
        self.results
            .lock()
            .unwrap()
            .iter()
            .map(|(_, result)| result.clone())
            .collect()
    }

    pub fn completions(&self) -> usize {
        self.completions.lock().unwrap().len()
    }
}

#[async_trait]
impl TrainingApi for InMemoryTrainingApi {
    async fn get_plan(&self, user_id: &str) -> AppResult<TrainingPlan> {
        self.plans
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .ok_or_else(|| AppError::network("get_plan", format!("no plan for {user_id}")))
    }

    async fn submit_exercise_result(
        &self,
        session_id: &str,
        result: &ExerciseResult,
    ) -> AppResult<()> {
        if self.fail_submissions.load(Ordering::SeqCst) {
            return Err(AppError::network("submit_exercise_result", "connection reset"));
        }
        self.results
            .lock()
            .unwrap()
            .push((session_id.to_owned(), result.clone()));
        Ok(())
    }

    async fn complete_session(&self, session_id: &str, report: &SessionReport) -> AppResult<()> {
        if self.fail_submissions.load(Ordering::SeqCst) {
            return Err(AppError::network("complete_session", "connection reset"));
        }
        self.completions
            .lock()
            .unwrap()
            .push((session_id.to_owned(), report.clone()));
        Ok(())
    }
}

// ============================================================================
// Photo storage
// ============================================================================

/// Photo store keeping files and indexes in memory
#[derive(Debug, Default)]
pub struct InMemoryPhotoStore {
    pub files: Mutex<BTreeSet<String>>,
    pub indexes: Mutex<HashMap<String, Vec<ProgressPhoto>>>,
    pub deleted: Mutex<Vec<String>>,
    pub moves: AtomicUsize,
    pub fail_move_number: Mutex<Option<usize>>,
    pub fail_write_index: AtomicBool,
}

impl InMemoryPhotoStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_file(&self, uri: &str) {
        self.files.lock().unwrap().insert(uri.to_owned());
    }

    pub fn has_file(&self, uri: &str) -> bool {
        self.files.lock().unwrap().contains(uri)
    }

    pub fn index(&self, user_id: &str) -> Vec<ProgressPhoto> {
        self.indexes
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Fail the n-th move (1-based) and no other
    pub fn fail_move(&self, number: usize) {
        *self.fail_move_number.lock().unwrap() = Some(number);
    }
}

#[async_trait]
impl PhotoStore for InMemoryPhotoStore {
    fn permanent_uri(
        &self,
        user_id: &str,
        batch_date: NaiveDate,
        side: PhotoSide,
        id: Uuid,
    ) -> AppResult<String> {
        Ok(format!("mem://{user_id}/{batch_date}/{side}-{id}.jpg"))
    }

    async fn move_file(&self, from: &str, to: &str) -> AppResult<()> {
        let number = self.moves.fetch_add(1, Ordering::SeqCst) + 1;
        if *self.fail_move_number.lock().unwrap() == Some(number) {
            return Err(AppError::storage(format!("disk full moving {from}")));
        }
        let mut files = self.files.lock().unwrap();
        if !files.remove(from) {
            return Err(AppError::storage(format!("{from} does not exist")));
        }
        files.insert(to.to_owned());
        Ok(())
    }

    async fn read_index(&self, user_id: &str) -> AppResult<Vec<ProgressPhoto>> {
        Ok(self.index(user_id))
    }

    async fn write_index(&self, user_id: &str, entries: &[ProgressPhoto]) -> AppResult<()> {
        if self.fail_write_index.load(Ordering::SeqCst) {
            return Err(AppError::storage("index write failed"));
        }
        self.indexes
            .lock()
            .unwrap()
            .insert(user_id.to_owned(), entries.to_vec());
        Ok(())
    }

    async fn delete(&self, uri: &str) -> AppResult<()> {
        self.files.lock().unwrap().remove(uri);
        self.deleted.lock().unwrap().push(uri.to_owned());
        Ok(())
    }
}

/// Gallery recording mirrored photos
#[derive(Debug)]
pub struct FakeGallery {
    pub permission_granted: AtomicBool,
    pub fail_saves: AtomicBool,
    pub saved: Mutex<Vec<String>>,
}

impl FakeGallery {
    pub fn new() -> Self {
        Self {
            permission_granted: AtomicBool::new(true),
            fail_saves: AtomicBool::new(false),
            saved: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl MediaGallery for FakeGallery {
    async fn request_permission(&self) -> PermissionStatus {
        if self.permission_granted.load(Ordering::SeqCst) {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        }
    }

    async fn save(&self, uri: &str) -> AppResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(AppError::storage("gallery is full"));
        }
        self.saved.lock().unwrap().push(uri.to_owned());
        Ok(())
    }
}

/// Still camera writing temporary files into an in-memory store
pub struct FakeShutter {
    store: Arc<InMemoryPhotoStore>,
    pub permission_granted: bool,
    pub shots: usize,
}

impl FakeShutter {
    pub fn new(store: &Arc<InMemoryPhotoStore>) -> Self {
        Self {
            store: Arc::clone(store),
            permission_granted: true,
            shots: 0,
        }
    }
}

#[async_trait]
impl PhotoCamera for FakeShutter {
    async fn request_permission(&mut self) -> PermissionStatus {
        if self.permission_granted {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        }
    }

    async fn take_photo(&mut self, side: PhotoSide) -> AppResult<CapturedPhoto> {
        self.shots += 1;
        let temp_uri = format!("tmp://{side}-{}.jpg", self.shots);
        self.store.add_file(&temp_uri);
        Ok(CapturedPhoto {
            side,
            temp_uri,
            width: 1080,
            height: 1920,
            size: 250_000,
        })
    }
}
