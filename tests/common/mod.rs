// Shared fakes for integration tests
//
// Scripted camera, microphone, speaker and storage with call counters, plus
// a fake Analysis Service served by axum on an ephemeral port that records
// every multipart upload it receives.

#![allow(dead_code)]

use anyhow::Result;
use axum::extract::{Multipart, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use scene_assist::{
    ActiveRecording, Camera, CaptureConfig, CaptureOrchestrator, Devices, LoadedSound,
    LocalStorage, Microphone, Mode, ModeController, PermissionStatus, RecordingPreset,
    ResponsePlayer, Speaker, Storage, UploadClient,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Notify;

pub const PHOTO_BYTES: &[u8] = b"\xFF\xD8\xFF\xE0fake-jpeg\xFF\xD9";
pub const CLIP_BYTES: &[u8] = b"fake-m4a-recording";

// ============================================================================
// Camera
// ============================================================================

pub struct FakeCamera {
    source: PathBuf,
    pub status: Mutex<PermissionStatus>,
    pub grant_on_request: AtomicBool,
    pub fail: AtomicBool,
    pub captures: AtomicUsize,
    pub permission_requests: AtomicUsize,
}

impl FakeCamera {
    pub fn new(dir: &Path) -> Self {
        let source = dir.join("camera").join("IMG_0001.jpg");
        std::fs::create_dir_all(source.parent().unwrap()).unwrap();
        std::fs::write(&source, PHOTO_BYTES).unwrap();

        Self {
            source,
            status: Mutex::new(PermissionStatus::Granted),
            grant_on_request: AtomicBool::new(true),
            fail: AtomicBool::new(false),
            captures: AtomicUsize::new(0),
            permission_requests: AtomicUsize::new(0),
        }
    }

    pub fn set_status(&self, status: PermissionStatus) {
        *self.status.lock().unwrap() = status;
    }
}

#[async_trait::async_trait]
impl Camera for FakeCamera {
    async fn permission_status(&self) -> Result<PermissionStatus> {
        Ok(*self.status.lock().unwrap())
    }

    async fn request_permission(&self) -> Result<PermissionStatus> {
        self.permission_requests.fetch_add(1, Ordering::SeqCst);
        let granted = if self.grant_on_request.load(Ordering::SeqCst) {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        };
        *self.status.lock().unwrap() = granted;
        Ok(granted)
    }

    async fn capture_still(&self) -> Result<PathBuf> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("camera is busy");
        }
        Ok(self.source.clone())
    }
}

// ============================================================================
// Microphone
// ============================================================================

pub struct FakeMicrophone {
    scratch: PathBuf,
    pub status: Mutex<PermissionStatus>,
    pub grant_on_request: AtomicBool,
    pub fail_start: AtomicBool,
    pub fail_stop: Arc<AtomicBool>,
    pub starts: AtomicUsize,
    pub stops: Arc<AtomicUsize>,
    pub permission_requests: AtomicUsize,
    pub last_preset: Mutex<Option<RecordingPreset>>,
}

impl FakeMicrophone {
    pub fn new(dir: &Path) -> Self {
        Self {
            scratch: dir.join("recorder"),
            status: Mutex::new(PermissionStatus::Granted),
            grant_on_request: AtomicBool::new(true),
            fail_start: AtomicBool::new(false),
            fail_stop: Arc::new(AtomicBool::new(false)),
            starts: AtomicUsize::new(0),
            stops: Arc::new(AtomicUsize::new(0)),
            permission_requests: AtomicUsize::new(0),
            last_preset: Mutex::new(None),
        }
    }

    pub fn set_status(&self, status: PermissionStatus) {
        *self.status.lock().unwrap() = status;
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch
    }
}

#[async_trait::async_trait]
impl Microphone for FakeMicrophone {
    async fn permission_status(&self) -> Result<PermissionStatus> {
        Ok(*self.status.lock().unwrap())
    }

    async fn request_permission(&self) -> Result<PermissionStatus> {
        self.permission_requests.fetch_add(1, Ordering::SeqCst);
        let granted = if self.grant_on_request.load(Ordering::SeqCst) {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        };
        *self.status.lock().unwrap() = granted;
        Ok(granted)
    }

    async fn start(&self, preset: RecordingPreset) -> Result<Box<dyn ActiveRecording>> {
        let n = self.starts.fetch_add(1, Ordering::SeqCst);
        *self.last_preset.lock().unwrap() = Some(preset);
        if self.fail_start.load(Ordering::SeqCst) {
            anyhow::bail!("microphone unavailable");
        }
        Ok(Box::new(FakeRecording {
            output: self.scratch.join(format!("rec-{}.{}", n, preset.extension)),
            fail: Arc::clone(&self.fail_stop),
            stops: Arc::clone(&self.stops),
        }))
    }
}

struct FakeRecording {
    output: PathBuf,
    fail: Arc<AtomicBool>,
    stops: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl ActiveRecording for FakeRecording {
    async fn stop(&mut self) -> Result<PathBuf> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("encoder crashed");
        }
        std::fs::create_dir_all(self.output.parent().unwrap())?;
        std::fs::write(&self.output, CLIP_BYTES)?;
        Ok(self.output.clone())
    }
}

// ============================================================================
// Speaker
// ============================================================================

#[derive(Default)]
pub struct FakeSpeaker {
    pub fail_load: AtomicBool,
    pub fail_start: AtomicBool,
    pub fail_finish: AtomicBool,
    /// Playback never completes
    pub hang_finish: AtomicBool,
    pub loads: AtomicUsize,
    pub starts: Arc<AtomicUsize>,
    pub unloads: Arc<AtomicUsize>,
    /// Path and contents of every file handed to `load`
    pub loaded: Mutex<Vec<(PathBuf, Vec<u8>)>>,
}

#[async_trait::async_trait]
impl Speaker for FakeSpeaker {
    async fn load(&self, path: &Path) -> Result<Box<dyn LoadedSound>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let bytes = std::fs::read(path)?;
        self.loaded.lock().unwrap().push((path.to_path_buf(), bytes));
        if self.fail_load.load(Ordering::SeqCst) {
            anyhow::bail!("unsupported audio");
        }
        Ok(Box::new(FakeSound {
            fail_start: self.fail_start.load(Ordering::SeqCst),
            fail_finish: self.fail_finish.load(Ordering::SeqCst),
            hang_finish: self.hang_finish.load(Ordering::SeqCst),
            starts: Arc::clone(&self.starts),
            unloads: Arc::clone(&self.unloads),
        }))
    }
}

struct FakeSound {
    fail_start: bool,
    fail_finish: bool,
    hang_finish: bool,
    starts: Arc<AtomicUsize>,
    unloads: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl LoadedSound for FakeSound {
    async fn start(&mut self) -> Result<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if self.fail_start {
            anyhow::bail!("audio session interrupted");
        }
        Ok(())
    }

    async fn finished(&mut self) -> Result<()> {
        if self.hang_finish {
            std::future::pending::<()>().await;
        }
        if self.fail_finish {
            anyhow::bail!("output device removed");
        }
        Ok(())
    }

    async fn unload(&mut self) -> Result<()> {
        self.unloads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Storage
// ============================================================================

/// `LocalStorage` with switchable failures and an operation counter
#[derive(Default)]
pub struct FakeStorage {
    inner: LocalStorage,
    pub fail_copy: AtomicBool,
    pub fail_move: AtomicBool,
    pub fail_write: AtomicBool,
    pub ops: AtomicUsize,
    pub deletes: Mutex<Vec<PathBuf>>,
}

#[async_trait::async_trait]
impl Storage for FakeStorage {
    async fn copy(&self, from: &Path, to: &Path) -> Result<u64> {
        self.ops.fetch_add(1, Ordering::SeqCst);
        if self.fail_copy.load(Ordering::SeqCst) {
            anyhow::bail!("no space left on device");
        }
        self.inner.copy(from, to).await
    }

    async fn move_file(&self, from: &Path, to: &Path) -> Result<u64> {
        self.ops.fetch_add(1, Ordering::SeqCst);
        if self.fail_move.load(Ordering::SeqCst) {
            anyhow::bail!("no space left on device");
        }
        self.inner.move_file(from, to).await
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        self.ops.fetch_add(1, Ordering::SeqCst);
        self.deletes.lock().unwrap().push(path.to_path_buf());
        self.inner.delete(path).await
    }

    async fn exists(&self, path: &Path) -> bool {
        self.ops.fetch_add(1, Ordering::SeqCst);
        self.inner.exists(path).await
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.ops.fetch_add(1, Ordering::SeqCst);
        self.inner.read(path).await
    }

    async fn write(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        self.ops.fetch_add(1, Ordering::SeqCst);
        if self.fail_write.load(Ordering::SeqCst) {
            anyhow::bail!("read-only filesystem");
        }
        self.inner.write(path, bytes).await
    }
}

// ============================================================================
// Fake Analysis Service
// ============================================================================

#[derive(Debug, Clone)]
pub struct ReceivedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct ReceivedUpload {
    pub accept: Option<String>,
    pub content_type: Option<String>,
    /// Part names in the order they arrived
    pub part_names: Vec<String>,
    pub fields: HashMap<String, String>,
    pub files: HashMap<String, ReceivedFile>,
}

#[derive(Clone)]
struct ServiceState {
    status: u16,
    body: String,
    gate: Option<Arc<Notify>>,
    received: Arc<Mutex<Vec<ReceivedUpload>>>,
}

pub struct FakeService {
    pub base_url: String,
    pub received: Arc<Mutex<Vec<ReceivedUpload>>>,
    gate: Option<Arc<Notify>>,
}

impl FakeService {
    /// Serve `/vision` with a fixed status and body
    pub async fn spawn(status: u16, body: impl Into<String>) -> Result<Self> {
        Self::spawn_inner(status, body.into(), None).await
    }

    /// Like `spawn`, but `/vision` holds its response until `release()`
    pub async fn spawn_gated(status: u16, body: impl Into<String>) -> Result<Self> {
        Self::spawn_inner(status, body.into(), Some(Arc::new(Notify::new()))).await
    }

    async fn spawn_inner(status: u16, body: String, gate: Option<Arc<Notify>>) -> Result<Self> {
        let received = Arc::new(Mutex::new(Vec::new()));
        let state = ServiceState {
            status,
            body,
            gate: gate.clone(),
            received: Arc::clone(&received),
        };

        let app = Router::new()
            .route("/vision", post(vision))
            .route("/health", get(health))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Ok(Self {
            base_url: format!("http://{}", addr),
            received,
            gate,
        })
    }

    /// A service address nothing is listening on
    pub async fn unreachable() -> Result<Self> {
        Ok(Self {
            base_url: unused_base_url().await?,
            received: Arc::new(Mutex::new(Vec::new())),
            gate: None,
        })
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub fn uploads(&self) -> Vec<ReceivedUpload> {
        self.received.lock().unwrap().clone()
    }
}

async fn vision(
    State(state): State<ServiceState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> (StatusCode, String) {
    let header_value = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let mut upload = ReceivedUpload {
        accept: header_value(header::ACCEPT),
        content_type: header_value(header::CONTENT_TYPE),
        ..Default::default()
    };

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();

        upload.part_names.push(name.clone());
        if file_name.is_some() {
            upload.files.insert(
                name,
                ReceivedFile {
                    file_name,
                    content_type,
                    bytes,
                },
            );
        } else {
            upload
                .fields
                .insert(name, String::from_utf8_lossy(&bytes).into_owned());
        }
    }
    state.received.lock().unwrap().push(upload);

    if let Some(gate) = &state.gate {
        gate.notified().await;
    }

    (
        StatusCode::from_u16(state.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        state.body.clone(),
    )
}

async fn health() -> (StatusCode, String) {
    (
        StatusCode::OK,
        r#"{"status":"healthy","timestamp":"2025-10-27T14:30:00.123456","message":"AI Accessibility Assistant is running"}"#
            .to_string(),
    )
}

/// Address nothing is listening on
pub async fn unused_base_url() -> Result<String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("http://{}", addr))
}

// ============================================================================
// Harness
// ============================================================================

/// An orchestrator wired to fakes inside a temporary directory
pub struct Harness {
    pub dir: TempDir,
    pub camera: Arc<FakeCamera>,
    pub microphone: Arc<FakeMicrophone>,
    pub speaker: Arc<FakeSpeaker>,
    pub storage: Arc<FakeStorage>,
    pub modes: Arc<ModeController>,
    pub service: FakeService,
    pub orchestrator: Arc<CaptureOrchestrator>,
}

impl Harness {
    pub async fn new(service: FakeService) -> Result<Self> {
        let dir = TempDir::new()?;
        let camera = Arc::new(FakeCamera::new(dir.path()));
        let microphone = Arc::new(FakeMicrophone::new(dir.path()));
        let speaker = Arc::new(FakeSpeaker::default());
        let storage = Arc::new(FakeStorage::default());
        let modes = Arc::new(ModeController::new(Mode::Normal));

        let config = CaptureConfig {
            cache_dir: dir.path().join("cache"),
            preset: RecordingPreset::HIGH_QUALITY,
            user_id: "user-42".to_string(),
            chat_id: "chat-7".to_string(),
        };
        let devices = Devices {
            camera: camera.clone(),
            microphone: microphone.clone(),
            storage: storage.clone(),
        };
        let uploader =
            UploadClient::new(service.base_url.clone(), Duration::from_secs(5), storage.clone())?;
        let player = ResponsePlayer::new(
            speaker.clone(),
            storage.clone(),
            dir.path().join("transient"),
        );

        let orchestrator = Arc::new(CaptureOrchestrator::new(
            config,
            devices,
            uploader,
            player,
            Arc::clone(&modes),
        ));

        Ok(Self {
            dir,
            camera,
            microphone,
            speaker,
            storage,
            modes,
            service,
            orchestrator,
        })
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.dir.path().join("cache")
    }

    pub fn transient_dir(&self) -> PathBuf {
        self.dir.path().join("transient")
    }

    /// Files the pipeline owns that are still on disk
    pub fn leftover_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for dir in [
            self.cache_dir(),
            self.transient_dir(),
            self.microphone.scratch_dir().to_path_buf(),
        ] {
            collect_files(&dir, &mut files);
        }
        files
    }
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, out);
        } else {
            out.push(path);
        }
    }
}
