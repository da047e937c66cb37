//! Camera and microphone authorization
//!
//! `PermissionGate::ensure()` is called before every capture attempt. It
//! checks both capabilities and prompts for whichever is not yet granted.
//! A denial is not retried; the caller re-invokes `ensure()` once the user
//! has acted.

use crate::device::{Camera, Microphone, PermissionStatus};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Outcome of a permission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    Granted,
    Denied { camera: bool, microphone: bool },
}

impl Authorization {
    pub fn is_granted(&self) -> bool {
        matches!(self, Authorization::Granted)
    }
}

pub struct PermissionGate {
    camera: Arc<dyn Camera>,
    microphone: Arc<dyn Microphone>,
    last: Mutex<Option<Authorization>>,
}

impl PermissionGate {
    pub fn new(camera: Arc<dyn Camera>, microphone: Arc<dyn Microphone>) -> Self {
        Self {
            camera,
            microphone,
            last: Mutex::new(None),
        }
    }

    /// Check both capabilities, prompting for any that are not granted
    pub async fn ensure(&self) -> Authorization {
        let camera = match self.camera.permission_status().await {
            Ok(PermissionStatus::Granted) => PermissionStatus::Granted,
            Ok(status) => {
                info!("Camera permission is {:?}, requesting", status);
                self.camera.request_permission().await.unwrap_or_else(|e| {
                    warn!("Camera permission request failed: {:#}", e);
                    PermissionStatus::Denied
                })
            }
            Err(e) => {
                warn!("Failed to read camera permission: {:#}", e);
                PermissionStatus::Denied
            }
        };

        let microphone = match self.microphone.permission_status().await {
            Ok(PermissionStatus::Granted) => PermissionStatus::Granted,
            Ok(status) => {
                info!("Microphone permission is {:?}, requesting", status);
                self.microphone.request_permission().await.unwrap_or_else(|e| {
                    warn!("Microphone permission request failed: {:#}", e);
                    PermissionStatus::Denied
                })
            }
            Err(e) => {
                warn!("Failed to read microphone permission: {:#}", e);
                PermissionStatus::Denied
            }
        };

        let result = if camera.is_granted() && microphone.is_granted() {
            Authorization::Granted
        } else {
            warn!(
                "Permissions denied (camera: {:?}, microphone: {:?})",
                camera, microphone
            );
            Authorization::Denied {
                camera: camera.is_granted(),
                microphone: microphone.is_granted(),
            }
        };

        if let Ok(mut last) = self.last.lock() {
            *last = Some(result);
        }
        result
    }

    /// Result of the most recent `ensure()`, if any
    pub fn last(&self) -> Option<Authorization> {
        self.last.lock().ok().and_then(|last| *last)
    }
}
