//! Scan surface types

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};

/// Surface lifecycle state
///
/// ```text
/// Idle → Requesting → { Active | PermissionDenied | Unavailable }
/// Active → Closed (success, explicit close, or surface teardown)
/// ```
///
/// `PermissionDenied` / `Unavailable` are terminal until the caller retries
/// by activating again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceState {
    Idle,
    Requesting,
    Active,
    PermissionDenied,
    Unavailable,
    Closed,
}

impl SurfaceState {
    /// Convert to string for logging
    pub fn as_str(&self) -> &'static str {
        match self {
            SurfaceState::Idle => "idle",
            SurfaceState::Requesting => "requesting",
            SurfaceState::Active => "active",
            SurfaceState::PermissionDenied => "permission_denied",
            SurfaceState::Unavailable => "unavailable",
            SurfaceState::Closed => "closed",
        }
    }
}

/// Acquisition-layer error kinds
///
/// Recovered locally by retry and the manual-entry fallback; never crash
/// the interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceErrorKind {
    /// Camera access refused
    PermissionDenied,
    /// Device or render target not ready after bounded retries
    Unavailable,
}

/// Event delivered to the activation's event channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// One candidate identity string; at most one per activation
    Code(String),
    /// Device/permission failure (expected decode misses are never reported)
    Error(SurfaceErrorKind),
}

/// Constraints passed to the camera capability
#[derive(Debug, Clone, Default)]
pub struct StreamConstraints {
    /// Prefer the environment-facing camera
    pub prefer_rear: bool,
    /// Request torch when the device supports it; silently ignored otherwise
    pub torch: bool,
}

/// One sampled video frame (raw pixel buffer)
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// One decode pass result from the engine
///
/// `code: None` is the normal case: most frames contain no QR code.
#[derive(Debug, Clone)]
pub struct DecodeAttempt {
    pub code: Option<String>,
}

/// Render target the continuous engine attaches to
///
/// The UI owns readiness; activation waits for it with a bounded retry
/// before attaching the engine.
#[derive(Debug, Default)]
pub struct RenderTarget {
    ready: AtomicBool,
}

impl RenderTarget {
    /// Target that is ready immediately
    pub fn ready() -> Self {
        Self {
            ready: AtomicBool::new(true),
        }
    }

    /// Target that becomes ready later via `set_ready`
    pub fn pending() -> Self {
        Self {
            ready: AtomicBool::new(false),
        }
    }

    pub fn set_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}
