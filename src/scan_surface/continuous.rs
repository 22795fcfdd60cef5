//! ContinuousScanSurface - Strategy A: engine-managed continuous decode
//!
//! ## Responsibilities
//!
//! - Wait for the render target with a bounded retry (10 x 100ms)
//! - Attach a scanning engine that reports every decode attempt
//! - Tear the engine down on first success before forwarding, so a second
//!   code remaining in frame never triggers a second report
//!
//! エンジンは成功・ミス両方のdecode attemptをコールバックする。ミスは
//! 正常系としてdebugログのみ、成功は1 activationにつき1回だけ転送。

use super::types::{DecodeAttempt, RenderTarget, SurfaceErrorKind, SurfaceEvent, SurfaceState};
use super::{
    replace_active, wait_for_target, ActivationParts, CancelFlag, ScanSurface, SurfaceHandle,
    TARGET_WAIT_ATTEMPTS, TARGET_WAIT_SPACING,
};
use super::device::DeviceError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

/// Capacity of the engine attempt channel
const ATTEMPT_CHANNEL_CAPACITY: usize = 32;

/// Library-managed scanning engine
///
/// Attach starts the engine against the render target; every decode
/// attempt (success or miss) flows into the channel until the session is
/// detached.
#[async_trait]
pub trait DecodeEngine: Send + Sync {
    async fn attach(
        &self,
        target: Arc<RenderTarget>,
        attempts: mpsc::Sender<DecodeAttempt>,
    ) -> Result<Box<dyn EngineSession>, DeviceError>;

    /// Torch capability probe; best-effort, defaults to unsupported
    fn has_torch(&self) -> bool {
        false
    }
}

/// One running engine attachment
#[async_trait]
pub trait EngineSession: Send {
    /// Tear the engine down; no attempts are produced after return
    async fn detach(&mut self);
}

/// Strategy A surface
pub struct ContinuousScanSurface {
    engine: Arc<dyn DecodeEngine>,
    target: Arc<RenderTarget>,
    target_wait_attempts: u32,
    target_wait_spacing: Duration,
    /// Cancel flag of the currently active capture loop, if any
    active: Mutex<Option<Arc<CancelFlag>>>,
}

impl ContinuousScanSurface {
    /// Create with the default render-target wait (10 x 100ms)
    pub fn new(engine: Arc<dyn DecodeEngine>, target: Arc<RenderTarget>) -> Self {
        Self::with_target_wait(engine, target, TARGET_WAIT_ATTEMPTS, TARGET_WAIT_SPACING)
    }

    /// Create with an explicit render-target wait budget
    pub fn with_target_wait(
        engine: Arc<dyn DecodeEngine>,
        target: Arc<RenderTarget>,
        attempts: u32,
        spacing: Duration,
    ) -> Self {
        Self {
            engine,
            target,
            target_wait_attempts: attempts,
            target_wait_spacing: spacing,
            active: Mutex::new(None),
        }
    }

    /// Capture loop for one activation
    async fn run(
        engine: Arc<dyn DecodeEngine>,
        target: Arc<RenderTarget>,
        wait_attempts: u32,
        wait_spacing: Duration,
        parts: ActivationParts,
    ) {
        if !wait_for_target(&target, &parts.cancel, wait_attempts, wait_spacing).await {
            if parts.cancel.is_cancelled() {
                parts.set_state(SurfaceState::Closed).await;
                return;
            }
            warn!(
                attempts = wait_attempts,
                "Render target never became ready"
            );
            parts.set_state(SurfaceState::Unavailable).await;
            parts.delivery.forward_error(SurfaceErrorKind::Unavailable);
            return;
        }

        let (attempt_tx, mut attempt_rx) = mpsc::channel(ATTEMPT_CHANNEL_CAPACITY);

        let attached = tokio::select! {
            _ = parts.cancel.cancelled() => {
                parts.set_state(SurfaceState::Closed).await;
                return;
            }
            result = engine.attach(target, attempt_tx) => result,
        };

        let mut session = match attached {
            Ok(session) => session,
            Err(DeviceError::PermissionDenied(msg)) => {
                warn!(reason = %msg, "Camera permission denied");
                parts.set_state(SurfaceState::PermissionDenied).await;
                parts.delivery.forward_error(SurfaceErrorKind::PermissionDenied);
                return;
            }
            Err(DeviceError::Unavailable(msg)) => {
                warn!(reason = %msg, "Scan engine unavailable");
                parts.set_state(SurfaceState::Unavailable).await;
                parts.delivery.forward_error(SurfaceErrorKind::Unavailable);
                return;
            }
        };

        // Close raced the attach: tear the engine down before reporting
        if parts.cancel.is_cancelled() {
            session.detach().await;
            parts.set_state(SurfaceState::Closed).await;
            return;
        }

        parts.set_state(SurfaceState::Active).await;
        info!("Continuous decode engine attached");

        loop {
            tokio::select! {
                _ = parts.cancel.cancelled() => {
                    session.detach().await;
                    parts.set_state(SurfaceState::Closed).await;
                    debug!("Continuous decode cancelled, engine detached");
                    break;
                }
                attempt = attempt_rx.recv() => {
                    match attempt {
                        Some(DecodeAttempt { code: Some(code) }) => {
                            // Detach before forwarding so a code still in
                            // frame cannot report twice
                            session.detach().await;
                            let delivered = parts.delivery.forward_code(code);
                            parts.set_state(SurfaceState::Closed).await;
                            if delivered {
                                info!("Engine decode forwarded, engine detached");
                            }
                            break;
                        }
                        Some(DecodeAttempt { code: None }) => {
                            // Expected: most attempts find no code
                            debug!("Decode miss");
                        }
                        None => {
                            // Engine went away without a success
                            warn!("Engine attempt channel closed unexpectedly");
                            session.detach().await;
                            parts.set_state(SurfaceState::Unavailable).await;
                            parts.delivery.forward_error(SurfaceErrorKind::Unavailable);
                            break;
                        }
                    }
                }
            }
        }
    }
}

#[async_trait]
impl ScanSurface for ContinuousScanSurface {
    async fn activate(&self, events: mpsc::Sender<SurfaceEvent>) -> SurfaceHandle {
        let parts = ActivationParts::new(events);
        replace_active(&self.active, parts.cancel.clone()).await;

        let task = tokio::spawn(Self::run(
            self.engine.clone(),
            self.target.clone(),
            self.target_wait_attempts,
            self.target_wait_spacing,
            parts.clone(),
        ));

        SurfaceHandle::new(
            parts.state,
            parts.closed,
            parts.cancel,
            parts.delivery,
            task,
            self.engine.has_torch(),
        )
    }
}
