//! ScanSurface - コード取得面
//!
//! ## 概要
//! ビンのQRペイロードを取得する抽象。2つの取得戦略が同一の契約を満たす:
//!
//! - `continuous`: エンジン主導の連続デコード（Strategy A）
//! - `sampling`: 100ms間隔のフレームサンプリング（Strategy B）
//!
//! ## 契約（両戦略共通）
//! - ライフサイクル: `Idle → Requesting → {Active | PermissionDenied |
//!   Unavailable}`、`Active → Closed`
//! - 成功デコードは1 activationにつき最大1回だけ下流へ転送される。
//!   転送前に必ずキャプチャループを停止する
//! - close時はカメラストリーム・タイマー・エンジンを解放してから戻る。
//!   close後に届いた遅延デコードは破棄
//! - 手入力フォールバックはどの状態でも使える（デバイス不要）
//! - デコードミス（コードなしフレーム）はエラーではなく、debugログのみ

pub mod continuous;
pub mod device;
pub mod sampling;
pub mod types;

// Re-exports
pub use continuous::{ContinuousScanSurface, DecodeEngine, EngineSession};
pub use device::{CameraDevice, CameraStream, DeviceError, FrameDecoder};
pub use sampling::FrameSamplingSurface;
pub use types::*;

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, Notify, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Default render-target wait: 10 attempts at 100ms spacing
pub const TARGET_WAIT_ATTEMPTS: u32 = 10;
pub const TARGET_WAIT_SPACING: Duration = Duration::from_millis(100);

/// Default frame sampling interval for Strategy B
pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// Capacity of the activation event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 8;

/// Scan surface contract
///
/// Activation always returns a handle; device/permission failures are
/// reflected in the handle state and reported once on the event channel,
/// so the manual-entry path on the handle stays usable.
#[async_trait]
pub trait ScanSurface: Send + Sync {
    async fn activate(&self, events: mpsc::Sender<SurfaceEvent>) -> SurfaceHandle;
}

/// Cooperative cancellation flag shared between handle and capture loop
pub(crate) struct CancelFlag {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelFlag {
    pub(crate) fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    pub(crate) fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once cancelled; registers the waiter before checking the
    /// flag so a cancel between check and await is not lost.
    pub(crate) async fn cancelled(&self) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}

/// At-most-once result forwarder
///
/// Shared by the capture loop and the manual-entry path, so exactly one
/// code is delivered per activation no matter which side wins.
pub(crate) struct Delivery {
    events: mpsc::Sender<SurfaceEvent>,
    delivered: AtomicBool,
    closed: Arc<AtomicBool>,
}

impl Delivery {
    pub(crate) fn new(events: mpsc::Sender<SurfaceEvent>, closed: Arc<AtomicBool>) -> Self {
        Self {
            events,
            delivered: AtomicBool::new(false),
            closed,
        }
    }

    /// Forward a decoded/typed code; returns whether it was delivered
    pub(crate) fn forward_code(&self, raw: String) -> bool {
        if self.closed.load(Ordering::SeqCst) {
            debug!(raw = %raw, "Late code after close discarded");
            return false;
        }

        if self
            .delivered
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!(raw = %raw, "Duplicate code in same activation discarded");
            return false;
        }

        if let Err(e) = self.events.try_send(SurfaceEvent::Code(raw)) {
            warn!(error = %e, "Event channel dropped, code lost");
            return false;
        }
        true
    }

    /// Report a device/permission failure
    pub(crate) fn forward_error(&self, kind: SurfaceErrorKind) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self.events.try_send(SurfaceEvent::Error(kind)) {
            warn!(error = %e, "Event channel dropped, error lost");
        }
    }
}

/// Handle owned by the caller of `activate`
///
/// Owns the capture loop of one activation. `close` tears everything down
/// before returning; dropping the handle cancels the loop as well, so no
/// capture loop outlives its handle.
pub struct SurfaceHandle {
    state: Arc<RwLock<SurfaceState>>,
    closed: Arc<AtomicBool>,
    cancel: Arc<CancelFlag>,
    delivery: Arc<Delivery>,
    task: Option<JoinHandle<()>>,
    torch_available: bool,
}

impl SurfaceHandle {
    pub(crate) fn new(
        state: Arc<RwLock<SurfaceState>>,
        closed: Arc<AtomicBool>,
        cancel: Arc<CancelFlag>,
        delivery: Arc<Delivery>,
        task: JoinHandle<()>,
        torch_available: bool,
    ) -> Self {
        Self {
            state,
            closed,
            cancel,
            delivery,
            task: Some(task),
            torch_available,
        }
    }

    /// Current lifecycle state
    pub async fn state(&self) -> SurfaceState {
        *self.state.read().await
    }

    /// Torch capability probe result for this activation
    pub fn has_torch(&self) -> bool {
        self.torch_available
    }

    /// Manual-entry fallback
    ///
    /// Available regardless of strategy or error state; feeds the same
    /// downstream contract as a successful decode. Returns whether the
    /// code was delivered (at-most-once still applies).
    pub fn submit_manual(&self, raw: &str) -> bool {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return false;
        }

        let delivered = self.delivery.forward_code(trimmed.to_string());
        if delivered {
            info!(raw = %trimmed, "Manual entry forwarded");
        }
        delivered
    }

    /// Close the surface, releasing all acquired device resources
    ///
    /// Honored even while the capture loop is requesting or decoding; a
    /// decode racing this close is discarded, not forwarded.
    pub async fn close(mut self) {
        self.closed.store(true, Ordering::SeqCst);
        self.cancel.cancel();

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Capture loop panicked during close");
            }
        }

        *self.state.write().await = SurfaceState::Closed;
        debug!("Scan surface closed");
    }
}

impl Drop for SurfaceHandle {
    fn drop(&mut self) {
        // Teardown without close(): cancel cooperatively so the loop
        // releases the stream/engine on its own.
        self.closed.store(true, Ordering::SeqCst);
        self.cancel.cancel();
    }
}

/// Shared per-activation plumbing for the two strategies
#[derive(Clone)]
pub(crate) struct ActivationParts {
    pub state: Arc<RwLock<SurfaceState>>,
    pub closed: Arc<AtomicBool>,
    pub cancel: Arc<CancelFlag>,
    pub delivery: Arc<Delivery>,
}

impl ActivationParts {
    pub(crate) fn new(events: mpsc::Sender<SurfaceEvent>) -> Self {
        let closed = Arc::new(AtomicBool::new(false));
        Self {
            state: Arc::new(RwLock::new(SurfaceState::Requesting)),
            closed: closed.clone(),
            cancel: Arc::new(CancelFlag::new()),
            delivery: Arc::new(Delivery::new(events, closed)),
        }
    }

    pub(crate) async fn set_state(&self, state: SurfaceState) {
        *self.state.write().await = state;
    }
}

/// Tear down a prior capture loop before starting a new one
///
/// Only one loop may be active per surface instance; surfaces call this at
/// the top of `activate`.
pub(crate) async fn replace_active(
    slot: &Mutex<Option<Arc<CancelFlag>>>,
    next: Arc<CancelFlag>,
) {
    let mut active = slot.lock().await;
    if let Some(prev) = active.replace(next) {
        debug!("Cancelling prior capture loop before new activation");
        prev.cancel();
    }
}

/// Wait for the render target with a bounded retry
///
/// Returns false when the target never became ready within the attempt cap
/// or the activation was cancelled meanwhile.
pub(crate) async fn wait_for_target(
    target: &RenderTarget,
    cancel: &CancelFlag,
    attempts: u32,
    spacing: Duration,
) -> bool {
    for attempt in 0..attempts {
        if cancel.is_cancelled() {
            return false;
        }
        if target.is_ready() {
            return true;
        }

        debug!(attempt = attempt + 1, max = attempts, "Render target not ready, retrying");
        tokio::select! {
            _ = cancel.cancelled() => return false,
            _ = tokio::time::sleep(spacing) => {}
        }
    }

    target.is_ready() && !cancel.is_cancelled()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_delivery_forwards_once() {
        let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let delivery = Delivery::new(tx, Arc::new(AtomicBool::new(false)));

        assert!(delivery.forward_code("BIN42".to_string()));
        assert!(!delivery.forward_code("BIN43".to_string()));

        assert_eq!(rx.recv().await, Some(SurfaceEvent::Code("BIN42".to_string())));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_delivery_discards_after_close() {
        let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let closed = Arc::new(AtomicBool::new(false));
        let delivery = Delivery::new(tx, closed.clone());

        closed.store(true, Ordering::SeqCst);
        assert!(!delivery.forward_code("BIN42".to_string()));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_cancel_flag_wakes_waiter() {
        let flag = Arc::new(CancelFlag::new());
        let waiter = flag.clone();

        let task = tokio::spawn(async move { waiter.cancelled().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        flag.cancel();

        tokio::time::timeout(Duration::from_millis(100), task)
            .await
            .expect("waiter should wake")
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancel_before_wait_returns_immediately() {
        let flag = CancelFlag::new();
        flag.cancel();
        tokio::time::timeout(Duration::from_millis(50), flag.cancelled())
            .await
            .expect("already-cancelled flag must not block");
    }

    #[tokio::test]
    async fn test_wait_for_target_bounded() {
        let target = RenderTarget::pending();
        let cancel = CancelFlag::new();

        let ready = wait_for_target(&target, &cancel, 3, Duration::from_millis(5)).await;
        assert!(!ready);
    }

    #[tokio::test]
    async fn test_wait_for_target_sees_late_ready() {
        let target = Arc::new(RenderTarget::pending());
        let cancel = CancelFlag::new();

        let flip = target.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            flip.set_ready();
        });

        let ready = wait_for_target(&target, &cancel, 10, Duration::from_millis(5)).await;
        assert!(ready);
    }
}
