//! FrameSamplingSurface - Strategy B: manual frame sampling
//!
//! ## Responsibilities
//!
//! - Acquire a raw video stream from the camera capability
//! - Sample the current frame into a pixel buffer on a fixed interval
//!   (100ms) and run a decode pass
//! - Stop the loop and release the stream on first success, close, or
//!   teardown
//!
//! デコードミス（コードなしフレーム）は正常系。エラーとして報告せず、
//! 次のtickで再試行する。

use super::device::{CameraDevice, CameraStream, DeviceError, FrameDecoder};
use super::types::{StreamConstraints, SurfaceErrorKind, SurfaceEvent, SurfaceState};
use super::{replace_active, ActivationParts, CancelFlag, ScanSurface, SurfaceHandle, SAMPLE_INTERVAL};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

/// Strategy B surface
pub struct FrameSamplingSurface {
    device: Arc<dyn CameraDevice>,
    decoder: Arc<dyn FrameDecoder>,
    constraints: StreamConstraints,
    sample_interval: Duration,
    /// Cancel flag of the currently active capture loop, if any
    active: Mutex<Option<Arc<CancelFlag>>>,
}

impl FrameSamplingSurface {
    /// Create with the default 100ms sampling interval
    pub fn new(
        device: Arc<dyn CameraDevice>,
        decoder: Arc<dyn FrameDecoder>,
        constraints: StreamConstraints,
    ) -> Self {
        Self::with_interval(device, decoder, constraints, SAMPLE_INTERVAL)
    }

    /// Create with an explicit sampling interval
    pub fn with_interval(
        device: Arc<dyn CameraDevice>,
        decoder: Arc<dyn FrameDecoder>,
        constraints: StreamConstraints,
        sample_interval: Duration,
    ) -> Self {
        Self {
            device,
            decoder,
            constraints,
            sample_interval,
            active: Mutex::new(None),
        }
    }

    /// Capture loop for one activation
    async fn run(
        device: Arc<dyn CameraDevice>,
        decoder: Arc<dyn FrameDecoder>,
        constraints: StreamConstraints,
        sample_interval: Duration,
        parts: ActivationParts,
    ) {
        // Requesting: acquire the stream, honoring close requests in flight
        let acquired = tokio::select! {
            _ = parts.cancel.cancelled() => {
                parts.set_state(SurfaceState::Closed).await;
                return;
            }
            result = device.request_stream(&constraints) => result,
        };

        let mut stream = match acquired {
            Ok(stream) => stream,
            Err(DeviceError::PermissionDenied(msg)) => {
                warn!(reason = %msg, "Camera permission denied");
                parts.set_state(SurfaceState::PermissionDenied).await;
                parts.delivery.forward_error(SurfaceErrorKind::PermissionDenied);
                return;
            }
            Err(DeviceError::Unavailable(msg)) => {
                warn!(reason = %msg, "Camera unavailable");
                parts.set_state(SurfaceState::Unavailable).await;
                parts.delivery.forward_error(SurfaceErrorKind::Unavailable);
                return;
            }
        };

        // Close raced the acquisition: release before reporting Active
        if parts.cancel.is_cancelled() {
            stream.stop().await;
            parts.set_state(SurfaceState::Closed).await;
            return;
        }

        parts.set_state(SurfaceState::Active).await;
        info!(interval_ms = sample_interval.as_millis() as u64, "Frame sampling started");

        let mut ticker = tokio::time::interval(sample_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = parts.cancel.cancelled() => {
                    stream.stop().await;
                    parts.set_state(SurfaceState::Closed).await;
                    debug!("Frame sampling cancelled, stream released");
                    break;
                }
                _ = ticker.tick() => {
                    let Some(frame) = stream.sample_frame().await else {
                        debug!("No frame ready this tick");
                        continue;
                    };

                    match decoder.decode(&frame) {
                        Some(code) => {
                            // Stop the capture loop before forwarding
                            stream.stop().await;
                            let delivered = parts.delivery.forward_code(code);
                            parts.set_state(SurfaceState::Closed).await;
                            if delivered {
                                info!("Frame decode forwarded, sampling stopped");
                            }
                            break;
                        }
                        None => {
                            // Expected: most frames contain no code
                            debug!(
                                width = frame.width,
                                height = frame.height,
                                "Decode miss"
                            );
                        }
                    }
                }
            }
        }
    }
}

#[async_trait]
impl ScanSurface for FrameSamplingSurface {
    async fn activate(&self, events: mpsc::Sender<SurfaceEvent>) -> SurfaceHandle {
        let parts = ActivationParts::new(events);
        replace_active(&self.active, parts.cancel.clone()).await;

        let torch_available = self.device.has_torch();
        if self.constraints.torch && !torch_available {
            debug!("Torch requested but unsupported, ignoring");
        }

        let task = tokio::spawn(Self::run(
            self.device.clone(),
            self.decoder.clone(),
            self.constraints.clone(),
            self.sample_interval,
            parts.clone(),
        ));

        SurfaceHandle::new(
            parts.state,
            parts.closed,
            parts.cancel,
            parts.delivery,
            task,
            torch_available,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan_surface::types::Frame;
    use crate::scan_surface::EVENT_CHANNEL_CAPACITY;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    const TICK: Duration = Duration::from_millis(5);

    fn frame(bytes: &[u8]) -> Frame {
        Frame {
            width: 640,
            height: 480,
            pixels: bytes.to_vec(),
        }
    }

    /// Decoder double: frames whose pixels start with "QR:" decode to the rest
    struct PrefixDecoder;

    impl FrameDecoder for PrefixDecoder {
        fn decode(&self, frame: &Frame) -> Option<String> {
            let text = std::str::from_utf8(&frame.pixels).ok()?;
            text.strip_prefix("QR:").map(String::from)
        }
    }

    /// Camera double with a scripted frame sequence and stop accounting
    struct MockCamera {
        deny: AtomicBool,
        frames: Mutex<VecDeque<Frame>>,
        stops: Arc<AtomicUsize>,
        torch: bool,
    }

    impl MockCamera {
        fn with_frames(frames: Vec<Frame>) -> Arc<Self> {
            Arc::new(Self {
                deny: AtomicBool::new(false),
                frames: Mutex::new(frames.into()),
                stops: Arc::new(AtomicUsize::new(0)),
                torch: false,
            })
        }

        fn denying() -> Arc<Self> {
            Arc::new(Self {
                deny: AtomicBool::new(true),
                frames: Mutex::new(VecDeque::new()),
                stops: Arc::new(AtomicUsize::new(0)),
                torch: false,
            })
        }
    }

    struct MockStream {
        frames: VecDeque<Frame>,
        stops: Arc<AtomicUsize>,
        stopped: bool,
    }

    #[async_trait]
    impl CameraStream for MockStream {
        async fn sample_frame(&mut self) -> Option<Frame> {
            if self.stopped {
                return None;
            }
            self.frames.pop_front()
        }

        async fn stop(&mut self) {
            if !self.stopped {
                self.stopped = true;
                self.stops.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[async_trait]
    impl CameraDevice for MockCamera {
        async fn request_stream(
            &self,
            _constraints: &StreamConstraints,
        ) -> Result<Box<dyn CameraStream>, DeviceError> {
            if self.deny.load(Ordering::SeqCst) {
                return Err(DeviceError::PermissionDenied("user refused".to_string()));
            }
            let frames = std::mem::take(&mut *self.frames.lock().await);
            Ok(Box::new(MockStream {
                frames,
                stops: self.stops.clone(),
                stopped: false,
            }))
        }

        fn has_torch(&self) -> bool {
            self.torch
        }
    }

    fn surface(camera: Arc<MockCamera>) -> FrameSamplingSurface {
        FrameSamplingSurface::with_interval(
            camera,
            Arc::new(PrefixDecoder),
            StreamConstraints::default(),
            TICK,
        )
    }

    async fn wait_for_state(handle: &SurfaceHandle, want: SurfaceState) {
        for _ in 0..100 {
            if handle.state().await == want {
                return;
            }
            tokio::time::sleep(TICK).await;
        }
        panic!("state never reached {:?}", want);
    }

    async fn recv(rx: &mut mpsc::Receiver<SurfaceEvent>) -> SurfaceEvent {
        tokio::time::timeout(Duration::from_millis(500), rx.recv())
            .await
            .expect("event expected")
            .expect("channel open")
    }

    #[tokio::test]
    async fn test_decode_forwards_exactly_once_and_stops_stream() {
        let camera = MockCamera::with_frames(vec![
            frame(b"noise"),
            frame(b"QR:BIN42"),
            frame(b"QR:BIN43"),
        ]);
        let surface = surface(camera.clone());
        let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let handle = surface.activate(tx).await;

        assert_eq!(recv(&mut rx).await, SurfaceEvent::Code("BIN42".to_string()));
        wait_for_state(&handle, SurfaceState::Closed).await;

        // Loop stopped on first success: the second decodable frame never fires
        assert_eq!(camera.stops.load(Ordering::SeqCst), 1);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_misses_are_not_reported_as_errors() {
        let camera = MockCamera::with_frames(vec![
            frame(b"noise1"),
            frame(b"noise2"),
            frame(b"QR:BIN42"),
        ]);
        let surface = surface(camera);
        let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let _handle = surface.activate(tx).await;

        // First event is the success; no Error events precede it
        assert_eq!(recv(&mut rx).await, SurfaceEvent::Code("BIN42".to_string()));
    }

    #[tokio::test]
    async fn test_close_releases_stream_every_cycle() {
        let camera = MockCamera::with_frames(vec![]);
        let surface = surface(camera.clone());

        for cycle in 1..=3 {
            let (tx, _rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
            let handle = surface.activate(tx).await;
            wait_for_state(&handle, SurfaceState::Active).await;
            handle.close().await;

            assert_eq!(camera.stops.load(Ordering::SeqCst), cycle);
        }
    }

    #[tokio::test]
    async fn test_permission_denied_keeps_manual_entry_functional() {
        let camera = MockCamera::denying();
        let surface = surface(camera);
        let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let handle = surface.activate(tx).await;
        wait_for_state(&handle, SurfaceState::PermissionDenied).await;

        assert_eq!(
            recv(&mut rx).await,
            SurfaceEvent::Error(SurfaceErrorKind::PermissionDenied)
        );

        // Manual fallback feeds the same downstream contract
        assert!(handle.submit_manual("BIN42"));
        assert_eq!(recv(&mut rx).await, SurfaceEvent::Code("BIN42".to_string()));
    }

    #[tokio::test]
    async fn test_manual_entry_is_gated_by_at_most_once() {
        let camera = MockCamera::with_frames(vec![frame(b"QR:BIN42")]);
        let surface = surface(camera);
        let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let handle = surface.activate(tx).await;
        assert_eq!(recv(&mut rx).await, SurfaceEvent::Code("BIN42".to_string()));
        wait_for_state(&handle, SurfaceState::Closed).await;

        assert!(!handle.submit_manual("BIN43"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_manual_entry_rejects_empty_input() {
        let camera = MockCamera::denying();
        let surface = surface(camera);
        let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let handle = surface.activate(tx).await;
        wait_for_state(&handle, SurfaceState::PermissionDenied).await;
        let _ = recv(&mut rx).await;

        assert!(!handle.submit_manual("   "));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_new_activation_tears_down_prior_loop() {
        let camera = MockCamera::with_frames(vec![]);
        let surface = surface(camera.clone());

        let (tx1, _rx1) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let first = surface.activate(tx1).await;
        wait_for_state(&first, SurfaceState::Active).await;

        let (tx2, _rx2) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let second = surface.activate(tx2).await;
        wait_for_state(&second, SurfaceState::Active).await;

        // The first loop released its stream once cancelled
        wait_for_state(&first, SurfaceState::Closed).await;
        assert_eq!(camera.stops.load(Ordering::SeqCst), 1);

        second.close().await;
        assert_eq!(camera.stops.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_drop_without_close_still_cancels_loop() {
        let camera = MockCamera::with_frames(vec![]);
        let surface = surface(camera.clone());

        let (tx, _rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let handle = surface.activate(tx).await;
        wait_for_state(&handle, SurfaceState::Active).await;
        drop(handle);

        // Cooperative cancel: the loop notices and releases the stream
        for _ in 0..100 {
            if camera.stops.load(Ordering::SeqCst) == 1 {
                return;
            }
            tokio::time::sleep(TICK).await;
        }
        panic!("stream never released after drop");
    }
}
