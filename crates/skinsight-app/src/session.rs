//! 가이드 세션 — DI 와이어링과 프레임 제출.
//!
//! 호스트는 세션을 하나 만들어 프레임을 넘기고, 결과를 반환값이나
//! 브로드캐스트 구독으로 받는다. 처리 중인 프레임이 있으면 새 프레임은
//! 큐에 쌓지 않고 버린다.

use skinsight_core::config::GuidanceConfig;
use skinsight_core::error::CoreError;
use skinsight_core::models::frame::{Frame, Rect};
use skinsight_core::models::guide::GuidanceResult;
use skinsight_core::models::performance::{PerformanceLevel, PerformanceStatus};
use skinsight_core::pool::BufferPool;
use skinsight_core::ports::auto_capture::AutoCaptureListener;
use skinsight_core::ports::monitor::MemoryProbe;
use skinsight_core::ports::thermal::ThermalProvider;
use skinsight_core::ports::vision::LesionDetector;
use skinsight_monitor::governor::PerformanceGovernor;
use skinsight_monitor::watch::{spawn_memory_watch, spawn_thermal_watch};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::auto_capture::AutoCaptureController;
use crate::pipeline::{build_detector, GuidancePipeline};

/// 결과 브로드캐스트 채널 용량
const RESULT_CHANNEL_CAPACITY: usize = 64;

/// 처리 중 플래그 해제 가드 (패닉 시에도 해제)
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// 가이드 세션
pub struct GuidanceSession {
    config: GuidanceConfig,
    pipeline: Arc<GuidancePipeline>,
    governor: Arc<PerformanceGovernor>,
    auto_capture: AutoCaptureController,
    results: broadcast::Sender<GuidanceResult>,
    in_flight: Arc<AtomicBool>,
    shutdown_tx: watch::Sender<bool>,
    watchers: parking_lot::Mutex<Vec<JoinHandle<()>>>,
}

impl GuidanceSession {
    /// 설정 검증 후 기본 검출기로 세션 생성 (tokio 런타임 안에서 호출)
    pub fn new(
        config: GuidanceConfig,
        listener: Arc<dyn AutoCaptureListener>,
    ) -> Result<Self, CoreError> {
        config.validate()?;
        let governor = Self::build_governor(&config);
        let detector = build_detector(&config, &governor);
        Self::assemble(config, governor, detector, listener)
    }

    /// 검출기 직접 주입
    pub fn with_detector(
        config: GuidanceConfig,
        detector: Box<dyn LesionDetector>,
        listener: Arc<dyn AutoCaptureListener>,
    ) -> Result<Self, CoreError> {
        config.validate()?;
        let governor = Self::build_governor(&config);
        Self::assemble(config, governor, detector, listener)
    }

    fn build_governor(config: &GuidanceConfig) -> Arc<PerformanceGovernor> {
        let pool = Arc::new(BufferPool::new(PerformanceLevel::High.profile().pool_size));
        Arc::new(PerformanceGovernor::new(config.performance.clone(), pool))
    }

    fn assemble(
        config: GuidanceConfig,
        governor: Arc<PerformanceGovernor>,
        detector: Box<dyn LesionDetector>,
        listener: Arc<dyn AutoCaptureListener>,
    ) -> Result<Self, CoreError> {
        let auto_capture = AutoCaptureController::new(config.auto_capture.clone(), listener)?;
        let pipeline = Arc::new(GuidancePipeline::with_detector(
            &config,
            governor.clone(),
            detector,
        ));
        let (results, _) = broadcast::channel(RESULT_CHANNEL_CAPACITY);
        let (shutdown_tx, _) = watch::channel(false);

        info!(
            "가이드 세션 생성: detector={}, auto_capture={}",
            pipeline.detector_name(),
            config.auto_capture.enabled
        );

        Ok(Self {
            config,
            pipeline,
            governor,
            auto_capture,
            results,
            in_flight: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            watchers: parking_lot::Mutex::new(Vec::new()),
        })
    }

    /// 온도/메모리 주기 감시 시작
    pub fn start_monitoring(
        &self,
        thermal: Arc<dyn ThermalProvider>,
        memory: Arc<dyn MemoryProbe>,
    ) {
        let perf = &self.config.performance;
        let mut watchers = self.watchers.lock();
        watchers.push(spawn_thermal_watch(
            thermal,
            self.governor.clone(),
            perf.thermal_poll_interval(),
            self.shutdown_tx.subscribe(),
        ));
        watchers.push(spawn_memory_watch(
            memory,
            self.governor.clone(),
            perf.memory_poll_interval(),
            self.shutdown_tx.subscribe(),
        ));
    }

    /// 프레임 제출
    ///
    /// 프레임 스킵 대상이거나 이전 프레임이 아직 처리 중이면 `None`.
    pub async fn submit_frame(&self, frame: Arc<Frame>, guide: Rect) -> Option<GuidanceResult> {
        if !self.governor.should_process(frame.index()) {
            debug!("프레임 스킵: {}", frame.index());
            return None;
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("처리 중, 프레임 폐기: {}", frame.index());
            return None;
        }
        let guard = InFlightGuard(self.in_flight.clone());

        let pipeline = self.pipeline.clone();
        let index = frame.index();
        let outcome = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            pipeline.process(&frame, guide)
        })
        .await;

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("프레임 처리 작업 실패 (frame={index}): {e}");
                return None;
            }
        };

        self.auto_capture.on_validation(&outcome.validation);
        // 구독자가 없으면 전송 실패, 무시
        let _ = self.results.send(outcome.guidance.clone());
        Some(outcome.guidance)
    }

    /// 결과 구독
    pub fn subscribe(&self) -> broadcast::Receiver<GuidanceResult> {
        self.results.subscribe()
    }

    pub fn force_capture(&self) -> bool {
        self.auto_capture.force_capture()
    }

    pub fn set_auto_capture_enabled(&self, enabled: bool) {
        self.auto_capture.set_enabled(enabled);
    }

    pub fn auto_capture(&self) -> &AutoCaptureController {
        &self.auto_capture
    }

    pub fn set_power_save(&self, enabled: bool) {
        self.governor.set_power_save(enabled);
    }

    pub fn governor(&self) -> &Arc<PerformanceGovernor> {
        &self.governor
    }

    pub fn pipeline(&self) -> &Arc<GuidancePipeline> {
        &self.pipeline
    }

    /// 진단용 성능 상태
    pub fn status(&self) -> PerformanceStatus {
        self.governor.status()
    }

    /// 감시 루프 종료 후 대기
    pub async fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
        self.auto_capture.cancel();
        let watchers: Vec<JoinHandle<()>> = self.watchers.lock().drain(..).collect();
        for handle in watchers {
            if let Err(e) = handle.await {
                warn!("감시 루프 종료 실패: {e}");
            }
        }
        info!("가이드 세션 종료");
    }
}

impl Drop for GuidanceSession {
    fn drop(&mut self) {
        self.shutdown_tx.send_replace(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use skinsight_core::models::detection::{DetectionCandidate, DetectionMethod};
    use skinsight_core::models::frame::{PixelFormat, Point};
    use skinsight_core::models::guide::GuideState;
    use skinsight_core::models::performance::{PerformanceProfile, ThermalState};
    use skinsight_core::models::roi::RoiResult;
    use skinsight_monitor::memory::SysInfoMemoryProbe;
    use skinsight_monitor::thermal::NoopThermalProvider;

    struct Silent;

    impl AutoCaptureListener for Silent {
        fn on_countdown_started(&self, _seconds: u32) {}
        fn on_countdown_tick(&self, _seconds: u32) {}
        fn on_countdown_cancelled(&self) {}
        fn on_auto_capture(&self) {}
    }

    struct Centered;

    impl LesionDetector for Centered {
        fn detect(
            &self,
            frame: &Frame,
            _roi: &RoiResult,
            _profile: &PerformanceProfile,
        ) -> Option<DetectionCandidate> {
            let center = frame.size().center();
            Some(DetectionCandidate {
                center,
                bbox: Rect::new(center.x as u32 - 10, center.y as u32 - 10, 20, 20),
                confidence: 0.9,
                area: 400.0,
                method: DetectionMethod::ColorThreshold,
            })
        }

        fn name(&self) -> &'static str {
            "centered_stub"
        }
    }

    fn frame(index: u64) -> Arc<Frame> {
        let (w, h) = (128u32, 128u32);
        let mut data = Vec::with_capacity((w * h) as usize);
        for y in 0..h {
            for x in 0..w {
                data.push(if (x / 4 + y / 4) % 2 == 0 { 90 } else { 190 });
            }
        }
        Arc::new(Frame::new(w, h, PixelFormat::Gray8, data, index).unwrap())
    }

    const GUIDE: Rect = Rect {
        x: 32,
        y: 32,
        w: 64,
        h: 64,
    };

    fn session() -> GuidanceSession {
        GuidanceSession::with_detector(
            GuidanceConfig::default(),
            Box::new(Centered),
            Arc::new(Silent),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn submit_returns_and_broadcasts() {
        let s = session();
        let mut rx = s.subscribe();
        let result = s.submit_frame(frame(0), GUIDE).await.unwrap();
        assert_eq!(result.state, GuideState::Ready);
        assert_eq!(result.detected_center, Some(Point::new(64.0, 64.0)));
        assert_eq!(rx.recv().await.unwrap(), result);
    }

    #[tokio::test]
    async fn frames_are_skipped_under_throttle() {
        let s = session();
        s.governor().on_thermal_state(ThermalState::Critical);
        // 5프레임마다 1개 처리
        assert!(s.submit_frame(frame(0), GUIDE).await.is_some());
        assert!(s.submit_frame(frame(1), GUIDE).await.is_none());
        assert!(s.submit_frame(frame(4), GUIDE).await.is_none());
        assert!(s.submit_frame(frame(5), GUIDE).await.is_some());
    }

    #[tokio::test]
    async fn frame_dropped_while_in_flight() {
        let s = session();
        s.in_flight.store(true, Ordering::Release);
        assert!(s.submit_frame(frame(0), GUIDE).await.is_none());
        s.in_flight.store(false, Ordering::Release);
        assert!(s.submit_frame(frame(1), GUIDE).await.is_some());
    }

    #[tokio::test]
    async fn invalid_config_is_rejected() {
        let mut config = GuidanceConfig::default();
        config.validator.min_area_ratio = 0.9;
        let result = GuidanceSession::new(config, Arc::new(Silent));
        assert_matches!(result.err(), Some(CoreError::Validation { .. }));
    }

    #[tokio::test]
    async fn monitoring_starts_and_stops() {
        let s = session();
        s.start_monitoring(Arc::new(NoopThermalProvider), Arc::new(SysInfoMemoryProbe::new()));
        tokio::task::yield_now().await;
        s.shutdown().await;
        assert_eq!(s.status().thermal_state, ThermalState::None);
    }
}
