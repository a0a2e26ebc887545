//! 프레임 단위 가이드 파이프라인.
//!
//! 조절기 프로파일 → ROI 선택 → 검출 + 품질 분석 → 촬영 검증 순으로
//! 한 프레임을 처리하고, 측정한 처리 시간을 조절기에 되돌려 준다.
//! 프로파일의 동시 작업 상한이 2 이상이면 검출과 품질 분석을
//! 스코프 스레드에서 병렬로 실행한다.

use skinsight_core::config::{DetectorMode, GuidanceConfig};
use skinsight_core::models::detection::DetectionCandidate;
use skinsight_core::models::frame::{Frame, Rect};
use skinsight_core::models::guide::{GuidanceResult, ValidationResult};
use skinsight_core::models::performance::PerformanceProfile;
use skinsight_core::models::quality::QualityMetrics;
use skinsight_core::models::roi::RoiResult;
use skinsight_core::ports::vision::LesionDetector;
use skinsight_monitor::governor::PerformanceGovernor;
use skinsight_vision::centered::CenteredDetector;
use skinsight_vision::detector::MultiMethodDetector;
use skinsight_vision::quality::QualityAnalyzer;
use skinsight_vision::roi::RoiSelector;
use skinsight_vision::validator::{CaptureValidator, ValidationInput};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// 한 프레임 처리 결과
#[derive(Debug, Clone)]
pub struct FrameOutcome {
    /// 호스트 표시용 결과
    pub guidance: GuidanceResult,
    /// 자동 촬영 컨트롤러 입력
    pub validation: ValidationResult,
}

/// 설정 모드에 맞는 검출기 생성
pub fn build_detector(
    config: &GuidanceConfig,
    governor: &PerformanceGovernor,
) -> Box<dyn LesionDetector> {
    let pool = governor.pool();
    match config.detector.mode {
        DetectorMode::Full => Box::new(MultiMethodDetector::new(config.detector.clone(), pool)),
        DetectorMode::Centered => Box::new(CenteredDetector::new(config.detector.clone(), pool)),
    }
}

/// 가이드 파이프라인
pub struct GuidancePipeline {
    detector: Box<dyn LesionDetector>,
    quality: QualityAnalyzer,
    validator: CaptureValidator,
    roi: RoiSelector,
    governor: Arc<PerformanceGovernor>,
}

impl GuidancePipeline {
    pub fn new(config: &GuidanceConfig, governor: Arc<PerformanceGovernor>) -> Self {
        let detector = build_detector(config, &governor);
        Self::with_detector(config, governor, detector)
    }

    /// 검출기 직접 주입
    pub fn with_detector(
        config: &GuidanceConfig,
        governor: Arc<PerformanceGovernor>,
        detector: Box<dyn LesionDetector>,
    ) -> Self {
        debug!("가이드 파이프라인 생성: detector={}", detector.name());
        Self {
            quality: QualityAnalyzer::new(config.quality.clone(), governor.pool()),
            validator: CaptureValidator::new(config.validator.clone()),
            roi: RoiSelector::new(&config.roi),
            detector,
            governor,
        }
    }

    pub fn governor(&self) -> &Arc<PerformanceGovernor> {
        &self.governor
    }

    pub fn roi_selector(&self) -> &RoiSelector {
        &self.roi
    }

    pub fn detector_name(&self) -> &'static str {
        self.detector.name()
    }

    /// 프레임 1장 처리
    ///
    /// `guide`는 화면 가이드 영역 (프레임 좌표).
    pub fn process(&self, frame: &Frame, guide: Rect) -> FrameOutcome {
        let started = Instant::now();
        let profile = self.governor.profile();

        let roi = if profile.roi_enabled {
            self.roi
                .compute_roi(frame.size(), self.governor.suggested_roi_scale())
        } else {
            RoiResult::full_frame(frame.size())
        };

        let (detection, quality) = self.analyze(frame, &roi, &profile);

        let validation = self.validator.validate(&ValidationInput {
            detection: detection.as_ref(),
            quality: &quality,
            guide,
        });

        if let Some(candidate) = &detection {
            self.roi.record_detection(candidate.center);
        }

        let elapsed = started.elapsed();
        self.governor
            .record_processing_time(elapsed.as_secs_f64() * 1000.0);

        debug!(
            "프레임 {} → {} (conf={:.2}, {}ms)",
            frame.index(),
            validation.state.as_str(),
            validation.confidence,
            elapsed.as_millis()
        );

        let guidance = GuidanceResult {
            frame_index: frame.index(),
            state: validation.state,
            can_capture: validation.can_capture,
            message: validation.message.clone(),
            confidence: validation.confidence,
            detected_center: detection.as_ref().map(|c| c.center),
            detection_method: detection.as_ref().map(|c| c.method.as_str().to_string()),
            processing_time_ms: elapsed.as_millis() as u64,
        };

        FrameOutcome {
            guidance,
            validation,
        }
    }

    fn analyze(
        &self,
        frame: &Frame,
        roi: &RoiResult,
        profile: &PerformanceProfile,
    ) -> (Option<DetectionCandidate>, QualityMetrics) {
        if profile.max_concurrent_ops < 2 {
            return (
                self.detector.detect(frame, roi, profile),
                self.quality.analyze(frame, profile),
            );
        }

        std::thread::scope(|s| {
            let detection = s.spawn(|| self.detector.detect(frame, roi, profile));
            let quality = self.quality.analyze(frame, profile);
            let detection = match detection.join() {
                Ok(result) => result,
                Err(_) => {
                    warn!("검출 스레드 패닉 (frame={})", frame.index());
                    None
                }
            };
            (detection, quality)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skinsight_core::config::PerformanceConfig;
    use skinsight_core::models::detection::DetectionMethod;
    use skinsight_core::models::frame::{PixelFormat, Point};
    use skinsight_core::models::guide::GuideState;
    use skinsight_core::models::performance::ThermalState;
    use skinsight_core::pool::BufferPool;

    /// 고정 후보를 돌려주는 검출기
    struct FixedDetector(Option<DetectionCandidate>);

    impl LesionDetector for FixedDetector {
        fn detect(
            &self,
            _frame: &Frame,
            _roi: &RoiResult,
            _profile: &PerformanceProfile,
        ) -> Option<DetectionCandidate> {
            self.0.clone()
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    fn governor() -> Arc<PerformanceGovernor> {
        Arc::new(PerformanceGovernor::new(
            PerformanceConfig::default(),
            Arc::new(BufferPool::new(8)),
        ))
    }

    /// 선명한 체커 무늬 그레이 프레임
    fn checker_frame(index: u64) -> Frame {
        let (w, h) = (128u32, 128u32);
        let mut data = Vec::with_capacity((w * h) as usize);
        for y in 0..h {
            for x in 0..w {
                data.push(if (x / 4 + y / 4) % 2 == 0 { 90 } else { 190 });
            }
        }
        Frame::new(w, h, PixelFormat::Gray8, data, index).unwrap()
    }

    const GUIDE: Rect = Rect {
        x: 32,
        y: 32,
        w: 64,
        h: 64,
    };

    fn centered_candidate() -> DetectionCandidate {
        DetectionCandidate {
            center: Point::new(64.0, 64.0),
            bbox: Rect::new(54, 54, 20, 20),
            confidence: 0.9,
            area: 400.0,
            method: DetectionMethod::ColorThreshold,
        }
    }

    #[test]
    fn ready_frame_produces_capture_result() {
        let pipeline = GuidancePipeline::with_detector(
            &GuidanceConfig::default(),
            governor(),
            Box::new(FixedDetector(Some(centered_candidate()))),
        );
        let outcome = pipeline.process(&checker_frame(7), GUIDE);
        assert_eq!(outcome.guidance.state, GuideState::Ready);
        assert!(outcome.guidance.can_capture);
        assert_eq!(outcome.guidance.frame_index, 7);
        assert_eq!(outcome.guidance.detected_center, Some(Point::new(64.0, 64.0)));
        assert_eq!(
            outcome.guidance.detection_method.as_deref(),
            Some("color_threshold")
        );
        assert!(outcome.validation.is_ready());
        assert_eq!(pipeline.roi_selector().history_len(), 1);
    }

    #[test]
    fn no_detection_is_searching() {
        let pipeline = GuidancePipeline::with_detector(
            &GuidanceConfig::default(),
            governor(),
            Box::new(FixedDetector(None)),
        );
        let outcome = pipeline.process(&checker_frame(0), GUIDE);
        assert_eq!(outcome.guidance.state, GuideState::Searching);
        assert!(outcome.guidance.detected_center.is_none());
        assert_eq!(pipeline.roi_selector().history_len(), 0);
    }

    #[test]
    fn processing_time_is_recorded() {
        let g = governor();
        let pipeline = GuidancePipeline::with_detector(
            &GuidanceConfig::default(),
            g.clone(),
            Box::new(FixedDetector(None)),
        );
        pipeline.process(&checker_frame(0), GUIDE);
        pipeline.process(&checker_frame(1), GUIDE);
        assert_eq!(g.status().frames_recorded, 2);
    }

    #[test]
    fn sequential_path_under_minimal_profile() {
        let g = governor();
        g.on_thermal_state(ThermalState::Critical);
        assert_eq!(g.profile().max_concurrent_ops, 1);
        let pipeline = GuidancePipeline::with_detector(
            &GuidanceConfig::default(),
            g,
            Box::new(FixedDetector(Some(centered_candidate()))),
        );
        let outcome = pipeline.process(&checker_frame(0), GUIDE);
        assert!(outcome.guidance.detected_center.is_some());
    }

    #[test]
    fn detector_follows_config_mode() {
        let mut config = GuidanceConfig::default();
        assert_eq!(GuidancePipeline::new(&config, governor()).detector_name(), "multi_method");
        config.detector.mode = DetectorMode::Centered;
        assert_eq!(GuidancePipeline::new(&config, governor()).detector_name(), "centered");
    }
}
