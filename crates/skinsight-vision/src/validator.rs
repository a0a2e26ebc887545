//! 촬영 검증 — 7상태 가이드 판정.
//!
//! 매 프레임 처음부터 다시 판정하는 순수 함수다. 우선순위:
//! 흐림 → 조명 불량 → 미검출 → 낮은 신뢰도 → 기하 조건(중앙/거리).

use skinsight_core::config::ValidatorConfig;
use skinsight_core::models::detection::DetectionCandidate;
use skinsight_core::models::frame::Rect;
use skinsight_core::models::guide::{GuideState, ValidationResult};
use skinsight_core::models::quality::QualityMetrics;

/// 검증 입력 (한 프레임분)
#[derive(Debug, Clone, Copy)]
pub struct ValidationInput<'a> {
    pub detection: Option<&'a DetectionCandidate>,
    pub quality: &'a QualityMetrics,
    /// 화면 가이드 영역 (프레임 좌표)
    pub guide: Rect,
}

/// 상태별 안내 메시지
pub fn guidance_message(state: GuideState) -> &'static str {
    match state {
        GuideState::Searching => "병변을 가이드 안에 맞춰 주세요",
        GuideState::Centering => "병변을 가이드 중앙으로 옮겨 주세요",
        GuideState::TooFar => "조금 더 가까이 다가가 주세요",
        GuideState::TooClose => "조금 더 멀리 떨어져 주세요",
        GuideState::PoorLighting => "조명이 적절하지 않습니다. 밝기를 조절해 주세요",
        GuideState::Blurry => "초점이 맞지 않습니다. 카메라를 고정해 주세요",
        GuideState::Ready => "촬영 준비 완료",
    }
}

const LOW_CONFIDENCE_MESSAGE: &str = "병변을 확인하는 중입니다. 카메라를 움직이지 마세요";

/// 촬영 가능 여부 판정기
#[derive(Debug, Clone)]
pub struct CaptureValidator {
    config: ValidatorConfig,
}

impl CaptureValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// 한 프레임 판정
    pub fn validate(&self, input: &ValidationInput<'_>) -> ValidationResult {
        if input.quality.is_blurry {
            return Self::reject(GuideState::Blurry, guidance_message(GuideState::Blurry));
        }
        if input.quality.has_exposure_issue() {
            return Self::reject(
                GuideState::PoorLighting,
                guidance_message(GuideState::PoorLighting),
            );
        }

        let Some(candidate) = input.detection else {
            return Self::reject(GuideState::Searching, guidance_message(GuideState::Searching));
        };

        let confidence = candidate.confidence.clamp(0.0, 1.0);
        let (distance, area_ratio) = self.geometry(candidate, input.guide);

        if confidence < self.config.min_confidence {
            return ValidationResult {
                state: GuideState::Searching,
                can_capture: false,
                message: LOW_CONFIDENCE_MESSAGE.to_string(),
                confidence,
                distance_from_center: distance,
                area_ratio,
            };
        }

        let state = if !self.config.geometry_checks {
            GuideState::Ready
        } else if distance > self.config.center_tolerance {
            GuideState::Centering
        } else if area_ratio < self.config.min_area_ratio {
            GuideState::TooFar
        } else if area_ratio > self.config.max_area_ratio {
            GuideState::TooClose
        } else {
            GuideState::Ready
        };

        ValidationResult {
            state,
            can_capture: state.allows_capture(),
            message: guidance_message(state).to_string(),
            confidence,
            distance_from_center: distance,
            area_ratio,
        }
    }

    /// (정규화 중심 거리, 면적 비율)
    fn geometry(&self, candidate: &DetectionCandidate, guide: Rect) -> (f32, f32) {
        let half_short = guide.w.min(guide.h) as f32 / 2.0;
        let distance = if half_short > 0.0 {
            candidate.center.distance(&guide.center()) / half_short
        } else {
            f32::MAX
        };
        let guide_area = guide.area() as f64;
        let area_ratio = if guide_area > 0.0 {
            (candidate.area / guide_area) as f32
        } else {
            0.0
        };
        (distance, area_ratio)
    }

    /// 중앙 정렬 점수 (0 ~ 100) — 허용치 안이면 100
    pub fn centering_score(&self, distance: f32) -> f32 {
        let tolerance = self.config.center_tolerance;
        if distance <= tolerance {
            return 100.0;
        }
        // 허용치 → 1.0 구간에서 선형 감소
        let span = (1.0 - tolerance).max(f32::EPSILON);
        (100.0 * (1.0 - (distance - tolerance) / span)).clamp(0.0, 100.0)
    }

    /// 크기 점수 (0 ~ 100) — 허용 범위 안이면 100
    pub fn size_score(&self, area_ratio: f32) -> f32 {
        let min = self.config.min_area_ratio;
        let max = self.config.max_area_ratio;
        let score = if area_ratio < min {
            100.0 * area_ratio / min.max(f32::EPSILON)
        } else if area_ratio > max {
            100.0 * (1.0 - (area_ratio - max) / (1.0 - max).max(f32::EPSILON))
        } else {
            100.0
        };
        score.clamp(0.0, 100.0)
    }

    fn reject(state: GuideState, message: &str) -> ValidationResult {
        ValidationResult {
            state,
            can_capture: false,
            message: message.to_string(),
            confidence: 0.0,
            distance_from_center: 0.0,
            area_ratio: 0.0,
        }
    }
}
