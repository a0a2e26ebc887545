//! 촬영 가이드 상태 및 검증 결과 모델.

use serde::{Deserialize, Serialize};

use super::frame::Point;

/// 사용자에게 표시하는 촬영 준비 상태 (프레임마다 정확히 하나)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GuideState {
    /// 병변을 찾는 중
    Searching,
    /// 가이드 중앙으로 이동 필요
    Centering,
    /// 너무 멀리 있음 (병변이 작게 보임)
    TooFar,
    /// 너무 가까이 있음 (병변이 크게 보임)
    TooClose,
    /// 조명 불량 (과노출/노출 부족)
    PoorLighting,
    /// 흐림
    Blurry,
    /// 촬영 가능
    Ready,
}

impl GuideState {
    /// 이 상태에서 촬영이 허용되는지
    pub fn allows_capture(self) -> bool {
        matches!(self, Self::Ready)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Searching => "SEARCHING",
            Self::Centering => "CENTERING",
            Self::TooFar => "TOO_FAR",
            Self::TooClose => "TOO_CLOSE",
            Self::PoorLighting => "POOR_LIGHTING",
            Self::Blurry => "BLURRY",
            Self::Ready => "READY",
        }
    }
}

/// 촬영 검증 결과 (프레임마다 새로 생성, 불변)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// 가이드 상태
    pub state: GuideState,
    /// 촬영 가능 여부
    pub can_capture: bool,
    /// 사용자 안내 메시지
    pub message: String,
    /// 검출 신뢰도 (0.0 ~ 1.0, 검출 없으면 0)
    pub confidence: f32,
    /// 가이드 중심까지의 정규화 거리 (가이드 짧은 변의 절반 기준)
    pub distance_from_center: f32,
    /// 병변 면적 / 가이드 면적
    pub area_ratio: f32,
}

impl ValidationResult {
    /// 촬영 준비 완료 여부
    pub fn is_ready(&self) -> bool {
        self.state == GuideState::Ready && self.can_capture
    }
}

/// 프레임 단위 가이드 결과 (호스트 표시 레이어로 전달)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuidanceResult {
    /// 처리한 프레임 번호
    pub frame_index: u64,
    /// 가이드 상태
    pub state: GuideState,
    /// 촬영 가능 여부
    pub can_capture: bool,
    /// 사용자 안내 메시지
    pub message: String,
    /// 검출 신뢰도
    pub confidence: f32,
    /// 검출된 병변 중심 (프레임 좌표)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_center: Option<Point>,
    /// 검출 방법 이름
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detection_method: Option<String>,
    /// 처리 시간 (밀리초)
    pub processing_time_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_ready_allows_capture() {
        let states = [
            GuideState::Searching,
            GuideState::Centering,
            GuideState::TooFar,
            GuideState::TooClose,
            GuideState::PoorLighting,
            GuideState::Blurry,
        ];
        for state in states {
            assert!(!state.allows_capture(), "{state:?}");
        }
        assert!(GuideState::Ready.allows_capture());
    }

    #[test]
    fn guide_state_serializes_screaming_snake() {
        let json = serde_json::to_string(&GuideState::PoorLighting).unwrap();
        assert_eq!(json, "\"POOR_LIGHTING\"");
        assert_eq!(GuideState::TooFar.as_str(), "TOO_FAR");
    }
}
