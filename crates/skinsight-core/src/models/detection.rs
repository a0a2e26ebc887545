//! 병변 검출 후보 모델.

use serde::{Deserialize, Serialize};

use super::frame::{Point, Rect};
use super::roi::RoiResult;

/// 후보를 만든 검출 방법
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    /// Lab 색공간 밝기/톤 임계값 (주 방법)
    ColorThreshold,
    /// 적응 임계값 + 거리 변환 + 워터셰드 (폴백)
    Watershed,
    /// 엣지/변화량 기반 폴백
    EdgeVariation,
    /// 중심 고정 검출기 — Otsu 임계값
    CenteredOtsu,
    /// 중심 고정 검출기 — 평균/표준편차 상대 임계값
    CenteredRelative,
    /// 중심 고정 검출기 — 적응 임계값
    CenteredAdaptive,
}

impl DetectionMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ColorThreshold => "color_threshold",
            Self::Watershed => "watershed",
            Self::EdgeVariation => "edge_variation",
            Self::CenteredOtsu => "centered_otsu",
            Self::CenteredRelative => "centered_relative",
            Self::CenteredAdaptive => "centered_adaptive",
        }
    }
}

/// 검출 후보 (한 프레임 처리 동안만 존재)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionCandidate {
    /// 중심점
    pub center: Point,
    /// 바운딩 박스
    pub bbox: Rect,
    /// 신뢰도 (0.0 ~ 1.0)
    pub confidence: f32,
    /// 면적 (픽셀)
    pub area: f64,
    /// 검출 방법
    pub method: DetectionMethod,
}

impl DetectionCandidate {
    /// ROI 좌표계 후보를 프레임 좌표계로 변환
    pub fn into_frame_space(self, roi: &RoiResult) -> Self {
        Self {
            center: roi.to_frame(self.center),
            bbox: roi.rect_to_frame(self.bbox),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_translates_to_frame_space() {
        let roi = RoiResult {
            rect: Rect::new(100, 50, 200, 200),
            scale: 0.5,
            center: Point::new(200.0, 150.0),
        };
        let candidate = DetectionCandidate {
            center: Point::new(10.0, 20.0),
            bbox: Rect::new(5, 15, 10, 10),
            confidence: 0.8,
            area: 78.0,
            method: DetectionMethod::ColorThreshold,
        };
        let moved = candidate.into_frame_space(&roi);
        assert_eq!(moved.center, Point::new(110.0, 70.0));
        assert_eq!(moved.bbox, Rect::new(105, 65, 10, 10));
        assert_eq!(moved.method.as_str(), "color_threshold");
    }
}
