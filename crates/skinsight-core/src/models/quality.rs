//! 이미지 품질 지표 모델.

use serde::{Deserialize, Serialize};

/// 프레임 품질 지표
///
/// `Default`는 분석 실패 시 사용하는 기본 품질 결과 (0 값, 플래그 모두 false).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// 선명도 (0 이상, 상한 없음)
    pub sharpness: f64,
    /// 평균 밝기 (0 ~ 255)
    pub brightness: f64,
    /// 대비 (표준편차 또는 max-min)
    pub contrast: f64,
    /// 흐림 여부
    pub is_blurry: bool,
    /// 과노출 여부
    pub is_overexposed: bool,
    /// 노출 부족 여부
    pub is_underexposed: bool,
}

impl QualityMetrics {
    /// 노출 문제 여부
    pub fn has_exposure_issue(&self) -> bool {
        self.is_overexposed || self.is_underexposed
    }

    /// 모든 품질 조건 충족 여부
    pub fn is_acceptable(&self) -> bool {
        !self.is_blurry && !self.has_exposure_issue()
    }
}
