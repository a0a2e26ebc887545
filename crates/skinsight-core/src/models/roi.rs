//! ROI(관심 영역) 결과 모델.

use serde::{Deserialize, Serialize};

use super::frame::{Point, Rect, Size};

/// 프레임 내 처리 대상 영역
///
/// 프레임마다 새로 생성되며, 검출기/분석기가 반환하는 좌표는
/// 파이프라인을 떠나기 전에 `to_frame`으로 프레임 좌표계로 되돌린다.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoiResult {
    /// 프레임 좌표계의 ROI 사각형 (항상 프레임 안에 포함)
    pub rect: Rect,
    /// 적용된 ROI 스케일 (0, 1]
    pub scale: f32,
    /// ROI 계산에 사용한 중심점 (프레임 좌표)
    pub center: Point,
}

impl RoiResult {
    /// 프레임 전체를 덮는 ROI (ROI 크롭 비활성 시)
    pub fn full_frame(size: Size) -> Self {
        Self {
            rect: Rect::new(0, 0, size.width, size.height),
            scale: 1.0,
            center: size.center(),
        }
    }

    /// ROI 좌표 → 프레임 좌표
    pub fn to_frame(&self, point: Point) -> Point {
        Point::new(point.x + self.rect.x as f32, point.y + self.rect.y as f32)
    }

    /// 프레임 좌표 → ROI 좌표
    pub fn to_roi(&self, point: Point) -> Point {
        Point::new(point.x - self.rect.x as f32, point.y - self.rect.y as f32)
    }

    /// ROI 좌표계 사각형 → 프레임 좌표계 사각형
    pub fn rect_to_frame(&self, rect: Rect) -> Rect {
        Rect::new(rect.x + self.rect.x, rect.y + self.rect.y, rect.w, rect.h)
    }

    /// ROI 크롭이 실제로 적용되었는지
    pub fn is_cropped(&self, frame: Size) -> bool {
        self.rect.w < frame.width || self.rect.h < frame.height
    }
}

/// 처리 시간 비율(관측/목표) → ROI 배율
///
/// 목표보다 빠르면 넓게, 1.5배 넘게 느리면 가장 좁게.
pub fn pick_scale(observed_ms: f64, target_ms: f64) -> f32 {
    if target_ms <= 0.0 || !observed_ms.is_finite() {
        return 0.5;
    }
    let ratio = observed_ms / target_ms;
    if ratio < 0.75 {
        0.9
    } else if ratio < 1.0 {
        0.8
    } else if ratio <= 1.5 {
        0.65
    } else {
        0.5
    }
}
