//! 윤곽 기하 지표와 후보 검증.
//!
//! 면적/무게중심은 다각형 모멘트(shoelace)로, 둘레와 볼록 껍질은
//! imageproc으로 계산한다. 퇴화 윤곽(면적 0, 둘레 0, 빈 껍질)은
//! `CoreError::DegenerateGeometry`로 걸러진다.

use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use imageproc::geometry::{arc_length, convex_hull};
use imageproc::point::Point as IpPoint;
use skinsight_core::config::DetectorConfig;
use skinsight_core::error::CoreError;
use skinsight_core::models::detection::{DetectionCandidate, DetectionMethod};
use skinsight_core::models::frame::{Point, Rect};
use skinsight_core::models::roi::RoiResult;
use std::f64::consts::PI;

const AREA_EPSILON: f64 = 1e-6;

/// 윤곽 하나의 기하 지표 (처리 해상도 좌표계)
#[derive(Debug, Clone, PartialEq)]
pub struct ContourMetrics {
    pub area: f64,
    pub perimeter: f64,
    pub centroid: Point,
    pub bbox: Rect,
    /// 원형도 4π·A/P² (0 ~ 1)
    pub compactness: f64,
    /// 견고도 A/볼록껍질 면적 (0 ~ 1)
    pub solidity: f64,
    /// 바운딩 박스 긴 변 / 짧은 변
    pub aspect_ratio: f64,
}

/// 부호 있는 다각형 면적과 무게중심 (shoelace 1차 모멘트)
fn polygon_moments(points: &[IpPoint<i32>]) -> (f64, f64, f64) {
    let n = points.len();
    let mut twice_area = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for i in 0..n {
        let p = points[i];
        let q = points[(i + 1) % n];
        let cross = p.x as f64 * q.y as f64 - q.x as f64 * p.y as f64;
        twice_area += cross;
        cx += (p.x + q.x) as f64 * cross;
        cy += (p.y + q.y) as f64 * cross;
    }
    (twice_area / 2.0, cx, cy)
}

fn bounding_rect(points: &[IpPoint<i32>]) -> Rect {
    let (mut min_x, mut min_y) = (i32::MAX, i32::MAX);
    let (mut max_x, mut max_y) = (i32::MIN, i32::MIN);
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Rect::new(
        min_x.max(0) as u32,
        min_y.max(0) as u32,
        (max_x - min_x + 1).max(1) as u32,
        (max_y - min_y + 1).max(1) as u32,
    )
}

/// 윤곽 점 목록의 기하 지표 계산
pub fn measure(points: &[IpPoint<i32>]) -> Result<ContourMetrics, CoreError> {
    if points.len() < 3 {
        return Err(CoreError::DegenerateGeometry(format!(
            "점 {}개",
            points.len()
        )));
    }

    let (signed_area, mx, my) = polygon_moments(points);
    let area = signed_area.abs();
    if area < AREA_EPSILON {
        return Err(CoreError::DegenerateGeometry("면적 0".to_string()));
    }
    let centroid = Point::new(
        (mx / (6.0 * signed_area)) as f32,
        (my / (6.0 * signed_area)) as f32,
    );

    let perimeter = arc_length(points, true);
    if perimeter < AREA_EPSILON {
        return Err(CoreError::DegenerateGeometry("둘레 0".to_string()));
    }

    let hull = convex_hull(points);
    if hull.len() < 3 {
        return Err(CoreError::DegenerateGeometry("빈 볼록 껍질".to_string()));
    }
    let hull_area = polygon_moments(&hull).0.abs();
    if hull_area < AREA_EPSILON {
        return Err(CoreError::DegenerateGeometry("볼록 껍질 면적 0".to_string()));
    }

    let bbox = bounding_rect(points);
    let long = bbox.w.max(bbox.h) as f64;
    let short = bbox.w.min(bbox.h) as f64;

    Ok(ContourMetrics {
        area,
        perimeter,
        centroid,
        bbox,
        compactness: (4.0 * PI * area / (perimeter * perimeter)).min(1.0),
        solidity: (area / hull_area).min(1.0),
        aspect_ratio: long / short,
    })
}

impl ContourMetrics {
    /// 처리 해상도 → ROI 좌표(배율 역변환) → 프레임 좌표 후보
    ///
    /// `scale`은 (가로, 세로) 실제 축소 비율.
    pub fn to_candidate(
        &self,
        method: DetectionMethod,
        confidence: f32,
        scale: (f32, f32),
        roi: &RoiResult,
    ) -> DetectionCandidate {
        let (sx, sy) = scale;
        let max_x = roi.rect.w.saturating_sub(1);
        let max_y = roi.rect.h.saturating_sub(1);
        let x = ((self.bbox.x as f32 / sx).floor() as u32).min(max_x);
        let y = ((self.bbox.y as f32 / sy).floor() as u32).min(max_y);
        let w = ((self.bbox.w as f32 / sx).ceil() as u32)
            .min(roi.rect.w.saturating_sub(x))
            .max(1);
        let h = ((self.bbox.h as f32 / sy).ceil() as u32)
            .min(roi.rect.h.saturating_sub(y))
            .max(1);

        let local_center = Point::new(
            (self.centroid.x / sx).clamp(0.0, roi.rect.w as f32),
            (self.centroid.y / sy).clamp(0.0, roi.rect.h as f32),
        );

        DetectionCandidate {
            center: local_center,
            bbox: Rect::new(x, y, w, h),
            confidence: confidence.clamp(0.0, 1.0),
            area: self.area / (sx as f64 * sy as f64),
            method,
        }
        .into_frame_space(roi)
    }
}

/// 이진 마스크의 바깥 윤곽 지표 (퇴화 윤곽 제외)
pub fn outer_contours(mask: &GrayImage) -> Vec<ContourMetrics> {
    find_contours::<i32>(mask)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer)
        .filter_map(|c| measure(&c.points).ok())
        .collect()
}

/// 검출기 설정 기반 윤곽 필터
#[derive(Debug, Clone)]
pub struct ContourFilter {
    min_area: f64,
    max_area: f64,
    min_compactness: f64,
    min_solidity: f64,
    max_aspect_ratio: f64,
    ideal_area: f64,
}

impl ContourFilter {
    /// `roi_area`는 처리 해상도 기준 면적, `scale`은 해상도 배율
    pub fn new(config: &DetectorConfig, roi_area: f64, scale: f32) -> Self {
        let scale2 = (scale as f64) * (scale as f64);
        Self {
            min_area: (roi_area * config.min_area_fraction).max(config.min_area_pixels * scale2),
            max_area: roi_area * config.max_area_fraction,
            min_compactness: config.min_compactness,
            min_solidity: config.min_solidity,
            max_aspect_ratio: config.max_aspect_ratio,
            ideal_area: (roi_area * config.ideal_area_fraction).max(1.0),
        }
    }

    /// 면적 → 원형도 → 견고도 → 종횡비 순서로 검사
    pub fn accepts(&self, m: &ContourMetrics) -> bool {
        m.area >= self.min_area
            && m.area <= self.max_area
            && m.compactness >= self.min_compactness
            && m.solidity >= self.min_solidity
            && m.aspect_ratio <= self.max_aspect_ratio
    }

    /// 신뢰도 = 0.5 + 면적 근접 보너스(≤0.2) + 0.15·원형도 + 0.15·견고도
    pub fn confidence(&self, m: &ContourMetrics) -> f32 {
        let closeness = 1.0 - ((m.area - self.ideal_area).abs() / self.ideal_area);
        let area_bonus = 0.2 * closeness.clamp(0.0, 1.0);
        let score = 0.5 + area_bonus + 0.15 * m.compactness + 0.15 * m.solidity;
        score.clamp(0.0, 1.0) as f32
    }

    /// 면적 큰 순으로 첫 유효 윤곽
    pub fn best(&self, mut contours: Vec<ContourMetrics>) -> Option<ContourMetrics> {
        contours.sort_by(|a, b| b.area.total_cmp(&a.area));
        contours.into_iter().find(|m| self.accepts(m))
    }
}
