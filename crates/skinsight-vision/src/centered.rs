//! 중심 고정 경량 검출기.
//!
//! 그레이스케일에서 점점 넓어지는 세 가지 임계값 전략을 차례로 시도하고,
//! 각 전략에서 ROI 중심에 가장 가까운 유효 윤곽을 고른다.

use image::GrayImage;
use imageproc::contrast::otsu_level;
use skinsight_core::config::DetectorConfig;
use skinsight_core::error::CoreError;
use skinsight_core::models::detection::{DetectionCandidate, DetectionMethod};
use skinsight_core::models::frame::{Frame, Point};
use skinsight_core::models::performance::PerformanceProfile;
use skinsight_core::models::roi::RoiResult;
use skinsight_core::pool::BufferPool;
use skinsight_core::ports::vision::LesionDetector;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::geometry::{outer_contours, ContourFilter, ContourMetrics};
use crate::preprocess;
use crate::segmentation;

/// 상대 임계값 = 평균 − k·표준편차
const RELATIVE_STD_FACTOR: f64 = 1.0;

/// (전략, 신뢰도 배수) — 시도 순서
const STRATEGIES: [(DetectionMethod, f32); 3] = [
    (DetectionMethod::CenteredOtsu, 1.0),
    (DetectionMethod::CenteredRelative, 0.9),
    (DetectionMethod::CenteredAdaptive, 0.8),
];

/// ROI 중심 고정 검출기
pub struct CenteredDetector {
    config: DetectorConfig,
    pool: Arc<BufferPool>,
}

/// 대각선 길이의 절반
fn half_diagonal(w: u32, h: u32) -> f32 {
    (w as f32).hypot(h as f32) / 2.0
}

impl CenteredDetector {
    pub fn new(config: DetectorConfig, pool: Arc<BufferPool>) -> Self {
        Self { config, pool }
    }

    fn mask_for(&self, method: DetectionMethod, gray: &GrayImage) -> GrayImage {
        match method {
            DetectionMethod::CenteredOtsu => {
                segmentation::threshold_inverse(gray, otsu_level(gray))
            }
            DetectionMethod::CenteredRelative => {
                let (mean, std) = segmentation::mean_std(gray);
                let level = (mean - RELATIVE_STD_FACTOR * std).clamp(0.0, 255.0) as u8;
                segmentation::threshold_inverse(gray, level)
            }
            _ => segmentation::adaptive_threshold_inverse(
                gray,
                self.config.adaptive_block_radius,
                self.config.adaptive_offset,
            ),
        }
    }

    /// 허용 반경 안에서 중심에 가장 가까운 유효 윤곽
    fn nearest_to_center(
        &self,
        contours: Vec<ContourMetrics>,
        filter: &ContourFilter,
        center: Point,
        max_offset: f32,
    ) -> Option<ContourMetrics> {
        contours
            .into_iter()
            .filter(|m| filter.accepts(m))
            .map(|m| (m.centroid.distance(&center), m))
            .filter(|(d, _)| *d <= max_offset)
            .min_by(|(a, _), (b, _)| a.total_cmp(b))
            .map(|(_, m)| m)
    }

    fn try_detect(
        &self,
        frame: &Frame,
        roi: &RoiResult,
        profile: &PerformanceProfile,
    ) -> Result<Option<DetectionCandidate>, CoreError> {
        frame.ensure_processable()?;

        let crop = preprocess::crop_gray(frame, roi.rect, &self.pool)?;
        let gray = preprocess::resize_gray(crop, profile.resolution_scale.clamp(0.05, 1.0), &self.pool)?;

        let (w, h) = gray.dimensions();
        let sx = w as f32 / roi.rect.w as f32;
        let sy = h as f32 / roi.rect.h as f32;
        let filter = ContourFilter::new(&self.config, w as f64 * h as f64, sx.min(sy));
        let center = Point::new(w as f32 / 2.0, h as f32 / 2.0);
        let half_diagonal = half_diagonal(w, h);
        let max_offset = self.config.centered_max_offset * half_diagonal;

        let mut found = None;
        for (method, penalty) in STRATEGIES {
            let mask = segmentation::clean_mask(&self.mask_for(method, &gray), self.config.morph_radius);
            if let Some(m) = self.nearest_to_center(outer_contours(&mask), &filter, center, max_offset) {
                found = Some((m, method, penalty));
                break;
            }
        }
        preprocess::release(&self.pool, gray);

        Ok(found.map(|(metrics, method, penalty)| {
            let confidence = filter.confidence(&metrics) * penalty;
            metrics.to_candidate(method, confidence, (sx, sy), roi)
        }))
    }
}

impl LesionDetector for CenteredDetector {
    fn detect(
        &self,
        frame: &Frame,
        roi: &RoiResult,
        profile: &PerformanceProfile,
    ) -> Option<DetectionCandidate> {
        match self.try_detect(frame, roi, profile) {
            Ok(result) => {
                if let Some(c) = &result {
                    debug!(
                        "중심 검출: method={}, conf={:.2}",
                        c.method.as_str(),
                        c.confidence
                    );
                }
                result
            }
            Err(e) => {
                warn!("중심 검출 실패 (frame={}): {e}", frame.index());
                None
            }
        }
    }

    fn name(&self) -> &'static str {
        "centered"
    }
}
