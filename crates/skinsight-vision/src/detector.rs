//! 다중 방법 병변 검출기.
//!
//! 1. Lab 색공간 임계값 + 모폴로지 정리 + 윤곽 검증 (주 방법)
//! 2. 고급 필터 프로파일에서만: 워터셰드 → 엣지 변화량 폴백
//!
//! 모든 내부 실패는 `None` + `warn!` 로그로 변환된다.

use image::RgbImage;
use skinsight_core::config::DetectorConfig;
use skinsight_core::error::CoreError;
use skinsight_core::models::detection::{DetectionCandidate, DetectionMethod};
use skinsight_core::models::frame::Frame;
use skinsight_core::models::performance::PerformanceProfile;
use skinsight_core::models::roi::RoiResult;
use skinsight_core::pool::BufferPool;
use skinsight_core::ports::vision::LesionDetector;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::geometry::{outer_contours, ContourFilter, ContourMetrics};
use crate::preprocess;
use crate::segmentation::{self, LabConverter, WatershedParams};

/// 최저 해상도 배율
const MIN_RESOLUTION_SCALE: f32 = 0.05;

/// Lab 임계값 주 방법 + 워터셰드/엣지 폴백 검출기
pub struct MultiMethodDetector {
    config: DetectorConfig,
    lab: LabConverter,
    pool: Arc<BufferPool>,
}

impl MultiMethodDetector {
    pub fn new(config: DetectorConfig, pool: Arc<BufferPool>) -> Self {
        Self {
            config,
            lab: LabConverter::new(),
            pool,
        }
    }

    fn try_detect(
        &self,
        frame: &Frame,
        roi: &RoiResult,
        profile: &PerformanceProfile,
    ) -> Result<Option<DetectionCandidate>, CoreError> {
        frame.ensure_processable()?;

        let crop = preprocess::crop_rgb(frame, roi.rect, &self.pool)?;
        let scale = profile.resolution_scale.clamp(MIN_RESOLUTION_SCALE, 1.0);
        let rgb = preprocess::resize_rgb(crop, scale, &self.pool)?;

        let (w, h) = rgb.dimensions();
        let sx = w as f32 / roi.rect.w as f32;
        let sy = h as f32 / roi.rect.h as f32;
        let filter = ContourFilter::new(&self.config, w as f64 * h as f64, sx.min(sy));

        let found = match self.color_threshold(&rgb, &filter) {
            Some(m) => Some((m, DetectionMethod::ColorThreshold)),
            None if profile.advanced_filters => self.fallbacks(&rgb, &filter)?,
            None => None,
        };
        preprocess::release(&self.pool, rgb);

        Ok(found.map(|(metrics, method)| {
            let confidence = filter.confidence(&metrics);
            metrics.to_candidate(method, confidence, (sx, sy), roi)
        }))
    }

    /// 주 방법 — Lab 마스크
    fn color_threshold(&self, rgb: &RgbImage, filter: &ContourFilter) -> Option<ContourMetrics> {
        let mask = segmentation::lab_mask(
            rgb,
            &self.lab,
            self.config.lightness_min,
            self.config.lightness_max,
            self.config.a_min,
        );
        let cleaned = segmentation::clean_mask(&mask, self.config.morph_radius);
        filter.best(outer_contours(&cleaned))
    }

    /// 폴백 — 워터셰드 후 엣지 변화량
    fn fallbacks(
        &self,
        rgb: &RgbImage,
        filter: &ContourFilter,
    ) -> Result<Option<(ContourMetrics, DetectionMethod)>, CoreError> {
        let gray = preprocess::rgb_to_gray(rgb, &self.pool)?;

        let params = WatershedParams {
            block_radius: self.config.adaptive_block_radius,
            offset: self.config.adaptive_offset,
            morph_radius: self.config.morph_radius,
            seed_ratio: self.config.seed_ratio,
        };
        let regions = segmentation::watershed_regions(&gray, params);
        let watershed = filter.best(regions.iter().flat_map(outer_contours).collect());

        let found = match watershed {
            Some(m) => Some((m, DetectionMethod::Watershed)),
            None => {
                let edges = segmentation::edge_mask(&gray, self.config.morph_radius);
                filter
                    .best(outer_contours(&edges))
                    .map(|m| (m, DetectionMethod::EdgeVariation))
            }
        };
        preprocess::release(&self.pool, gray);
        Ok(found)
    }
}

impl LesionDetector for MultiMethodDetector {
    fn detect(
        &self,
        frame: &Frame,
        roi: &RoiResult,
        profile: &PerformanceProfile,
    ) -> Option<DetectionCandidate> {
        match self.try_detect(frame, roi, profile) {
            Ok(Some(candidate)) => {
                debug!(
                    "병변 검출: method={}, center=({:.1}, {:.1}), conf={:.2}",
                    candidate.method.as_str(),
                    candidate.center.x,
                    candidate.center.y,
                    candidate.confidence
                );
                Some(candidate)
            }
            Ok(None) => {
                debug!("병변 미검출 (frame={})", frame.index());
                None
            }
            Err(e) => {
                warn!("병변 검출 실패 (frame={}): {e}", frame.index());
                None
            }
        }
    }

    fn name(&self) -> &'static str {
        "multi_method"
    }
}
