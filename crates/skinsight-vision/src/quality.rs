//! 프레임 품질 분석.
//!
//! 선명도/밝기/대비/노출 플래그를 계산한다. 고급 필터 프로파일은
//! 라플라시안 분산과 표준편차를, 기본 프로파일은 Sobel 평균 기울기와
//! max−min 범위를 쓴다.

use image::GrayImage;
use imageproc::filter::laplacian_filter;
use imageproc::gradients::sobel_gradients;
use skinsight_core::config::QualityConfig;
use skinsight_core::error::CoreError;
use skinsight_core::models::frame::{Frame, Rect};
use skinsight_core::models::performance::PerformanceProfile;
use skinsight_core::models::quality::QualityMetrics;
use skinsight_core::pool::BufferPool;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::preprocess;
use crate::segmentation::mean_std;

/// 프레임 품질 분석기
pub struct QualityAnalyzer {
    config: QualityConfig,
    pool: Arc<BufferPool>,
}

impl QualityAnalyzer {
    pub fn new(config: QualityConfig, pool: Arc<BufferPool>) -> Self {
        Self { config, pool }
    }

    /// 프레임 품질 분석. 실패 시 기본 품질 결과
    pub fn analyze(&self, frame: &Frame, profile: &PerformanceProfile) -> QualityMetrics {
        match self.try_analyze(frame, profile) {
            Ok(metrics) => {
                debug!(
                    "품질: sharpness={:.1}, brightness={:.1}, contrast={:.1}, blurry={}, over={}, under={}",
                    metrics.sharpness,
                    metrics.brightness,
                    metrics.contrast,
                    metrics.is_blurry,
                    metrics.is_overexposed,
                    metrics.is_underexposed
                );
                metrics
            }
            Err(e) => {
                warn!("품질 분석 실패 (frame={}): {e}", frame.index());
                QualityMetrics::default()
            }
        }
    }

    fn try_analyze(
        &self,
        frame: &Frame,
        profile: &PerformanceProfile,
    ) -> Result<QualityMetrics, CoreError> {
        frame.ensure_processable()?;
        let full = Rect::new(0, 0, frame.width(), frame.height());
        let gray = preprocess::crop_gray(frame, full, &self.pool)?;
        let gray = preprocess::resize_gray(gray, profile.resolution_scale.clamp(0.05, 1.0), &self.pool)?;
        let metrics = self.measure(&gray, profile.advanced_filters);
        preprocess::release(&self.pool, gray);
        Ok(metrics)
    }

    /// 그레이스케일 영상 품질 지표
    pub fn measure(&self, gray: &GrayImage, advanced: bool) -> QualityMetrics {
        let total = (gray.width() as f64 * gray.height() as f64).max(1.0);
        let mut bright = 0usize;
        let mut dark = 0usize;
        let mut min = u8::MAX;
        let mut max = u8::MIN;
        for p in gray.pixels() {
            let v = p.0[0];
            if v >= self.config.bright_pixel_threshold {
                bright += 1;
            }
            if v <= self.config.dark_pixel_threshold {
                dark += 1;
            }
            min = min.min(v);
            max = max.max(v);
        }
        let (brightness, std) = mean_std(gray);

        let (sharpness, contrast, blur_threshold) = if advanced {
            (
                laplacian_variance(gray),
                std,
                self.config.laplacian_blur_threshold,
            )
        } else {
            (
                mean_gradient(gray),
                max.saturating_sub(min) as f64,
                self.config.sobel_blur_threshold,
            )
        };

        QualityMetrics {
            sharpness,
            brightness: brightness.clamp(0.0, 255.0),
            contrast,
            is_blurry: sharpness < blur_threshold,
            is_overexposed: bright as f64 / total > self.config.overexposed_ratio as f64,
            is_underexposed: dark as f64 / total > self.config.underexposed_ratio as f64,
        }
    }
}

fn laplacian_variance(gray: &GrayImage) -> f64 {
    let lap = laplacian_filter(gray);
    let n = (lap.width() as f64 * lap.height() as f64).max(1.0);
    let (sum, sum_sq) = lap.pixels().fold((0.0f64, 0.0f64), |(s, sq), p| {
        let v = p.0[0] as f64;
        (s + v, sq + v * v)
    });
    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0)
}

fn mean_gradient(gray: &GrayImage) -> f64 {
    let grad = sobel_gradients(gray);
    let n = (grad.width() as f64 * grad.height() as f64).max(1.0);
    grad.pixels().map(|p| p.0[0] as f64).sum::<f64>() / n
}
