//! ROI(관심 영역) 선택.
//!
//! 최근 검출 중심의 이동 평균으로 ROI를 편향시켜 처리 픽셀 수를 줄인다.
//! 결과 사각형은 항상 프레임 안으로 잘리며, 실패하지 않는다.

use parking_lot::Mutex;
use skinsight_core::config::RoiConfig;
use skinsight_core::models::frame::{Point, Rect, Size};
pub use skinsight_core::models::roi::pick_scale;
use skinsight_core::models::roi::RoiResult;
use std::collections::VecDeque;
use tracing::trace;

/// ROI 배율 하한
pub const MIN_ROI_SCALE: f32 = 0.05;

/// 검출 이력 기반 ROI 선택기
#[derive(Debug)]
pub struct RoiSelector {
    adaptive: bool,
    history_size: usize,
    history: Mutex<VecDeque<Point>>,
}

impl RoiSelector {
    pub fn new(config: &RoiConfig) -> Self {
        let history_size = config.history_size.max(1);
        Self {
            adaptive: config.adaptive,
            history_size,
            history: Mutex::new(VecDeque::with_capacity(history_size)),
        }
    }

    /// 프레임 크기와 배율로 ROI 계산
    pub fn compute_roi(&self, frame: Size, roi_scale: f32) -> RoiResult {
        let scale = if roi_scale.is_finite() {
            roi_scale.clamp(MIN_ROI_SCALE, 1.0)
        } else {
            1.0
        };

        if frame.width == 0 || frame.height == 0 {
            return RoiResult {
                rect: Rect::default(),
                scale,
                center: Point::default(),
            };
        }

        let center = self.biased_center().unwrap_or_else(|| frame.center());
        let w = ((frame.width as f32 * scale).round() as u32).clamp(1, frame.width);
        let h = ((frame.height as f32 * scale).round() as u32).clamp(1, frame.height);

        let (x, rw) = clip_span(center.x, w, frame.width);
        let (y, rh) = clip_span(center.y, h, frame.height);
        let rect = Rect::new(x, y, rw, rh);
        trace!("ROI: {:?} (scale={scale:.2}, center=({:.1}, {:.1}))", rect, center.x, center.y);

        RoiResult {
            rect,
            scale,
            center,
        }
    }

    /// 검출 성공 시 중심 기록 (최근 N개 유지)
    pub fn record_detection(&self, center: Point) {
        let mut history = self.history.lock();
        if history.len() >= self.history_size {
            history.pop_front();
        }
        history.push_back(center);
    }

    pub fn clear_history(&self) {
        self.history.lock().clear();
    }

    pub fn history_len(&self) -> usize {
        self.history.lock().len()
    }

    fn biased_center(&self) -> Option<Point> {
        if !self.adaptive {
            return None;
        }
        let history = self.history.lock();
        if history.is_empty() {
            return None;
        }
        let n = history.len() as f32;
        let (sx, sy) = history
            .iter()
            .fold((0.0f32, 0.0f32), |(sx, sy), p| (sx + p.x, sy + p.y));
        Some(Point::new(sx / n, sy / n))
    }
}

/// 중심 `c`, 길이 `len`인 구간을 [0, limit) 안으로 자름: (시작, 길이)
fn clip_span(c: f32, len: u32, limit: u32) -> (u32, u32) {
    let start = c - len as f32 / 2.0;
    let end = start + len as f32;
    let clipped_start = (start.max(0.0).floor() as u32).min(limit - 1);
    let clipped_end = (end.min(limit as f32).ceil() as u32).clamp(clipped_start + 1, limit);
    (clipped_start, clipped_end - clipped_start)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector() -> RoiSelector {
        RoiSelector::new(&RoiConfig::default())
    }

    #[test]
    fn centered_roi_without_history() {
        let roi = selector().compute_roi(Size::new(640, 480), 0.5);
        assert_eq!(roi.rect, Rect::new(160, 120, 320, 240));
        assert_eq!(roi.center, Point::new(320.0, 240.0));
    }

    #[test]
    fn roi_biased_toward_history_and_clipped() {
        let sel = selector();
        sel.record_detection(Point::new(600.0, 450.0));
        sel.record_detection(Point::new(620.0, 470.0));
        let frame = Size::new(640, 480);
        let roi = sel.compute_roi(frame, 0.5);
        assert_eq!(roi.center, Point::new(610.0, 460.0));
        assert!(roi.rect.fits_within(frame));
        // 가장자리에서 잘려 줄어듦
        assert!(roi.rect.w < 320 && roi.rect.h < 240);
        assert_eq!(roi.rect.right(), 640);
        assert_eq!(roi.rect.bottom(), 480);
    }

    #[test]
    fn history_is_bounded() {
        let sel = selector();
        for i in 0..25 {
            sel.record_detection(Point::new(i as f32, 0.0));
        }
        assert_eq!(sel.history_len(), 10);
        sel.clear_history();
        assert_eq!(sel.history_len(), 0);
    }

    #[test]
    fn non_adaptive_ignores_history() {
        let sel = RoiSelector::new(&RoiConfig {
            adaptive: false,
            history_size: 10,
        });
        sel.record_detection(Point::new(10.0, 10.0));
        let roi = sel.compute_roi(Size::new(100, 100), 0.5);
        assert_eq!(roi.rect, Rect::new(25, 25, 50, 50));
    }

    #[test]
    fn scale_is_clamped() {
        let sel = selector();
        let frame = Size::new(200, 100);
        let tiny = sel.compute_roi(frame, 0.0);
        assert_eq!(tiny.scale, MIN_ROI_SCALE);
        assert_eq!(tiny.rect.w, 10);
        let big = sel.compute_roi(frame, 3.0);
        assert_eq!(big.rect, Rect::new(0, 0, 200, 100));
        let nan = sel.compute_roi(frame, f32::NAN);
        assert_eq!(nan.scale, 1.0);
    }

    #[test]
    fn zero_size_frame_gives_empty_rect() {
        let roi = selector().compute_roi(Size::new(0, 480), 0.8);
        assert!(roi.rect.is_empty());
    }

    #[test]
    fn rect_always_inside_frame() {
        let sel = selector();
        let points = [(-50.0, -50.0), (0.0, 0.0), (1000.0, 10.0), (5.0, 900.0), (33.3, 77.7)];
        for (x, y) in points {
            sel.clear_history();
            sel.record_detection(Point::new(x, y));
            for scale in [0.05f32, 0.3, 0.8, 1.0] {
                let frame = Size::new(97, 53);
                let roi = sel.compute_roi(frame, scale);
                assert!(roi.rect.fits_within(frame), "{:?}", roi.rect);
                assert!(!roi.rect.is_empty());
            }
        }
    }

    #[test]
    fn pick_scale_bands() {
        assert_eq!(pick_scale(50.0, 100.0), 0.9);
        assert_eq!(pick_scale(90.0, 100.0), 0.8);
        assert_eq!(pick_scale(150.0, 100.0), 0.65);
        assert_eq!(pick_scale(151.0, 100.0), 0.5);
        assert_eq!(pick_scale(10.0, 0.0), 0.5);
    }
}
