//! 병변 후보 마스크 생성.
//!
//! - Lab 색공간 임계값 마스크 (주 방법)
//! - 적응 임계값 + 거리 변환 + 마커 워터셰드 (폴백)
//! - Canny 엣지 기반 변화량 마스크 (폴백)
//!
//! 모든 마스크는 전경 255 / 배경 0 이진 영상이다.

use image::{GrayImage, ImageBuffer, Luma, RgbImage};
use imageproc::distance_transform::{distance_transform, Norm};
use imageproc::edges::canny;
use imageproc::filter::{box_filter, gaussian_blur_f32};
use imageproc::gradients::sobel_gradients;
use imageproc::morphology::{close, open};
use imageproc::region_labelling::{connected_components, Connectivity};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

const FOREGROUND: u8 = 255;

/// 워터셰드 결과에서 검사할 최대 영역 수
const MAX_WATERSHED_REGIONS: usize = 32;

/// sRGB → CIE L*a*b* (D65) 변환기
///
/// 감마 해제 테이블을 생성 시 한 번 계산한다.
#[derive(Debug, Clone)]
pub struct LabConverter {
    linear: [f32; 256],
}

impl LabConverter {
    pub fn new() -> Self {
        let mut linear = [0.0f32; 256];
        for (i, v) in linear.iter_mut().enumerate() {
            let c = i as f32 / 255.0;
            *v = if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            };
        }
        Self { linear }
    }

    /// (L*, a*) 반환 (b*는 마스크에 쓰지 않음)
    pub fn lightness_a(&self, [r, g, b]: [u8; 3]) -> (f32, f32) {
        let (r, g, b) = (
            self.linear[r as usize],
            self.linear[g as usize],
            self.linear[b as usize],
        );
        let x = (0.412_456_4 * r + 0.357_576_1 * g + 0.180_437_5 * b) / 0.950_47;
        let y = 0.212_672_9 * r + 0.715_152_2 * g + 0.072_175 * b;
        let fx = lab_f(x);
        let fy = lab_f(y);
        (116.0 * fy - 16.0, 500.0 * (fx - fy))
    }
}

impl Default for LabConverter {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn lab_f(t: f32) -> f32 {
    const DELTA: f32 = 6.0 / 29.0;
    if t > DELTA * DELTA * DELTA {
        t.cbrt()
    } else {
        t / (3.0 * DELTA * DELTA) + 4.0 / 29.0
    }
}

/// Lab 임계값 마스크 — L* ∈ [l_min, l_max] 이고 a* ≥ a_min
pub fn lab_mask(
    rgb: &RgbImage,
    converter: &LabConverter,
    l_min: f32,
    l_max: f32,
    a_min: f32,
) -> GrayImage {
    let (w, h) = rgb.dimensions();
    let mut mask = GrayImage::new(w, h);
    for (src, dst) in rgb.pixels().zip(mask.pixels_mut()) {
        let (l, a) = converter.lightness_a(src.0);
        if l >= l_min && l <= l_max && a >= a_min {
            dst.0[0] = FOREGROUND;
        }
    }
    mask
}

/// 닫기 후 열기 (L∞ 커널)
pub fn clean_mask(mask: &GrayImage, radius: u8) -> GrayImage {
    if radius == 0 {
        return mask.clone();
    }
    open(&close(mask, Norm::LInf, radius), Norm::LInf, radius)
}

/// 고정 임계값 이진화 — 값 ≤ level 이면 전경 (어두운 병변)
pub fn threshold_inverse(gray: &GrayImage, level: u8) -> GrayImage {
    map_binary(gray, |v| v <= level)
}

/// 적응 임계값 이진화 — 값 < 지역 평균 − offset 이면 전경
pub fn adaptive_threshold_inverse(gray: &GrayImage, block_radius: u32, offset: u8) -> GrayImage {
    let mean = box_filter(gray, block_radius, block_radius);
    let (w, h) = gray.dimensions();
    GrayImage::from_fn(w, h, |x, y| {
        let v = gray.get_pixel(x, y).0[0] as i32;
        let m = mean.get_pixel(x, y).0[0] as i32;
        if v < m - offset as i32 {
            Luma([FOREGROUND])
        } else {
            Luma([0])
        }
    })
}

fn map_binary(gray: &GrayImage, pred: impl Fn(u8) -> bool) -> GrayImage {
    let (w, h) = gray.dimensions();
    let mut out = GrayImage::new(w, h);
    for (src, dst) in gray.pixels().zip(out.pixels_mut()) {
        if pred(src.0[0]) {
            dst.0[0] = FOREGROUND;
        }
    }
    out
}

/// 평균/표준편차
pub fn mean_std(gray: &GrayImage) -> (f64, f64) {
    let n = (gray.width() as f64 * gray.height() as f64).max(1.0);
    let (sum, sum_sq) = gray.pixels().fold((0.0f64, 0.0f64), |(s, sq), p| {
        let v = p.0[0] as f64;
        (s + v, sq + v * v)
    });
    let mean = sum / n;
    let var = (sum_sq / n - mean * mean).max(0.0);
    (mean, var.sqrt())
}

/// 워터셰드 분할 설정
#[derive(Debug, Clone, Copy)]
pub struct WatershedParams {
    pub block_radius: u32,
    pub offset: u8,
    pub morph_radius: u8,
    /// 최대 거리 대비 시드 비율
    pub seed_ratio: f32,
}

/// 적응 임계값 → 열기 → 거리 변환 시드 → 마커 워터셰드
///
/// 영역별 이진 마스크를 면적 큰 순으로 반환한다.
pub fn watershed_regions(gray: &GrayImage, params: WatershedParams) -> Vec<GrayImage> {
    let blurred = gaussian_blur_f32(gray, 1.5);
    let binary = adaptive_threshold_inverse(&blurred, params.block_radius, params.offset);
    let foreground = if params.morph_radius > 0 {
        open(&binary, Norm::LInf, params.morph_radius)
    } else {
        binary
    };

    // distance_transform은 전경까지의 거리를 재므로 반전 마스크를 넣는다
    let background = map_binary(&foreground, |v| v == 0);
    let distance = distance_transform(&background, Norm::L1);
    let max_distance = foreground
        .pixels()
        .zip(distance.pixels())
        .filter(|(f, _)| f.0[0] == FOREGROUND)
        .map(|(_, d)| d.0[0])
        .max()
        .unwrap_or(0);
    if max_distance == 0 {
        return Vec::new();
    }

    let seed_level = ((max_distance as f32 * params.seed_ratio).round() as u8).max(1);
    let seeds = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let is_fg = foreground.get_pixel(x, y).0[0] == FOREGROUND;
        if is_fg && distance.get_pixel(x, y).0[0] >= seed_level {
            Luma([FOREGROUND])
        } else {
            Luma([0])
        }
    });
    let markers = connected_components(&seeds, Connectivity::Eight, Luma([0u8]));
    let labels = flood(&blurred, &foreground, markers);
    split_regions(&labels)
}

/// Sobel 기울기 위 우선순위 범람 — 전경 안에서만 라벨 확장
fn flood(
    gray: &GrayImage,
    foreground: &GrayImage,
    mut labels: ImageBuffer<Luma<u32>, Vec<u32>>,
) -> ImageBuffer<Luma<u32>, Vec<u32>> {
    let gradient = sobel_gradients(gray);
    let (w, h) = gray.dimensions();
    let mut heap = BinaryHeap::new();
    let mut seq: u64 = 0;

    for y in 0..h {
        for x in 0..w {
            if labels.get_pixel(x, y).0[0] != 0 {
                heap.push(Reverse((gradient.get_pixel(x, y).0[0], seq, x, y)));
                seq += 1;
            }
        }
    }

    while let Some(Reverse((_, _, x, y))) = heap.pop() {
        let label = labels.get_pixel(x, y).0[0];
        for (nx, ny) in neighbors4(x, y, w, h) {
            if labels.get_pixel(nx, ny).0[0] == 0 && foreground.get_pixel(nx, ny).0[0] == FOREGROUND {
                labels.put_pixel(nx, ny, Luma([label]));
                heap.push(Reverse((gradient.get_pixel(nx, ny).0[0], seq, nx, ny)));
                seq += 1;
            }
        }
    }
    labels
}

fn neighbors4(x: u32, y: u32, w: u32, h: u32) -> impl Iterator<Item = (u32, u32)> {
    let candidates = [
        (x.checked_sub(1), Some(y)),
        (x.checked_add(1).filter(|v| *v < w), Some(y)),
        (Some(x), y.checked_sub(1)),
        (Some(x), y.checked_add(1).filter(|v| *v < h)),
    ];
    candidates
        .into_iter()
        .filter_map(|(x, y)| Some((x?, y?)))
}

fn split_regions(labels: &ImageBuffer<Luma<u32>, Vec<u32>>) -> Vec<GrayImage> {
    let max_label = labels.pixels().map(|p| p.0[0]).max().unwrap_or(0) as usize;
    if max_label == 0 {
        return Vec::new();
    }
    let mut counts = vec![0usize; max_label + 1];
    for p in labels.pixels() {
        counts[p.0[0] as usize] += 1;
    }

    let mut order: Vec<u32> = (1..=max_label as u32).filter(|l| counts[*l as usize] > 0).collect();
    order.sort_by(|a, b| counts[*b as usize].cmp(&counts[*a as usize]));
    order.truncate(MAX_WATERSHED_REGIONS);

    let (w, h) = labels.dimensions();
    order
        .into_iter()
        .map(|label| {
            GrayImage::from_fn(w, h, |x, y| {
                if labels.get_pixel(x, y).0[0] == label {
                    Luma([FOREGROUND])
                } else {
                    Luma([0])
                }
            })
        })
        .collect()
}

/// Canny 엣지 → 닫기 — 바깥 윤곽이 병변 경계를 감싸는 마스크
pub fn edge_mask(gray: &GrayImage, morph_radius: u8) -> GrayImage {
    let blurred = gaussian_blur_f32(gray, 1.4);
    let edges = canny(&blurred, 20.0, 50.0);
    if morph_radius == 0 {
        return edges;
    }
    close(&edges, Norm::LInf, morph_radius)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn foreground_count(mask: &GrayImage) -> usize {
        mask.pixels().filter(|p| p.0[0] == FOREGROUND).count()
    }

    #[test]
    fn lab_reference_colors() {
        let lab = LabConverter::new();
        let (l_white, a_white) = lab.lightness_a([255, 255, 255]);
        assert!((l_white - 100.0).abs() < 0.5);
        assert!(a_white.abs() < 0.5);

        let (l_black, _) = lab.lightness_a([0, 0, 0]);
        assert!(l_black.abs() < 0.5);

        // 적색은 a* 양수
        let (_, a_red) = lab.lightness_a([200, 30, 30]);
        assert!(a_red > 40.0);
    }

    #[test]
    fn lab_mask_keeps_dark_brown_not_skin() {
        let lab = LabConverter::new();
        let mut rgb = RgbImage::from_pixel(20, 20, Rgb([220, 190, 170]));
        for y in 5..15 {
            for x in 5..15 {
                rgb.put_pixel(x, y, Rgb([90, 60, 40]));
            }
        }
        let mask = lab_mask(&rgb, &lab, 0.0, 55.0, -5.0);
        assert_eq!(foreground_count(&mask), 100);
        assert_eq!(mask.get_pixel(10, 10).0[0], FOREGROUND);
        assert_eq!(mask.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn clean_mask_removes_speckles() {
        let mut mask = GrayImage::new(40, 40);
        mask.put_pixel(3, 3, Luma([FOREGROUND]));
        for y in 15..30 {
            for x in 15..30 {
                mask.put_pixel(x, y, Luma([FOREGROUND]));
            }
        }
        let cleaned = clean_mask(&mask, 2);
        assert_eq!(cleaned.get_pixel(3, 3).0[0], 0);
        assert_eq!(cleaned.get_pixel(22, 22).0[0], FOREGROUND);
    }

    #[test]
    fn adaptive_threshold_finds_local_dark_spot() {
        let mut gray = GrayImage::from_pixel(60, 60, Luma([180]));
        for y in 25..35 {
            for x in 25..35 {
                gray.put_pixel(x, y, Luma([80]));
            }
        }
        let mask = adaptive_threshold_inverse(&gray, 10, 6);
        assert_eq!(mask.get_pixel(30, 30).0[0], FOREGROUND);
        assert_eq!(mask.get_pixel(5, 5).0[0], 0);
    }

    #[test]
    fn watershed_splits_touching_blobs() {
        let mut gray = GrayImage::from_pixel(120, 80, Luma([200]));
        for (cx, cy) in [(40.0f32, 40.0f32), (78.0, 40.0)] {
            for y in 0..80u32 {
                for x in 0..120u32 {
                    let d = ((x as f32 - cx).powi(2) + (y as f32 - cy).powi(2)).sqrt();
                    if d <= 20.0 {
                        gray.put_pixel(x, y, Luma([60]));
                    }
                }
            }
        }
        let params = WatershedParams {
            block_radius: 30,
            offset: 6,
            morph_radius: 1,
            seed_ratio: 0.7,
        };
        let regions = watershed_regions(&gray, params);
        assert!(regions.len() >= 2, "영역 {}개", regions.len());
    }

    #[test]
    fn flat_image_has_no_watershed_regions() {
        let gray = GrayImage::from_pixel(50, 50, Luma([128]));
        let params = WatershedParams {
            block_radius: 10,
            offset: 6,
            morph_radius: 2,
            seed_ratio: 0.5,
        };
        assert!(watershed_regions(&gray, params).is_empty());
    }

    #[test]
    fn mean_std_of_two_levels() {
        let gray = GrayImage::from_fn(10, 10, |x, _| if x < 5 { Luma([0]) } else { Luma([100]) });
        let (mean, std) = mean_std(&gray);
        assert!((mean - 50.0).abs() < 1e-9);
        assert!((std - 50.0).abs() < 1e-9);
    }
}
