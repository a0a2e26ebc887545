//! 프레임 전처리.
//!
//! ROI 크롭 + RGB/그레이스케일 변환 + fast_image_resize 기반 다운스케일.
//! 모든 중간 버퍼는 `BufferPool`에서 빌리고, 사용 후 `release`로 반납한다.

use fast_image_resize::{images::Image as FirImage, FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::{GrayImage, ImageBuffer, Pixel, RgbImage};
use skinsight_core::error::CoreError;
use skinsight_core::models::frame::{Frame, PixelFormat, Rect};
use skinsight_core::pool::BufferPool;
use tracing::trace;

/// 다운스케일 후 최소 변 길이
const MIN_SCALED_DIMENSION: u32 = 8;

/// 배율 적용 후 크기 (1.0 이상이면 원본 유지, 최소 8px)
pub fn scaled_dimensions(width: u32, height: u32, scale: f32) -> (u32, u32) {
    if scale >= 0.999 {
        return (width, height);
    }
    let scale_side = |side: u32| {
        ((side as f32 * scale).round() as u32)
            .max(MIN_SCALED_DIMENSION)
            .min(side)
    };
    (scale_side(width), scale_side(height))
}

/// ITU-R BT.601 휘도
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 299 + g as u32 * 587 + b as u32 * 114 + 500) / 1000) as u8
}

#[inline]
fn rgb_of(format: PixelFormat, px: &[u8]) -> [u8; 3] {
    match format {
        PixelFormat::Gray8 => [px[0], px[0], px[0]],
        PixelFormat::Rgb8 | PixelFormat::Rgba8 => [px[0], px[1], px[2]],
        PixelFormat::Bgra8 => [px[2], px[1], px[0]],
    }
}

fn check_rect(frame: &Frame, rect: Rect) -> Result<(), CoreError> {
    if rect.is_empty() || !rect.fits_within(frame.size()) {
        return Err(CoreError::InvalidFrame(format!(
            "ROI가 프레임 밖: {:?} (프레임 {}x{})",
            rect,
            frame.width(),
            frame.height()
        )));
    }
    Ok(())
}

/// `rect` 영역의 행 단위 원본 슬라이스 순회
fn for_each_row<'a>(
    frame: &'a Frame,
    rect: Rect,
    mut f: impl FnMut(usize, &'a [u8]),
) {
    let ch = frame.channels();
    let stride = frame.width() as usize * ch;
    let row_len = rect.w as usize * ch;
    let data = frame.data();
    for row in 0..rect.h as usize {
        let start = (rect.y as usize + row) * stride + rect.x as usize * ch;
        f(row, &data[start..start + row_len]);
    }
}

/// ROI 크롭 → RGB8
pub fn crop_rgb(frame: &Frame, rect: Rect, pool: &BufferPool) -> Result<RgbImage, CoreError> {
    check_rect(frame, rect)?;
    let format = frame.format();
    let ch = frame.channels();
    let out_stride = rect.w as usize * 3;
    let mut buf = pool.borrow(out_stride * rect.h as usize);

    for_each_row(frame, rect, |row, src| {
        let out_row = &mut buf[row * out_stride..(row + 1) * out_stride];
        for (px, out) in src.chunks_exact(ch).zip(out_row.chunks_exact_mut(3)) {
            out.copy_from_slice(&rgb_of(format, px));
        }
    });

    RgbImage::from_raw(rect.w, rect.h, buf)
        .ok_or_else(|| CoreError::ImageProcessing("RGB 버퍼 크기 불일치".to_string()))
}

/// ROI 크롭 → 그레이스케일
pub fn crop_gray(frame: &Frame, rect: Rect, pool: &BufferPool) -> Result<GrayImage, CoreError> {
    check_rect(frame, rect)?;
    let format = frame.format();
    let ch = frame.channels();
    let out_stride = rect.w as usize;
    let mut buf = pool.borrow(out_stride * rect.h as usize);

    for_each_row(frame, rect, |row, src| {
        let out_row = &mut buf[row * out_stride..(row + 1) * out_stride];
        for (px, out) in src.chunks_exact(ch).zip(out_row.iter_mut()) {
            let [r, g, b] = rgb_of(format, px);
            *out = luma(r, g, b);
        }
    });

    GrayImage::from_raw(rect.w, rect.h, buf)
        .ok_or_else(|| CoreError::ImageProcessing("그레이 버퍼 크기 불일치".to_string()))
}

/// RGB → 그레이스케일 (풀 버퍼 사용)
pub fn rgb_to_gray(image: &RgbImage, pool: &BufferPool) -> Result<GrayImage, CoreError> {
    let (w, h) = image.dimensions();
    let mut buf = pool.borrow(w as usize * h as usize);
    for (px, out) in image.pixels().zip(buf.iter_mut()) {
        let [r, g, b] = px.0;
        *out = luma(r, g, b);
    }
    GrayImage::from_raw(w, h, buf)
        .ok_or_else(|| CoreError::ImageProcessing("그레이 버퍼 크기 불일치".to_string()))
}

/// RGB 다운스케일 (배율 1.0이면 그대로 반환)
pub fn resize_rgb(image: RgbImage, scale: f32, pool: &BufferPool) -> Result<RgbImage, CoreError> {
    resize_buffer(image, scale, PixelType::U8x3, pool)
}

/// 그레이스케일 다운스케일 (배율 1.0이면 그대로 반환)
pub fn resize_gray(image: GrayImage, scale: f32, pool: &BufferPool) -> Result<GrayImage, CoreError> {
    resize_buffer(image, scale, PixelType::U8, pool)
}

fn resize_buffer<P>(
    image: ImageBuffer<P, Vec<u8>>,
    scale: f32,
    pixel_type: PixelType,
    pool: &BufferPool,
) -> Result<ImageBuffer<P, Vec<u8>>, CoreError>
where
    P: Pixel<Subpixel = u8>,
{
    let (src_w, src_h) = image.dimensions();
    let (dst_w, dst_h) = scaled_dimensions(src_w, src_h, scale);
    if (dst_w, dst_h) == (src_w, src_h) {
        return Ok(image);
    }

    let channels = P::CHANNEL_COUNT as usize;
    let src_image = FirImage::from_vec_u8(src_w, src_h, image.into_raw(), pixel_type)
        .map_err(|e| CoreError::ImageProcessing(format!("소스 이미지 생성 실패: {e}")))?;
    let dst_buf = pool.borrow(dst_w as usize * dst_h as usize * channels);
    let mut dst_image = FirImage::from_vec_u8(dst_w, dst_h, dst_buf, pixel_type)
        .map_err(|e| CoreError::ImageProcessing(format!("대상 이미지 생성 실패: {e}")))?;

    let mut resizer = Resizer::new();
    let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear));
    resizer
        .resize(&src_image, &mut dst_image, &options)
        .map_err(|e| CoreError::ImageProcessing(format!("리사이즈 실패: {e}")))?;

    pool.give_back(src_image.into_vec());
    trace!("다운스케일: {}x{} → {}x{}", src_w, src_h, dst_w, dst_h);

    ImageBuffer::from_raw(dst_w, dst_h, dst_image.into_vec())
        .ok_or_else(|| CoreError::ImageProcessing("결과 이미지 생성 실패".to_string()))
}

/// 처리 끝난 이미지 버퍼를 풀에 반납
pub fn release<P>(pool: &BufferPool, image: ImageBuffer<P, Vec<u8>>)
where
    P: Pixel<Subpixel = u8>,
{
    pool.give_back(image.into_raw());
}
