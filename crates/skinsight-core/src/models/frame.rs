//! 카메라 프레임 모델.
//!
//! 외부 카메라 협력자가 넘겨주는 불변 픽셀 버퍼와
//! 파이프라인 전반에서 쓰는 좌표/영역 타입을 정의.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// 처리 가능한 최소 프레임 변 길이 (픽셀)
pub const MIN_FRAME_DIMENSION: u32 = 16;

/// 픽셀 포맷
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 8비트 그레이스케일
    Gray8,
    /// 8비트 RGB
    Rgb8,
    /// 8비트 RGBA
    Rgba8,
    /// 8비트 BGRA (모바일 카메라 버퍼)
    Bgra8,
}

impl PixelFormat {
    /// 픽셀당 채널 수
    pub fn channels(self) -> usize {
        match self {
            Self::Gray8 => 1,
            Self::Rgb8 => 3,
            Self::Rgba8 | Self::Bgra8 => 4,
        }
    }
}

/// 2D 좌표 (프레임 또는 ROI 좌표계)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// 두 점 사이 유클리드 거리
    pub fn distance(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// 프레임 크기
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// 전체 픽셀 수
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// 중심 좌표
    pub fn center(&self) -> Point {
        Point::new(self.width as f32 / 2.0, self.height as f32 / 2.0)
    }
}

/// 직사각형 영역 (ROI, 바운딩 박스, 가이드 영역)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// 영역 면적 (픽셀)
    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }

    /// 영역 중심
    pub fn center(&self) -> Point {
        Point::new(
            self.x as f32 + self.w as f32 / 2.0,
            self.y as f32 + self.h as f32 / 2.0,
        )
    }

    /// 오른쪽 경계 (exclusive)
    pub fn right(&self) -> u32 {
        self.x + self.w
    }

    /// 아래쪽 경계 (exclusive)
    pub fn bottom(&self) -> u32 {
        self.y + self.h
    }

    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// 주어진 크기 안에 완전히 포함되는지
    pub fn fits_within(&self, size: Size) -> bool {
        self.right() <= size.width && self.bottom() <= size.height
    }
}

/// 카메라 프레임 (불변 뷰)
///
/// 외부 협력자가 소유하며, 코어는 한 번의 처리 호출 동안만 읽는다.
#[derive(Debug, Clone)]
pub struct Frame {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
    index: u64,
}

impl Frame {
    /// 새 프레임 생성 — 버퍼 길이가 `width * height * channels`와 일치해야 함
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        data: Vec<u8>,
        index: u64,
    ) -> Result<Self, CoreError> {
        let expected = width as usize * height as usize * format.channels();
        if data.len() != expected {
            return Err(CoreError::InvalidFrame(format!(
                "버퍼 길이 불일치: expected={expected}, actual={}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            format,
            data,
            index,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn channels(&self) -> usize {
        self.format.channels()
    }

    /// 단조 증가 프레임 번호
    pub fn index(&self) -> u64 {
        self.index
    }

    /// 원시 픽셀 버퍼
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// 파이프라인 처리 가능 여부 검사
    pub fn ensure_processable(&self) -> Result<(), CoreError> {
        if self.width < MIN_FRAME_DIMENSION || self.height < MIN_FRAME_DIMENSION {
            return Err(CoreError::InvalidFrame(format!(
                "프레임이 너무 작음: {}x{} (최소 {MIN_FRAME_DIMENSION})",
                self.width, self.height
            )));
        }
        Ok(())
    }
}
