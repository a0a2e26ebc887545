//! 가이드 파이프라인 설정 구조체.
//!
//! 검출/품질/검증/ROI/자동 촬영/성능 조절값을 정의한다.
//! 생성 시점에 구성 협력자(`ConfigManager` 또는 호스트)가 주입하며,
//! 모든 섹션은 누락 시 기본값으로 채워진다.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::CoreError;

/// 최상위 가이드 설정
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuidanceConfig {
    /// 병변 검출 설정
    #[serde(default)]
    pub detector: DetectorConfig,
    /// 품질 분석 설정
    #[serde(default)]
    pub quality: QualityConfig,
    /// 촬영 검증 설정
    #[serde(default)]
    pub validator: ValidatorConfig,
    /// ROI 설정
    #[serde(default)]
    pub roi: RoiConfig,
    /// 자동 촬영 설정
    #[serde(default)]
    pub auto_capture: AutoCaptureConfig,
    /// 성능/온도 조절 설정
    #[serde(default)]
    pub performance: PerformanceConfig,
    /// 로깅 설정
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GuidanceConfig {
    /// 기본 설정 생성
    pub fn default_config() -> Self {
        Self::default()
    }

    /// 설정값 범위 검증
    pub fn validate(&self) -> Result<(), CoreError> {
        self.detector.validate()?;
        self.quality.validate()?;
        self.validator.validate()?;
        self.roi.validate()?;
        self.auto_capture.validate()?;
        self.performance.validate()?;
        Ok(())
    }
}

fn ensure_unit(field: &str, value: f32) -> Result<(), CoreError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(CoreError::validation(field, format!("0~1 범위 밖: {value}")));
    }
    Ok(())
}

fn ensure_ordered(field: &str, low: f64, high: f64) -> Result<(), CoreError> {
    if low >= high {
        return Err(CoreError::validation(
            field,
            format!("하한({low})이 상한({high}) 이상"),
        ));
    }
    Ok(())
}

// ============================================================
// 검출 설정
// ============================================================

/// 검출기 모드
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorMode {
    /// 다중 방법 검출기 (기본)
    #[default]
    Full,
    /// 경량 중심 고정 검출기
    Centered,
}

/// 병변 검출 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// 검출기 모드
    #[serde(default)]
    pub mode: DetectorMode,
    /// 병변 마스크 L* 하한
    #[serde(default)]
    pub lightness_min: f32,
    /// 병변 마스크 L* 상한
    #[serde(default = "default_lightness_max")]
    pub lightness_max: f32,
    /// 병변 마스크 a* 하한 (푸른/녹색 그림자 제외)
    #[serde(default = "default_a_min")]
    pub a_min: f32,
    /// 모폴로지 커널 반경 (L∞)
    #[serde(default = "default_morph_radius")]
    pub morph_radius: u8,
    /// ROI 대비 최소 면적 비율
    #[serde(default = "default_min_area_fraction")]
    pub min_area_fraction: f64,
    /// ROI 대비 최대 면적 비율
    #[serde(default = "default_max_area_fraction")]
    pub max_area_fraction: f64,
    /// 절대 최소 면적 (픽셀)
    #[serde(default = "default_min_area_pixels")]
    pub min_area_pixels: f64,
    /// 최소 원형도 (4π·A/P²)
    #[serde(default = "default_min_compactness")]
    pub min_compactness: f64,
    /// 최소 견고도 (A/볼록껍질 면적)
    #[serde(default = "default_min_solidity")]
    pub min_solidity: f64,
    /// 최대 종횡비 (긴 변/짧은 변)
    #[serde(default = "default_max_aspect_ratio")]
    pub max_aspect_ratio: f64,
    /// 면적 근접 보너스 기준 ROI 비율
    #[serde(default = "default_ideal_area_fraction")]
    pub ideal_area_fraction: f64,
    /// 적응 임계값 블록 반경
    #[serde(default = "default_adaptive_block_radius")]
    pub adaptive_block_radius: u32,
    /// 적응 임계값 오프셋 (평균 - C)
    #[serde(default = "default_adaptive_offset")]
    pub adaptive_offset: u8,
    /// 워터셰드 시드 비율 (최대 거리 대비)
    #[serde(default = "default_seed_ratio")]
    pub seed_ratio: f32,
    /// 중심 고정 검출기 — 허용 중심 오프셋 (ROI 대각선 절반 대비)
    #[serde(default = "default_centered_max_offset")]
    pub centered_max_offset: f32,
}

fn default_lightness_max() -> f32 {
    55.0
}
fn default_a_min() -> f32 {
    -5.0
}
fn default_morph_radius() -> u8 {
    2
}
fn default_min_area_fraction() -> f64 {
    0.002
}
fn default_max_area_fraction() -> f64 {
    0.6
}
fn default_min_area_pixels() -> f64 {
    64.0
}
fn default_min_compactness() -> f64 {
    0.3
}
fn default_min_solidity() -> f64 {
    0.75
}
fn default_max_aspect_ratio() -> f64 {
    3.0
}
fn default_ideal_area_fraction() -> f64 {
    0.08
}
fn default_adaptive_block_radius() -> u32 {
    15
}
fn default_adaptive_offset() -> u8 {
    6
}
fn default_seed_ratio() -> f32 {
    0.5
}
fn default_centered_max_offset() -> f32 {
    0.6
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            mode: DetectorMode::Full,
            lightness_min: 0.0,
            lightness_max: default_lightness_max(),
            a_min: default_a_min(),
            morph_radius: default_morph_radius(),
            min_area_fraction: default_min_area_fraction(),
            max_area_fraction: default_max_area_fraction(),
            min_area_pixels: default_min_area_pixels(),
            min_compactness: default_min_compactness(),
            min_solidity: default_min_solidity(),
            max_aspect_ratio: default_max_aspect_ratio(),
            ideal_area_fraction: default_ideal_area_fraction(),
            adaptive_block_radius: default_adaptive_block_radius(),
            adaptive_offset: default_adaptive_offset(),
            seed_ratio: default_seed_ratio(),
            centered_max_offset: default_centered_max_offset(),
        }
    }
}

impl DetectorConfig {
    fn validate(&self) -> Result<(), CoreError> {
        ensure_ordered(
            "detector.lightness",
            self.lightness_min as f64,
            self.lightness_max as f64,
        )?;
        ensure_ordered(
            "detector.area_fraction",
            self.min_area_fraction,
            self.max_area_fraction,
        )?;
        ensure_unit("detector.seed_ratio", self.seed_ratio)?;
        if self.max_aspect_ratio < 1.0 {
            return Err(CoreError::validation(
                "detector.max_aspect_ratio",
                "1 이상이어야 함",
            ));
        }
        Ok(())
    }
}

// ============================================================
// 품질 분석 설정
// ============================================================

/// 품질 분석 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityConfig {
    /// 라플라시안 분산 흐림 임계값 (고급 모드)
    #[serde(default = "default_laplacian_blur_threshold")]
    pub laplacian_blur_threshold: f64,
    /// Sobel 평균 기울기 흐림 임계값 (기본 모드)
    #[serde(default = "default_sobel_blur_threshold")]
    pub sobel_blur_threshold: f64,
    /// 밝은 픽셀 기준값
    #[serde(default = "default_bright_pixel_threshold")]
    pub bright_pixel_threshold: u8,
    /// 어두운 픽셀 기준값
    #[serde(default = "default_dark_pixel_threshold")]
    pub dark_pixel_threshold: u8,
    /// 과노출 판정 밝은 픽셀 비율
    #[serde(default = "default_overexposed_ratio")]
    pub overexposed_ratio: f32,
    /// 노출 부족 판정 어두운 픽셀 비율
    #[serde(default = "default_underexposed_ratio")]
    pub underexposed_ratio: f32,
}

fn default_laplacian_blur_threshold() -> f64 {
    100.0
}
fn default_sobel_blur_threshold() -> f64 {
    20.0
}
fn default_bright_pixel_threshold() -> u8 {
    245
}
fn default_dark_pixel_threshold() -> u8 {
    40
}
fn default_overexposed_ratio() -> f32 {
    0.10
}
fn default_underexposed_ratio() -> f32 {
    0.15
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            laplacian_blur_threshold: default_laplacian_blur_threshold(),
            sobel_blur_threshold: default_sobel_blur_threshold(),
            bright_pixel_threshold: default_bright_pixel_threshold(),
            dark_pixel_threshold: default_dark_pixel_threshold(),
            overexposed_ratio: default_overexposed_ratio(),
            underexposed_ratio: default_underexposed_ratio(),
        }
    }
}

impl QualityConfig {
    fn validate(&self) -> Result<(), CoreError> {
        ensure_unit("quality.overexposed_ratio", self.overexposed_ratio)?;
        ensure_unit("quality.underexposed_ratio", self.underexposed_ratio)?;
        ensure_ordered(
            "quality.pixel_threshold",
            self.dark_pixel_threshold as f64,
            self.bright_pixel_threshold as f64,
        )?;
        Ok(())
    }
}

// ============================================================
// 촬영 검증 설정
// ============================================================

/// 촬영 검증 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// 최소 검출 신뢰도
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,
    /// 중앙 정렬 허용치 (가이드 짧은 변 절반 대비 거리)
    #[serde(default = "default_center_tolerance")]
    pub center_tolerance: f32,
    /// 최소 병변/가이드 면적 비율 (미만이면 TOO_FAR)
    #[serde(default = "default_min_area_ratio")]
    pub min_area_ratio: f32,
    /// 최대 병변/가이드 면적 비율 (초과하면 TOO_CLOSE)
    #[serde(default = "default_max_area_ratio")]
    pub max_area_ratio: f32,
    /// 기하 조건(중앙/크기) 검사 사용 여부 — false면 단순 모드
    #[serde(default = "default_true")]
    pub geometry_checks: bool,
}

fn default_min_confidence() -> f32 {
    0.6
}
fn default_center_tolerance() -> f32 {
    0.25
}
fn default_min_area_ratio() -> f32 {
    0.05
}
fn default_max_area_ratio() -> f32 {
    0.70
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            center_tolerance: default_center_tolerance(),
            min_area_ratio: default_min_area_ratio(),
            max_area_ratio: default_max_area_ratio(),
            geometry_checks: true,
        }
    }
}

impl ValidatorConfig {
    fn validate(&self) -> Result<(), CoreError> {
        ensure_unit("validator.min_confidence", self.min_confidence)?;
        if self.center_tolerance <= 0.0 {
            return Err(CoreError::validation(
                "validator.center_tolerance",
                "0보다 커야 함",
            ));
        }
        ensure_ordered(
            "validator.area_ratio",
            self.min_area_ratio as f64,
            self.max_area_ratio as f64,
        )?;
        Ok(())
    }
}

// ============================================================
// ROI 설정
// ============================================================

/// ROI 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoiConfig {
    /// 최근 검출 위치 기반 적응 모드
    #[serde(default = "default_true")]
    pub adaptive: bool,
    /// 검출 중심 이력 크기
    #[serde(default = "default_roi_history_size")]
    pub history_size: usize,
}

fn default_roi_history_size() -> usize {
    10
}

impl Default for RoiConfig {
    fn default() -> Self {
        Self {
            adaptive: true,
            history_size: default_roi_history_size(),
        }
    }
}

impl RoiConfig {
    fn validate(&self) -> Result<(), CoreError> {
        if self.history_size == 0 {
            return Err(CoreError::validation("roi.history_size", "1 이상이어야 함"));
        }
        Ok(())
    }
}

// ============================================================
// 자동 촬영 설정
// ============================================================

/// 자동 촬영 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoCaptureConfig {
    /// 자동 촬영 활성화
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 카운트다운 길이 (초)
    #[serde(default = "default_countdown_secs")]
    pub countdown_secs: u32,
    /// 안정성 확인 시간 (밀리초)
    #[serde(default = "default_stability_window_ms")]
    pub stability_window_ms: u64,
    /// 안정성 확인 시작에 필요한 연속 유효 프레임 수
    #[serde(default = "default_stability_frames")]
    pub stability_frames: u32,
    /// 연속 판정 최대 간격 (밀리초), 초과 시 카운터 1로 리셋
    #[serde(default = "default_frame_gap_ms")]
    pub frame_gap_ms: u64,
    /// 강제 촬영 허용
    #[serde(default = "default_true")]
    pub allow_force_capture: bool,
}

fn default_countdown_secs() -> u32 {
    3
}
fn default_stability_window_ms() -> u64 {
    1_000
}
fn default_stability_frames() -> u32 {
    2
}
fn default_frame_gap_ms() -> u64 {
    2_000
}

impl Default for AutoCaptureConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            countdown_secs: default_countdown_secs(),
            stability_window_ms: default_stability_window_ms(),
            stability_frames: default_stability_frames(),
            frame_gap_ms: default_frame_gap_ms(),
            allow_force_capture: true,
        }
    }
}

impl AutoCaptureConfig {
    pub fn stability_window(&self) -> Duration {
        Duration::from_millis(self.stability_window_ms)
    }

    pub fn frame_gap(&self) -> Duration {
        Duration::from_millis(self.frame_gap_ms)
    }

    fn validate(&self) -> Result<(), CoreError> {
        if self.countdown_secs == 0 {
            return Err(CoreError::validation(
                "auto_capture.countdown_secs",
                "1 이상이어야 함",
            ));
        }
        if self.stability_frames < 2 {
            return Err(CoreError::validation(
                "auto_capture.stability_frames",
                "2 이상이어야 함",
            ));
        }
        Ok(())
    }
}

// ============================================================
// 성능/온도 조절 설정
// ============================================================

/// 성능/온도 조절 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// 목표 프레임 처리 시간 (밀리초) — ROI 배율 선택 기준
    #[serde(default = "default_target_processing_ms")]
    pub target_processing_ms: f64,
    /// 처리 시간 이력 크기
    #[serde(default = "default_processing_history")]
    pub processing_history: usize,
    /// 메모리 샘플 이력 크기
    #[serde(default = "default_memory_history")]
    pub memory_history: usize,
    /// MINIMAL 등급 평균 처리 시간 (밀리초)
    #[serde(default = "default_minimal_ms")]
    pub minimal_processing_ms: f64,
    /// LOW 등급 평균 처리 시간 (밀리초)
    #[serde(default = "default_low_ms")]
    pub low_processing_ms: f64,
    /// MEDIUM 등급 평균 처리 시간 (밀리초)
    #[serde(default = "default_medium_ms")]
    pub medium_processing_ms: f64,
    /// MINIMAL 등급 메모리 압력
    #[serde(default = "default_minimal_memory")]
    pub minimal_memory_pressure: f64,
    /// LOW 등급 메모리 압력
    #[serde(default = "default_low_memory")]
    pub low_memory_pressure: f64,
    /// MEDIUM 등급 메모리 압력
    #[serde(default = "default_medium_memory")]
    pub medium_memory_pressure: f64,
    /// 온도 폴링 간격 (밀리초)
    #[serde(default = "default_thermal_poll_ms")]
    pub thermal_poll_ms: u64,
    /// 메모리 폴링 간격 (밀리초)
    #[serde(default = "default_memory_poll_ms")]
    pub memory_poll_ms: u64,
    /// 프로세스 메모리 상한 (MB). 0이면 시스템 전체 메모리 기준
    #[serde(default)]
    pub memory_budget_mb: u64,
    /// 시작 시 절전 모드
    #[serde(default)]
    pub power_save: bool,
}

fn default_target_processing_ms() -> f64 {
    100.0
}
fn default_processing_history() -> usize {
    10
}
fn default_memory_history() -> usize {
    5
}
fn default_minimal_ms() -> f64 {
    500.0
}
fn default_low_ms() -> f64 {
    400.0
}
fn default_medium_ms() -> f64 {
    300.0
}
fn default_minimal_memory() -> f64 {
    0.90
}
fn default_low_memory() -> f64 {
    0.80
}
fn default_medium_memory() -> f64 {
    0.70
}
fn default_thermal_poll_ms() -> u64 {
    5_000
}
fn default_memory_poll_ms() -> u64 {
    2_000
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            target_processing_ms: default_target_processing_ms(),
            processing_history: default_processing_history(),
            memory_history: default_memory_history(),
            minimal_processing_ms: default_minimal_ms(),
            low_processing_ms: default_low_ms(),
            medium_processing_ms: default_medium_ms(),
            minimal_memory_pressure: default_minimal_memory(),
            low_memory_pressure: default_low_memory(),
            medium_memory_pressure: default_medium_memory(),
            thermal_poll_ms: default_thermal_poll_ms(),
            memory_poll_ms: default_memory_poll_ms(),
            memory_budget_mb: 0,
            power_save: false,
        }
    }
}

impl PerformanceConfig {
    pub fn thermal_poll_interval(&self) -> Duration {
        Duration::from_millis(self.thermal_poll_ms)
    }

    pub fn memory_poll_interval(&self) -> Duration {
        Duration::from_millis(self.memory_poll_ms)
    }

    /// 프로세스 메모리 상한 (바이트), 미설정이면 `None`
    pub fn memory_budget_bytes(&self) -> Option<u64> {
        (self.memory_budget_mb > 0).then(|| self.memory_budget_mb.saturating_mul(1_048_576))
    }

    fn validate(&self) -> Result<(), CoreError> {
        ensure_ordered(
            "performance.processing_ms",
            self.medium_processing_ms,
            self.low_processing_ms,
        )?;
        ensure_ordered(
            "performance.processing_ms",
            self.low_processing_ms,
            self.minimal_processing_ms,
        )?;
        ensure_ordered(
            "performance.memory_pressure",
            self.medium_memory_pressure,
            self.low_memory_pressure,
        )?;
        ensure_ordered(
            "performance.memory_pressure",
            self.low_memory_pressure,
            self.minimal_memory_pressure,
        )?;
        if self.processing_history == 0 || self.memory_history == 0 {
            return Err(CoreError::validation(
                "performance.history",
                "1 이상이어야 함",
            ));
        }
        if self.target_processing_ms <= 0.0 {
            return Err(CoreError::validation(
                "performance.target_processing_ms",
                "0보다 커야 함",
            ));
        }
        if self.thermal_poll_ms == 0 {
            return Err(CoreError::validation(
                "performance.thermal_poll_ms",
                "0보다 커야 함",
            ));
        }
        if self.memory_poll_ms == 0 {
            return Err(CoreError::validation(
                "performance.memory_poll_ms",
                "0보다 커야 함",
            ));
        }
        Ok(())
    }
}

// ============================================================
// 로깅 설정
// ============================================================

/// 로깅 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 기본 로그 필터 (`RUST_LOG`가 우선)
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_true() -> bool {
    true
}
