//! 성능/온도 프로파일 모델.
//!
//! 성능 등급(`PerformanceLevel`)과 온도 상태(`ThermalState`)는 각각
//! 고정 프로파일 테이블을 인덱싱한다. 모든 열거값에 항목이 있으므로
//! 조회는 실패하지 않는다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 성능 등급 (Minimal < Low < Medium < High)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PerformanceLevel {
    Minimal,
    Low,
    Medium,
    High,
}

impl PerformanceLevel {
    /// 등급별 고정 프로파일
    pub fn profile(self) -> PerformanceProfile {
        match self {
            Self::High => PerformanceProfile {
                quality_multiplier: 1.0,
                frame_skip_rate: 0,
                resolution_scale: 1.0,
                max_concurrent_ops: 4,
                advanced_filters: true,
                roi_enabled: true,
                roi_scale: 0.8,
                pool_size: 8,
            },
            Self::Medium => PerformanceProfile {
                quality_multiplier: 0.75,
                frame_skip_rate: 1,
                resolution_scale: 0.75,
                max_concurrent_ops: 2,
                advanced_filters: true,
                roi_enabled: true,
                roi_scale: 0.7,
                pool_size: 6,
            },
            Self::Low => PerformanceProfile {
                quality_multiplier: 0.5,
                frame_skip_rate: 2,
                resolution_scale: 0.5,
                max_concurrent_ops: 2,
                advanced_filters: false,
                roi_enabled: true,
                roi_scale: 0.6,
                pool_size: 4,
            },
            Self::Minimal => PerformanceProfile {
                quality_multiplier: 0.25,
                frame_skip_rate: 4,
                resolution_scale: 0.35,
                max_concurrent_ops: 1,
                advanced_filters: false,
                roi_enabled: true,
                roi_scale: 0.5,
                pool_size: 2,
            },
        }
    }
}

/// 기기 온도 상태 (None < Light < Moderate < Severe < Critical < Emergency)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThermalState {
    None,
    Light,
    Moderate,
    Severe,
    Critical,
    Emergency,
}

impl ThermalState {
    /// 온도 상태별 고정 프로파일
    pub fn profile(self) -> PerformanceProfile {
        match self {
            Self::None => PerformanceLevel::High.profile(),
            Self::Light => PerformanceProfile {
                quality_multiplier: 0.9,
                frame_skip_rate: 0,
                resolution_scale: 0.9,
                max_concurrent_ops: 3,
                advanced_filters: true,
                roi_enabled: true,
                roi_scale: 0.8,
                pool_size: 8,
            },
            Self::Moderate => PerformanceLevel::Medium.profile(),
            Self::Severe => PerformanceLevel::Low.profile(),
            Self::Critical => PerformanceLevel::Minimal.profile(),
            Self::Emergency => PerformanceProfile {
                quality_multiplier: 0.1,
                frame_skip_rate: 9,
                resolution_scale: 0.25,
                max_concurrent_ops: 1,
                advanced_filters: false,
                roi_enabled: true,
                roi_scale: 0.4,
                pool_size: 1,
            },
        }
    }

    /// 상태 보고용 대응 성능 등급
    pub fn level(self) -> PerformanceLevel {
        match self {
            Self::None | Self::Light => PerformanceLevel::High,
            Self::Moderate => PerformanceLevel::Medium,
            Self::Severe => PerformanceLevel::Low,
            Self::Critical | Self::Emergency => PerformanceLevel::Minimal,
        }
    }
}

/// 처리 품질 조절값 묶음 (교체 시 통째로 바뀜, 부분 변경 없음)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceProfile {
    /// 처리 품질 배수 (0.0 ~ 1.0)
    pub quality_multiplier: f32,
    /// 프레임 스킵 비율 (N이면 N+1 프레임마다 1개 처리)
    pub frame_skip_rate: u32,
    /// 이미지 해상도 배율 (0.0 ~ 1.0)
    pub resolution_scale: f32,
    /// 최대 동시 작업 수
    pub max_concurrent_ops: usize,
    /// 고급 필터/폴백 검출 사용 여부
    pub advanced_filters: bool,
    /// ROI 크롭 사용 여부
    pub roi_enabled: bool,
    /// ROI 배율 (0.0 ~ 1.0)
    pub roi_scale: f32,
    /// 버퍼 풀 최대 크기
    pub pool_size: usize,
}

impl PerformanceProfile {
    /// 이 프로파일에서 해당 프레임을 처리해야 하는지
    pub fn should_process(&self, frame_index: u64) -> bool {
        frame_index % (self.frame_skip_rate as u64 + 1) == 0
    }
}

impl Default for PerformanceProfile {
    fn default() -> Self {
        PerformanceLevel::High.profile()
    }
}

/// 현재 프로파일을 결정한 신호
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileSource {
    /// 초기값
    Initial,
    /// 처리 시간/메모리/절전 모드 휴리스틱
    Heuristic,
    /// 온도 상태 콜백
    Thermal,
}

/// 진단용 성능/온도 상태 스냅샷 (외부 메트릭 협력자 소비)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceStatus {
    /// 스냅샷 시각
    pub timestamp: DateTime<Utc>,
    /// 현재 성능 등급
    pub level: PerformanceLevel,
    /// 마지막 온도 상태
    pub thermal_state: ThermalState,
    /// 현재 프로파일 결정 신호
    pub source: ProfileSource,
    /// 현재 프로파일
    pub profile: PerformanceProfile,
    /// 평균 처리 시간 (밀리초)
    pub average_processing_ms: f64,
    /// 평균 메모리 압력 (0.0 ~ 1.0)
    pub memory_pressure: f64,
    /// 절전 모드 여부
    pub power_save: bool,
    /// 기록된 처리 시간 샘플 수
    pub frames_recorded: u64,
    /// 버퍼 풀 통계
    pub pool: PoolStats,
}

/// 버퍼 풀 통계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// 풀에 보관 중인 버퍼 수
    pub available: usize,
    /// 최대 보관 수
    pub capacity: usize,
    /// 재사용 횟수
    pub hits: u64,
    /// 신규 할당 횟수
    pub misses: u64,
    /// 풀이 가득 차 버린 횟수
    pub dropped: u64,
}
