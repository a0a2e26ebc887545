//! 성능/온도 조절기.
//!
//! 처리 시간, 메모리 압력, 절전 모드로 계산한 휴리스틱 등급과
//! 온도 상태 콜백 중 마지막으로 바뀐 쪽이 활성 프로파일을 정한다.
//! 두 축을 병합하지 않는다. 각 축은 자기 값이 바뀔 때만 발행한다.

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use skinsight_core::config::PerformanceConfig;
use skinsight_core::models::performance::{
    PerformanceLevel, PerformanceProfile, PerformanceStatus, ProfileSource, ThermalState,
};
use skinsight_core::models::roi::pick_scale;
use skinsight_core::pool::BufferPool;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info};

/// 휴리스틱 등급 분류 (가장 심한 조건부터)
pub fn classify(
    config: &PerformanceConfig,
    average_ms: f64,
    memory_pressure: f64,
    power_save: bool,
) -> PerformanceLevel {
    if memory_pressure >= config.minimal_memory_pressure
        || average_ms >= config.minimal_processing_ms
    {
        PerformanceLevel::Minimal
    } else if power_save
        || memory_pressure >= config.low_memory_pressure
        || average_ms >= config.low_processing_ms
    {
        PerformanceLevel::Low
    } else if memory_pressure >= config.medium_memory_pressure
        || average_ms >= config.medium_processing_ms
    {
        PerformanceLevel::Medium
    } else {
        PerformanceLevel::High
    }
}

fn push_bounded(window: &mut VecDeque<f64>, value: f64, cap: usize) {
    if window.len() >= cap {
        window.pop_front();
    }
    window.push_back(value);
}

fn mean(window: &VecDeque<f64>) -> f64 {
    if window.is_empty() {
        return 0.0;
    }
    window.iter().sum::<f64>() / window.len() as f64
}

#[derive(Debug)]
struct GovernorState {
    processing_ms: VecDeque<f64>,
    memory: VecDeque<f64>,
    power_save: bool,
    /// 마지막 휴리스틱 분류값
    heuristic_level: PerformanceLevel,
    /// 마지막 온도 상태
    thermal_state: ThermalState,
    /// 활성 등급 (보고용)
    level: PerformanceLevel,
    source: ProfileSource,
    frames_recorded: u64,
}

/// 활성 성능 프로파일 관리자
///
/// 프로파일은 `Arc` 스냅샷으로 통째 교체되므로 읽는 쪽은 잠금 없이
/// 일관된 프로파일을 본다.
#[derive(Debug)]
pub struct PerformanceGovernor {
    config: PerformanceConfig,
    active: RwLock<Arc<PerformanceProfile>>,
    state: Mutex<GovernorState>,
    pool: Arc<BufferPool>,
}

impl PerformanceGovernor {
    pub fn new(config: PerformanceConfig, pool: Arc<BufferPool>) -> Self {
        let initial = PerformanceLevel::High.profile();
        pool.set_capacity(initial.pool_size);
        let power_save = config.power_save;

        let governor = Self {
            active: RwLock::new(Arc::new(initial)),
            state: Mutex::new(GovernorState {
                processing_ms: VecDeque::with_capacity(config.processing_history),
                memory: VecDeque::with_capacity(config.memory_history),
                power_save: false,
                heuristic_level: PerformanceLevel::High,
                thermal_state: ThermalState::None,
                level: PerformanceLevel::High,
                source: ProfileSource::Initial,
                frames_recorded: 0,
            }),
            config,
            pool,
        };
        if power_save {
            governor.set_power_save(true);
        }
        governor
    }

    /// 현재 활성 프로파일 스냅샷
    pub fn profile(&self) -> Arc<PerformanceProfile> {
        self.active.read().clone()
    }

    pub fn level(&self) -> PerformanceLevel {
        self.state.lock().level
    }

    /// 이 프레임을 처리해야 하는지 (프레임 스킵)
    pub fn should_process(&self, frame_index: u64) -> bool {
        self.profile().should_process(frame_index)
    }

    pub fn pool(&self) -> Arc<BufferPool> {
        self.pool.clone()
    }

    /// 프레임 처리 시간 기록 후 휴리스틱 재계산
    pub fn record_processing_time(&self, elapsed_ms: f64) {
        let mut state = self.state.lock();
        push_bounded(
            &mut state.processing_ms,
            elapsed_ms.max(0.0),
            self.config.processing_history,
        );
        state.frames_recorded += 1;
        self.reclassify(&mut state);
    }

    /// 메모리 압력 샘플 기록 (0.0 ~ 1.0) 후 휴리스틱 재계산
    pub fn record_memory_pressure(&self, pressure: f64) {
        let mut state = self.state.lock();
        let value = if pressure.is_finite() {
            pressure.clamp(0.0, 1.0)
        } else {
            0.0
        };
        push_bounded(&mut state.memory, value, self.config.memory_history);
        self.reclassify(&mut state);
    }

    pub fn set_power_save(&self, enabled: bool) {
        let mut state = self.state.lock();
        if state.power_save == enabled {
            return;
        }
        state.power_save = enabled;
        info!("절전 모드 변경: {}", enabled);
        self.reclassify(&mut state);
    }

    /// 온도 상태 콜백 — 상태가 바뀔 때만 프로파일 교체
    pub fn on_thermal_state(&self, thermal: ThermalState) {
        let mut state = self.state.lock();
        if state.thermal_state == thermal {
            return;
        }
        info!("온도 상태 변경: {:?} → {:?}", state.thermal_state, thermal);
        state.thermal_state = thermal;
        self.publish(&mut state, thermal.profile(), thermal.level(), ProfileSource::Thermal);
    }

    pub fn average_processing_ms(&self) -> f64 {
        mean(&self.state.lock().processing_ms)
    }

    pub fn memory_pressure(&self) -> f64 {
        mean(&self.state.lock().memory)
    }

    /// 처리 시간 기반 권장 ROI 배율 (활성 프로파일 배율 이하)
    pub fn suggested_roi_scale(&self) -> f32 {
        let profile_scale = self.profile().roi_scale;
        let state = self.state.lock();
        if state.processing_ms.is_empty() {
            return profile_scale;
        }
        let suggested = pick_scale(mean(&state.processing_ms), self.config.target_processing_ms);
        suggested.min(profile_scale)
    }

    /// 진단용 상태 스냅샷
    pub fn status(&self) -> PerformanceStatus {
        let profile = *self.profile();
        let state = self.state.lock();
        PerformanceStatus {
            timestamp: Utc::now(),
            level: state.level,
            thermal_state: state.thermal_state,
            source: state.source,
            profile,
            average_processing_ms: mean(&state.processing_ms),
            memory_pressure: mean(&state.memory),
            power_save: state.power_save,
            frames_recorded: state.frames_recorded,
            pool: self.pool.stats(),
        }
    }

    fn reclassify(&self, state: &mut GovernorState) {
        let level = classify(
            &self.config,
            mean(&state.processing_ms),
            mean(&state.memory),
            state.power_save,
        );
        if level == state.heuristic_level {
            return;
        }
        debug!("휴리스틱 등급 변경: {:?} → {:?}", state.heuristic_level, level);
        state.heuristic_level = level;
        self.publish(state, level.profile(), level, ProfileSource::Heuristic);
    }

    fn publish(
        &self,
        state: &mut GovernorState,
        profile: PerformanceProfile,
        level: PerformanceLevel,
        source: ProfileSource,
    ) {
        *self.active.write() = Arc::new(profile);
        self.pool.set_capacity(profile.pool_size);
        state.level = level;
        state.source = source;
        info!(
            "성능 프로파일 교체: level={:?}, source={:?}, res={:.2}, skip={}, pool={}",
            level, source, profile.resolution_scale, profile.frame_skip_rate, profile.pool_size
        );
    }
}
