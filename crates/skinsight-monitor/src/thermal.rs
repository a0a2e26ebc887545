//! 온도 상태 어댑터.
//!
//! `ThermalProvider` 포트 구현. sysinfo 부품 온도 기반 상태 분류와
//! 온도 센서가 없는 환경용 no-op 제공자.

use async_trait::async_trait;
use skinsight_core::error::CoreError;
use skinsight_core::models::performance::ThermalState;
use skinsight_core::ports::thermal::ThermalProvider;
use sysinfo::Components;
use tracing::debug;

/// 부품 최고 온도(°C) → 온도 상태
pub fn classify_temperature(celsius: f32) -> ThermalState {
    if celsius < 60.0 {
        ThermalState::None
    } else if celsius < 70.0 {
        ThermalState::Light
    } else if celsius < 80.0 {
        ThermalState::Moderate
    } else if celsius < 90.0 {
        ThermalState::Severe
    } else if celsius < 100.0 {
        ThermalState::Critical
    } else {
        ThermalState::Emergency
    }
}

/// sysinfo 기반 온도 제공자 — `ThermalProvider` 포트 구현
#[derive(Debug, Default)]
pub struct SysInfoThermalProvider;

impl SysInfoThermalProvider {
    pub fn new() -> Self {
        Self
    }

    /// 현재 부품 온도 중 최고값
    fn max_temperature() -> Option<f32> {
        let components = Components::new_with_refreshed_list();
        components
            .list()
            .iter()
            .filter_map(|c| {
                let t: Option<f32> = c.temperature().into();
                t.filter(|v| v.is_finite())
            })
            .reduce(f32::max)
    }
}

#[async_trait]
impl ThermalProvider for SysInfoThermalProvider {
    async fn current_state(&self) -> Result<ThermalState, CoreError> {
        let max = tokio::task::spawn_blocking(Self::max_temperature)
            .await
            .map_err(|e| CoreError::Internal(format!("온도 조회 작업 실패: {e}")))?
            .ok_or_else(|| CoreError::ThermalUnavailable("온도 센서 없음".to_string()))?;

        let state = classify_temperature(max);
        debug!("부품 최고 온도 {:.1}°C → {:?}", max, state);
        Ok(state)
    }

    fn name(&self) -> &'static str {
        "sysinfo"
    }
}

/// 항상 제한 없음(`None`)을 보고하는 제공자
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopThermalProvider;

#[async_trait]
impl ThermalProvider for NoopThermalProvider {
    async fn current_state(&self) -> Result<ThermalState, CoreError> {
        Ok(ThermalState::None)
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
