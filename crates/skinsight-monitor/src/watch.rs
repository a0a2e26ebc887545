//! 주기 감시 루프.
//!
//! 온도/메모리 어댑터를 주기적으로 조회해 조절기에 전달한다.
//! 종료 신호(`watch::Receiver<bool>`)가 `true`가 되면 루프를 빠져나간다.

use skinsight_core::models::performance::ThermalState;
use skinsight_core::ports::monitor::MemoryProbe;
use skinsight_core::ports::thermal::ThermalProvider;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// 감시 주기 하한 (`tokio::time::interval`은 0 주기를 허용하지 않음)
const MIN_PERIOD: Duration = Duration::from_millis(1);

use crate::governor::PerformanceGovernor;

/// 온도 상태 감시 시작
///
/// 조회 실패 시 제한 없는 상태(`ThermalState::None`)를 적용한다.
pub fn spawn_thermal_watch(
    provider: Arc<dyn ThermalProvider>,
    governor: Arc<PerformanceGovernor>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let period = period.max(MIN_PERIOD);
    tokio::spawn(async move {
        info!("온도 감시 시작: provider={}, 주기={}ms", provider.name(), period.as_millis());
        let mut interval = tokio::time::interval(period);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let state = match provider.current_state().await {
                        Ok(state) => state,
                        Err(e) => {
                            warn!("온도 상태 조회 실패, 기본 상태 적용: {e}");
                            ThermalState::None
                        }
                    };
                    governor.on_thermal_state(state);
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("온도 감시 종료");
    })
}

/// 메모리 압력 감시 시작
pub fn spawn_memory_watch(
    probe: Arc<dyn MemoryProbe>,
    governor: Arc<PerformanceGovernor>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let period = period.max(MIN_PERIOD);
    tokio::spawn(async move {
        info!("메모리 감시 시작: 주기={}ms", period.as_millis());
        let mut interval = tokio::time::interval(period);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match probe.sample().await {
                        Ok(sample) => {
                            let pressure = sample.pressure();
                            debug!("메모리 압력: {:.2}", pressure);
                            governor.record_memory_pressure(pressure);
                        }
                        Err(e) => warn!("메모리 샘플 실패: {e}"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("메모리 감시 종료");
    })
}
