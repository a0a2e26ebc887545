//! 온도 상태 포트.
//!
//! 구현: `skinsight-monitor` crate (sysinfo 부품 온도, no-op 폴백)

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::performance::ThermalState;

/// 기기 온도 상태 제공자
///
/// 생성 시점에 구현체를 선택한다. 조회 실패 시 호출자는
/// 제한 없는 기본 프로파일(`ThermalState::None`)로 폴백한다.
#[async_trait]
pub trait ThermalProvider: Send + Sync {
    /// 현재 온도 상태 조회
    async fn current_state(&self) -> Result<ThermalState, CoreError>;

    /// 로그용 제공자 이름
    fn name(&self) -> &'static str;
}
