//! 메모리 모니터링 포트.
//!
//! 구현: `skinsight-monitor` crate (sysinfo)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// 메모리 사용량 샘플
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySample {
    /// 사용 중인 메모리 (바이트)
    pub used_bytes: u64,
    /// 사용 가능한 최대 메모리 (바이트)
    pub max_bytes: u64,
}

impl MemorySample {
    /// 메모리 압력 (0.0 ~ 1.0)
    pub fn pressure(&self) -> f64 {
        if self.max_bytes == 0 {
            return 0.0;
        }
        (self.used_bytes as f64 / self.max_bytes as f64).clamp(0.0, 1.0)
    }
}

/// 메모리 사용량 측정
#[async_trait]
pub trait MemoryProbe: Send + Sync {
    /// 현재 메모리 사용량 샘플
    async fn sample(&self) -> Result<MemorySample, CoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pressure_is_clamped() {
        let sample = MemorySample {
            used_bytes: 3,
            max_bytes: 4,
        };
        assert!((sample.pressure() - 0.75).abs() < f64::EPSILON);

        let zero = MemorySample {
            used_bytes: 10,
            max_bytes: 0,
        };
        assert_eq!(zero.pressure(), 0.0);
    }
}
