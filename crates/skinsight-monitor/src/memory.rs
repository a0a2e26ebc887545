//! 메모리 사용량 어댑터.
//!
//! `MemoryProbe` 포트 구현. 현재 프로세스의 상주 메모리를 상한 대비로
//! 측정한다. 상한을 지정하지 않으면 시스템 전체 메모리가 상한이다.

use async_trait::async_trait;
use skinsight_core::config::PerformanceConfig;
use skinsight_core::error::CoreError;
use skinsight_core::ports::monitor::{MemoryProbe, MemorySample};
use std::sync::Mutex;
use sysinfo::{Pid, ProcessesToUpdate, System};
use tracing::debug;

/// sysinfo 기반 프로세스 메모리 측정기 — `MemoryProbe` 포트 구현
pub struct SysInfoMemoryProbe {
    sys: Mutex<System>,
    pid: Pid,
    budget_bytes: Option<u64>,
}

impl SysInfoMemoryProbe {
    /// 시스템 전체 메모리를 상한으로 사용
    pub fn new() -> Self {
        Self::with_budget(None)
    }

    /// 프로세스 메모리 상한(바이트) 지정
    pub fn with_budget(budget_bytes: Option<u64>) -> Self {
        Self {
            sys: Mutex::new(System::new()),
            pid: Pid::from_u32(std::process::id()),
            budget_bytes: budget_bytes.filter(|b| *b > 0),
        }
    }

    /// `performance.memory_budget_mb` 설정으로 생성
    pub fn from_config(config: &PerformanceConfig) -> Self {
        Self::with_budget(config.memory_budget_bytes())
    }

    pub fn budget_bytes(&self) -> Option<u64> {
        self.budget_bytes
    }
}

impl Default for SysInfoMemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemoryProbe for SysInfoMemoryProbe {
    async fn sample(&self) -> Result<MemorySample, CoreError> {
        let mut sys = self
            .sys
            .lock()
            .map_err(|e| CoreError::Internal(format!("시스템 잠금 실패: {e}")))?;
        sys.refresh_processes(ProcessesToUpdate::Some(&[self.pid]), true);

        let used_bytes = sys
            .process(self.pid)
            .map(|p| p.memory())
            .ok_or_else(|| CoreError::Internal(format!("프로세스 정보 없음: pid={}", self.pid)))?;

        let max_bytes = match self.budget_bytes {
            Some(budget) => budget,
            None => {
                sys.refresh_memory();
                sys.total_memory()
            }
        };

        let sample = MemorySample {
            used_bytes,
            max_bytes,
        };
        debug!(
            "프로세스 메모리: {}/{}MB ({:.0}%)",
            sample.used_bytes / 1_048_576,
            sample.max_bytes / 1_048_576,
            sample.pressure() * 100.0
        );
        Ok(sample)
    }
}
