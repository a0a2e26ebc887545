//! # skinsight-monitor
//!
//! 성능/온도 조절 어댑터.
//!
//! - [`governor`]: 처리 시간/메모리/절전 휴리스틱과 온도 상태로 활성 프로파일 선택
//! - [`thermal`]: `ThermalProvider` 구현 (sysinfo 부품 온도, no-op)
//! - [`memory`]: `MemoryProbe` 구현 (sysinfo)
//! - [`watch`]: 주기 감시 루프

pub mod governor;
pub mod memory;
pub mod thermal;
pub mod watch;
