//! # skinsight-app
//!
//! 가이드 파이프라인 조립 레이어. 어댑터 crate들을 DI로 연결한다.
//!
//! - [`pipeline`]: 프레임 1장 처리 (프로파일 → ROI → 검출/품질 → 검증)
//! - [`auto_capture`]: 안정성 확인 + 취소 가능한 카운트다운
//! - [`session`]: 프레임 제출, 결과 브로드캐스트, 주기 감시 와이어링
//! - [`logging`]: tracing 구독자 초기화

pub mod auto_capture;
pub mod logging;
pub mod pipeline;
pub mod session;
