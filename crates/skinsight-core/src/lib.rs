//! # skinsight-core
//!
//! SKINSIGHT 도메인 모델, 포트(trait) 정의, 에러 타입, 설정.
//! 모든 크레이트가 공유하는 핵심 타입과 인터페이스를 제공한다.
//!
//! ## 구조
//!
//! - [`models`] — 프레임/검출/품질/가이드/성능 데이터 구조체
//! - [`ports`] — 검출기, 온도, 메모리, 자동 촬영 리스너 포트
//! - [`error`] — 핵심 에러 타입 (thiserror)
//! - [`config`] — 가이드 파이프라인 설정 구조체
//! - [`config_manager`] — 설정 파일 + 환경 변수 레이어 관리
//! - [`pool`] — 재사용 이미지 버퍼 풀

pub mod config;
pub mod config_manager;
pub mod error;
pub mod models;
pub mod pool;
pub mod ports;
