//! 도메인 모델.
//!
//! 파이프라인 단계 사이를 오가는 데이터 구조체. 모두 프레임 단위로
//! 새로 생성되는 불변 값이다.

pub mod detection;
pub mod frame;
pub mod guide;
pub mod performance;
pub mod quality;
pub mod roi;
