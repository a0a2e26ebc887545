//! SKINSIGHT 핵심 에러 타입.
//!
//! 프레임 처리 경로의 에러는 컴포넌트 경계에서 "미검출"/기본 품질 결과로
//! 변환되며, 호스트에게 전파되지 않는다. 설정 로드 등 초기화 경로만
//! `Result<_, CoreError>`를 호출자에게 반환한다.

use thiserror::Error;

/// 코어 레이어 에러.
#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 설정값 오류
    #[error("설정 에러: {0}")]
    Config(String),

    /// 필드 유효성 검증 실패
    #[error("유효성 검증 실패 — {field}: {message}")]
    Validation {
        /// 검증 실패한 필드명
        field: String,
        /// 실패 사유
        message: String,
    },

    /// 잘못된 입력 프레임 (크기 부족, 버퍼 길이 불일치 등)
    #[error("잘못된 프레임: {0}")]
    InvalidFrame(String),

    /// 수치적으로 퇴화된 기하 (면적 0 모멘트, 둘레 0 등)
    #[error("퇴화된 윤곽: {0}")]
    DegenerateGeometry(String),

    /// 이미지 처리 실패 (리사이즈, 변환 등)
    #[error("이미지 처리 에러: {0}")]
    ImageProcessing(String),

    /// 온도 상태 조회 실패
    #[error("온도 상태 조회 불가: {0}")]
    ThermalUnavailable(String),

    /// 내부 에러 (예상치 못한 상황)
    #[error("내부 에러: {0}")]
    Internal(String),

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// 유효성 검증 에러 생성 헬퍼
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}
