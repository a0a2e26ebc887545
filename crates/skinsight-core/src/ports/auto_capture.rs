//! 자동 촬영 이벤트 포트.
//!
//! 호스트(화면/햅틱/음성 안내 레이어)가 구현하여 등록한다.

/// 카운트다운 막바지에 강해지는 피드백 신호
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FeedbackCue {
    Light,
    Medium,
    Strong,
}

impl FeedbackCue {
    /// 남은 초에 대응하는 피드백 강도
    pub fn for_remaining(seconds: u32) -> Self {
        match seconds {
            0 | 1 => Self::Strong,
            2 => Self::Medium,
            _ => Self::Light,
        }
    }
}

/// 자동 촬영 컨트롤러 리스너
///
/// 콜백은 컨트롤러의 이벤트 발행 잠금 안에서 호출된다.
/// 콜백 안에서 `is_countdown_active()` 같은 조회는 가능하지만,
/// 검증 결과 전달이나 취소 같은 상태 변경 호출은 하면 안 된다.
pub trait AutoCaptureListener: Send + Sync {
    /// 카운트다운 시작 (총 초)
    fn on_countdown_started(&self, seconds: u32);

    /// 카운트다운 틱 (남은 초)
    fn on_countdown_tick(&self, seconds: u32);

    /// 카운트다운 취소
    fn on_countdown_cancelled(&self);

    /// 자동 촬영 실행
    fn on_auto_capture(&self);

    /// 안정성 확인 시작
    fn on_stability_started(&self) {}

    /// 안정성 확인 중 조건 이탈
    fn on_stability_cancelled(&self) {}

    /// 햅틱/음성 피드백 신호
    fn on_feedback_cue(&self, _cue: FeedbackCue) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cues_escalate_near_zero() {
        assert_eq!(FeedbackCue::for_remaining(3), FeedbackCue::Light);
        assert_eq!(FeedbackCue::for_remaining(2), FeedbackCue::Medium);
        assert_eq!(FeedbackCue::for_remaining(1), FeedbackCue::Strong);
        assert!(FeedbackCue::Strong > FeedbackCue::Light);
    }
}
