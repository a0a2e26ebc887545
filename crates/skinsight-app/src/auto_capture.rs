//! 자동 촬영 컨트롤러.
//!
//! READY 판정이 연속으로 들어오면 안정성 확인 타이머를 걸고, 그 동안
//! 조건이 유지되면 1초 단위 카운트다운 뒤 촬영 이벤트를 발행한다.
//! READY가 아닌 판정이 오면 즉시 취소한다.
//!
//! 타이머는 tokio 태스크다. 마감 시각은 타이머를 거는 시점에 정해진다.
//! 세대 토큰과 `JoinHandle::abort`로 무효화하며,
//! 이벤트 발행 잠금(`emit`)이 콜백과 취소를 직렬화하므로 취소 호출이
//! 반환된 뒤에는 이전 타이머의 콜백이 발행되지 않는다.
//! 잠금 순서는 항상 `emit` → `state`.

use parking_lot::Mutex;
use skinsight_core::config::AutoCaptureConfig;
use skinsight_core::error::CoreError;
use skinsight_core::models::guide::ValidationResult;
use skinsight_core::ports::auto_capture::{AutoCaptureListener, FeedbackCue};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

const TICK: Duration = Duration::from_secs(1);

/// 컨트롤러 단계
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePhase {
    Idle,
    StabilityChecking,
    CountingDown { remaining: u32 },
}

#[derive(Debug)]
struct ControllerState {
    enabled: bool,
    phase: CapturePhase,
    consecutive_valid: u32,
    last_valid_at: Option<Instant>,
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

impl ControllerState {
    /// 타이머 무효화 + 카운터 초기화, 이전 단계 반환
    fn reset(&mut self) -> CapturePhase {
        self.generation = self.generation.wrapping_add(1);
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.consecutive_valid = 0;
        self.last_valid_at = None;
        std::mem::replace(&mut self.phase, CapturePhase::Idle)
    }
}

struct Inner {
    config: AutoCaptureConfig,
    listener: Arc<dyn AutoCaptureListener>,
    runtime: Handle,
    emit: Mutex<()>,
    state: Mutex<ControllerState>,
}

/// 취소된 단계에 맞는 리스너 알림
fn notify_cancelled(listener: &dyn AutoCaptureListener, previous: CapturePhase) {
    match previous {
        CapturePhase::StabilityChecking => listener.on_stability_cancelled(),
        CapturePhase::CountingDown { .. } => listener.on_countdown_cancelled(),
        CapturePhase::Idle => {}
    }
}

impl Inner {
    /// 안정성 확인 타이머 시작 (state 잠금 보유 상태에서 호출)
    fn arm_stability(self: &Arc<Self>, state: &mut ControllerState) {
        state.generation = state.generation.wrapping_add(1);
        let generation = state.generation;
        state.phase = CapturePhase::StabilityChecking;

        let inner = Arc::clone(self);
        let deadline = Instant::now() + self.config.stability_window();
        let handle = self.runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            inner.stability_elapsed(generation);
        });
        if let Some(previous) = state.timer.replace(handle) {
            previous.abort();
        }
    }

    /// 카운트다운 타이머 시작 (state 잠금 보유 상태에서 호출)
    fn arm_countdown(self: &Arc<Self>, state: &mut ControllerState) -> u32 {
        state.generation = state.generation.wrapping_add(1);
        let generation = state.generation;
        let seconds = self.config.countdown_secs.max(1);
        state.phase = CapturePhase::CountingDown { remaining: seconds };

        let inner = Arc::clone(self);
        let started = Instant::now();
        let handle = self.runtime.spawn(async move {
            let mut remaining = seconds;
            let mut elapsed = 0u32;
            while remaining > 0 {
                elapsed += 1;
                tokio::time::sleep_until(started + TICK * elapsed).await;
                remaining -= 1;
                if !inner.countdown_tick(generation, remaining) {
                    break;
                }
            }
        });
        if let Some(previous) = state.timer.replace(handle) {
            previous.abort();
        }
        seconds
    }

    fn stability_elapsed(self: &Arc<Self>, generation: u64) {
        let _emit = self.emit.lock();
        let seconds = {
            let mut state = self.state.lock();
            if state.generation != generation || state.phase != CapturePhase::StabilityChecking {
                return;
            }
            // 현재 태스크 자신의 핸들이므로 abort하지 않고 분리
            state.timer = None;
            self.arm_countdown(&mut state)
        };
        info!("자동 촬영 카운트다운 시작: {}초", seconds);
        self.listener.on_countdown_started(seconds);
        self.listener.on_feedback_cue(FeedbackCue::for_remaining(seconds));
    }

    /// 카운트다운 1초 경과. 계속 진행해야 하면 `true`
    fn countdown_tick(&self, generation: u64, remaining: u32) -> bool {
        let _emit = self.emit.lock();
        {
            let mut state = self.state.lock();
            if state.generation != generation
                || !matches!(state.phase, CapturePhase::CountingDown { .. })
            {
                return false;
            }
            if remaining > 0 {
                state.phase = CapturePhase::CountingDown { remaining };
            } else {
                state.timer = None;
                state.reset();
            }
        }

        if remaining > 0 {
            debug!("카운트다운: {}초 남음", remaining);
            self.listener.on_countdown_tick(remaining);
            self.listener.on_feedback_cue(FeedbackCue::for_remaining(remaining));
            true
        } else {
            info!("자동 촬영 실행");
            self.listener.on_auto_capture();
            false
        }
    }
}

/// 자동 촬영 컨트롤러
///
/// 가이드 세션마다 하나씩 만든다. tokio 런타임 안에서 생성해야 한다.
pub struct AutoCaptureController {
    inner: Arc<Inner>,
}

impl AutoCaptureController {
    pub fn new(
        config: AutoCaptureConfig,
        listener: Arc<dyn AutoCaptureListener>,
    ) -> Result<Self, CoreError> {
        let runtime = Handle::try_current()
            .map_err(|e| CoreError::Internal(format!("tokio 런타임 없음: {e}")))?;
        Ok(Self::with_runtime(config, listener, runtime))
    }

    /// 타이머를 돌릴 런타임 직접 지정
    pub fn with_runtime(
        config: AutoCaptureConfig,
        listener: Arc<dyn AutoCaptureListener>,
        runtime: Handle,
    ) -> Self {
        let enabled = config.enabled;
        Self {
            inner: Arc::new(Inner {
                config,
                listener,
                runtime,
                emit: Mutex::new(()),
                state: Mutex::new(ControllerState {
                    enabled,
                    phase: CapturePhase::Idle,
                    consecutive_valid: 0,
                    last_valid_at: None,
                    generation: 0,
                    timer: None,
                }),
            }),
        }
    }

    /// 프레임 검증 결과 전달
    pub fn on_validation(&self, result: &ValidationResult) {
        let inner = &self.inner;
        let _emit = inner.emit.lock();

        if !result.is_ready() {
            let previous = {
                let mut state = inner.state.lock();
                if !state.enabled {
                    return;
                }
                state.reset()
            };
            if previous != CapturePhase::Idle {
                info!("자동 촬영 취소: 상태={}", result.state.as_str());
                notify_cancelled(inner.listener.as_ref(), previous);
            }
            return;
        }

        let started = {
            let mut state = inner.state.lock();
            if !state.enabled {
                return;
            }
            let now = Instant::now();
            let within_gap = state
                .last_valid_at
                .is_some_and(|last| now.duration_since(last) <= inner.config.frame_gap());
            state.consecutive_valid = if within_gap {
                state.consecutive_valid.saturating_add(1)
            } else {
                1
            };
            state.last_valid_at = Some(now);

            if state.phase == CapturePhase::Idle
                && state.consecutive_valid >= inner.config.stability_frames
            {
                inner.arm_stability(&mut state);
                true
            } else {
                false
            }
        };

        if started {
            debug!("안정성 확인 시작");
            inner.listener.on_stability_started();
        }
    }

    /// 카운트다운 즉시 시작 — 진행 중인 카운트다운은 먼저 취소
    pub fn start_countdown(&self) {
        let inner = &self.inner;
        let _emit = inner.emit.lock();
        let (previous, seconds) = {
            let mut state = inner.state.lock();
            if !state.enabled {
                return;
            }
            let previous = state.reset();
            (previous, inner.arm_countdown(&mut state))
        };
        notify_cancelled(inner.listener.as_ref(), previous);
        info!("자동 촬영 카운트다운 시작: {}초", seconds);
        inner.listener.on_countdown_started(seconds);
        inner.listener.on_feedback_cue(FeedbackCue::for_remaining(seconds));
    }

    /// 상태 기계를 건너뛴 즉시 촬영 (실행했으면 `true`)
    pub fn force_capture(&self) -> bool {
        let inner = &self.inner;
        let _emit = inner.emit.lock();
        let previous = {
            let mut state = inner.state.lock();
            if !state.enabled || !inner.config.allow_force_capture {
                return false;
            }
            state.reset()
        };
        notify_cancelled(inner.listener.as_ref(), previous);
        info!("강제 촬영 실행");
        inner.listener.on_auto_capture();
        true
    }

    /// 진행 중인 안정성 확인/카운트다운 취소
    pub fn cancel(&self) {
        let inner = &self.inner;
        let _emit = inner.emit.lock();
        let previous = inner.state.lock().reset();
        if previous != CapturePhase::Idle {
            info!("자동 촬영 수동 취소");
            notify_cancelled(inner.listener.as_ref(), previous);
        }
    }

    /// 자동 촬영 활성/비활성
    ///
    /// 비활성화하면 진행 중인 단계를 취소하고 리스너에 알린다.
    pub fn set_enabled(&self, enabled: bool) {
        let inner = &self.inner;
        let _emit = inner.emit.lock();
        let previous = {
            let mut state = inner.state.lock();
            if state.enabled == enabled {
                return;
            }
            state.enabled = enabled;
            if enabled {
                CapturePhase::Idle
            } else {
                state.reset()
            }
        };
        info!("자동 촬영 {}", if enabled { "활성화" } else { "비활성화" });
        notify_cancelled(inner.listener.as_ref(), previous);
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.state.lock().enabled
    }

    pub fn is_countdown_active(&self) -> bool {
        matches!(
            self.inner.state.lock().phase,
            CapturePhase::CountingDown { .. }
        )
    }

    pub fn phase(&self) -> CapturePhase {
        self.inner.state.lock().phase
    }

    pub fn consecutive_valid(&self) -> u32 {
        self.inner.state.lock().consecutive_valid
    }
}

impl Drop for AutoCaptureController {
    fn drop(&mut self) {
        let inner = &self.inner;
        let _emit = inner.emit.lock();
        let previous = inner.state.lock().reset();
        if previous != CapturePhase::Idle {
            debug!("컨트롤러 해제로 자동 촬영 취소");
            notify_cancelled(inner.listener.as_ref(), previous);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skinsight_core::models::guide::GuideState;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        StabilityStarted,
        StabilityCancelled,
        Started(u32),
        Tick(u32),
        Cancelled,
        Captured,
        Cue(FeedbackCue),
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<Event>>,
    }

    impl Recorder {
        fn events(&self) -> Vec<Event> {
            self.events.lock().clone()
        }

        /// 피드백 신호를 뺀 이벤트
        fn milestones(&self) -> Vec<Event> {
            self.events()
                .into_iter()
                .filter(|e| !matches!(e, Event::Cue(_)))
                .collect()
        }

        fn push(&self, event: Event) {
            self.events.lock().push(event);
        }
    }

    impl AutoCaptureListener for Recorder {
        fn on_countdown_started(&self, seconds: u32) {
            self.push(Event::Started(seconds));
        }
        fn on_countdown_tick(&self, seconds: u32) {
            self.push(Event::Tick(seconds));
        }
        fn on_countdown_cancelled(&self) {
            self.push(Event::Cancelled);
        }
        fn on_auto_capture(&self) {
            self.push(Event::Captured);
        }
        fn on_stability_started(&self) {
            self.push(Event::StabilityStarted);
        }
        fn on_stability_cancelled(&self) {
            self.push(Event::StabilityCancelled);
        }
        fn on_feedback_cue(&self, cue: FeedbackCue) {
            self.push(Event::Cue(cue));
        }
    }

    fn result(state: GuideState) -> ValidationResult {
        ValidationResult {
            state,
            can_capture: state.allows_capture(),
            message: String::new(),
            confidence: 0.9,
            distance_from_center: 0.0,
            area_ratio: 0.2,
        }
    }

    fn controller() -> (AutoCaptureController, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let controller =
            AutoCaptureController::new(AutoCaptureConfig::default(), recorder.clone()).unwrap();
        (controller, recorder)
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    async fn advance(duration: Duration) {
        tokio::time::advance(duration).await;
        settle().await;
    }

    #[tokio::test(start_paused = true)]
    async fn ready_frames_lead_to_capture() {
        let (c, rec) = controller();
        c.on_validation(&result(GuideState::Ready));
        assert_eq!(c.phase(), CapturePhase::Idle);
        c.on_validation(&result(GuideState::Ready));
        assert_eq!(c.phase(), CapturePhase::StabilityChecking);

        advance(Duration::from_millis(1_000)).await;
        assert!(c.is_countdown_active());
        assert_eq!(c.phase(), CapturePhase::CountingDown { remaining: 3 });

        advance(TICK).await;
        advance(TICK).await;
        assert_eq!(c.phase(), CapturePhase::CountingDown { remaining: 1 });
        advance(TICK).await;

        assert_eq!(c.phase(), CapturePhase::Idle);
        assert!(!c.is_countdown_active());
        assert_eq!(c.consecutive_valid(), 0);
        assert_eq!(
            rec.milestones(),
            vec![
                Event::StabilityStarted,
                Event::Started(3),
                Event::Tick(2),
                Event::Tick(1),
                Event::Captured,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn feedback_cues_escalate() {
        let (c, rec) = controller();
        c.start_countdown();
        for _ in 0..3 {
            advance(TICK).await;
        }
        let cues: Vec<Event> = rec
            .events()
            .into_iter()
            .filter(|e| matches!(e, Event::Cue(_)))
            .collect();
        assert_eq!(
            cues,
            vec![
                Event::Cue(FeedbackCue::Light),
                Event::Cue(FeedbackCue::Medium),
                Event::Cue(FeedbackCue::Strong),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn regression_during_stability_cancels() {
        let (c, rec) = controller();
        c.on_validation(&result(GuideState::Ready));
        c.on_validation(&result(GuideState::Ready));
        c.on_validation(&result(GuideState::Blurry));
        assert_eq!(c.phase(), CapturePhase::Idle);

        advance(Duration::from_secs(5)).await;
        assert_eq!(
            rec.milestones(),
            vec![Event::StabilityStarted, Event::StabilityCancelled]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn regression_during_countdown_cancels_synchronously() {
        let (c, rec) = controller();
        c.start_countdown();
        advance(TICK).await;
        c.on_validation(&result(GuideState::Centering));
        assert!(!c.is_countdown_active());

        advance(Duration::from_secs(5)).await;
        assert_eq!(
            rec.milestones(),
            vec![Event::Started(3), Event::Tick(2), Event::Cancelled]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn restarting_countdown_cancels_previous() {
        let (c, rec) = controller();
        c.start_countdown();
        advance(TICK).await;
        c.start_countdown();
        for _ in 0..3 {
            advance(TICK).await;
        }
        let milestones = rec.milestones();
        let started = milestones.iter().filter(|e| matches!(e, Event::Started(_))).count();
        let ended = milestones
            .iter()
            .filter(|e| matches!(e, Event::Cancelled | Event::Captured))
            .count();
        assert_eq!(started, 2);
        assert_eq!(ended, 2);
        assert_eq!(
            milestones,
            vec![
                Event::Started(3),
                Event::Tick(2),
                Event::Cancelled,
                Event::Started(3),
                Event::Tick(2),
                Event::Tick(1),
                Event::Captured,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn gap_resets_consecutive_counter() {
        let (c, _rec) = controller();
        c.on_validation(&result(GuideState::Ready));
        advance(Duration::from_millis(2_500)).await;
        c.on_validation(&result(GuideState::Ready));
        assert_eq!(c.consecutive_valid(), 1);
        assert_eq!(c.phase(), CapturePhase::Idle);

        advance(Duration::from_millis(500)).await;
        c.on_validation(&result(GuideState::Ready));
        assert_eq!(c.consecutive_valid(), 2);
        assert_eq!(c.phase(), CapturePhase::StabilityChecking);
    }

    #[tokio::test(start_paused = true)]
    async fn ready_during_countdown_does_not_restart() {
        let (c, rec) = controller();
        c.start_countdown();
        c.on_validation(&result(GuideState::Ready));
        c.on_validation(&result(GuideState::Ready));
        c.on_validation(&result(GuideState::Ready));
        assert_eq!(c.phase(), CapturePhase::CountingDown { remaining: 3 });
        assert_eq!(
            rec.milestones()
                .iter()
                .filter(|e| matches!(e, Event::Started(_)))
                .count(),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn force_capture_bypasses_machine() {
        let (c, rec) = controller();
        c.start_countdown();
        assert!(c.force_capture());
        assert!(!c.is_countdown_active());
        advance(Duration::from_secs(5)).await;
        assert_eq!(
            rec.milestones(),
            vec![Event::Started(3), Event::Cancelled, Event::Captured]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn force_capture_respects_config() {
        let recorder = Arc::new(Recorder::default());
        let c = AutoCaptureController::new(
            AutoCaptureConfig {
                allow_force_capture: false,
                ..Default::default()
            },
            recorder.clone(),
        )
        .unwrap();
        assert!(!c.force_capture());
        assert!(recorder.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn disabling_ends_started_countdown_once() {
        let (c, rec) = controller();
        c.start_countdown();
        c.set_enabled(false);
        assert!(!c.is_enabled());
        assert!(!c.is_countdown_active());
        advance(Duration::from_secs(10)).await;
        assert_eq!(rec.milestones(), vec![Event::Started(3), Event::Cancelled]);

        // 이미 비활성이면 추가 알림 없음
        c.set_enabled(false);
        assert_eq!(rec.milestones().len(), 2);

        // 비활성 상태에서는 판정 무시
        c.on_validation(&result(GuideState::Ready));
        c.on_validation(&result(GuideState::Ready));
        assert_eq!(c.phase(), CapturePhase::Idle);
        assert!(!c.force_capture());
    }

    #[tokio::test(start_paused = true)]
    async fn disabling_during_stability_notifies_stability_cancel() {
        let (c, rec) = controller();
        c.on_validation(&result(GuideState::Ready));
        c.on_validation(&result(GuideState::Ready));
        c.set_enabled(false);
        advance(Duration::from_secs(5)).await;
        assert_eq!(
            rec.milestones(),
            vec![Event::StabilityStarted, Event::StabilityCancelled]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_controller_cancels_countdown() {
        let (c, rec) = controller();
        c.start_countdown();
        advance(TICK).await;
        drop(c);
        advance(Duration::from_secs(5)).await;
        assert_eq!(
            rec.milestones(),
            vec![Event::Started(3), Event::Tick(2), Event::Cancelled]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn timers_keep_schedule_when_polled_late() {
        let (c, rec) = controller();
        c.start_countdown();
        // 타이머 태스크가 한 번도 폴링되기 전에 시간이 지난 경우
        tokio::time::advance(TICK).await;
        settle().await;
        assert_eq!(c.phase(), CapturePhase::CountingDown { remaining: 2 });

        tokio::time::advance(TICK * 2).await;
        settle().await;
        assert_eq!(c.phase(), CapturePhase::Idle);
        assert_eq!(
            rec.milestones(),
            vec![
                Event::Started(3),
                Event::Tick(2),
                Event::Tick(1),
                Event::Captured,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn non_ready_while_idle_is_silent() {
        let (c, rec) = controller();
        c.on_validation(&result(GuideState::Searching));
        c.cancel();
        assert!(rec.events().is_empty());
    }

    #[test]
    fn construction_requires_runtime() {
        let recorder = Arc::new(Recorder::default());
        assert!(AutoCaptureController::new(AutoCaptureConfig::default(), recorder).is_err());
    }
}
