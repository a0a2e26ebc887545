//! 비전(병변 검출) 포트.
//!
//! 구현: `skinsight-vision` crate (image, imageproc, fast_image_resize)

use crate::models::detection::DetectionCandidate;
use crate::models::frame::Frame;
use crate::models::performance::PerformanceProfile;
use crate::models::roi::RoiResult;

/// 병변 검출기 — 프레임의 ROI에서 최적 후보 하나를 찾는다.
///
/// 구현체는 내부 실패(퇴화 윤곽, 예상 밖 프레임 형태 등)를 에러로
/// 전파하지 않고 `None`을 반환해야 한다. 반환 좌표는 프레임 좌표계.
pub trait LesionDetector: Send + Sync {
    /// ROI 안에서 병변 후보 검출
    fn detect(
        &self,
        frame: &Frame,
        roi: &RoiResult,
        profile: &PerformanceProfile,
    ) -> Option<DetectionCandidate>;

    /// 로그용 검출기 이름
    fn name(&self) -> &'static str;
}
