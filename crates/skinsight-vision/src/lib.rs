//! # skinsight-vision
//!
//! 프레임 단위 비전 처리 크레이트.
//! ROI 선택, 병변 검출(다중 방법/중심 고정), 품질 분석, 촬영 검증을 담당한다.
//! 이미지 연산은 image/imageproc, 다운스케일은 fast_image_resize를 사용한다.

pub mod centered;
pub mod detector;
pub mod geometry;
pub mod preprocess;
pub mod quality;
pub mod roi;
pub mod segmentation;
pub mod validator;
