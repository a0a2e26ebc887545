//! skinsight-vision 성능 벤치마크
//!
//! 실행: cargo bench -p skinsight-vision
//!
//! 벤치마크 대상:
//! - 병변 검출 (MultiMethodDetector, CenteredDetector)
//! - 품질 분석 (QualityAnalyzer)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use skinsight_core::config::{DetectorConfig, QualityConfig, RoiConfig};
use skinsight_core::models::frame::{Frame, PixelFormat};
use skinsight_core::models::performance::PerformanceLevel;
use skinsight_core::pool::BufferPool;
use skinsight_core::ports::vision::LesionDetector;
use skinsight_vision::centered::CenteredDetector;
use skinsight_vision::detector::MultiMethodDetector;
use skinsight_vision::quality::QualityAnalyzer;
use skinsight_vision::roi::RoiSelector;
use std::sync::Arc;

/// 피부톤 + 질감 노이즈 + 중앙 병변 프레임
fn create_lesion_frame(width: u32, height: u32) -> Frame {
    let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
    let radius = width.min(height) as f32 / 8.0;
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            let noise = ((x.wrapping_mul(31) ^ y.wrapping_mul(17)) % 33) as i32 - 16;
            let d = ((x as f32 - cx).powi(2) + (y as f32 - cy).powi(2)).sqrt();
            let base = if d <= radius { [90, 60, 40] } else { [220, 190, 170] };
            for c in base {
                data.push((c + noise).clamp(0, 255) as u8);
            }
            data.push(255);
        }
    }
    Frame::new(width, height, PixelFormat::Rgba8, data, 0).unwrap()
}

fn bench_detectors(c: &mut Criterion) {
    let mut group = c.benchmark_group("lesion_detection");
    let pool = Arc::new(BufferPool::new(8));
    let multi = MultiMethodDetector::new(DetectorConfig::default(), pool.clone());
    let centered = CenteredDetector::new(DetectorConfig::default(), pool);
    let selector = RoiSelector::new(&RoiConfig::default());

    for (width, height) in [(640, 480), (1280, 720)] {
        let frame = create_lesion_frame(width, height);
        group.throughput(Throughput::Elements((width * height) as u64));

        for level in [PerformanceLevel::High, PerformanceLevel::Low] {
            let profile = level.profile();
            let roi = selector.compute_roi(frame.size(), profile.roi_scale);
            let id = format!("{}x{}/{:?}", width, height, level);

            group.bench_with_input(BenchmarkId::new("multi_method", &id), &frame, |b, frame| {
                b.iter(|| black_box(multi.detect(frame, &roi, &profile)));
            });
            group.bench_with_input(BenchmarkId::new("centered", &id), &frame, |b, frame| {
                b.iter(|| black_box(centered.detect(frame, &roi, &profile)));
            });
        }
    }

    group.finish();
}

fn bench_quality(c: &mut Criterion) {
    let mut group = c.benchmark_group("quality_analysis");
    let analyzer = QualityAnalyzer::new(QualityConfig::default(), Arc::new(BufferPool::new(4)));
    let frame = create_lesion_frame(1280, 720);

    for level in [PerformanceLevel::High, PerformanceLevel::Low, PerformanceLevel::Minimal] {
        let profile = level.profile();
        group.bench_with_input(
            BenchmarkId::new("analyze", format!("{:?}", level)),
            &frame,
            |b, frame| {
                b.iter(|| black_box(analyzer.analyze(frame, &profile)));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_detectors, bench_quality);
criterion_main!(benches);
