use criterion::{
    black_box, criterion_group, criterion_main, AxisScale, BenchmarkId, Criterion,
    PlotConfiguration,
};

use congestion_predictor::config::PredictorConfig;
use congestion_predictor::prediction_engine::features::HistoryRecord;
use congestion_predictor::prediction_engine::learned::learned_predict;
use congestion_predictor::shared_data::{Severity, Weather};

/// Builds a synthetic history window whose level follows the hour of day.
fn generate_history(window: usize) -> Vec<HistoryRecord> {
    (0..window)
        .map(|i| {
            let hour = (i % 24) as u8;
            let severity = match hour {
                8..=10 | 17..=19 => Severity::Critical,
                11..=16 => Severity::Medium,
                _ => Severity::Low,
            };
            HistoryRecord {
                hour,
                day_of_week: (i % 7) as u8 + 1,
                vehicle_count: 100 + (i as u32 * 37) % 900,
                weather: if i % 5 == 0 { Weather::Rain } else { Weather::Clear },
                is_holiday: i % 11 == 0,
                severity: severity.to_string(),
            }
        })
        .collect()
}

/// Fit-and-predict cost for the window sizes the service sees: the
/// sufficiency threshold, a typical road and the full window.
fn bench_learned(c: &mut Criterion) {
    let config = PredictorConfig::default();
    let windows = [10, 100, 200];

    let mut group = c.benchmark_group("Learned_Predict_Window");
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Linear));
    group.sample_size(20);

    for &window in windows.iter() {
        let history = generate_history(window);
        group.bench_with_input(
            BenchmarkId::new("learned_predict", window),
            &window,
            |b, &_window| {
                b.iter(|| {
                    let prediction = learned_predict(
                        black_box(&history),
                        black_box(18),
                        black_box(3),
                        Weather::Clear,
                        false,
                        &config,
                    );
                    black_box(prediction).ok();
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_learned);
criterion_main!(benches);
