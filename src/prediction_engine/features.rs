use crate::error::DataQualityError;
use crate::prediction_engine::forest::LabeledSample;
use crate::shared_data::{Observation, Severity, Weather};

pub const N_FEATURES: usize = 4;
pub const N_CLASSES: usize = 4;

/// Weather code used as a model feature. Only Rain and Fog carry their own
/// code; every other category shares Clear's.
pub fn encode_weather(weather: Weather) -> f64 {
    match weather {
        Weather::Rain => 1.0,
        Weather::Fog => 2.0,
        _ => 0.0,
    }
}

pub fn encode_severity(severity: Severity) -> usize {
    match severity {
        Severity::Low => 0,
        Severity::Medium => 1,
        Severity::High => 2,
        Severity::Critical => 3,
    }
}

pub fn decode_severity(class: usize) -> Option<Severity> {
    Severity::ALL.get(class).copied()
}

/// Feature vector in model column order: hour, day of week, holiday, weather.
pub fn feature_vector(hour: u8, day_of_week: u8, is_holiday: bool, weather: Weather) -> Vec<f64> {
    vec![
        hour as f64,
        day_of_week as f64,
        if is_holiday { 1.0 } else { 0.0 },
        encode_weather(weather),
    ]
}

/// One training row as read from history, before encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRecord {
    pub hour: u8,
    pub day_of_week: u8,
    pub vehicle_count: u32,
    pub weather: Weather,
    pub is_holiday: bool,
    pub severity: String,
}

impl From<&Observation> for HistoryRecord {
    fn from(obs: &Observation) -> Self {
        Self {
            hour: obs.hour(),
            day_of_week: obs.day_of_week(),
            vehicle_count: obs.vehicle_count,
            weather: obs.weather,
            is_holiday: obs.is_holiday,
            severity: obs.congestion_level.clone(),
        }
    }
}

impl HistoryRecord {
    pub fn to_sample(&self) -> Result<LabeledSample, DataQualityError> {
        let severity = Severity::from_label(&self.severity)
            .ok_or_else(|| DataQualityError::UnknownSeverity(self.severity.clone()))?;
        Ok(LabeledSample {
            features: feature_vector(self.hour, self.day_of_week, self.is_holiday, self.weather),
            label: encode_severity(severity),
        })
    }
}

/// Training set built from a history window.
#[derive(Debug, Default)]
pub struct EncodedWindow {
    pub samples: Vec<LabeledSample>,
    pub rejected: Vec<DataQualityError>,
}

/// Encode every row, setting aside rows whose label has no class instead of
/// guessing one.
pub fn encode_window(history: &[HistoryRecord]) -> EncodedWindow {
    let mut window = EncodedWindow::default();
    for record in history {
        match record.to_sample() {
            Ok(sample) => window.samples.push(sample),
            Err(e) => window.rejected.push(e),
        }
    }
    window
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(severity: &str) -> HistoryRecord {
        HistoryRecord {
            hour: 8,
            day_of_week: 2,
            vehicle_count: 400,
            weather: Weather::Fog,
            is_holiday: true,
            severity: severity.to_string(),
        }
    }

    #[test]
    fn weather_codes() {
        assert_eq!(encode_weather(Weather::Clear), 0.0);
        assert_eq!(encode_weather(Weather::Rain), 1.0);
        assert_eq!(encode_weather(Weather::Fog), 2.0);
        assert_eq!(encode_weather(Weather::Snow), 0.0);
        assert_eq!(encode_weather(Weather::Storm), 0.0);
    }

    #[test]
    fn severity_codes_invert() {
        for s in Severity::ALL {
            assert_eq!(decode_severity(encode_severity(s)), Some(s));
        }
        assert_eq!(decode_severity(4), None);
    }

    #[test]
    fn vector_column_order() {
        assert_eq!(feature_vector(17, 6, true, Weather::Rain), vec![17.0, 6.0, 1.0, 1.0]);
        assert_eq!(feature_vector(0, 1, false, Weather::Storm).len(), N_FEATURES);
    }

    #[test]
    fn malformed_rows_are_set_aside() {
        let history = vec![record("High"), record("Jammed"), record("Low"), record("")];
        let window = encode_window(&history);
        assert_eq!(window.samples.len(), 2);
        assert_eq!(window.samples[0].label, 2);
        assert_eq!(window.samples[0].features, vec![8.0, 2.0, 1.0, 2.0]);
        assert_eq!(window.samples[1].label, 0);
        assert_eq!(
            window.rejected,
            vec![
                DataQualityError::UnknownSeverity("Jammed".into()),
                DataQualityError::UnknownSeverity(String::new()),
            ]
        );
    }
}
