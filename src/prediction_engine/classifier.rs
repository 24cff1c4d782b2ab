use crate::shared_data::Severity;

pub const NO_SUGGESTION: &str = "No suggestion available";

/// Classify a vehicle count against road capacity.
///
/// A zero capacity has no meaningful ratio and is reported as `Low`.
pub fn classify(vehicle_count: f64, capacity: f64) -> Severity {
    if capacity <= 0.0 {
        return Severity::Low;
    }
    let ratio = vehicle_count / capacity;
    if ratio < 0.50 {
        Severity::Low
    } else if ratio < 0.75 {
        Severity::Medium
    } else if ratio < 0.90 {
        Severity::High
    } else {
        Severity::Critical
    }
}

/// Advisory text shown alongside a severity.
pub fn advise(severity: Severity) -> &'static str {
    match severity {
        Severity::Low => "Traffic flowing smoothly! No action needed.",
        Severity::Medium => "Moderate traffic. Consider carpooling or alternate routes.",
        Severity::High => {
            "Heavy traffic! Use public transport. Avoid peak hours 8-10 AM and 5-7 PM."
        }
        Severity::Critical => {
            "Emergency! Deploy traffic police immediately. Activate alternate route signals!"
        }
    }
}

/// Like [`advise`], for labels read back from storage.
pub fn advise_label(label: &str) -> &'static str {
    Severity::from_label(label).map_or(NO_SUGGESTION, advise)
}
