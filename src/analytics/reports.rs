//! Aggregate views over the observation stream for dashboards and the
//! admin CLI. Everything here is read-only.

use crate::analytics::ingest::latest_per_road;
use crate::error::StoreError;
use crate::global_variables::TREND_DAYS_LIMIT;
use crate::prediction_engine::classifier::{advise_label, classify};
use crate::shared_data::{day_of_week, Observation, Road, RoadId, Severity, Weather};
use crate::storage::TrafficStore;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Hour shown on the dashboard when nothing was recorded today.
const DEFAULT_PEAK_HOUR: u8 = 9;

pub fn hour_label(hour: u8) -> String {
    format!("{}:00", hour)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LevelCounts {
    #[serde(rename = "Low")]
    pub low: usize,
    #[serde(rename = "Medium")]
    pub medium: usize,
    #[serde(rename = "High")]
    pub high: usize,
    #[serde(rename = "Critical")]
    pub critical: usize,
}

impl LevelCounts {
    fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Low => self.low += 1,
            Severity::Medium => self.medium += 1,
            Severity::High => self.high += 1,
            Severity::Critical => self.critical += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub total_roads: usize,
    /// Roads whose latest reading is Critical.
    pub current_critical: usize,
    pub peak_hour: String,
    pub today_counts: LevelCounts,
}

pub fn dashboard<S: TrafficStore + ?Sized>(
    store: &S,
    today: NaiveDate,
) -> Result<Dashboard, StoreError> {
    let total_roads = store.list_roads()?.len();
    let observations = store.all_observations()?;

    let current_critical = latest_per_road(observations.clone())
        .values()
        .filter(|o| o.congestion_level == Severity::Critical.as_str())
        .count();

    let todays: Vec<&Observation> = observations
        .iter()
        .filter(|o| o.recorded_at.date() == today)
        .collect();

    let mut by_hour: BTreeMap<u8, Vec<f64>> = BTreeMap::new();
    let mut today_counts = LevelCounts::default();
    for obs in &todays {
        by_hour
            .entry(obs.hour())
            .or_default()
            .push(obs.vehicle_count as f64);
        if let Ok(level) = obs.severity() {
            today_counts.add(level);
        }
    }

    // Earliest hour wins a tie.
    let mut peak: Option<(u8, f64)> = None;
    for (hour, counts) in &by_hour {
        let avg = mean(counts);
        if peak.map_or(true, |(_, best)| avg > best) {
            peak = Some((*hour, avg));
        }
    }

    Ok(Dashboard {
        total_roads,
        current_critical,
        peak_hour: hour_label(peak.map_or(DEFAULT_PEAK_HOUR, |(h, _)| h)),
        today_counts,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoadUsage {
    pub road_id: RoadId,
    pub road_name: String,
    pub area: String,
    pub capacity: u32,
    pub avg_vehicles: f64,
    pub usage_percent: f64,
    pub congestion_level: Severity,
}

/// Average load of every road with at least one reading, busiest first.
pub fn roadwise<S: TrafficStore + ?Sized>(store: &S) -> Result<Vec<RoadUsage>, StoreError> {
    let mut counts: HashMap<RoadId, Vec<f64>> = HashMap::new();
    for obs in store.all_observations()? {
        counts
            .entry(obs.road_id)
            .or_default()
            .push(obs.vehicle_count as f64);
    }

    let mut rows: Vec<RoadUsage> = store
        .list_roads()?
        .into_iter()
        .filter_map(|road| {
            let avg = mean(counts.get(&road.id)?);
            let usage_percent = if road.capacity == 0 {
                0.0
            } else {
                (avg / road.capacity as f64 * 1000.0).round() / 10.0
            };
            let avg_vehicles = avg.round();
            Some(RoadUsage {
                road_id: road.id,
                congestion_level: classify(avg_vehicles, road.capacity as f64),
                road_name: road.road_name,
                area: road.area,
                capacity: road.capacity,
                avg_vehicles,
                usage_percent,
            })
        })
        .collect();
    rows.sort_by(|a, b| b.avg_vehicles.total_cmp(&a.avg_vehicles));
    Ok(rows)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyAverage {
    pub hour: u8,
    pub avg_vehicles: f64,
    pub hour_label: String,
}

fn hourly_from(observations: &[Observation]) -> Vec<HourlyAverage> {
    let mut by_hour: BTreeMap<u8, Vec<f64>> = BTreeMap::new();
    for obs in observations {
        by_hour
            .entry(obs.hour())
            .or_default()
            .push(obs.vehicle_count as f64);
    }
    by_hour
        .into_iter()
        .map(|(hour, counts)| HourlyAverage {
            hour,
            avg_vehicles: mean(&counts).round(),
            hour_label: hour_label(hour),
        })
        .collect()
}

/// Average count per hour of day, for one road or the whole network.
pub fn hourly<S: TrafficStore + ?Sized>(
    store: &S,
    road_id: Option<RoadId>,
) -> Result<Vec<HourlyAverage>, StoreError> {
    let observations = match road_id {
        Some(id) => store.observations_for_road(id)?,
        None => store.all_observations()?,
    };
    Ok(hourly_from(&observations))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTrend {
    pub date: NaiveDate,
    pub avg_vehicles: f64,
    pub total_records: usize,
}

/// Per-day averages in date order, limited to the earliest days on record.
pub fn trend<S: TrafficStore + ?Sized>(store: &S) -> Result<Vec<DailyTrend>, StoreError> {
    let mut by_day: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for obs in store.all_observations()? {
        by_day
            .entry(obs.recorded_at.date())
            .or_default()
            .push(obs.vehicle_count as f64);
    }
    Ok(by_day
        .into_iter()
        .take(TREND_DAYS_LIMIT)
        .map(|(date, counts)| DailyTrend {
            date,
            avg_vehicles: mean(&counts).round(),
            total_records: counts.len(),
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapCell {
    /// 1 = Sunday.
    pub day_num: u8,
    pub day_name: String,
    pub hour: u8,
    pub avg_vehicles: f64,
}

/// Average count for every (weekday, hour) pair that has data.
pub fn heatmap<S: TrafficStore + ?Sized>(store: &S) -> Result<Vec<HeatmapCell>, StoreError> {
    let mut cells: BTreeMap<(u8, u8), (String, Vec<f64>)> = BTreeMap::new();
    for obs in store.all_observations()? {
        let key = (day_of_week(&obs.recorded_at), obs.hour());
        cells
            .entry(key)
            .or_insert_with(|| (day_name(&obs.recorded_at), Vec::new()))
            .1
            .push(obs.vehicle_count as f64);
    }
    Ok(cells
        .into_iter()
        .map(|((day_num, hour), (day_name, counts))| HeatmapCell {
            day_num,
            day_name,
            hour,
            avg_vehicles: mean(&counts).round(),
        })
        .collect())
}

fn day_name(ts: &NaiveDateTime) -> String {
    ts.format("%A").to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub observation_id: u64,
    pub road_id: RoadId,
    pub road_name: String,
    pub area: String,
    pub city: String,
    pub vehicle_count: u32,
    pub congestion_level: String,
    pub weather: Weather,
    pub recorded_at: NaiveDateTime,
    pub capacity: u32,
    pub suggestion: String,
}

/// Roads whose latest reading is High or Critical, heaviest first.
pub fn alerts<S: TrafficStore + ?Sized>(store: &S) -> Result<Vec<Alert>, StoreError> {
    let roads: HashMap<RoadId, Road> = store
        .list_roads()?
        .into_iter()
        .map(|r| (r.id, r))
        .collect();

    let mut alerts: Vec<Alert> = latest_per_road(store.all_observations()?)
        .into_values()
        .filter(|o| matches!(o.severity(), Ok(Severity::High | Severity::Critical)))
        .filter_map(|o| {
            let road = roads.get(&o.road_id)?;
            Some(Alert {
                observation_id: o.id,
                road_id: road.id,
                road_name: road.road_name.clone(),
                area: road.area.clone(),
                city: road.city.clone(),
                vehicle_count: o.vehicle_count,
                suggestion: advise_label(&o.congestion_level).to_string(),
                congestion_level: o.congestion_level,
                weather: o.weather,
                recorded_at: o.recorded_at,
                capacity: road.capacity,
            })
        })
        .collect();
    alerts.sort_by(|a, b| {
        b.vehicle_count
            .cmp(&a.vehicle_count)
            .then_with(|| a.road_id.cmp(&b.road_id))
    });
    Ok(alerts)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoadStats {
    pub avg_vehicles: Option<f64>,
    pub max_vehicles: Option<u32>,
    pub min_vehicles: Option<u32>,
    pub total_records: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoadComparison {
    pub road: Option<Road>,
    pub hourly: Vec<HourlyAverage>,
    pub stats: RoadStats,
}

fn road_comparison<S: TrafficStore + ?Sized>(
    store: &S,
    road_id: RoadId,
) -> Result<RoadComparison, StoreError> {
    let observations = store.observations_for_road(road_id)?;
    let counts: Vec<f64> = observations.iter().map(|o| o.vehicle_count as f64).collect();
    Ok(RoadComparison {
        road: store.get_road(road_id)?,
        hourly: hourly_from(&observations),
        stats: RoadStats {
            avg_vehicles: (!counts.is_empty()).then(|| mean(&counts).round()),
            max_vehicles: observations.iter().map(|o| o.vehicle_count).max(),
            min_vehicles: observations.iter().map(|o| o.vehicle_count).min(),
            total_records: observations.len(),
        },
    })
}

/// Side by side profile of two roads. An unknown id yields `road: None`
/// with empty statistics rather than an error.
pub fn compare<S: TrafficStore + ?Sized>(
    store: &S,
    first: RoadId,
    second: RoadId,
) -> Result<(RoadComparison, RoadComparison), StoreError> {
    Ok((road_comparison(store, first)?, road_comparison(store, second)?))
}

/// Weekday/hour grid used by the heatmap chart, Sunday first.
pub fn heatmap_grid(cells: &[HeatmapCell]) -> [[f64; 24]; 7] {
    let mut grid = [[0.0; 24]; 7];
    for cell in cells {
        let day = (cell.day_num as usize).clamp(1, 7) - 1;
        let hour = (cell.hour as usize).min(23);
        grid[day][hour] = cell.avg_vehicles;
    }
    grid
}
