use crate::analytics::charts::{render_heatmap, render_hourly_chart};
use crate::analytics::ingest::{add_observation, road_statuses, traffic_history, HistoryFilter, TrafficInput};
use crate::analytics::reports::{alerts, compare, dashboard, heatmap, hourly, roadwise, trend};
use crate::config::ServiceConfig;
use crate::prediction_engine::CongestionPredictor;
use crate::service::prediction_service::submit_request;
use crate::shared_data::{current_timestamp, NewRoad, PredictionRequest, RoadId, Severity, Weather};
use crate::storage::TrafficStore;
use chrono::NaiveDate;
use std::error::Error;
use std::io::{stdout, BufRead, Write};

fn prompt<R: BufRead>(input: &mut R, label: &str) -> std::io::Result<String> {
    print!("{}", label);
    stdout().flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn prompt_road_id<R: BufRead>(input: &mut R, label: &str) -> Result<RoadId, Box<dyn Error>> {
    let raw = prompt(input, label)?;
    Ok(raw.parse::<RoadId>().map_err(|_| format!("invalid road id {:?}", raw))?)
}

fn prompt_weather<R: BufRead>(input: &mut R) -> std::io::Result<Weather> {
    let raw = prompt(input, "Weather (Clear/Rain/Fog/Snow/Storm) [Clear]: ")?;
    Ok(if raw.is_empty() {
        Weather::Clear
    } else {
        Weather::from(raw)
    })
}

fn prompt_yes_no<R: BufRead>(input: &mut R, label: &str) -> std::io::Result<bool> {
    let raw = prompt(input, label)?;
    Ok(matches!(raw.to_ascii_lowercase().as_str(), "y" | "yes"))
}

pub fn show_roads<S: TrafficStore>(store: &S) -> Result<(), Box<dyn Error>> {
    let statuses = road_statuses(store)?;
    if statuses.is_empty() {
        println!("No roads registered.");
    }
    for status in statuses {
        let road = &status.road;
        match &status.latest {
            Some(obs) => println!(
                "[{}] {} ({}, {}) cap {}: {} vehicles, {} at {}",
                road.id,
                road.road_name,
                road.area,
                road.city,
                road.capacity,
                obs.vehicle_count,
                obs.congestion_level,
                obs.recorded_at
            ),
            None => println!(
                "[{}] {} ({}, {}) cap {}: no readings",
                road.id, road.road_name, road.area, road.city, road.capacity
            ),
        }
    }
    Ok(())
}

fn add_road_interactive<S: TrafficStore, R: BufRead>(
    store: &S,
    input: &mut R,
) -> Result<(), Box<dyn Error>> {
    let road_name = prompt(input, "Road name: ")?;
    let area = prompt(input, "Area: ")?;
    let city = prompt(input, "City: ")?;
    let raw = prompt(input, "Capacity (vehicles): ")?;
    let capacity = raw
        .parse::<u32>()
        .map_err(|_| format!("invalid capacity {:?}", raw))?;
    let road = store.add_road(NewRoad {
        road_name,
        area,
        city,
        capacity,
    })?;
    println!("Added road {} with id {}", road.road_name, road.id);
    Ok(())
}

fn add_traffic_interactive<S: TrafficStore, R: BufRead>(
    store: &S,
    input: &mut R,
) -> Result<(), Box<dyn Error>> {
    let road_id = prompt_road_id(input, "Road id: ")?;
    let raw = prompt(input, "Vehicle count: ")?;
    let vehicle_count = raw
        .parse::<u32>()
        .map_err(|_| format!("invalid vehicle count {:?}", raw))?;
    let weather = prompt_weather(input)?;
    let is_holiday = prompt_yes_no(input, "Holiday? (y/N): ")?;
    let outcome = add_observation(
        store,
        TrafficInput {
            road_id,
            vehicle_count,
            weather,
            is_holiday,
            recorded_at: None,
        },
    )?;
    println!(
        "Recorded {} vehicles: {}. {}",
        outcome.observation.vehicle_count, outcome.congestion_level, outcome.suggestion
    );
    Ok(())
}

fn read_request<R: BufRead>(input: &mut R) -> Result<PredictionRequest, Box<dyn Error>> {
    let road_id = prompt_road_id(input, "Road id: ")?;
    let raw = prompt(input, "Hour 0-23 [now]: ")?;
    let hour = if raw.is_empty() {
        None
    } else {
        Some(raw.parse::<u8>().map_err(|_| format!("invalid hour {:?}", raw))?)
    };
    let weather = prompt_weather(input)?;
    let is_holiday = prompt_yes_no(input, "Holiday? (y/N): ")?;
    Ok(PredictionRequest {
        road_id,
        hour,
        weather,
        is_holiday,
    })
}

fn predict_interactive<S: TrafficStore, R: BufRead>(
    predictor: &CongestionPredictor<S>,
    input: &mut R,
) -> Result<(), Box<dyn Error>> {
    let request = read_request(input)?;
    let result = predictor.predict(&request)?;
    println!(
        "{} at {}:00 ({}, holiday: {}): {} with {:.1}% confidence [{}]",
        result.road_name,
        result.hour,
        result.weather,
        result.is_holiday,
        result.predicted_level,
        result.confidence,
        result.provenance
    );
    println!("Suggestion: {}", result.suggestion);
    Ok(())
}

fn history_interactive<S: TrafficStore, R: BufRead>(
    store: &S,
    input: &mut R,
) -> Result<(), Box<dyn Error>> {
    let raw_road = prompt(input, "Road id [all]: ")?;
    let raw_date = prompt(input, "Date YYYY-MM-DD [any]: ")?;
    let raw_level = prompt(input, "Level Low/Medium/High/Critical [any]: ")?;

    let filter = HistoryFilter {
        road_id: if raw_road.is_empty() {
            None
        } else {
            Some(raw_road.parse().map_err(|_| format!("invalid road id {:?}", raw_road))?)
        },
        date: if raw_date.is_empty() {
            None
        } else {
            Some(NaiveDate::parse_from_str(&raw_date, "%Y-%m-%d")?)
        },
        level: if raw_level.is_empty() {
            None
        } else {
            Some(Severity::from_label(&raw_level).ok_or(format!("unknown level {:?}", raw_level))?)
        },
    };

    let rows = traffic_history(store, &filter)?;
    println!("{} matching readings", rows.len());
    for row in rows {
        println!(
            "{} | {} ({}) | {} vehicles | {} | {}{}",
            row.observation.recorded_at,
            row.road_name,
            row.area,
            row.observation.vehicle_count,
            row.observation.congestion_level,
            row.observation.weather,
            if row.observation.is_holiday { " | holiday" } else { "" }
        );
    }
    Ok(())
}

fn reports_menu<S: TrafficStore, R: BufRead>(
    store: &S,
    input: &mut R,
) -> Result<(), Box<dyn Error>> {
    println!("\nReports Menu:");
    println!("1. Dashboard summary");
    println!("2. Road-wise average usage");
    println!("3. Active alerts");
    println!("4. Daily trend");
    println!("5. Compare two roads");
    let choice = prompt(input, "Enter your choice: ")?.parse::<u32>().unwrap_or(0);
    match choice {
        1 => {
            let summary = dashboard(store, current_timestamp().date())?;
            println!("Total roads: {}", summary.total_roads);
            println!("Roads currently critical: {}", summary.current_critical);
            println!("Peak hour today: {}", summary.peak_hour);
            println!("Today's levels: {:?}", summary.today_counts);
        }
        2 => {
            for row in roadwise(store)? {
                println!(
                    "{} ({}): avg {} of {} ({:.1}%) {}",
                    row.road_name,
                    row.area,
                    row.avg_vehicles,
                    row.capacity,
                    row.usage_percent,
                    row.congestion_level
                );
            }
        }
        3 => {
            let active = alerts(store)?;
            if active.is_empty() {
                println!("No active alerts.");
            }
            for alert in active {
                println!(
                    "{} {}: {} vehicles ({}). {}",
                    alert.congestion_level,
                    alert.road_name,
                    alert.vehicle_count,
                    alert.recorded_at,
                    alert.suggestion
                );
            }
        }
        4 => {
            for day in trend(store)? {
                println!(
                    "{}: avg {} over {} readings",
                    day.date, day.avg_vehicles, day.total_records
                );
            }
        }
        5 => {
            let first = prompt_road_id(input, "First road id: ")?;
            let second = prompt_road_id(input, "Second road id: ")?;
            let (a, b) = compare(store, first, second)?;
            for (id, side) in [(first, a), (second, b)] {
                let name = side
                    .road
                    .map(|r| r.road_name)
                    .unwrap_or_else(|| format!("unknown road {}", id));
                println!(
                    "{}: {} readings, avg {:?}, min {:?}, max {:?}",
                    name,
                    side.stats.total_records,
                    side.stats.avg_vehicles,
                    side.stats.min_vehicles,
                    side.stats.max_vehicles
                );
            }
        }
        _ => println!("Invalid choice."),
    }
    Ok(())
}

fn charts_interactive<S: TrafficStore, R: BufRead>(
    store: &S,
    config: &ServiceConfig,
    input: &mut R,
) -> Result<(), Box<dyn Error>> {
    let raw = prompt(input, "Road id for hourly chart [all]: ")?;
    let road_id = if raw.is_empty() {
        None
    } else {
        Some(raw.parse::<RoadId>().map_err(|_| format!("invalid road id {:?}", raw))?)
    };
    let title = match road_id {
        Some(id) => format!("Average vehicles per hour, road {}", id),
        None => "Average vehicles per hour, all roads".to_string(),
    };

    std::fs::create_dir_all(&config.chart_dir)?;
    let hourly_path = config.chart_dir.join("hourly_traffic.png");
    render_hourly_chart(&hourly(store, road_id)?, &title, &hourly_path)?;
    let heatmap_path = config.chart_dir.join("traffic_heatmap.png");
    render_heatmap(&heatmap(store)?, &heatmap_path)?;
    println!(
        "Charts saved to {} and {}",
        hourly_path.display(),
        heatmap_path.display()
    );
    Ok(())
}

/// Interactive admin menu. Returns when the user exits or input ends.
pub fn run_cli<S: TrafficStore, R: BufRead>(
    predictor: &CongestionPredictor<S>,
    config: &ServiceConfig,
    input: &mut R,
) -> std::io::Result<()> {
    let store = predictor.store();
    loop {
        println!("\nTraffic Congestion Admin CLI");
        println!("1. List roads with latest status");
        println!("2. Register a road");
        println!("3. Record a traffic reading");
        println!("4. Predict congestion");
        println!("5. Traffic history");
        println!("6. Reports");
        println!("7. Render charts");
        println!("8. Send prediction request to the service");
        println!("9. Exit");
        let line = prompt(input, "Enter your choice: ")?;
        if line.is_empty() && input.fill_buf()?.is_empty() {
            println!("Input closed, exiting CLI.");
            break;
        }
        let result = match line.parse::<u32>().unwrap_or(0) {
            1 => show_roads(store),
            2 => add_road_interactive(store, input),
            3 => add_traffic_interactive(store, input),
            4 => predict_interactive(predictor, input),
            5 => history_interactive(store, input),
            6 => reports_menu(store, input),
            7 => charts_interactive(store, config, input),
            8 => read_request(input).and_then(|request| {
                submit_request(&config.amqp_url, &request)?;
                println!("Request for road {} queued", request.road_id);
                Ok(())
            }),
            9 => {
                println!("Exiting CLI.");
                break;
            }
            _ => {
                println!("Invalid choice. Try again.");
                Ok(())
            }
        };
        if let Err(e) = result {
            eprintln!("Error: {}", e);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PredictorConfig;
    use crate::storage::MemoryStore;
    use std::io::Cursor;

    fn run(script: &str) -> CongestionPredictor<MemoryStore> {
        let predictor = CongestionPredictor::new(MemoryStore::new(), PredictorConfig::default());
        let mut input = Cursor::new(script.as_bytes().to_vec());
        run_cli(&predictor, &ServiceConfig::default(), &mut input).unwrap();
        predictor
    }

    #[test]
    fn registers_road_and_records_reading() {
        let predictor = run("2\nHosur Road\nSouth\nBangalore\n1000\n3\n1\n950\nRain\nn\n9\n");
        let roads = predictor.store().list_roads().unwrap();
        assert_eq!(roads.len(), 1);
        assert_eq!(roads[0].road_name, "Hosur Road");
        let observations = predictor.store().all_observations().unwrap();
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].congestion_level, "Critical");
        assert_eq!(observations[0].weather, Weather::Rain);
    }

    #[test]
    fn prediction_is_recorded() {
        let predictor = run("2\nHosur Road\nSouth\nBangalore\n1000\n4\n1\n8\n\ny\n9\n");
        let records = predictor.store().list_predictions(Some(1)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].hour, 8);
        assert!(records[0].is_holiday);
    }

    #[test]
    fn bad_input_does_not_end_the_session() {
        let predictor = run("3\nabc\n42\n2\nHosur Road\nSouth\nBangalore\n1000\n9\n");
        assert_eq!(predictor.store().list_roads().unwrap().len(), 1);
    }

    #[test]
    fn exits_at_end_of_input() {
        let predictor = run("1\n");
        assert!(predictor.store().list_roads().unwrap().is_empty());
    }
}
