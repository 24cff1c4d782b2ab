use crate::analytics::reports::{heatmap_grid, HeatmapCell, HourlyAverage};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::error::Error;
use std::path::Path;

const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

fn label_style(size: i32) -> TextStyle<'static> {
    TextStyle::from(("sans-serif", size).into_font())
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Center))
}

/// Bar chart of average vehicles per hour of day.
pub fn render_hourly_chart(
    rows: &[HourlyAverage],
    title: &str,
    path: &Path,
) -> Result<(), Box<dyn Error>> {
    let max_avg = rows
        .iter()
        .map(|r| r.avg_vehicles)
        .fold(0.0_f64, f64::max)
        .max(1.0);

    let backend = BitMapBackend::new(path, (900, 500));
    let root = backend.into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 20))
        .margin(30)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d((0u32..24u32).into_segmented(), 0.0..max_avg * 1.1)?;

    chart
        .configure_mesh()
        .x_desc("Hour of day")
        .y_desc("Average vehicles")
        .draw()?;

    chart.draw_series(
        Histogram::vertical(&chart)
            .style(RED.mix(0.6).filled())
            .margin(2)
            .data(rows.iter().map(|r| (r.hour as u32, r.avg_vehicles))),
    )?;

    root.present()?;
    log::info!("hourly chart saved to {}", path.display());
    Ok(())
}

/// Weekday by hour grid, shaded from white (empty) to red (busiest cell).
pub fn render_heatmap(cells: &[HeatmapCell], path: &Path) -> Result<(), Box<dyn Error>> {
    let grid = heatmap_grid(cells);
    let peak = grid
        .iter()
        .flat_map(|row| row.iter())
        .cloned()
        .fold(0.0_f64, f64::max)
        .max(1.0);

    let (label_width, header_height) = (60, 30);
    let (cell_width, cell_height) = (40, 50);
    let image_width = label_width + 24 * cell_width;
    let image_height = header_height + 7 * cell_height;

    let backend = BitMapBackend::new(path, (image_width as u32, image_height as u32));
    let root = backend.into_drawing_area();
    root.fill(&WHITE)?;

    for hour in 0..24 {
        let x = label_width + hour * cell_width + cell_width / 2;
        root.draw(&Text::new(
            hour.to_string(),
            (x, header_height / 2),
            label_style(13),
        ))?;
    }

    for (day, row) in grid.iter().enumerate() {
        let y0 = header_height + day as i32 * cell_height;
        root.draw(&Text::new(
            DAY_NAMES[day],
            (label_width / 2, y0 + cell_height / 2),
            label_style(14),
        ))?;

        for (hour, &avg) in row.iter().enumerate() {
            let x0 = label_width + hour as i32 * cell_width;
            let intensity = avg / peak;
            let green_blue = (255.0 * (1.0 - intensity)).round() as u8;
            root.draw(&Rectangle::new(
                [(x0, y0), (x0 + cell_width, y0 + cell_height)],
                RGBColor(255, green_blue, green_blue).filled(),
            ))?;
            root.draw(&Rectangle::new(
                [(x0, y0), (x0 + cell_width, y0 + cell_height)],
                &BLACK,
            ))?;
        }
    }

    root.present()?;
    log::info!("heatmap saved to {}", path.display());
    Ok(())
}
