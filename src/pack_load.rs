//! Pack weight over the course of a trip
//!
//! Food is eaten at a constant daily rate, so the pack gets lighter each day
//! while the base weight stays fixed.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use csv::Writer;
use log::info;
use plotters::prelude::*;
use plotters::style::{FontDesc, FontFamily, FontStyle};
use serde::Serialize;
use thiserror::Error;

use crate::glyph_backend::GlyphTextBackend;

/// Longest trip the calculator will tabulate, in days.
pub const MAX_TRIP_DAYS: u32 = 3650;

const PLOT_SIZE: (u32, u32) = (1024, 640);

#[derive(Debug, Error)]
pub enum PackLoadError {
    #[error("{field} must be a non-negative number, got {value}")]
    InvalidInput { field: &'static str, value: f64 },

    #[error("body weight must be greater than zero")]
    ZeroBodyWeight,

    #[error("trip duration of {days} days exceeds the {max} day limit")]
    TripTooLong { days: f64, max: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Plot error: {0}")]
    Plot(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackInputs {
    pub base_weight: f64,
    pub body_weight: f64,
    pub trip_duration: f64,
    pub daily_food: f64,
}

impl PackInputs {
    fn validate(&self) -> Result<(), PackLoadError> {
        for (field, value) in [
            ("base weight", self.base_weight),
            ("body weight", self.body_weight),
            ("trip duration", self.trip_duration),
            ("daily food", self.daily_food),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PackLoadError::InvalidInput { field, value });
            }
        }
        if self.body_weight == 0.0 {
            return Err(PackLoadError::ZeroBodyWeight);
        }
        if self.trip_duration > f64::from(MAX_TRIP_DAYS) {
            return Err(PackLoadError::TripTooLong {
                days: self.trip_duration,
                max: MAX_TRIP_DAYS,
            });
        }
        Ok(())
    }
}

/// Load carried on one day of the trip. Weights in pounds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayLoad {
    pub day_num: u32,
    pub food_weight: f64,
    pub total_pack_weight: f64,
    pub pct_body_weight: f64,
}

pub fn calc_daily_load(inputs: &PackInputs) -> Result<Vec<DayLoad>, PackLoadError> {
    inputs.validate()?;

    let mut table = Vec::new();
    let mut day_num: u32 = 1;

    while f64::from(day_num) <= inputs.trip_duration {
        let food_weight = inputs.daily_food * (inputs.trip_duration - f64::from(day_num));
        let total_pack_weight = inputs.base_weight + food_weight;
        let pct_body_weight = ((total_pack_weight / inputs.body_weight) * 100.0 * 100.0).round() / 100.0;

        table.push(DayLoad {
            day_num,
            food_weight,
            total_pack_weight,
            pct_body_weight,
        });
        day_num += 1;
    }

    Ok(table)
}

pub fn write_daily_load_csv<W: Write>(table: &[DayLoad], out: W) -> Result<(), PackLoadError> {
    let mut wtr = Writer::from_writer(out);
    for day in table {
        wtr.serialize(day)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_daily_load_json<W: Write>(table: &[DayLoad], out: W) -> Result<(), PackLoadError> {
    serde_json::to_writer_pretty(out, table)?;
    Ok(())
}

/// Writes `<name>.csv` and `<name>.json` into `out_dir`, returning both paths.
pub fn save_daily_load(
    table: &[DayLoad],
    hike_name: &str,
    out_dir: &Path,
) -> Result<(PathBuf, PathBuf), PackLoadError> {
    let csv_path = out_dir.join(format!("{hike_name}.csv"));
    let json_path = out_dir.join(format!("{hike_name}.json"));

    write_daily_load_csv(table, BufWriter::new(File::create(&csv_path)?))?;
    info!("Successfully wrote data to CSV file {}", csv_path.display());

    let mut json_out = BufWriter::new(File::create(&json_path)?);
    write_daily_load_json(table, &mut json_out)?;
    json_out.flush()?;
    info!("Successfully wrote data to JSON file {}", json_path.display());

    Ok((csv_path, json_path))
}

/// Draws total pack weight and percent of body weight per day into `<name>.png`.
pub fn plot_daily_load(
    table: &[DayLoad],
    hike_name: &str,
    out_dir: &Path,
) -> Result<PathBuf, PackLoadError> {
    let png_path = out_dir.join(format!("{hike_name}.png"));

    draw_daily_load_chart(table, hike_name, &png_path)
        .map_err(|e| PackLoadError::Plot(e.to_string()))?;
    info!("Successfully wrote pack weight plot {}", png_path.display());

    Ok(png_path)
}

fn draw_daily_load_chart(
    table: &[DayLoad],
    hike_name: &str,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = GlyphTextBackend::new(BitMapBackend::new(path, PLOT_SIZE)).into_drawing_area();
    root.fill(&WHITE)?;

    let last_day = table.last().map(|day| day.day_num).unwrap_or(1);
    let y_max = table
        .iter()
        .map(|day| day.total_pack_weight.max(day.pct_body_weight))
        .fold(1.0_f64, f64::max)
        * 1.15;

    let title_font = FontDesc::new(FontFamily::SansSerif, 24.0, FontStyle::Normal);
    let note_style = FontDesc::new(FontFamily::SansSerif, 12.0, FontStyle::Normal).color(&BLACK);
    let pct_color = RGBColor(128, 128, 128);

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("{hike_name} Pack Weight Statistics"), title_font)
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(0u32..last_day + 1, 0.0..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Day of Trip")
        .y_desc("Pack Weight | % of Body Weight")
        .x_labels((last_day as usize + 2).min(16))
        .draw()?;

    chart
        .draw_series(LineSeries::new(
            table.iter().map(|day| (day.day_num, day.total_pack_weight)),
            BLACK.stroke_width(2),
        ))?
        .label("Total Pack Weight (Lbs)")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLACK.stroke_width(2)));

    chart
        .draw_series(LineSeries::new(
            table.iter().map(|day| (day.day_num, day.pct_body_weight)),
            pct_color.stroke_width(2),
        ))?
        .label("Pack Weight vs Body Weight (%)")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], pct_color.stroke_width(2)));

    chart.draw_series(table.iter().map(|day| {
        EmptyElement::at((day.day_num, day.total_pack_weight))
            + Circle::new((0, 0), 4, BLACK.filled())
            + Text::new(format!("{:.2} lbs", day.total_pack_weight), (6, -16), note_style.clone())
    }))?;

    chart.draw_series(table.iter().map(|day| {
        EmptyElement::at((day.day_num, day.pct_body_weight))
            + Circle::new((0, 0), 4, pct_color.filled())
            + Text::new(format!("{:.2}%", day.pct_body_weight), (6, 6), note_style.clone())
    }))?;

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn inputs(base: f64, body: f64, days: f64, food: f64) -> PackInputs {
        PackInputs {
            base_weight: base,
            body_weight: body,
            trip_duration: days,
            daily_food: food,
        }
    }

    #[test]
    fn test_three_day_trip() {
        let table = calc_daily_load(&inputs(15.0, 180.0, 3.0, 2.0)).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(
            table[0],
            DayLoad { day_num: 1, food_weight: 4.0, total_pack_weight: 19.0, pct_body_weight: 10.56 }
        );
        assert_eq!(table[2].food_weight, 0.0);
        assert_eq!(table[2].total_pack_weight, 15.0);
        assert_eq!(table[2].pct_body_weight, 8.33);
    }

    #[test]
    fn test_fractional_duration() {
        let table = calc_daily_load(&inputs(10.0, 100.0, 2.5, 1.0)).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table[1].food_weight, 0.5);
    }

    #[test]
    fn test_short_trip_has_no_days() {
        assert!(calc_daily_load(&inputs(10.0, 100.0, 0.5, 1.0)).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            calc_daily_load(&inputs(10.0, 0.0, 2.0, 1.0)),
            Err(PackLoadError::ZeroBodyWeight)
        ));
        assert!(matches!(
            calc_daily_load(&inputs(-1.0, 150.0, 2.0, 1.0)),
            Err(PackLoadError::InvalidInput { field: "base weight", .. })
        ));
        assert!(calc_daily_load(&inputs(10.0, 150.0, f64::INFINITY, 1.0)).is_err());
    }

    #[test]
    fn test_trip_length_is_capped() {
        assert!(matches!(
            calc_daily_load(&inputs(10.0, 150.0, 5e9, 1.0)),
            Err(PackLoadError::TripTooLong { max: MAX_TRIP_DAYS, .. })
        ));

        let longest = calc_daily_load(&inputs(10.0, 150.0, f64::from(MAX_TRIP_DAYS), 0.5)).unwrap();
        assert_eq!(longest.len(), MAX_TRIP_DAYS as usize);
        assert_eq!(longest.last().map(|d| d.day_num), Some(MAX_TRIP_DAYS));
    }

    #[test]
    fn test_csv_and_json_files() {
        let dir = tempfile::tempdir().unwrap();
        let table = calc_daily_load(&inputs(12.0, 160.0, 2.0, 1.5)).unwrap();

        let (csv_path, json_path) = save_daily_load(&table, "Enchantments", dir.path()).unwrap();

        let csv_text = std::fs::read_to_string(csv_path).unwrap();
        assert_eq!(
            csv_text.lines().next(),
            Some("day_num,food_weight,total_pack_weight,pct_body_weight")
        );
        assert_eq!(csv_text.lines().count(), 3);

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(json_path).unwrap()).unwrap();
        assert_eq!(json[0]["day_num"], 1);
        assert_eq!(json[1]["total_pack_weight"], 12.0);
    }

    #[test]
    fn test_plot_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let table = calc_daily_load(&inputs(15.0, 180.0, 5.0, 2.0)).unwrap();

        let png_path = plot_daily_load(&table, "Wonderland Trail", dir.path()).unwrap();

        assert_eq!(png_path, dir.path().join("Wonderland Trail.png"));
        let bytes = std::fs::read(&png_path).unwrap();
        assert!(bytes.starts_with(b"\x89PNG"));
    }

    #[test]
    fn test_plot_of_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let png_path = plot_daily_load(&[], "Overnighter", dir.path()).unwrap();
        assert!(png_path.exists());
    }

    #[test]
    fn test_plot_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let table = calc_daily_load(&inputs(15.0, 180.0, 2.0, 2.0)).unwrap();
        let err = plot_daily_load(&table, "Nowhere", &dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, PackLoadError::Plot(_)));
    }
}
