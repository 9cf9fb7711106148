use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use csv::Writer;
use log::{error, info};

use crate::batch::BatchReport;
use crate::summary::TrackSummary;

pub const CSV_HEADER: [&str; 6] = [
    "Date",
    " Name",
    " GPX File",
    " Elevation Gain (ft)",
    " Elevation Loss (ft)",
    " Total Distance (mi)",
];

pub fn write_summaries_csv<'a, W: Write>(
    summaries: impl IntoIterator<Item = &'a TrackSummary>,
    out: W,
) -> csv::Result<usize> {
    let mut wtr = Writer::from_writer(out);
    wtr.write_record(CSV_HEADER)?;

    let mut rows = 0;
    for summary in summaries {
        let gain = summary.elevation_gain_ft().to_string();
        let loss = summary.elevation_loss_ft().to_string();
        let distance = format!("{:.2}", summary.distance_mi());

        let record: [&str; 6] = [
            summary.date(),
            summary.name(),
            summary.source_id(),
            &gain,
            &loss,
            &distance,
        ];
        wtr.write_record(record)?;
        rows += 1;
    }

    wtr.flush()?;
    Ok(rows)
}

pub fn save_summaries_csv(report: &BatchReport, csv_path: &Path) -> csv::Result<()> {
    info!("Writing data to {} ...", csv_path.display());
    let file = File::create(csv_path)?;
    let rows = write_summaries_csv(report.summaries(), file)?;
    info!("📊 {} row(s) saved to: {}", rows, csv_path.display());
    Ok(())
}

pub fn save_summaries_json(report: &BatchReport, json_path: &Path) -> anyhow::Result<()> {
    let summaries: Vec<&TrackSummary> = report.summaries().collect();
    let mut out = BufWriter::new(File::create(json_path)?);
    serde_json::to_writer_pretty(&mut out, &summaries)?;
    out.flush()?;
    info!("📊 JSON summaries saved to: {}", json_path.display());
    Ok(())
}

pub fn print_processing_summary(report: &BatchReport) {
    let stdout = io::stdout();
    if let Err(e) = write_processing_summary(report, stdout.lock()) {
        error!("Failed to print processing summary: {}", e);
    }
}

pub fn write_processing_summary<W: Write>(report: &BatchReport, mut out: W) -> io::Result<()> {
    writeln!(out, "\n🎯 PROCESSING SUMMARY")?;
    writeln!(out, "====================")?;

    if report.is_empty() {
        writeln!(out, "No GPX files found")?;
        return Ok(());
    }

    writeln!(out, "Total files processed: {}", report.len())?;
    writeln!(out, "✅ Successful: {}", report.success_count())?;
    writeln!(out, "❌ Errors: {}", report.failure_count())?;

    for item in report.items() {
        if let Err(failure) = &item.outcome {
            writeln!(out, "   • {} ({})", failure.source_id(), item.path.display())?;
            writeln!(out, "     {}", failure)?;
        }
    }

    if report.success_count() > 0 {
        let total_distance: f64 = report.summaries().map(|s| s.distance_mi()).sum();
        let total_gain: u64 = report.summaries().map(|s| u64::from(s.elevation_gain_ft())).sum();
        let total_loss: u64 = report.summaries().map(|s| u64::from(s.elevation_loss_ft())).sum();

        writeln!(out, "\n🏔️  TOTALS:")?;
        writeln!(out, "Distance: {:.2} mi", total_distance)?;
        writeln!(out, "Elevation gain: {} ft", total_gain)?;
        writeln!(out, "Elevation loss: {} ft", total_loss)?;
    }

    Ok(())
}
