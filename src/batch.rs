//! Batch processing of a directory of track files
//!
//! Each file runs through the whole pipeline on one worker of a dedicated
//! rayon pool. Workers share nothing; results travel back over a channel
//! tagged with their input position and are slotted into place, so output
//! order is input order no matter which file finishes first.

use std::path::{Path, PathBuf};
use std::sync::mpsc;

use anyhow::{bail, Context};
use log::{debug, error, info};
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use walkdir::WalkDir;

use crate::error::{Result, TrackError};
use crate::summary::{process_track_file, TrackSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    pub workers: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { workers: num_cpus::get() }
    }
}

impl BatchConfig {
    pub fn sequential() -> Self {
        Self { workers: 1 }
    }

    pub fn with_workers(workers: usize) -> Self {
        Self { workers: workers.max(1) }
    }
}

/// Outcome for one input file.
#[derive(Debug)]
pub struct BatchItem {
    pub path: PathBuf,
    pub outcome: Result<TrackSummary>,
}

/// One entry per input file, in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    items: Vec<BatchItem>,
}

impl BatchReport {
    pub fn items(&self) -> &[BatchItem] {
        &self.items
    }

    pub fn summaries(&self) -> impl Iterator<Item = &TrackSummary> {
        self.items.iter().filter_map(|item| item.outcome.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &TrackError> {
        self.items.iter().filter_map(|item| item.outcome.as_ref().err())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn success_count(&self) -> usize {
        self.summaries().count()
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }
}

pub struct BatchCoordinator {
    pool: ThreadPool,
}

impl BatchCoordinator {
    pub fn new(config: BatchConfig) -> std::result::Result<Self, ThreadPoolBuildError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.workers.max(1))
            .thread_name(|i| format!("track-worker-{i}"))
            .build()?;

        Ok(Self { pool })
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn run(&self, paths: &[PathBuf]) -> BatchReport {
        self.run_with(paths, process_track_file)
    }

    /// Runs `process` once per path on the pool and collects results in input order.
    pub fn run_with<F>(&self, paths: &[PathBuf], process: F) -> BatchReport
    where
        F: Fn(&Path) -> Result<TrackSummary> + Sync,
    {
        info!(
            "Processing {} GPX file(s) on {} worker(s)",
            paths.len(),
            self.workers()
        );

        let process = &process;
        let (tx, rx) = mpsc::channel();

        self.pool.scope(|scope| {
            for (index, path) in paths.iter().enumerate() {
                let tx = tx.clone();
                scope.spawn(move |_| {
                    debug!("Worker picked up {}", path.display());
                    let outcome = process(path);
                    // rx lives until after the scope joins
                    let _ = tx.send((index, outcome));
                });
            }
        });
        drop(tx);

        let mut slots: Vec<Option<Result<TrackSummary>>> = paths.iter().map(|_| None).collect();
        for (index, outcome) in rx {
            slots[index] = Some(outcome);
        }

        // Every task has sent exactly once by the time the scope returns.
        let items: Vec<BatchItem> = slots
            .into_iter()
            .zip(paths)
            .filter_map(|(slot, path)| {
                slot.map(|outcome| BatchItem { path: path.clone(), outcome })
            })
            .collect();

        for item in &items {
            if let Err(failure) = &item.outcome {
                error!("Error processing GPX file {}: {}", item.path.display(), failure);
            }
        }

        BatchReport { items }
    }
}

/// Lists `.gpx`/`.GPX` files directly inside `dir`, sorted by file name.
pub fn discover_gpx_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("Please verify GPX directory path: {}", dir.display());
    }

    let mut gpx_files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| format!("Failed to list {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let is_gpx = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext == "gpx" || ext == "GPX")
            .unwrap_or(false);

        if is_gpx {
            gpx_files.push(entry.into_path());
        }
    }

    info!("Found {} GPX files to process ...", gpx_files.len());
    Ok(gpx_files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::summarize_track;
    use crate::track_parser::tests::gpx_document;
    use crate::track_parser::{source_id_for, Track};
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::sync::Mutex;
    use std::thread;
    use std::time::Duration;

    fn names(report: &BatchReport) -> Vec<String> {
        report.summaries().map(|s| s.source_id().to_string()).collect()
    }

    #[test]
    fn test_zero_workers_is_normalised() {
        assert_eq!(BatchConfig::with_workers(0).workers, 1);
        assert!(BatchConfig::default().workers >= 1);

        let coordinator = BatchCoordinator::new(BatchConfig { workers: 0 }).unwrap();
        assert_eq!(coordinator.workers(), 1);
    }

    #[test]
    fn test_output_order_is_input_order_not_completion_order() {
        let coordinator = BatchCoordinator::new(BatchConfig::with_workers(4)).unwrap();
        let paths: Vec<PathBuf> = ["a.gpx", "b.gpx", "c.gpx", "d.gpx"]
            .iter()
            .map(PathBuf::from)
            .collect();
        let finished = Mutex::new(Vec::new());

        let report = coordinator.run_with(&paths, |path| {
            let id = source_id_for(path);
            if id == "a.gpx" {
                thread::sleep(Duration::from_millis(300));
            }
            finished.lock().unwrap().push(id.clone());
            Ok(summarize_track(&Track::new(&id, vec![])))
        });

        let finished = finished.into_inner().unwrap();
        assert_eq!(finished.last().map(String::as_str), Some("a.gpx"));
        assert_eq!(names(&report), vec!["a.gpx", "b.gpx", "c.gpx", "d.gpx"]);
    }

    #[test]
    fn test_failure_keeps_its_position() {
        let coordinator = BatchCoordinator::new(BatchConfig::with_workers(2)).unwrap();
        let paths: Vec<PathBuf> = ["ok1.gpx", "bad.gpx", "ok2.gpx"].iter().map(PathBuf::from).collect();

        let report = coordinator.run_with(&paths, |path| {
            let id = source_id_for(path);
            if id == "bad.gpx" {
                return Err(TrackError::MalformedDocument { source_id: id, reason: "boom".into() });
            }
            Ok(summarize_track(&Track::new(&id, vec![])))
        });

        assert_eq!(report.len(), 3);
        assert!(report.items()[0].outcome.is_ok());
        assert!(report.items()[1].outcome.is_err());
        assert!(report.items()[2].outcome.is_ok());
        assert_eq!(report.items()[1].path, PathBuf::from("bad.gpx"));
    }

    #[test]
    fn test_one_malformed_file_does_not_abort_batch() {
        let dir = tempfile::tempdir().unwrap();
        let good = gpx_document(&[(46.85, -121.76, 1600.0), (46.86, -121.75, 1650.0)]);
        for name in ["2020-01-01_A.gpx", "2020-01-02_B.gpx", "2020-01-04_D.gpx"] {
            fs::write(dir.path().join(name), &good).unwrap();
        }
        fs::write(dir.path().join("2020-01-03_C.gpx"), "<gpx><trk><trkseg><trkpt").unwrap();

        let paths = discover_gpx_files(dir.path()).unwrap();
        let report = BatchCoordinator::new(BatchConfig::default()).unwrap().run(&paths);

        assert_eq!(report.len(), 4);
        assert_eq!(report.success_count(), 3);
        assert_eq!(report.failure_count(), 1);
        assert_eq!(
            names(&report),
            vec!["2020-01-01_A.gpx", "2020-01-02_B.gpx", "2020-01-04_D.gpx"]
        );

        let failure = report.failures().next().unwrap();
        assert_eq!(failure.source_id(), "2020-01-03_C.gpx");
    }

    #[test]
    fn test_sequential_matches_parallel() {
        let dir = tempfile::tempdir().unwrap();
        for (i, ele) in [100.0, 200.0, 300.0].iter().enumerate() {
            let doc = gpx_document(&[(10.0, 10.0, *ele), (10.01, 10.0, ele + 25.0)]);
            fs::write(dir.path().join(format!("day{i}_walk.gpx")), doc).unwrap();
        }
        let paths = discover_gpx_files(dir.path()).unwrap();

        let parallel = BatchCoordinator::new(BatchConfig::with_workers(3)).unwrap().run(&paths);
        let sequential = BatchCoordinator::new(BatchConfig::sequential()).unwrap().run(&paths);

        let p: Vec<_> = parallel.summaries().cloned().collect();
        let s: Vec<_> = sequential.summaries().cloned().collect();
        assert_eq!(p, s);
        assert_eq!(p.len(), 3);
    }

    #[test]
    fn test_discovery_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.gpx", "a.GPX", "c.txt", "d.Gpx"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("e.gpx"), "").unwrap();

        let found: Vec<String> = discover_gpx_files(dir.path())
            .unwrap()
            .iter()
            .map(|p| source_id_for(p))
            .collect();

        assert_eq!(found, vec!["a.GPX", "b.gpx"]);
    }

    #[test]
    fn test_discovery_rejects_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_gpx_files(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_empty_batch() {
        let report = BatchCoordinator::new(BatchConfig::sequential()).unwrap().run(&[]);
        assert!(report.is_empty());
    }
}
