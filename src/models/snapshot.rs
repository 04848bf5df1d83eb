use super::{Coord, Dimensions, Environment, Path, Survivor};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path as FsPath, PathBuf};
use tracing::instrument;
use uuid::Uuid;

/// Consistent view of a run for visualization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub run_id: Uuid,
    pub captured_at: DateTime<Utc>,
    pub generation: u32,
    pub dimensions: Dimensions,
    pub best_fitness: Option<f64>,
    pub path_length: usize,
    pub best_path: Vec<Coord>,
    pub survivors: Vec<Survivor>,
    pub obstacles: Vec<Coord>,
}

impl Snapshot {
    pub(crate) fn capture(
        run_id: Uuid,
        generation: u32,
        environment: &Environment,
        best: Option<&Path>,
    ) -> Self {
        let best_path = best.map(|p| p.genes().to_vec()).unwrap_or_default();

        Self {
            run_id,
            captured_at: Utc::now(),
            generation,
            dimensions: environment.dimensions(),
            best_fitness: best.map(Path::fitness),
            path_length: best_path.len(),
            best_path,
            survivors: environment.survivors().to_vec(),
            obstacles: environment.obstacles().to_vec(),
        }
    }
}

/// Final best path of a single island, taken once its worker has been joined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IslandSnapshot {
    pub worker_id: usize,
    pub local_generations: u64,
    #[serde(flatten)]
    pub snapshot: Snapshot,
}

impl IslandSnapshot {
    pub(crate) fn capture(
        run_id: Uuid,
        generation: u32,
        environment: &Environment,
        worker_id: usize,
        local_generations: u64,
        best: Option<&Path>,
    ) -> Self {
        Self {
            worker_id,
            local_generations,
            snapshot: Snapshot::capture(run_id, generation, environment, best),
        }
    }
}

/// Receives numbered snapshots during a run, and one island snapshot per worker at the end.
///
/// Snapshots are captured under the shared-state lock and handed to the sink after the
/// lock is released. A failing sink is logged and does not stop the run.
pub trait SnapshotSink: Send {
    fn write(&mut self, sequence: u32, snapshot: &Snapshot) -> anyhow::Result<()>;

    fn write_island(&mut self, _island: &IslandSnapshot) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Writes each snapshot as `snapshot_<sequence>.json` and each island snapshot as
/// `worker_<id>.json` into a directory.
#[derive(Debug, Clone)]
pub struct JsonSnapshotWriter {
    directory: PathBuf,
}

impl JsonSnapshotWriter {
    /// Creates the writer and its output directory.
    pub fn new(directory: impl AsRef<FsPath>) -> anyhow::Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory).with_context(|| {
            format!(
                "Could not create snapshot directory {}",
                directory.display()
            )
        })?;

        Ok(Self { directory })
    }

    pub fn file_for(&self, sequence: u32) -> PathBuf {
        self.directory.join(format!("snapshot_{sequence}.json"))
    }

    pub fn island_file_for(&self, worker_id: usize) -> PathBuf {
        self.directory.join(format!("worker_{worker_id}.json"))
    }
}

impl SnapshotSink for JsonSnapshotWriter {
    #[instrument(level = "debug", skip(self, snapshot), fields(sequence = sequence, generation = snapshot.generation))]
    fn write(&mut self, sequence: u32, snapshot: &Snapshot) -> anyhow::Result<()> {
        let file = self.file_for(sequence);
        let json = serde_json::to_vec_pretty(snapshot)?;
        fs::write(&file, json)
            .with_context(|| format!("Could not write snapshot {}", file.display()))?;

        Ok(())
    }

    #[instrument(level = "debug", skip(self, island), fields(worker_id = island.worker_id))]
    fn write_island(&mut self, island: &IslandSnapshot) -> anyhow::Result<()> {
        let file = self.island_file_for(island.worker_id);
        let json = serde_json::to_vec_pretty(island)?;
        fs::write(&file, json)
            .with_context(|| format!("Could not write island snapshot {}", file.display()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn environment() -> Environment {
        Environment::from_parts(
            Dimensions::new(4, 4, 2).unwrap(),
            vec![Coord::new(1, 1, 0)],
            vec![Survivor {
                position: Coord::new(3, 3, 1),
                priority: 2,
            }],
        )
        .unwrap()
    }

    #[test]
    fn it_captures_the_environment_and_best_path() {
        let env = environment();
        let mut best = Path::new(vec![Coord::new(0, 0, 0), Coord::new(1, 0, 0)]);
        best.fitness = 12.5;

        let snapshot = Snapshot::capture(Uuid::now_v7(), 7, &env, Some(&best));

        assert_eq!(snapshot.generation, 7);
        assert_eq!(snapshot.best_fitness, Some(12.5));
        assert_eq!(snapshot.path_length, 2);
        assert_eq!(snapshot.best_path, best.genes());
        assert_eq!(snapshot.survivors, env.survivors());
        assert_eq!(snapshot.obstacles, vec![Coord::new(1, 1, 0)]);
    }

    #[test]
    fn it_captures_runs_without_a_best_path() {
        let snapshot = Snapshot::capture(Uuid::now_v7(), 0, &environment(), None);

        assert_eq!(snapshot.best_fitness, None);
        assert_eq!(snapshot.path_length, 0);
        assert!(snapshot.best_path.is_empty());
    }

    #[test]
    fn it_writes_island_snapshots_per_worker() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = JsonSnapshotWriter::new(dir.path()).unwrap();
        let mut best = Path::new(vec![Coord::new(0, 0, 0)]);
        best.fitness = 3.0;

        let island = IslandSnapshot::capture(Uuid::now_v7(), 4, &environment(), 2, 20, Some(&best));
        writer.write_island(&island).unwrap();

        let file = dir.path().join("worker_2.json");
        let written: IslandSnapshot =
            serde_json::from_str(&fs::read_to_string(file).unwrap()).unwrap();
        assert_eq!(written, island);
        assert_eq!(written.snapshot.best_fitness, Some(3.0));
        assert_eq!(written.local_generations, 20);
    }
}
