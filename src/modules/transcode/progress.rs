use super::error::JobError;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;
use uuid::Uuid;

/// Process-wide table of per-target completion percentages, keyed by job id.
///
/// Cheap to clone; all clones share one table. A row is created when a job
/// starts, written by in-flight targets, read by the poll endpoint, and
/// removed by the retention janitor once the job has been terminal for the
/// retention window. Targets of the same job write disjoint slots, so a
/// single lock around the map is all the coordination needed.
#[derive(Clone, Default)]
pub struct ProgressTable {
    slots: Arc<RwLock<HashMap<Uuid, Vec<f32>>>>,
}

impl ProgressTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_job(&self, job_id: Uuid, target_count: usize) -> Result<(), JobError> {
        let mut slots = self.slots.write().unwrap();
        if slots.contains_key(&job_id) {
            return Err(JobError::DuplicateJob(job_id));
        }
        slots.insert(job_id, vec![0.0; target_count]);
        Ok(())
    }

    /// Record one progress report, clamped to [0, 100], last writer wins.
    ///
    /// Unknown jobs and out-of-range indices are dropped with a log line:
    /// a late event arriving after removal must never take the caller down.
    pub fn report(&self, job_id: Uuid, target_index: usize, percent: f32) {
        let mut slots = self.slots.write().unwrap();
        match slots.get_mut(&job_id) {
            Some(row) if target_index < row.len() => {
                row[target_index] = percent.clamp(0.0, 100.0);
            }
            _ => debug!("Dropping progress report for untracked job {job_id} (target {target_index})"),
        }
    }

    /// Pin a finished target to 100, whatever its last raw report said.
    pub fn mark_done(&self, job_id: Uuid, target_index: usize) {
        self.report(job_id, target_index, 100.0);
    }

    /// Job-level percentage: the average of the per-target slots.
    pub fn overall(&self, job_id: Uuid) -> Option<f32> {
        let slots = self.slots.read().unwrap();
        slots.get(&job_id).map(|row| {
            if row.is_empty() {
                0.0
            } else {
                row.iter().sum::<f32>() / row.len() as f32
            }
        })
    }

    pub fn snapshot(&self, job_id: Uuid) -> Option<Vec<f32>> {
        self.slots.read().unwrap().get(&job_id).cloned()
    }

    pub fn end_job(&self, job_id: Uuid) {
        self.slots.write().unwrap().remove(&job_id);
    }
}
