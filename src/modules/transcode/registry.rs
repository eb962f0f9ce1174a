use super::error::JobError;
use super::model::{JobStatus, TargetOutcome, TargetProfile, TargetState};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// Everything the result endpoint needs to answer for one job.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub status: JobStatus,
    pub targets: Vec<TargetOutcome>,
    pub submitted_at: OffsetDateTime,
    pub finished_at: Option<OffsetDateTime>,
}

/// In-memory book of submitted jobs. Terminal results stay readable until
/// the retention window lapses, then the janitor sweeps them out.
#[derive(Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<Uuid, JobRecord>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, job_id: Uuid, profiles: &[TargetProfile]) -> Result<(), JobError> {
        let mut jobs = self.jobs.write().unwrap();
        if jobs.contains_key(&job_id) {
            return Err(JobError::DuplicateJob(job_id));
        }
        jobs.insert(
            job_id,
            JobRecord {
                status: JobStatus::Pending,
                targets: profiles
                    .iter()
                    .cloned()
                    .map(TargetOutcome::pending)
                    .collect(),
                submitted_at: OffsetDateTime::now_utc(),
                finished_at: None,
            },
        );
        Ok(())
    }

    pub fn mark_running(&self, job_id: Uuid) {
        if let Some(record) = self.jobs.write().unwrap().get_mut(&job_id) {
            record.status = JobStatus::Running;
            for target in &mut record.targets {
                target.state = TargetState::Running;
            }
        }
    }

    /// Terminal transition. Happens at most once; later calls are ignored.
    pub fn complete(&self, job_id: Uuid, status: JobStatus, targets: Vec<TargetOutcome>) {
        if let Some(record) = self.jobs.write().unwrap().get_mut(&job_id) {
            if record.finished_at.is_some() {
                return;
            }
            record.status = status;
            record.targets = targets;
            record.finished_at = Some(OffsetDateTime::now_utc());
        }
    }

    pub fn get(&self, job_id: Uuid) -> Option<JobRecord> {
        self.jobs.read().unwrap().get(&job_id).cloned()
    }

    /// Drop jobs that have been terminal for longer than `retention`;
    /// returns the removed ids so the caller can drop their progress rows too.
    pub fn expire_finished_before(&self, retention: Duration) -> Vec<Uuid> {
        let cutoff = OffsetDateTime::now_utc() - retention;
        let mut jobs = self.jobs.write().unwrap();
        let expired: Vec<Uuid> = jobs
            .iter()
            .filter(|(_, record)| record.finished_at.is_some_and(|at| at < cutoff))
            .map(|(id, _)| *id)
            .collect();
        for id in &expired {
            jobs.remove(id);
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profiles() -> Vec<TargetProfile> {
        vec![
            TargetProfile::new("720p", 1280, 720),
            TargetProfile::new("360p", 640, 360),
        ]
    }

    #[test]
    fn creating_the_same_job_twice_is_rejected() {
        let registry = JobRegistry::new();
        let job = Uuid::new_v4();

        registry.create(job, &profiles()).unwrap();
        assert!(matches!(
            registry.create(job, &profiles()),
            Err(JobError::DuplicateJob(_))
        ));
    }

    #[test]
    fn new_jobs_start_pending_with_pending_targets() {
        let registry = JobRegistry::new();
        let job = Uuid::new_v4();
        registry.create(job, &profiles()).unwrap();

        let record = registry.get(job).unwrap();
        assert_eq!(record.status, JobStatus::Pending);
        assert!(record.targets.iter().all(|t| t.state == TargetState::Pending));
        assert!(record.finished_at.is_none());
    }

    #[test]
    fn completion_happens_exactly_once() {
        let registry = JobRegistry::new();
        let job = Uuid::new_v4();
        registry.create(job, &profiles()).unwrap();
        registry.mark_running(job);

        registry.complete(job, JobStatus::Failed, vec![]);
        let first_finish = registry.get(job).unwrap().finished_at.unwrap();

        registry.complete(job, JobStatus::Succeeded, vec![]);
        let record = registry.get(job).unwrap();
        assert_eq!(record.status, JobStatus::Failed);
        assert_eq!(record.finished_at, Some(first_finish));
    }

    #[test]
    fn expiry_only_removes_jobs_past_the_retention_window() {
        let registry = JobRegistry::new();
        let finished = Uuid::new_v4();
        let running = Uuid::new_v4();
        registry.create(finished, &profiles()).unwrap();
        registry.create(running, &profiles()).unwrap();
        registry.complete(finished, JobStatus::Succeeded, vec![]);

        // Nothing is old enough yet.
        assert!(registry.expire_finished_before(Duration::seconds(600)).is_empty());

        // With a zero-length window the finished job goes, the running one stays.
        let expired = registry.expire_finished_before(Duration::seconds(-1));
        assert_eq!(expired, vec![finished]);
        assert!(registry.get(finished).is_none());
        assert!(registry.get(running).is_some());
    }
}
