use crate::state::AppState;
use std::time::Duration;
use tracing::{debug, info};

/// Sweeps terminal jobs out of the registry and the progress table once they
/// have been finished for longer than the configured retention window, so a
/// long-running server does not accumulate historical jobs forever.
pub async fn start_janitor(state: AppState) {
    info!("🧹 Starting retention janitor...");

    let retention = time::Duration::seconds(state.config.job_retention_secs as i64);
    let mut ticker = tokio::time::interval(Duration::from_secs(30));

    loop {
        ticker.tick().await;

        let expired = state.jobs.expire_finished_before(retention);
        for job_id in expired {
            state.progress.end_job(job_id);
            debug!("Expired job {job_id} after retention window");
        }
    }
}
