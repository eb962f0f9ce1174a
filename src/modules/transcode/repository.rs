use crate::infrastructure::db::pool::DbPool;
use uuid::Uuid;

/// Registers finished artifacts with the relational collaborator.
///
/// Registration is best-effort bookkeeping: a failure here is logged by the
/// caller and never demotes a target whose artifact already stored.
pub struct ArtifactRepository;

impl ArtifactRepository {
    pub async fn record_artifact(
        db: &DbPool,
        job_id: Uuid,
        uploader: Option<&str>,
        filename: &str,
        locator: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO artifacts (job_id, uploader, filename, locator, created_at)
             VALUES ($1, $2, $3, $4, NOW())",
        )
        .bind(job_id)
        .bind(uploader)
        .bind(filename)
        .bind(locator)
        .execute(db)
        .await?;

        Ok(())
    }
}
