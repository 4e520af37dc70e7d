use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use crate::services::TrainingJobService;

// Background admission loop: promotes pending and queued jobs to running
// whenever per-organization quota allows (one scheduler tick per interval).
#[derive(Debug)]
pub struct AdmissionProcessor {
    pub job_service: Arc<TrainingJobService>,
    pub tick: Duration,
}

impl AdmissionProcessor {
    pub async fn run(&self) {
        loop {
            if let Err(error) = self.job_service.admit_queued(&None).await {
                tracing::error!("admission tick failed: {}", error);
            }

            sleep(self.tick).await;
        }
    }
}
