mod deployment;
mod edge_target;
mod model_version;
mod training_job;

pub use deployment::Deployment;
pub use edge_target::EdgeTarget;
pub use model_version::ModelVersion;
pub use training_job::TrainingJob;
