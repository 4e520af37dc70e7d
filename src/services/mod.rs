mod deployment;
mod edge_target;
mod model_version;
mod training_job;

pub use deployment::DeploymentService;
pub use edge_target::EdgeTargetService;
pub use model_version::ModelVersionService;
pub use training_job::TrainingJobService;
