mod deployment;
mod edge_target;
mod model_version;
mod training_job;

pub use deployment::DeploymentMemoryPersistence;
pub use edge_target::EdgeTargetMemoryPersistence;
pub use model_version::ModelVersionMemoryPersistence;
pub use training_job::TrainingJobMemoryPersistence;
