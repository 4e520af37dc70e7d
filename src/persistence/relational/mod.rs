mod deployment;
mod edge_target;
mod model_version;
mod training_job;

pub use deployment::DeploymentRelationalPersistence;
pub use edge_target::EdgeTargetRelationalPersistence;
pub use model_version::ModelVersionRelationalPersistence;
pub use training_job::TrainingJobRelationalPersistence;
