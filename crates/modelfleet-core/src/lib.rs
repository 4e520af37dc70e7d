mod errors;
mod event_stream;
mod events;
mod external;
mod messages;
mod status;

pub mod test;

pub use errors::OrchestratorError;
pub use event_stream::EventStream;
pub use events::{create_event, decode_event_model, Event, EventType, ModelType, OperationId};
pub use external::{
    DatasetDirectory, FleetRegistry, InstallAgent, MinimumAccuracyGate, QualityGate,
    TrainingExecutor,
};
pub use messages::*;
pub use status::{DeploymentStatus, FailureKind, JobStatus, RolloutStatus, VersionStatus};
