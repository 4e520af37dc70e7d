mod admission;
mod rollout;

pub use admission::AdmissionProcessor;
pub use rollout::RolloutProcessor;
