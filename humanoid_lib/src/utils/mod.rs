pub mod actuator_mapping;
pub mod gait_classifier;
pub mod limb_solver;
pub mod pose_codec;
pub mod tracing;

pub use actuator_mapping::*;
pub use gait_classifier::*;
pub use limb_solver::*;
pub use self::tracing::*;
