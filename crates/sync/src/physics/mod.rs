mod body;
mod hooks;
mod rig;
mod step;
mod wheels;
mod world;

pub use body::{Transform, VehicleBody};
pub use hooks::WheelContactFilter;
pub use rig::{ChassisBody, RigDesc, VehicleRig};
pub use step::{StepBuffers, StepOutput};
pub use wheels::{Wheel, WheelCollaborator, WheelRequests};
pub use world::{PhysicsWorld, SetupError};
