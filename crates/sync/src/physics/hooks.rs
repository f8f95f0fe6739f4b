use rapier3d::prelude::*;

/// Drops contacts between the chassis and its own wheels.
#[derive(Debug, Clone, Default)]
pub struct WheelContactFilter {
    chassis: Option<RigidBodyHandle>,
    wheels: Vec<ColliderHandle>,
}

impl WheelContactFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chassis(&self) -> Option<RigidBodyHandle> {
        self.chassis
    }

    pub fn wheels(&self) -> &[ColliderHandle] {
        &self.wheels
    }

    /// Replaces the filtered set. Previous wheels are forgotten.
    pub fn replace(&mut self, chassis: RigidBodyHandle, wheels: Vec<ColliderHandle>) {
        self.chassis = Some(chassis);
        self.wheels = wheels;
    }

    pub fn disables(
        &self,
        body1: Option<RigidBodyHandle>,
        collider1: ColliderHandle,
        body2: Option<RigidBodyHandle>,
        collider2: ColliderHandle,
    ) -> bool {
        let Some(chassis) = self.chassis else {
            return false;
        };

        (body1 == Some(chassis) && self.wheels.contains(&collider2))
            || (body2 == Some(chassis) && self.wheels.contains(&collider1))
    }
}

impl PhysicsHooks for WheelContactFilter {
    fn filter_contact_pair(&self, context: &PairFilterContext) -> Option<SolverFlags> {
        if self.disables(
            context.rigid_body1,
            context.collider1,
            context.rigid_body2,
            context.collider2,
        ) {
            None
        } else {
            Some(SolverFlags::COMPUTE_IMPULSES)
        }
    }
}
