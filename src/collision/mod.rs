pub mod broad_phase;
pub mod contact;
pub mod continuous;
pub mod filter;
pub mod manifold;
pub mod narrow_phase;

pub use broad_phase::{BroadPhase, BruteForce, DynamicTree, Fattening, SweepAndPrune};
pub use contact::{
    BodyHandle, Contact, ContactKey, ContactPoint, FixtureId, FixtureKey, JointHandle, MAX_CONTACT_POINTS,
};
pub use continuous::{ConservativeAdvancement, TimeOfImpact, TimeOfImpactDetector};
pub use filter::CollisionFilter;
pub use manifold::{ClippingManifoldSolver, Manifold, ManifoldPoint, ManifoldPointId, ManifoldSolver};
pub use narrow_phase::{DistanceDetector, Epa, Gjk, NarrowPhaseDetector, Penetration, Sat, Separation};
