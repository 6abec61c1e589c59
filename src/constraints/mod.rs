//! Constraint rows solved by the sequential impulse solver

mod contact_constraint;
pub mod joint;

pub use contact_constraint::ContactConstraint;
pub use joint::{
    AngleJoint, DistanceJoint, FrictionJoint, Joint, JointConstraint, JointKind, MouseJoint,
    PrismaticJoint, PulleyJoint, RevoluteJoint, RopeJoint, WeldJoint, WheelJoint,
};
