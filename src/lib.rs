//! # RustPhy2D
//!
//! A 2D rigid body collision and constraint kernel written in Rust.
//!
//! ## Features
//!
//! - **Shapes**: circles, convex polygons, rectangles, triangles and segments
//! - **Broad Phase**: brute force, sweep and prune, or a dynamic AABB tree
//! - **Narrow Phase**: GJK with EPA for penetration, or SAT
//! - **Contact Manifolds**: reference-face clipping with stable point ids
//! - **Constraint Solver**: warm-started sequential impulses with block solving
//! - **Joints**: distance, revolute, prismatic, weld, rope, wheel, pulley,
//!   angle, friction and mouse
//! - **Continuous Collision**: conservative advancement for fast bodies
//! - **Sleeping**: islands of resting bodies are skipped until disturbed
//!
//! ## Quick Start
//!
//! ```rust
//! use rustphy2d::prelude::*;
//!
//! let mut world = World::new();
//! world.set_gravity(Vec2::new(0.0, -9.8));
//!
//! // a static floor
//! let floor = BodyDesc::fixed()
//!     .build()
//!     .with_fixture(Fixture::new(Shape::rectangle(20.0, 1.0).unwrap()));
//! world.add_body(floor);
//!
//! // a dynamic ball
//! let ball = BodyDesc::dynamic()
//!     .with_position(Vec2::new(0.0, 5.0))
//!     .build()
//!     .with_fixture(Fixture::new(Shape::circle(0.5).unwrap()));
//! let ball = world.add_body(ball);
//!
//! let dt = 1.0 / 60.0;
//! for _ in 0..300 {
//!     world.step(dt).unwrap();
//! }
//!
//! let y = world.body(ball).unwrap().position().y;
//! assert!((y - 1.0).abs() < 0.05);
//! ```

pub mod bounds;
pub mod collision;
pub mod constraints;
pub mod dynamics;
pub mod error;
pub mod geometry;
pub mod listener;
pub mod math;
pub mod settings;
pub mod solver;
mod world;

pub use error::{PhysicsError, Result};
pub use settings::Settings;
pub use world::{RayCastHit, StepInfo, World, DEFAULT_GRAVITY};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::bounds::{AxisAlignedBounds, Bounds};
    pub use crate::collision::{BodyHandle, CollisionFilter, Contact, ContactPoint, FixtureId, JointHandle};
    pub use crate::constraints::{
        AngleJoint, DistanceJoint, FrictionJoint, Joint, MouseJoint, PrismaticJoint, PulleyJoint, RevoluteJoint,
        RopeJoint, WeldJoint, WheelJoint,
    };
    pub use crate::dynamics::{Body, BodyDesc, BodyType, Fixture};
    pub use crate::error::{PhysicsError, Result};
    pub use crate::geometry::{Aabb, MassProperties, Polygon, Ray, Shape, ShapeType};
    pub use crate::listener::{BoundsListener, ContactListener, StepListener};
    pub use crate::math::{Rotation, Transform, Vec2};
    pub use crate::settings::{ContinuousDetectionMode, Settings};
    pub use crate::world::{RayCastHit, StepInfo, World};
}
