mod aabb;
mod feature;
mod hull;
mod mass;
mod polygon;
mod ray;
mod shape;

pub use aabb::Aabb;
pub use feature::{EdgeFeature, Feature, Interval, PointFeature};
pub use hull::convex_hull;
pub use mass::{MassProperties, MassType};
pub use polygon::{Polygon, Triangle};
pub use ray::{Ray, RayHit};
pub use shape::{closest_point_on_segment, Circle, Segment, Shape, ShapeType};
