mod fixture;
mod integrator;
mod rigid_body;
mod sweep;

pub use fixture::Fixture;
pub use integrator::{integrate_position, integrate_velocity};
pub use rigid_body::{Body, BodyDesc, BodyType};
pub use sweep::Sweep;
