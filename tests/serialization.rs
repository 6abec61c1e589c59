#![cfg(feature = "serde")]

use rustphy2d::bounds::AxisAlignedBounds;
use rustphy2d::collision::CollisionFilter;
use rustphy2d::math::{Transform, Vec2};
use rustphy2d::settings::{BroadPhaseKind, ContinuousDetectionMode};
use rustphy2d::Settings;

#[test]
fn test_settings_round_trip() {
    let mut settings = Settings::default();
    settings.set_velocity_iterations(20).expect("iterations");
    settings.set_broad_phase(BroadPhaseKind::SweepAndPrune);
    settings.set_continuous_mode(ContinuousDetectionMode::BulletsOnly);

    let json = serde_json::to_string(&settings).expect("serialize");
    let back: Settings = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, settings);
}

#[test]
fn test_missing_settings_fields_use_defaults() {
    let settings: Settings = serde_json::from_str(r#"{ "position_iterations": 4 }"#).expect("deserialize");
    assert_eq!(settings.position_iterations(), 4);
    assert_eq!(settings.velocity_iterations(), Settings::default().velocity_iterations());
}

#[test]
fn test_invalid_settings_are_rejected() {
    let result: Result<Settings, _> = serde_json::from_str(r#"{ "step_frequency": -30.0 }"#);
    assert!(result.is_err());

    let result: Result<Settings, _> = serde_json::from_str(r#"{ "velocity_iterations": 0 }"#);
    assert!(result.is_err());
}

#[test]
fn test_value_types_round_trip() {
    let transform = Transform::from_position_angle(Vec2::new(1.5, -2.0), 0.75);
    let json = serde_json::to_string(&transform).expect("serialize");
    let back: Transform = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, transform);

    let filter = CollisionFilter {
        category: 0b100,
        mask: 0b011,
    };
    let back: CollisionFilter = serde_json::from_str(&serde_json::to_string(&filter).expect("serialize")).expect("deserialize");
    assert_eq!(back, filter);

    let bounds = AxisAlignedBounds::new(40.0, 20.0);
    let back: AxisAlignedBounds =
        serde_json::from_str(&serde_json::to_string(&bounds).expect("serialize")).expect("deserialize");
    assert_eq!(back, bounds);
}
