//! Tunables for a synchronized object.

use bevy::math::Vec3;
use serde::{Deserialize, Serialize};

use crate::anchor::{Bone, Hand};
use crate::error::SyncError;
use crate::sync::Pose;

/// When the owner pushes state on its own, beyond the pushes behaviors trigger
/// (teleports, state changes, unexpected accelerations).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PushPolicy {
    /// Only triggered pushes.
    OnDemand,
    /// Also push whenever `interval` seconds passed since the last push.
    Heartbeat { interval: f32 },
}

impl Default for PushPolicy {
    fn default() -> Self {
        Self::Heartbeat { interval: 1.0 }
    }
}

impl PushPolicy {
    pub fn is_due(&self, since_last_push: f32) -> bool {
        match *self {
            Self::OnDemand => false,
            Self::Heartbeat { interval } => since_last_push >= interval,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Length of one interpolation window in seconds. Never shorter than a tick.
    pub interpolation_duration: f32,
    /// Height (along the up axis) at or below which a falling object respawns.
    pub respawn_height: f32,
    /// Where `respawn` puts the object.
    pub spawn: Pose,
    /// Velocity mismatch (m/s) that counts as a non-gravitational acceleration.
    pub acceleration_epsilon: f32,
    /// Distance a sleeping object may sit from its synced pose before it counts as desync.
    pub sleep_drift_tolerance: f32,
    /// Same as `sleep_drift_tolerance`, for rotation (radians).
    pub sleep_angle_tolerance: f32,
    /// Speed above which a resting owned body counts as woken up.
    pub rest_speed: f32,
    pub push_policy: PushPolicy,
    /// Bone used by the bone attachment state.
    pub bone: Bone,
    pub bone_offset: Pose,
    /// Hand used by the held-by-hand state.
    pub held_hand: Hand,
    pub hand_offset: Pose,
    pub playspace_offset: Pose,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interpolation_duration: 0.1,
            respawn_height: -10.0,
            spawn: Pose::from_position(Vec3::new(0.0, 1.0, 0.0)),
            acceleration_epsilon: 0.05,
            sleep_drift_tolerance: 0.01,
            sleep_angle_tolerance: 0.02,
            rest_speed: 0.05,
            push_policy: PushPolicy::default(),
            bone: Bone::Chest,
            bone_offset: Pose::IDENTITY,
            held_hand: Hand::Right,
            hand_offset: Pose::IDENTITY,
            playspace_offset: Pose::IDENTITY,
        }
    }
}

impl SyncConfig {
    /// Parses and validates a JSON config. Missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, SyncError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SyncError> {
        if !(self.interpolation_duration.is_finite() && self.interpolation_duration > 0.0) {
            return Err(SyncError::InvalidConfig(format!(
                "interpolation_duration must be positive, got {}",
                self.interpolation_duration
            )));
        }
        if let PushPolicy::Heartbeat { interval } = self.push_policy {
            if !(interval.is_finite() && interval > 0.0) {
                return Err(SyncError::InvalidConfig(format!(
                    "heartbeat interval must be positive, got {interval}"
                )));
            }
        }
        for (name, value) in [
            ("acceleration_epsilon", self.acceleration_epsilon),
            ("sleep_drift_tolerance", self.sleep_drift_tolerance),
            ("sleep_angle_tolerance", self.sleep_angle_tolerance),
            ("rest_speed", self.rest_speed),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(SyncError::InvalidConfig(format!(
                    "{name} must be non-negative, got {value}"
                )));
            }
        }
        if !self.respawn_height.is_finite() {
            return Err(SyncError::InvalidConfig("respawn_height must be finite".into()));
        }
        Ok(())
    }

    /// Window length actually used: the configured duration, but never below one tick.
    pub fn window_duration(&self, fixed_dt: f32) -> f32 {
        self.interpolation_duration.max(fixed_dt)
    }
}
