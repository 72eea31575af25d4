use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Amount of floats in a configuration.
pub const STATE_LEN: usize = 7;

/// A rigid body configuration: translation `(x, y, z)` followed by a unit
/// quaternion `(w, x, y, z)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct State([f32; STATE_LEN]);

impl State {
    /// The identity configuration at the origin.
    pub const IDENTITY: Self = Self([0., 0., 0., 1., 0., 0., 0.]);

    /// Wraps a raw configuration vector as is.
    pub fn new(raw: [f32; STATE_LEN]) -> Self {
        Self(raw)
    }

    /// Builds a configuration from its parts, normalizing the rotation.
    pub fn from_parts(translation: Vec3, rotation: Quat) -> Self {
        let q = rotation.normalize();
        Self([translation.x, translation.y, translation.z, q.w, q.x, q.y, q.z])
    }

    pub fn translation(&self) -> Vec3 {
        Vec3::new(self.0[0], self.0[1], self.0[2])
    }

    /// The normalized rotation of this configuration.
    pub fn rotation(&self) -> Quat {
        let [.., w, x, y, z] = self.0;
        Quat::from_xyzw(x, y, z, w).normalize()
    }

    pub fn as_array(&self) -> &[f32; STATE_LEN] {
        &self.0
    }

    /// Translation distance plus half the rotation angle between both configurations.
    pub fn distance(&self, other: &State) -> f32 {
        let tr = self.translation().distance(other.translation());
        let dot = self.rotation().dot(other.rotation()).abs().min(1.);
        tr + dot.acos()
    }
}

impl From<[f32; STATE_LEN]> for State {
    fn from(raw: [f32; STATE_LEN]) -> Self {
        Self(raw)
    }
}
