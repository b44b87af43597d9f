use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    pub const UP: Self = Self::new(0.0, 0.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn distance(self, other: Self) -> f32 {
        (other - self).length()
    }

    pub fn lerp(self, to: Self, t: f32) -> Self {
        self + (to - self) * t
    }

    /// Move toward `target` by at most `max_step`. Returns the new point and
    /// whether the target was reached.
    pub fn step_toward(self, target: Self, max_step: f32) -> (Self, bool) {
        let delta = target - self;
        let dist = delta.length();
        if dist <= max_step || dist <= f32::EPSILON {
            return (target, true);
        }
        (self + delta * (max_step / dist), false)
    }
}

impl core::ops::Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl core::ops::Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl core::ops::Mul<f32> for Vec3 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Location plus yaw (degrees, around +Z).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub location: Vec3,
    #[serde(default)]
    pub yaw_deg: f32,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        location: Vec3::ZERO,
        yaw_deg: 0.0,
    };

    pub const fn at(location: Vec3) -> Self {
        Self {
            location,
            yaw_deg: 0.0,
        }
    }

    /// Local point to world space.
    pub fn transform_position(&self, local: Vec3) -> Vec3 {
        let (sin, cos) = self.yaw_deg.to_radians().sin_cos();
        Vec3::new(
            local.x * cos - local.y * sin,
            local.x * sin + local.y * cos,
            local.z,
        ) + self.location
    }

    /// Local yaw to world yaw, normalised to `[0, 360)`.
    pub fn transform_yaw(&self, local_yaw_deg: f32) -> f32 {
        (self.yaw_deg + local_yaw_deg).rem_euclid(360.0)
    }

    /// Compose a local transform into world space.
    pub fn transform(&self, local: &Transform) -> Transform {
        Transform {
            location: self.transform_position(local.location),
            yaw_deg: self.transform_yaw(local.yaw_deg),
        }
    }
}

/// Easing curves for timed interpolations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Easing {
    Linear,
    InOutCubic,
    #[default]
    InOutExpo,
}

impl Easing {
    /// Map linear progress `t` in `[0, 1]` onto the curve.
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::InOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Easing::InOutExpo => {
                if t <= 0.0 {
                    0.0
                } else if t >= 1.0 {
                    1.0
                } else if t < 0.5 {
                    2f32.powf(20.0 * t - 10.0) / 2.0
                } else {
                    (2.0 - 2f32.powf(-20.0 * t + 10.0)) / 2.0
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn yaw_rotates_offsets() {
        let origin = Transform {
            location: Vec3::new(100.0, 0.0, 0.0),
            yaw_deg: 90.0,
        };
        let world = origin.transform_position(Vec3::new(10.0, 0.0, 5.0));
        assert!(close(world.x, 100.0));
        assert!(close(world.y, 10.0));
        assert!(close(world.z, 5.0));
        assert!(close(origin.transform_yaw(300.0), 30.0));
    }

    #[test]
    fn step_toward_stops_on_target() {
        let (p, arrived) = Vec3::ZERO.step_toward(Vec3::new(3.0, 4.0, 0.0), 2.5);
        assert!(!arrived);
        assert!(close(p.length(), 2.5));

        let (p, arrived) = p.step_toward(Vec3::new(3.0, 4.0, 0.0), 10.0);
        assert!(arrived);
        assert_eq!(p, Vec3::new(3.0, 4.0, 0.0));
    }

    #[test]
    fn easing_endpoints() {
        for easing in [Easing::Linear, Easing::InOutCubic, Easing::InOutExpo] {
            assert!(close(easing.apply(0.0), 0.0));
            assert!(close(easing.apply(1.0), 1.0));
            assert!(close(easing.apply(0.5), 0.5));
        }
        assert!(Easing::InOutExpo.apply(0.1) < 0.01);
    }
}
