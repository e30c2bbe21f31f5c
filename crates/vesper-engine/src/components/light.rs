//! Light sources and their derived falloff/shadow state.

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use vesper_ecs::component::Component;
use vesper_ecs::EcsError;

use crate::shadow::ShadowMapHandle;

/// Near plane of every light-space projection.
pub const LIGHT_SHADOW_MIN_DISTANCE: f32 = 0.1;

/// A light stops contributing once its attenuation drops below
/// `1 / LIGHT_ATTENUATION_CUTOFF` of full intensity.
pub const LIGHT_ATTENUATION_CUTOFF: f32 = 30.0;

/// Max distance of a light that does not attenuate with distance.
pub const UNATTENUATED_MAX_DISTANCE: f32 = 1000.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightType {
    /// Directional light without a position.
    #[default]
    Infinite,
    Point,
    Spot,
    Area,
}

/// `1 / (constant + linear * d + quadratic * d^2)` falloff coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Attenuation {
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Default for Attenuation {
    fn default() -> Self {
        Self {
            constant: 1.0,
            linear: 0.0,
            quadratic: 0.0,
        }
    }
}

impl Attenuation {
    /// Attenuation factor at distance `d`.
    pub fn factor(&self, d: f32) -> f32 {
        1.0 / (self.constant + self.linear * d + self.quadratic * d * d)
    }

    /// Distance at which the factor falls to `1 / LIGHT_ATTENUATION_CUTOFF`.
    ///
    /// Solves `quadratic * x^2 + linear * x + (constant - cutoff) = 0` for the
    /// positive root and clamps it to at least
    /// `LIGHT_SHADOW_MIN_DISTANCE + 1`. A light with neither linear nor
    /// quadratic falloff gets [`UNATTENUATED_MAX_DISTANCE`]. A light that is
    /// already below the cutoff at distance zero gets the minimum.
    pub fn max_distance(&self) -> f32 {
        let min_distance = LIGHT_SHADOW_MIN_DISTANCE + 1.0;
        let a = self.quadratic;
        let b = self.linear;
        let c = self.constant - LIGHT_ATTENUATION_CUTOFF;

        if a == 0.0 && b == 0.0 {
            return UNATTENUATED_MAX_DISTANCE;
        }

        let distance = if a == 0.0 {
            -c / b
        } else {
            let discriminant = b * b - 4.0 * a * c;
            if discriminant < 0.0 {
                tracing::warn!(
                    constant = self.constant,
                    linear = b,
                    quadratic = a,
                    "light never reaches the attenuation cutoff, using minimum distance"
                );
                return min_distance;
            }
            let sqrt_d = discriminant.sqrt();
            let root1 = (-b + sqrt_d) / (2.0 * a);
            let root2 = (-b - sqrt_d) / (2.0 * a);
            if root1 > 0.0 {
                root1
            } else {
                root2
            }
        };

        distance.max(min_distance)
    }
}

/// A light attached to an entity with a [`TransformComponent`](super::TransformComponent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightComponent {
    flags: u32,
    light_type: LightType,
    pub color: Vec3,
    pub energy: f32,
    pub atten: Attenuation,

    #[serde(skip)]
    position: Vec3,
    #[serde(skip)]
    max_distance: f32,
    #[serde(skip)]
    shadow_map: Option<ShadowMapHandle>,
    /// Set while the light wants a shadow map but the pool had none.
    #[serde(skip)]
    shadow_map_pending: bool,
    #[serde(skip)]
    light_space_matrices: [Mat4; 6],
}

impl Default for LightComponent {
    fn default() -> Self {
        Self {
            flags: Self::DIRTY,
            light_type: LightType::Infinite,
            color: Vec3::ONE,
            energy: 1.0,
            atten: Attenuation::default(),
            position: Vec3::ZERO,
            max_distance: 0.0,
            shadow_map: None,
            shadow_map_pending: false,
            light_space_matrices: [Mat4::IDENTITY; 6],
        }
    }
}

impl LightComponent {
    pub const DIRTY: u32 = 1 << 1;
    pub const CAST_SHADOW: u32 = 1 << 2;

    pub fn is_dirty(&self) -> bool {
        self.flags & Self::DIRTY != 0
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        if dirty {
            self.flags |= Self::DIRTY;
        } else {
            self.flags &= !Self::DIRTY;
        }
    }

    pub fn cast_shadow(&self) -> bool {
        self.flags & Self::CAST_SHADOW != 0
    }

    pub fn set_cast_shadow(&mut self, cast: bool) {
        if cast {
            self.flags |= Self::CAST_SHADOW;
        } else {
            self.flags &= !Self::CAST_SHADOW;
        }
        self.set_dirty(true);
    }

    pub fn light_type(&self) -> LightType {
        self.light_type
    }

    pub fn set_light_type(&mut self, light_type: LightType) {
        self.light_type = light_type;
        self.set_dirty(true);
    }

    /// World position, copied from the transform every frame.
    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn max_distance(&self) -> f32 {
        self.max_distance
    }

    pub fn shadow_map(&self) -> Option<ShadowMapHandle> {
        self.shadow_map
    }

    /// Whether the last update wanted a shadow map slot and got none.
    pub fn is_shadow_map_pending(&self) -> bool {
        self.shadow_map_pending
    }

    pub(crate) fn set_shadow_map_pending(&mut self, pending: bool) {
        self.shadow_map_pending = pending;
    }

    pub(crate) fn set_shadow_map(&mut self, handle: Option<ShadowMapHandle>) {
        self.shadow_map = handle;
    }

    /// Light-space view-projection matrices (six cube faces for point lights).
    pub fn light_space_matrices(&self) -> &[Mat4; 6] {
        &self.light_space_matrices
    }

    /// Refresh derived state from the owner's translation.
    ///
    /// Position is always copied. Max distance and shadow matrices are only
    /// recomputed when the light or its transform is dirty, after which the
    /// light's dirty flag is cleared.
    pub fn update(&mut self, translation: Vec3, transform_dirty: bool) {
        self.position = translation;

        if !(self.is_dirty() || transform_dirty) {
            return;
        }

        self.max_distance = self.atten.max_distance();

        if self.cast_shadow() && self.light_type == LightType::Point {
            self.light_space_matrices = point_light_cube_matrices(
                self.position,
                LIGHT_SHADOW_MIN_DISTANCE,
                self.max_distance,
            );
        }

        self.set_dirty(false);
    }
}

impl Component for LightComponent {
    fn on_deserialized(&mut self, _version: u32) -> Result<(), EcsError> {
        self.set_dirty(true);
        Ok(())
    }
}

/// View-projection for each cube face in +X, -X, +Y, -Y, +Z, -Z order.
pub fn point_light_cube_matrices(position: Vec3, near: f32, far: f32) -> [Mat4; 6] {
    const FACES: [(Vec3, Vec3); 6] = [
        (Vec3::X, Vec3::NEG_Y),
        (Vec3::NEG_X, Vec3::NEG_Y),
        (Vec3::Y, Vec3::Z),
        (Vec3::NEG_Y, Vec3::NEG_Z),
        (Vec3::Z, Vec3::NEG_Y),
        (Vec3::NEG_Z, Vec3::NEG_Y),
    ];
    let projection = Mat4::perspective_rh(std::f32::consts::FRAC_PI_2, 1.0, near, far);
    FACES.map(|(direction, up)| projection * Mat4::look_at_rh(position, position + direction, up))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_falloff_uses_hardcoded_distance() {
        let atten = Attenuation {
            constant: 1.0,
            linear: 0.0,
            quadratic: 0.0,
        };
        assert_eq!(atten.max_distance(), 1000.0);
    }

    #[test]
    fn quadratic_root_hits_the_cutoff() {
        let atten = Attenuation {
            constant: 1.0,
            linear: 0.2,
            quadratic: 0.05,
        };
        let d = atten.max_distance();
        assert!((atten.factor(d) - 1.0 / 30.0).abs() < 1e-5);
    }

    #[test]
    fn linear_only_falloff_is_solved_directly() {
        let atten = Attenuation {
            constant: 1.0,
            linear: 0.5,
            quadratic: 0.0,
        };
        assert!((atten.max_distance() - 58.0).abs() < 1e-4);
    }

    #[test]
    fn tiny_distances_are_clamped() {
        let atten = Attenuation {
            constant: 29.9,
            linear: 0.0,
            quadratic: 100.0,
        };
        assert_eq!(atten.max_distance(), LIGHT_SHADOW_MIN_DISTANCE + 1.0);
    }

    #[test]
    fn constant_above_cutoff_falls_back_to_minimum() {
        let atten = Attenuation {
            constant: 40.0,
            linear: 0.1,
            quadratic: 1.0,
        };
        assert_eq!(atten.max_distance(), LIGHT_SHADOW_MIN_DISTANCE + 1.0);
    }

    #[test]
    fn update_only_recomputes_when_dirty() {
        let mut light = LightComponent::default();
        light.atten.linear = 0.5;
        light.update(Vec3::new(1.0, 2.0, 3.0), false);
        assert!(!light.is_dirty());
        let first = light.max_distance();

        light.atten.linear = 1.0;
        light.update(Vec3::new(4.0, 5.0, 6.0), false);
        assert_eq!(light.position(), Vec3::new(4.0, 5.0, 6.0));
        assert_eq!(light.max_distance(), first);

        light.update(Vec3::ZERO, true);
        assert!(light.max_distance() < first);
    }

    #[test]
    fn point_shadow_matrices_look_down_each_axis() {
        let matrices = point_light_cube_matrices(Vec3::ZERO, 0.1, 10.0);
        // A point in front of the +X face projects to the centre of that face.
        let clip = matrices[0] * glam::Vec4::new(5.0, 0.0, 0.0, 1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }
}
