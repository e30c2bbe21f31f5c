//! Keyframe animation players.
//!
//! An [`AnimationComponent`] owns a set of [`Sampler`]s (keyframe times plus
//! packed values) and [`Channel`]s binding a sampler to one TRS property of
//! a target entity. Keyframe times are expected in ascending order; the
//! bracketing search is a linear scan that picks the latest key at or before
//! the playhead and the earliest key at or after it, independently.

use glam::{Quat, Vec3, Vec4};
use serde::{Deserialize, Serialize};
use vesper_ecs::component::Component;
use vesper_ecs::entity::Entity;
use vesper_ecs::EcsError;

use crate::math::saturate;

/// Which transform property a channel drives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelPath {
    Translation,
    Rotation,
    Scale,
    /// Imported channel the engine cannot drive; skipped.
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub path: ChannelPath,
    pub target_id: Entity,
    pub sampler_index: usize,
}

/// Keyframe times and their values, packed three floats per key for
/// translation/scale and four (x, y, z, w) for rotation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sampler {
    pub keyframe_times: Vec<f32>,
    pub keyframe_data: Vec<f32>,
}

/// Result of locating the playhead between two keyframes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyframeBracket {
    pub left: usize,
    pub right: usize,
    /// Interpolation parameter in `[0, 1]`.
    pub t: f32,
}

impl Sampler {
    /// Locate `timer` between two keyframes.
    ///
    /// Returns `None` when there are no keys or `timer` is before the first
    /// keyframe time. Past the last key both ends clamp to it.
    pub fn bracket(&self, timer: f32) -> Option<KeyframeBracket> {
        let mut time_first = f32::MAX;
        let mut time_left = f32::MIN;
        let mut time_right = f32::MAX;
        let mut left = 0;
        let mut right = 0;

        for (k, &time) in self.keyframe_times.iter().enumerate() {
            time_first = time_first.min(time);
            if time <= timer && time > time_left {
                time_left = time;
                left = k;
            }
            if time >= timer && time < time_right {
                time_right = time;
                right = k;
            }
        }

        if self.keyframe_times.is_empty() || timer < time_first {
            return None;
        }

        // Past the last key nothing is >= timer; hold the last key.
        if time_right == f32::MAX {
            right = left;
        }

        let t = if left != right {
            let l = self.keyframe_times[left];
            let r = self.keyframe_times[right];
            (timer - l) / (r - l)
        } else {
            0.0
        };

        Some(KeyframeBracket {
            left,
            right,
            t: saturate(t),
        })
    }

    fn vec3(&self, key: usize) -> Vec3 {
        Vec3::from_slice(&self.keyframe_data[key * 3..key * 3 + 3])
    }

    fn vec4(&self, key: usize) -> Vec4 {
        Vec4::from_slice(&self.keyframe_data[key * 4..key * 4 + 4])
    }
}

/// An interpolated channel value ready to be written to a transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnimatedValue {
    Translation(Vec3),
    Rotation(Quat),
    Scale(Vec3),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationComponent {
    pub flags: u32,
    pub start: f32,
    pub end: f32,
    pub timer: f32,
    pub amount: f32,
    pub speed: f32,
    pub channels: Vec<Channel>,
    pub samplers: Vec<Sampler>,
}

impl Default for AnimationComponent {
    fn default() -> Self {
        Self {
            flags: Self::LOOPED,
            start: 0.0,
            end: 0.0,
            timer: 0.0,
            amount: 1.0,
            speed: 1.0,
            channels: Vec::new(),
            samplers: Vec::new(),
        }
    }
}

impl AnimationComponent {
    pub const PLAYING: u32 = 1 << 0;
    pub const LOOPED: u32 = 1 << 1;

    pub fn is_playing(&self) -> bool {
        self.flags & Self::PLAYING != 0
    }

    pub fn is_looped(&self) -> bool {
        self.flags & Self::LOOPED != 0
    }

    pub fn play(&mut self) {
        self.flags |= Self::PLAYING;
    }

    pub fn stop(&mut self) {
        self.flags &= !Self::PLAYING;
    }

    pub fn set_looped(&mut self, looped: bool) {
        if looped {
            self.flags |= Self::LOOPED;
        } else {
            self.flags &= !Self::LOOPED;
        }
    }

    /// Interpolated value of every drivable channel at the current playhead.
    ///
    /// Channels whose sampler has no key at or before the playhead are
    /// skipped, as are `Unknown` paths.
    ///
    /// # Panics
    ///
    /// Panics if a channel references a missing sampler or a sampler's data
    /// length does not match its key count.
    pub fn sample(&self) -> Vec<(Entity, AnimatedValue)> {
        let mut out = Vec::with_capacity(self.channels.len());
        for channel in &self.channels {
            if channel.path == ChannelPath::Unknown {
                continue;
            }
            assert!(
                channel.sampler_index < self.samplers.len(),
                "channel references sampler {} of {}",
                channel.sampler_index,
                self.samplers.len()
            );
            let sampler = &self.samplers[channel.sampler_index];
            let Some(KeyframeBracket { left, right, t }) = sampler.bracket(self.timer) else {
                continue;
            };

            let keys = sampler.keyframe_times.len();
            let value = match channel.path {
                ChannelPath::Translation | ChannelPath::Scale => {
                    assert_eq!(sampler.keyframe_data.len(), keys * 3, "vec3 sampler size mismatch");
                    let v = sampler.vec3(left).lerp(sampler.vec3(right), t);
                    if channel.path == ChannelPath::Translation {
                        AnimatedValue::Translation(v)
                    } else {
                        AnimatedValue::Scale(v)
                    }
                }
                ChannelPath::Rotation => {
                    assert_eq!(sampler.keyframe_data.len(), keys * 4, "quat sampler size mismatch");
                    let v = sampler.vec4(left).lerp(sampler.vec4(right), t);
                    AnimatedValue::Rotation(Quat::from_vec4(v).normalize())
                }
                ChannelPath::Unknown => continue,
            };
            out.push((channel.target_id, value));
        }
        out
    }

    /// Wrap a looped playhead past `end`, then advance it if playing.
    pub fn advance(&mut self, dt: f32) {
        if self.is_looped() && self.timer > self.end {
            self.timer = self.start;
        }
        if self.is_playing() {
            self.timer += dt * self.speed;
        }
    }
}

impl Component for AnimationComponent {
    /// Reject clips that [`sample`](AnimationComponent::sample) would panic on.
    fn on_deserialized(&mut self, _version: u32) -> Result<(), EcsError> {
        for (index, channel) in self.channels.iter().enumerate() {
            let width = match channel.path {
                ChannelPath::Translation | ChannelPath::Scale => 3,
                ChannelPath::Rotation => 4,
                ChannelPath::Unknown => continue,
            };
            let reason = match self.samplers.get(channel.sampler_index) {
                None => format!(
                    "channel {index} references sampler {} of {}",
                    channel.sampler_index,
                    self.samplers.len()
                ),
                Some(sampler) if sampler.keyframe_data.len() != sampler.keyframe_times.len() * width => {
                    format!(
                        "channel {index} needs {} values, sampler has {}",
                        sampler.keyframe_times.len() * width,
                        sampler.keyframe_data.len()
                    )
                }
                Some(_) => continue,
            };
            return Err(EcsError::InvalidData {
                component: "AnimationComponent",
                reason,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_sampler() -> Sampler {
        Sampler {
            keyframe_times: vec![0.0, 1.0, 2.0],
            keyframe_data: vec![0.0, 0.0, 0.0, 10.0, 0.0, 0.0, 10.0, 20.0, 0.0],
        }
    }

    #[test]
    fn bracket_interpolates_between_neighbours() {
        let b = linear_sampler().bracket(1.5).unwrap();
        assert_eq!((b.left, b.right), (1, 2));
        assert!((b.t - 0.5).abs() < 1e-6);
    }

    #[test]
    fn bracket_on_exact_key_has_zero_t() {
        let b = linear_sampler().bracket(1.0).unwrap();
        assert_eq!((b.left, b.right), (1, 1));
        assert_eq!(b.t, 0.0);
    }

    #[test]
    fn bracket_before_first_key_is_none() {
        let sampler = Sampler {
            keyframe_times: vec![0.5, 1.0],
            keyframe_data: vec![0.0; 6],
        };
        assert!(sampler.bracket(0.25).is_none());
        assert!(Sampler::default().bracket(0.0).is_none());
    }

    #[test]
    fn bracket_after_last_key_holds_last_value() {
        let b = linear_sampler().bracket(5.0).unwrap();
        assert_eq!((b.left, b.right), (2, 2));
    }

    #[test]
    fn sample_skips_unknown_paths() {
        let mut anim = AnimationComponent::default();
        anim.samplers.push(linear_sampler());
        anim.channels.push(Channel {
            path: ChannelPath::Unknown,
            target_id: Entity::from_raw(7),
            sampler_index: 0,
        });
        assert!(anim.sample().is_empty());
    }

    #[test]
    fn rotation_channel_yields_unit_quaternion() {
        let half = std::f32::consts::FRAC_1_SQRT_2;
        let mut anim = AnimationComponent::default();
        anim.samplers.push(Sampler {
            keyframe_times: vec![0.0, 1.0],
            keyframe_data: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, half, half],
        });
        anim.channels.push(Channel {
            path: ChannelPath::Rotation,
            target_id: Entity::from_raw(3),
            sampler_index: 0,
        });
        anim.timer = 0.5;
        let values = anim.sample();
        let AnimatedValue::Rotation(q) = values[0].1 else {
            panic!("expected rotation");
        };
        assert!(q.is_normalized());
    }

    #[test]
    fn loaded_clip_with_bad_channel_is_rejected() {
        let mut anim = AnimationComponent::default();
        anim.samplers.push(linear_sampler());
        anim.channels.push(Channel {
            path: ChannelPath::Translation,
            target_id: Entity::from_raw(3),
            sampler_index: 0,
        });
        assert!(anim.on_deserialized(0).is_ok());

        anim.channels[0].path = ChannelPath::Rotation;
        assert!(matches!(
            anim.on_deserialized(0),
            Err(EcsError::InvalidData { component: "AnimationComponent", .. })
        ));

        anim.channels[0].path = ChannelPath::Scale;
        anim.channels[0].sampler_index = 4;
        let err = anim.on_deserialized(0).unwrap_err();
        assert!(err.to_string().contains("sampler 4 of 1"));
    }

    #[test]
    fn advance_wraps_looped_and_moves_playing() {
        let mut anim = AnimationComponent {
            start: 0.0,
            end: 1.0,
            timer: 1.5,
            speed: 2.0,
            ..Default::default()
        };
        anim.play();
        anim.advance(0.25);
        assert_eq!(anim.timer, 0.5);

        anim.stop();
        anim.advance(0.25);
        assert_eq!(anim.timer, 0.5);
    }
}
