use std::f32::consts::{PI, TAU};
use std::time::Instant;

use crate::coords::{ColorRgba, Vec3};

/// Sun state for one moment of the day.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Daylight {
    /// Direction the light travels.
    pub direction: Vec3,
    pub colour: ColorRgba,
    pub ambient: ColorRgba,
    /// Ambient strength relative to full day, `0..=1`.
    pub attenuation: f32,
}

/// Day cycle position in `[0, 1)`, optionally advancing with wall time.
///
/// `0.0` is midnight-ish darkness; the sun rises at `0.25` and sets at `0.75`.
#[derive(Debug, Clone)]
pub struct TimeOfDay {
    t: f32,
    /// Cycles per second.
    speed: f32,
    last: Option<Instant>,
}

const DIFFUSE: f32 = 0.4;
const AMBIENT: f32 = 0.2;
const SUN_DISTANCE: f32 = 1000.0;
const SUN_AZIMUTH: f32 = -1.5;
const PHASE_OFFSET: f32 = 0.75;

impl TimeOfDay {
    pub const NIGHT_DIRECTION: Vec3 = Vec3 { x: 1.0, y: 3.0, z: -5.0 };
    pub const NIGHT_COLOUR: ColorRgba = ColorRgba::rgb(0.2 * 0.25, 0.2 * 0.25, 0.2 * 0.4);

    pub fn new(t: f32) -> Self {
        Self { t: t.rem_euclid(1.0), speed: 0.0, last: None }
    }

    pub fn set(&mut self, t: f32) {
        self.t = t.rem_euclid(1.0);
    }

    #[inline]
    pub fn get(&self) -> f32 {
        self.t
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    /// Advances by `speed × elapsed` since the previous call.
    pub fn update(&mut self, now: Instant) {
        let last = self.last.replace(now).unwrap_or(now);
        if self.speed != 0.0 {
            let elapsed = now.saturating_duration_since(last).as_secs_f32();
            self.set(self.t + self.speed * elapsed);
        }
    }

    /// Sun direction, colours and ambient attenuation.
    ///
    /// Dawn and dusk ramp the sun in and out; at night everything is zero and
    /// the direction is a fixed `(-1, -1, -1)`.
    pub fn daylight(&self) -> Daylight {
        let t = (self.t + PHASE_OFFSET) % 1.0;
        let a = t * TAU;
        let z = a.sin() * SUN_DISTANCE;
        let p = a.cos() * SUN_DISTANCE;
        let x = SUN_AZIMUTH.cos() * p;
        let y = SUN_AZIMUTH.sin() * p;

        let ramp = |phase: f32| (40.0 * phase / PI).sin().max(0.0);
        let (k, direction) = if t < 0.125 {
            (ramp(t), Vec3::new(-x, -y, -z))
        } else if t < 0.375 {
            (1.0, Vec3::new(-x, -y, -z))
        } else if t < 0.5 {
            (ramp(t + 0.25), Vec3::new(-x, -y, -z))
        } else {
            (0.0, Vec3::new(-1.0, -1.0, -1.0))
        };

        let grey = |v: f32| ColorRgba::rgb(v, v, v);
        Daylight {
            direction,
            colour: grey(DIFFUSE * k),
            ambient: grey(AMBIENT * k),
            attenuation: k,
        }
    }

    /// Fixed moonlight.
    pub fn nightlight(&self) -> (Vec3, ColorRgba) {
        (Self::NIGHT_DIRECTION, Self::NIGHT_COLOUR)
    }
}

impl Default for TimeOfDay {
    fn default() -> Self {
        Self::new(0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn midday_is_full_strength() {
        let d = TimeOfDay::new(0.5).daylight();
        assert!(close(d.colour.r, DIFFUSE));
        assert!(close(d.ambient.r, AMBIENT));
        assert!(close(d.attenuation, 1.0));
        assert!(d.direction.z < 0.0, "sun above the scene shines down");
    }

    #[test]
    fn night_is_dark_with_fixed_direction() {
        let d = TimeOfDay::new(0.0).daylight();
        assert_eq!(d.colour, ColorRgba::black());
        assert_eq!(d.attenuation, 0.0);
        assert_eq!(d.direction, Vec3::new(-1.0, -1.0, -1.0));
    }

    #[test]
    fn dawn_ramps_up() {
        let early = TimeOfDay::new(0.26).daylight();
        let later = TimeOfDay::new(0.36).daylight();
        assert!(early.attenuation < later.attenuation);
        assert!(early.attenuation > 0.0);
    }

    #[test]
    fn update_advances_by_speed() {
        let mut tod = TimeOfDay::new(0.1);
        tod.set_speed(0.5);
        let start = Instant::now();
        tod.update(start);
        tod.update(start + Duration::from_millis(200));
        assert!(close(tod.get(), 0.2));
    }

    #[test]
    fn update_without_speed_is_frozen() {
        let mut tod = TimeOfDay::new(0.3);
        let start = Instant::now();
        tod.update(start);
        tod.update(start + Duration::from_secs(5));
        assert_eq!(tod.get(), 0.3);
    }

    #[test]
    fn set_wraps_into_unit_range() {
        let mut tod = TimeOfDay::default();
        tod.set(1.25);
        assert!(close(tod.get(), 0.25));
    }
}
