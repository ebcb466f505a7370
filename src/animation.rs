//! Animation scalars and the model matrices derived from them.
//!
//! The scene is driven by three numbers: the sun's rotation angle and the
//! horizontal offsets of the robot and the cone. [`AnimationState::advance`]
//! moves them forward by a frame delta, rebuilds the three model matrices and
//! then wraps the offsets once the robot leaves the right edge.
//!
//! The matrices of a frame are always built *before* the wrap of that frame,
//! so a reset only becomes visible on the next call to `advance`.

use cgmath::{Deg, Matrix4, SquareMatrix, Vector3};

/// Constants that shape the animation.
///
/// The `Default` values describe the demo scene. Everything is expressed in
/// world units of the orthographic projection (see [`crate::camera`]).
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationConfig {
    /// Degrees per second the sun spins counter-clockwise.
    pub sun_spin_deg_per_sec: f32,
    /// Units per second both sliding sprites move to the right.
    pub slide_speed: f32,
    pub sun_position: Vector3<f32>,
    pub sun_scale: Vector3<f32>,
    pub robot_scale: Vector3<f32>,
    pub cone_scale: Vector3<f32>,
    /// Vertical offset of the sliding sprites, applied before their scale.
    pub ground_y: f32,
    pub robot_start_x: f32,
    pub cone_start_x: f32,
    /// Once `robot_x` exceeds this, the robot (and possibly the cone) wraps.
    pub wrap_threshold: f32,
    pub robot_reset_x: f32,
    pub cone_reset_x: f32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            sun_spin_deg_per_sec: 60.0,
            slide_speed: 1.5,
            sun_position: Vector3::new(-3.9, 2.7, 0.0),
            sun_scale: Vector3::new(2.3, 2.3, 1.0),
            robot_scale: Vector3::new(1.5, 1.3, 1.0),
            cone_scale: Vector3::new(1.5, 1.2, 1.0),
            ground_y: -1.0,
            robot_start_x: -5.0,
            cone_start_x: -4.0,
            wrap_threshold: 4.8,
            robot_reset_x: -4.6,
            cone_reset_x: -3.6,
        }
    }
}

/// The mutable animation scalars together with the matrices of the last frame.
#[derive(Clone, Debug)]
pub struct AnimationState {
    config: AnimationConfig,
    sun_rotate: f32,
    robot_x: f32,
    cone_x: f32,
    sun: Matrix4<f32>,
    robot: Matrix4<f32>,
    cone: Matrix4<f32>,
}

impl AnimationState {
    /// Start a new animation. All matrices are identity until the first
    /// [`advance`](Self::advance).
    pub fn new(config: AnimationConfig) -> Self {
        Self {
            sun_rotate: 0.0,
            robot_x: config.robot_start_x,
            cone_x: config.cone_start_x,
            sun: Matrix4::identity(),
            robot: Matrix4::identity(),
            cone: Matrix4::identity(),
            config,
        }
    }

    /// Advance by `dt` seconds.
    ///
    /// Negative or non-finite deltas are treated as zero so that a clock hiccup
    /// never moves the sprites backwards.
    pub fn advance(&mut self, dt: f32) {
        let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };
        let cfg = &self.config;

        self.sun_rotate = (self.sun_rotate + cfg.sun_spin_deg_per_sec * dt) % 360.0;
        self.robot_x += cfg.slide_speed * dt;
        self.cone_x += cfg.slide_speed * dt;

        self.sun = sun_matrix(cfg, self.sun_rotate);
        self.robot = slide_matrix(cfg.robot_scale, self.robot_x, cfg.ground_y);
        self.cone = slide_matrix(cfg.cone_scale, self.cone_x, cfg.ground_y);

        if self.robot_x > cfg.wrap_threshold {
            if self.cone_x > cfg.wrap_threshold {
                self.cone_x = cfg.cone_reset_x;
            }
            self.robot_x = cfg.robot_reset_x;
            log::debug!("robot wrapped, cone at {}", self.cone_x);
        }
    }

    pub fn sun_rotate(&self) -> f32 {
        self.sun_rotate
    }

    pub fn robot_x(&self) -> f32 {
        self.robot_x
    }

    pub fn cone_x(&self) -> f32 {
        self.cone_x
    }

    pub fn sun_matrix(&self) -> Matrix4<f32> {
        self.sun
    }

    pub fn robot_matrix(&self) -> Matrix4<f32> {
        self.robot
    }

    pub fn cone_matrix(&self) -> Matrix4<f32> {
        self.cone
    }

    pub fn config(&self) -> &AnimationConfig {
        &self.config
    }
}

impl Default for AnimationState {
    fn default() -> Self {
        Self::new(AnimationConfig::default())
    }
}

/// translate * scale * rotate: the sun spins around its own centre.
fn sun_matrix(cfg: &AnimationConfig, angle: f32) -> Matrix4<f32> {
    let s = cfg.sun_scale;
    Matrix4::from_translation(cfg.sun_position)
        * Matrix4::from_nonuniform_scale(s.x, s.y, s.z)
        * Matrix4::from_angle_z(Deg(angle))
}

/// scale * translate: the offset itself is scaled, so a slide of `x` covers
/// `x * scale.x` world units.
fn slide_matrix(scale: Vector3<f32>, x: f32, y: f32) -> Matrix4<f32> {
    Matrix4::from_nonuniform_scale(scale.x, scale.y, scale.z)
        * Matrix4::from_translation(Vector3::new(x, y, 0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cgmath::{Point3, Transform};

    fn apply(m: Matrix4<f32>, x: f32, y: f32) -> Point3<f32> {
        m.transform_point(Point3::new(x, y, 0.0))
    }

    #[test]
    fn starts_at_configured_offsets() {
        let state = AnimationState::default();
        assert_eq!(state.robot_x(), -5.0);
        assert_eq!(state.cone_x(), -4.0);
        assert_eq!(state.sun_rotate(), 0.0);
        assert_eq!(state.robot_matrix(), Matrix4::identity());
    }

    #[test]
    fn advances_linearly_with_dt() {
        let mut state = AnimationState::default();
        state.advance(0.5);
        assert_relative_eq!(state.sun_rotate(), 30.0);
        assert_relative_eq!(state.robot_x(), -4.25);
        assert_relative_eq!(state.cone_x(), -3.25);
    }

    #[test]
    fn ignores_negative_and_nan_dt() {
        let mut state = AnimationState::default();
        state.advance(-1.0);
        state.advance(f32::NAN);
        assert_eq!(state.robot_x(), -5.0);
        assert_eq!(state.sun_rotate(), 0.0);
    }

    #[test]
    fn robot_offset_is_scaled() {
        let mut state = AnimationState::default();
        state.advance(2.0);
        // robot_x = -2.0, scaled by 1.5 on x and the ground by 1.3 on y
        let centre = apply(state.robot_matrix(), 0.0, 0.0);
        assert_relative_eq!(centre.x, -3.0, epsilon = 1e-5);
        assert_relative_eq!(centre.y, -1.3, epsilon = 1e-5);
        let corner = apply(state.robot_matrix(), 0.5, 0.5);
        assert_relative_eq!(corner.x, -2.25, epsilon = 1e-5);
    }

    #[test]
    fn sun_spins_around_its_centre() {
        let mut state = AnimationState::default();
        state.advance(1.5);
        let centre = apply(state.sun_matrix(), 0.0, 0.0);
        assert_relative_eq!(centre.x, -3.9, epsilon = 1e-5);
        assert_relative_eq!(centre.y, 2.7, epsilon = 1e-5);
        // 90 degrees: the right edge midpoint ends up above the centre
        let edge = apply(state.sun_matrix(), 0.5, 0.0);
        assert_relative_eq!(edge.x, -3.9, epsilon = 1e-4);
        assert_relative_eq!(edge.y, 2.7 + 1.15, epsilon = 1e-4);
    }

    #[test]
    fn rotation_stays_below_full_turn() {
        let mut state = AnimationState::default();
        for _ in 0..100 {
            state.advance(1.0);
        }
        assert!(state.sun_rotate() >= 0.0 && state.sun_rotate() < 360.0);
        assert_relative_eq!(state.sun_rotate(), 6000.0 % 360.0, epsilon = 1e-3);
    }

    #[test]
    fn matrices_are_built_before_the_wrap() {
        let mut state = AnimationState::default();
        // robot_x = -5 + 1.5 * 6.6 = 4.9, cone_x = 5.9
        state.advance(6.6);
        assert_relative_eq!(state.robot_x(), -4.6);
        assert_relative_eq!(state.cone_x(), -3.6);
        let robot = apply(state.robot_matrix(), 0.0, 0.0);
        assert_relative_eq!(robot.x, 4.9 * 1.5, epsilon = 1e-4);
    }

    #[test]
    fn cone_only_wraps_together_with_robot() {
        let cfg = AnimationConfig {
            cone_start_x: 4.0,
            robot_start_x: 0.0,
            ..Default::default()
        };
        let mut state = AnimationState::new(cfg);
        // cone passes the threshold but the robot does not
        state.advance(1.0);
        assert_relative_eq!(state.cone_x(), 5.5, epsilon = 1e-6);
        assert_relative_eq!(state.robot_x(), 1.5, epsilon = 1e-6);
        // robot passes next: both reset
        state.advance(2.4);
        assert_relative_eq!(state.robot_x(), -4.6);
        assert_relative_eq!(state.cone_x(), -3.6);
    }

    #[test]
    fn robot_wrap_keeps_cone_when_cone_is_behind() {
        let cfg = AnimationConfig {
            robot_start_x: 4.7,
            cone_start_x: 0.0,
            ..Default::default()
        };
        let mut state = AnimationState::new(cfg);
        state.advance(0.1);
        assert_relative_eq!(state.robot_x(), -4.6);
        assert_relative_eq!(state.cone_x(), 0.15, epsilon = 1e-6);
    }
}
