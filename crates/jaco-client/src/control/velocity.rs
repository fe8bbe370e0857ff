//! 关节速度 PD 控制器
//!
//! ```text
//! e      = wrap(target - current)           // 最短角距离
//! output = Kp * e + Kv * (e - e_prev) / dt  // rad/s
//! output = clamp(output, ±limit[joint])
//! ```
//!
//! 第一次 tick（或时间跳变之后）没有上一误差，微分项为 0。

use super::controller::Controller;
use crate::config::ArmConfig;
use crate::types::{Joint, JointArray, Rad};
use std::time::Duration;

/// 关节速度 PD 控制器
#[derive(Debug, Clone)]
pub struct PdVelocityController {
    kp: f64,
    kv: f64,
    /// 每个关节的速度上限（rad/s）
    limits: JointArray<f64>,
    target: JointArray<Rad>,
    last_error: Option<JointArray<f64>>,
}

impl PdVelocityController {
    pub fn new(kp: f64, kv: f64, limits: JointArray<f64>) -> Self {
        Self {
            kp,
            kv,
            limits,
            target: JointArray::splat(Rad::ZERO),
            last_error: None,
        }
    }

    /// 使用配置中的增益，限速为各关节类别上限 × 安全系数
    pub fn from_config(config: &ArmConfig) -> Self {
        let limits = JointArray::splat(0.0)
            .map_with_joint(|joint: Joint, _| config.limits.joint_limit(joint));
        Self::new(
            config.velocity_controller.kp,
            config.velocity_controller.kv,
            limits,
        )
    }

    pub fn set_target(&mut self, target: JointArray<Rad>) {
        self.target = target;
    }

    pub fn target(&self) -> &JointArray<Rad> {
        &self.target
    }

    pub fn limits(&self) -> &JointArray<f64> {
        &self.limits
    }

    /// 当前误差（rad，已按最短角距离折算）
    pub fn error(&self, current: &JointArray<Rad>) -> JointArray<f64> {
        current.map_with(self.target, |c, t| c.shortest_to(t).0)
    }
}

impl Controller for PdVelocityController {
    type Input = JointArray<Rad>;
    type Output = JointArray<f64>;

    fn tick(&mut self, current: &JointArray<Rad>, dt: Duration) -> JointArray<f64> {
        let dt_sec = dt.as_secs_f64();
        if dt_sec <= 0.0 {
            return JointArray::splat(0.0);
        }

        let error = self.error(current);
        let derivative = match self.last_error {
            Some(prev) => error.map_with(prev, |e, p| (e - p) / dt_sec),
            None => JointArray::splat(0.0),
        };
        self.last_error = Some(error);

        let raw = error.map_with(derivative, |e, d| self.kp * e + self.kv * d);
        raw.map_with(self.limits, |v, limit| {
            if v.is_finite() {
                v.clamp(-limit, limit)
            } else {
                0.0
            }
        })
    }

    fn on_time_jump(&mut self, _real_dt: Duration) {
        self.last_error = None;
    }

    fn reset(&mut self) {
        self.last_error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn controller() -> PdVelocityController {
        PdVelocityController::from_config(&ArmConfig::default())
    }

    #[test]
    fn test_proportional_first_tick() {
        let mut c = controller();
        c.set_target(JointArray::new([Rad(0.1), Rad(0.0), Rad(0.0), Rad(0.0), Rad(0.0), Rad(-0.05)]));
        let out = c.tick(&JointArray::splat(Rad(0.0)), Duration::from_millis(10));
        assert!((out[Joint::J1] - 0.5).abs() < 1e-10);
        assert!((out[Joint::J6] + 0.25).abs() < 1e-10);
        assert_eq!(out[Joint::J3], 0.0);
    }

    #[test]
    fn test_derivative_term() {
        let mut c = PdVelocityController::new(1.0, 0.1, JointArray::splat(10.0));
        c.set_target(JointArray::splat(Rad(1.0)));
        c.tick(&JointArray::splat(Rad(0.0)), Duration::from_millis(10));
        // e: 1.0 -> 0.9, de/dt = -10
        let out = c.tick(&JointArray::splat(Rad(0.1)), Duration::from_millis(10));
        assert!((out[0] - (0.9 - 1.0)).abs() < 1e-10);
    }

    #[test]
    fn test_clamped_to_class_limits() {
        let mut c = controller();
        c.set_target(JointArray::splat(Rad(3.0)));
        let out = c.tick(&JointArray::splat(Rad(0.0)), Duration::from_millis(10));
        for joint in Joint::ALL {
            let limit = ArmConfig::default().limits.joint_limit(joint);
            assert!((out[joint].abs() - limit).abs() < 1e-12);
        }
    }

    #[test]
    fn test_error_wraps_shortest_path() {
        let mut c = controller();
        c.set_target(JointArray::splat(Rad(-PI + 0.05)));
        let out = c.tick(&JointArray::splat(Rad(PI - 0.05)), Duration::from_millis(10));
        // 最短路径是正向 0.1 rad
        assert!((out[0] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_zero_dt_gives_zero_output() {
        let mut c = controller();
        c.set_target(JointArray::splat(Rad(1.0)));
        let out = c.tick(&JointArray::splat(Rad(0.0)), Duration::ZERO);
        assert_eq!(out, JointArray::splat(0.0));
    }

    #[test]
    fn test_single_joint_converges_with_decreasing_commands() {
        let mut c = controller();
        let target = JointArray::new([Rad(0.5), Rad(0.0), Rad(0.0), Rad(0.0), Rad(0.0), Rad(0.0)]);
        c.set_target(target);

        // 无噪声的积分对象：q += u·dt
        let dt = Duration::from_millis(20);
        let mut q = JointArray::splat(Rad(0.0));
        let mut last_magnitude = f64::INFINITY;
        let mut converged_at = None;
        for tick in 0..200 {
            let cmd = c.tick(&q, dt);
            for joint in &Joint::ALL[1..] {
                assert_eq!(cmd[*joint], 0.0);
            }
            assert!(cmd[Joint::J1].abs() <= last_magnitude + 1e-12);
            last_magnitude = cmd[Joint::J1].abs();

            q = q.map_with(cmd, |p, v| p + Rad(v * dt.as_secs_f64()));
            if c.error(&q).l1_norm() < 0.03 {
                converged_at = Some(tick);
                break;
            }
        }
        assert!(converged_at.is_some_and(|t| t < 100));
    }

    #[test]
    fn test_time_jump_resets_derivative() {
        let mut c = PdVelocityController::new(1.0, 1.0, JointArray::splat(100.0));
        c.set_target(JointArray::splat(Rad(1.0)));
        c.tick(&JointArray::splat(Rad(0.0)), Duration::from_millis(10));
        c.on_time_jump(Duration::from_secs(1));
        let out = c.tick(&JointArray::splat(Rad(0.5)), Duration::from_millis(10));
        assert!((out[0] - 0.5).abs() < 1e-10);
    }
}
