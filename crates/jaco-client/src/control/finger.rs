//! 手指 PID 控制器
//!
//! 在原始手指单位下工作，输出手指速度（原始单位/秒），钳位到最大手指速度。
//! 积分项只在 `reset()` 时清零；每个夹爪目标开始前执行器都会调用一次。

use super::controller::Controller;
use crate::config::FingerControllerConfig;
use std::time::Duration;

/// 两指 PID 控制器
#[derive(Debug, Clone)]
pub struct FingerController {
    kp: f64,
    ki: f64,
    kv: f64,
    max_speed: f64,
    integral_limit: f64,
    target: [f64; 2],
    integral: [f64; 2],
    last_error: Option<[f64; 2]>,
}

impl FingerController {
    pub fn new(config: &FingerControllerConfig) -> Self {
        Self {
            kp: config.kp,
            ki: config.ki,
            kv: config.kv,
            max_speed: config.max_speed,
            integral_limit: config.integral_limit,
            target: [0.0; 2],
            integral: [0.0; 2],
            last_error: None,
        }
    }

    pub fn set_target(&mut self, target: [f64; 2]) {
        self.target = target;
    }

    pub fn target(&self) -> [f64; 2] {
        self.target
    }

    pub fn integral(&self) -> [f64; 2] {
        self.integral
    }

    /// 每个手指的误差（原始单位）
    pub fn error(&self, current: &[f64; 2]) -> [f64; 2] {
        [self.target[0] - current[0], self.target[1] - current[1]]
    }
}

impl Controller for FingerController {
    type Input = [f64; 2];
    type Output = [f64; 2];

    fn tick(&mut self, current: &[f64; 2], dt: Duration) -> [f64; 2] {
        let dt_sec = dt.as_secs_f64();
        if dt_sec <= 0.0 {
            return [0.0; 2];
        }

        let error = self.error(current);
        let mut output = [0.0; 2];
        for i in 0..2 {
            self.integral[i] = (self.integral[i] + error[i] * dt_sec)
                .clamp(-self.integral_limit, self.integral_limit);
            let derivative = self.last_error.map_or(0.0, |prev| (error[i] - prev[i]) / dt_sec);

            let v = self.kp * error[i] + self.ki * self.integral[i] + self.kv * derivative;
            output[i] = if v.is_finite() {
                v.clamp(-self.max_speed, self.max_speed)
            } else {
                0.0
            };
        }
        self.last_error = Some(error);
        output
    }

    fn on_time_jump(&mut self, _real_dt: Duration) {
        // 只重置微分项
        self.last_error = None;
    }

    fn reset(&mut self) {
        self.integral = [0.0; 2];
        self.last_error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> FingerController {
        FingerController::new(&FingerControllerConfig::default())
    }

    #[test]
    fn test_output_clamped_to_max_speed() {
        let mut c = controller();
        c.set_target([6400.0, 0.0]);
        let out = c.tick(&[0.0, 6400.0], Duration::from_millis(10));
        assert_eq!(out, [3000.0, -3000.0]);
    }

    #[test]
    fn test_pid_terms() {
        let mut c = controller();
        c.set_target([100.0, 100.0]);
        let out = c.tick(&[90.0, 100.0], Duration::from_millis(100));
        // P = 75, I = 0.1 * (10 * 0.1) = 0.1, D = 0
        assert!((out[0] - 75.1).abs() < 1e-9);
        assert_eq!(out[1], 0.0);

        let out = c.tick(&[95.0, 100.0], Duration::from_millis(100));
        // P = 37.5, I = 0.1 * 1.5 = 0.15, D = 0.05 * (5 - 10) / 0.1 = -2.5
        assert!((out[0] - (37.5 + 0.15 - 2.5)).abs() < 1e-9);
    }

    #[test]
    fn test_reset_clears_integral() {
        let mut c = controller();
        c.set_target([500.0, 500.0]);
        for _ in 0..10 {
            c.tick(&[0.0, 0.0], Duration::from_millis(10));
        }
        assert!(c.integral()[0] > 0.0);

        c.reset();
        assert_eq!(c.integral(), [0.0, 0.0]);
    }

    #[test]
    fn test_time_jump_keeps_integral() {
        let mut c = controller();
        c.set_target([500.0, 500.0]);
        c.tick(&[0.0, 0.0], Duration::from_millis(10));
        let before = c.integral();
        c.on_time_jump(Duration::from_secs(2));
        assert_eq!(c.integral(), before);
    }

    #[test]
    fn test_integral_is_bounded() {
        let mut config = FingerControllerConfig::default();
        config.integral_limit = 10.0;
        let mut c = FingerController::new(&config);
        c.set_target([6400.0, 6400.0]);
        for _ in 0..100 {
            c.tick(&[0.0, 0.0], Duration::from_millis(100));
        }
        assert_eq!(c.integral(), [10.0, 10.0]);
    }
}
