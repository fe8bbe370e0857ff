//! Trajectory Interpolator - 关节空间轨迹插值
//!
//! 把稀疏航点展开成按控制周期采样的稠密轨迹，保证速度和加速度有界。
//!
//! # 算法
//!
//! 线性段 + 抛物线过渡（LSPB）：
//! ```text
//! 节点      q0 = 当前位置, q1..qn = 航点（展开为最短路径）
//! 段时长    Tk = 标称时长 × time_scaling
//! 速度拉伸  sv = max(1, max Tmin_k / Tk)        Tmin_k = max_j |Δq_kj| / limit_j
//! 段速度    vk = Δqk / Tk,  v0 = v(n+1) = 0
//! 过渡时长  τi = max_j |v(i+1)j - vij| / a_max
//! 加速拉伸  sc = max(1, sqrt(max (τ(k-1) + τk) / 2Tk))
//! ```
//!
//! 两次拉伸都作用于所有段，因此相对时序保持不变，只是整体变慢。
//! 线性段上速度恒为 `vk`，过渡段速度在相邻两段之间线性变化，所以每个
//! 采样点的速度都不超过关节类别上限 × 安全系数。
//!
//! # 特性
//!
//! - **起止静止**: 起点和终点速度为 0，位置精确等于当前位置和最后一个航点
//! - **超速不拒绝**: 航点时间戳太紧时整体拉长，而不是拒绝目标
//! - **强类型**: 位置用 `Rad`，速度用 rad/s
//!
//! # 示例
//!
//! ```rust
//! use jaco_client::config::ArmConfig;
//! use jaco_client::control::{JointWaypoint, TrajectoryInterpolator};
//! use jaco_client::types::{JointArray, Rad};
//!
//! let interpolator = TrajectoryInterpolator::from_config(&ArmConfig::default());
//! let start = JointArray::splat(Rad(0.0));
//! let target = JointWaypoint::new(JointArray::new([Rad(0.5), Rad(0.0), Rad(0.0), Rad(0.0), Rad(0.0), Rad(0.0)]));
//!
//! let trajectory = interpolator.interpolate(start, &[target]).unwrap();
//! assert!(trajectory.len() > 2);
//! ```

use crate::config::{ArmConfig, LimitsConfig};
use crate::types::{CartesianPose, GoalError, Joint, JointArray, Rad};
use std::time::Duration;

/// 相邻节点位置差小于该值时视为同一节点
const KNOT_EPSILON: f64 = 1e-6;

/// 关节空间航点
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointWaypoint {
    pub positions: JointArray<Rad>,
    /// 相对目标开始的期望到达时间
    pub time_from_start: Option<Duration>,
}

impl JointWaypoint {
    pub fn new(positions: JointArray<Rad>) -> Self {
        Self {
            positions,
            time_from_start: None,
        }
    }

    pub fn at(positions: JointArray<Rad>, time_from_start: Duration) -> Self {
        Self {
            positions,
            time_from_start: Some(time_from_start),
        }
    }
}

/// 轨迹点
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectoryPoint {
    pub positions: JointArray<Rad>,
    /// rad/s
    pub velocities: Option<JointArray<f64>>,
    pub time_from_start: Duration,
}

/// 插值后的轨迹
///
/// 点按时间非递减排列，第一个点在 t = 0，最后一个点在 `duration`。
#[derive(Debug, Clone)]
pub struct Trajectory {
    points: Vec<TrajectoryPoint>,
    duration: Duration,
    minimum_duration: Duration,
    stretch: f64,
}

impl Trajectory {
    pub fn points(&self) -> &[TrajectoryPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// 速度上限隐含的最短时长（所有段 Tmin 之和）
    pub fn minimum_duration(&self) -> Duration {
        self.minimum_duration
    }

    /// 为满足速度和加速度上限额外施加的拉伸倍数（≥ 1）
    pub fn stretch(&self) -> f64 {
        self.stretch
    }

    pub fn final_point(&self) -> Option<&TrajectoryPoint> {
        self.points.last()
    }
}

/// 轨迹插值器
#[derive(Debug, Clone)]
pub struct TrajectoryInterpolator {
    /// 每个关节的速度上限（rad/s，已乘安全系数）
    velocity_limits: JointArray<f64>,
    time_scaling: f64,
    /// 过渡段加速度上限（rad/s²）
    max_acceleration: f64,
    sample_period: Duration,
    /// 规划结果（含拉伸）允许的最长时长
    max_duration: Duration,
}

impl TrajectoryInterpolator {
    pub fn new(
        velocity_limits: JointArray<f64>,
        time_scaling: f64,
        max_acceleration: f64,
        sample_period: Duration,
    ) -> Self {
        Self {
            velocity_limits,
            time_scaling,
            max_acceleration,
            sample_period,
            max_duration: LimitsConfig::default().max_trajectory_duration(),
        }
    }

    pub fn with_max_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = max_duration;
        self
    }

    pub fn from_config(config: &ArmConfig) -> Self {
        let limits =
            JointArray::splat(0.0).map_with_joint(|joint: Joint, _| config.limits.joint_limit(joint));
        Self::new(
            limits,
            config.limits.time_scaling_factor,
            config.limits.max_curvature,
            config.velocity_controller.period(),
        )
        .with_max_duration(config.limits.max_trajectory_duration())
    }

    pub fn velocity_limits(&self) -> &JointArray<f64> {
        &self.velocity_limits
    }

    pub fn sample_period(&self) -> Duration {
        self.sample_period
    }

    /// 从 `start` 出发经过所有航点，生成稠密轨迹
    ///
    /// # 错误
    ///
    /// - 航点为空
    /// - 任一位置不是有限值
    /// - 时间戳倒序
    /// - 时间戳或拉伸后的时长超过 `max_duration`
    pub fn interpolate(
        &self,
        start: JointArray<Rad>,
        waypoints: &[JointWaypoint],
    ) -> Result<Trajectory, GoalError> {
        validate_waypoints(waypoints, self.max_duration)?;
        if start.iter().any(|r| !r.is_finite()) {
            return Err(GoalError::invalid("current joint position is not finite"));
        }

        let profile = self.plan(start, waypoints);
        let total = profile.total_duration();
        if !(total.is_finite() && total <= self.max_duration.as_secs_f64()) {
            return Err(GoalError::invalid(format!(
                "planned duration {:.1}s exceeds the {:?} limit",
                total, self.max_duration
            )));
        }
        Ok(self.sample(&profile))
    }

    fn plan(&self, start: JointArray<Rad>, waypoints: &[JointWaypoint]) -> Profile {
        // 节点：展开角度并合并重复节点
        let mut knots: Vec<JointArray<f64>> = vec![start.map(Rad::value)];
        let mut stamps: Vec<Option<f64>> = vec![Some(0.0)];
        let mut previous = start;
        for waypoint in waypoints {
            let unwrapped = waypoint
                .positions
                .map_with(previous, |target, reference| target.nearest_equivalent(reference));
            let delta = unwrapped.map_with(previous, |a, b| (a - b).value());
            if delta.max_abs() < KNOT_EPSILON {
                continue;
            }
            knots.push(unwrapped.map(Rad::value));
            stamps.push(waypoint.time_from_start.map(|t| t.as_secs_f64()));
            previous = unwrapped;
        }

        let segments = knots.len() - 1;
        let mut minimum = Vec::with_capacity(segments);
        let mut durations = Vec::with_capacity(segments);
        for k in 1..=segments {
            let delta = knots[k].map_with(knots[k - 1], |a, b| a - b);
            let t_min = delta
                .map_with(self.velocity_limits, |d, limit| d.abs() / limit)
                .iter()
                .fold(0.0_f64, |acc, &t| acc.max(t));
            let nominal = match (stamps[k - 1], stamps[k]) {
                (Some(a), Some(b)) if b > a => b - a,
                _ => t_min,
            };
            minimum.push(t_min);
            durations.push(nominal * self.time_scaling);
        }

        let velocity_stretch = minimum
            .iter()
            .zip(&durations)
            .map(|(t_min, t)| t_min / t)
            .fold(1.0_f64, f64::max);
        for t in &mut durations {
            *t *= velocity_stretch;
        }

        let mut profile = Profile::build(knots.clone(), durations.clone(), self.max_acceleration);
        let curvature_stretch = profile.blend_overlap().sqrt().max(1.0);
        if curvature_stretch > 1.0 {
            for t in &mut durations {
                *t *= curvature_stretch;
            }
            profile = Profile::build(knots, durations, self.max_acceleration);
        }

        profile.minimum_duration = minimum.iter().sum();
        profile.stretch = velocity_stretch * curvature_stretch;
        profile
    }

    fn sample(&self, profile: &Profile) -> Trajectory {
        let total = profile.total_duration();
        let step = self.sample_period.as_secs_f64();
        let mut points = Vec::new();

        if step > 0.0 {
            let mut i = 0u64;
            loop {
                let t = i as f64 * step;
                if t >= total {
                    break;
                }
                points.push(profile.point_at(t));
                i += 1;
            }
        }
        // 终点精确落在最后一个节点上
        points.push(profile.point_at(total));

        Trajectory {
            points,
            duration: Duration::from_secs_f64(total),
            minimum_duration: Duration::from_secs_f64(profile.minimum_duration),
            stretch: profile.stretch,
        }
    }
}

/// 检查航点非空、有限、时间戳非递减且不超过 `max_duration`
pub fn validate_waypoints(waypoints: &[JointWaypoint], max_duration: Duration) -> Result<(), GoalError> {
    if waypoints.is_empty() {
        return Err(GoalError::invalid("trajectory has no points"));
    }
    let mut last_stamp: Option<Duration> = None;
    for (i, waypoint) in waypoints.iter().enumerate() {
        if waypoint.positions.iter().any(|r| !r.is_finite()) {
            return Err(GoalError::invalid(format!("point {} has non-finite positions", i)));
        }
        if let Some(stamp) = waypoint.time_from_start {
            if stamp > max_duration {
                return Err(GoalError::invalid(format!(
                    "point {} time_from_start {:?} exceeds the {:?} limit",
                    i, stamp, max_duration
                )));
            }
            if let Some(last) = last_stamp
                && stamp < last
            {
                return Err(GoalError::invalid(format!(
                    "point {} time_from_start {:?} is earlier than previous {:?}",
                    i, stamp, last
                )));
            }
            last_stamp = Some(stamp);
        }
    }
    Ok(())
}

/// LSPB 轨迹的解析表示
#[derive(Debug, Clone)]
struct Profile {
    knots: Vec<JointArray<f64>>,
    /// 节点时刻（未平移）
    times: Vec<f64>,
    /// 段速度，首尾各补一个 0
    velocities: Vec<JointArray<f64>>,
    /// 每个节点的过渡时长
    blends: Vec<f64>,
    durations: Vec<f64>,
    minimum_duration: f64,
    stretch: f64,
}

impl Profile {
    fn build(knots: Vec<JointArray<f64>>, durations: Vec<f64>, max_acceleration: f64) -> Self {
        let mut times = Vec::with_capacity(knots.len());
        let mut t = 0.0;
        times.push(t);
        for d in &durations {
            t += d;
            times.push(t);
        }

        let mut velocities = Vec::with_capacity(knots.len() + 1);
        velocities.push(JointArray::splat(0.0));
        for (k, d) in durations.iter().enumerate() {
            let delta = knots[k + 1].map_with(knots[k], |a, b| a - b);
            velocities.push(delta.map(|x| x / d));
        }
        velocities.push(JointArray::splat(0.0));

        let blends = (0..knots.len())
            .map(|i| {
                let dv = velocities[i + 1].map_with(velocities[i], |a, b| a - b);
                dv.max_abs() / max_acceleration
            })
            .collect();

        Self {
            knots,
            times,
            velocities,
            blends,
            durations,
            minimum_duration: 0.0,
            stretch: 1.0,
        }
    }

    /// 相邻过渡段占用段时长的最大比例，> 1 表示过渡段重叠
    fn blend_overlap(&self) -> f64 {
        self.durations
            .iter()
            .enumerate()
            .map(|(k, d)| (self.blends[k] + self.blends[k + 1]) / (2.0 * d))
            .fold(0.0, f64::max)
    }

    fn total_duration(&self) -> f64 {
        let n = self.blends.len() - 1;
        self.durations.iter().sum::<f64>() + (self.blends[0] + self.blends[n]) / 2.0
    }

    /// `shifted` 为从轨迹开始算起的时间
    fn point_at(&self, shifted: f64) -> TrajectoryPoint {
        let t = shifted - self.blends[0] / 2.0;
        let (positions, velocities) = self.evaluate(t);
        TrajectoryPoint {
            positions: positions.map(Rad),
            velocities: Some(velocities),
            time_from_start: Duration::from_secs_f64(shifted.max(0.0)),
        }
    }

    fn evaluate(&self, t: f64) -> (JointArray<f64>, JointArray<f64>) {
        for k in 0..self.knots.len() {
            let tau = self.blends[k];
            let t_k = self.times[k];
            if t > t_k + tau / 2.0 {
                continue;
            }
            if t >= t_k - tau / 2.0 && tau > 0.0 {
                let v_in = self.velocities[k];
                let v_out = self.velocities[k + 1];
                let dt = t - t_k;
                let s = dt + tau / 2.0;
                let acceleration = v_out.map_with(v_in, |o, i| (o - i) / tau);
                let q = self.knots[k]
                    .map_with(v_in, |q, v| q + v * dt)
                    .map_with(acceleration, |q, a| q + 0.5 * a * s * s);
                let v = v_in.map_with(acceleration, |v, a| v + a * s);
                return (q, v);
            }
            if k == 0 {
                return (self.knots[0], JointArray::splat(0.0));
            }
            // 第 k 段（节点 k-1 到 k）的线性部分
            let v = self.velocities[k];
            let dt = t - self.times[k - 1];
            let q = self.knots[k - 1].map_with(v, |q, v| q + v * dt);
            return (q, v);
        }

        let last = self.knots.len() - 1;
        (self.knots[last], JointArray::splat(0.0))
    }
}

/// 笛卡尔航点抽稀
///
/// 从 `current` 开始，只保留与上一个保留位姿相距至少 `min_step`（米）或姿态变化至少
/// `min_angle`（弧度）的位姿；最后一个位姿总是保留。细插值由控制器板载的笛卡尔控制器完成。
pub fn cartesian_waypoints(
    current: &CartesianPose,
    poses: &[CartesianPose],
    min_step: f64,
    min_angle: f64,
) -> Vec<CartesianPose> {
    let mut kept = Vec::new();
    let mut reference = *current;
    let Some((last, rest)) = poses.split_last() else {
        return kept;
    };
    for pose in rest {
        let moved = pose.position.distance(&reference.position) >= min_step;
        let turned = pose.orientation.max_angle_to(&reference.orientation) >= min_angle;
        if moved || turned {
            kept.push(*pose);
            reference = *pose;
        }
    }
    kept.push(*last);
    kept
}
