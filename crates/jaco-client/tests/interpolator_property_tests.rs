//! 轨迹插值的属性测试
//!
//! 使用 proptest 验证速度上限、时长下界和时间戳拉伸的单调性。

use jaco_client::config::ArmConfig;
use jaco_client::control::{JointWaypoint, TrajectoryInterpolator};
use jaco_client::types::{JointArray, Rad};
use proptest::prelude::*;
use std::time::Duration;

fn joints() -> impl Strategy<Value = JointArray<Rad>> {
    prop::array::uniform6(-1.5..1.5f64).prop_map(|values| JointArray::new(values.map(Rad)))
}

/// 1 到 4 个航点，时间戳间隔至少 0.25 s
fn stamped_waypoints() -> impl Strategy<Value = Vec<JointWaypoint>> {
    prop::collection::vec((joints(), 0.25..2.0f64), 1..=4).prop_map(|points| {
        let mut t = 0.0;
        points
            .into_iter()
            .map(|(positions, gap)| {
                t += gap;
                JointWaypoint::at(positions, Duration::from_secs_f64(t))
            })
            .collect()
    })
}

fn stretched(waypoints: &[JointWaypoint], factor: f64) -> Vec<JointWaypoint> {
    waypoints
        .iter()
        .map(|w| JointWaypoint {
            positions: w.positions,
            time_from_start: w.time_from_start.map(|t| t.mul_f64(factor)),
        })
        .collect()
}

fn interpolator() -> TrajectoryInterpolator {
    TrajectoryInterpolator::from_config(&ArmConfig::default())
}

proptest! {
    /// 每个采样点的速度都不超过关节上限
    #[test]
    fn prop_sampled_velocity_within_limits(start in joints(), waypoints in stamped_waypoints()) {
        let i = interpolator();
        let trajectory = i.interpolate(start, &waypoints).unwrap();
        for point in trajectory.points() {
            let v = point.velocities.unwrap();
            for (value, limit) in v.iter().zip(i.velocity_limits().iter()) {
                prop_assert!(value.abs() <= limit + 1e-9, "{} exceeds {}", value, limit);
            }
        }
    }

    /// 终点精确落在最后一个航点上且静止
    #[test]
    fn prop_ends_at_last_waypoint(start in joints(), waypoints in stamped_waypoints()) {
        let trajectory = interpolator().interpolate(start, &waypoints).unwrap();
        let last = trajectory.final_point().unwrap();
        let target = waypoints[waypoints.len() - 1].positions;
        for (reached, expected) in last.positions.iter().zip(target.iter()) {
            prop_assert!((reached.value() - expected.value()).abs() < 1e-9);
        }
        prop_assert!(last.velocities.unwrap().max_abs() < 1e-9);
    }

    /// 总时长不短于速度上限隐含的最短时长
    #[test]
    fn prop_duration_not_below_minimum(start in joints(), waypoints in stamped_waypoints()) {
        let trajectory = interpolator().interpolate(start, &waypoints).unwrap();
        prop_assert!(trajectory.stretch() >= 1.0);
        prop_assert!(
            trajectory.duration().as_secs_f64() + 1e-6 >= trajectory.minimum_duration().as_secs_f64()
        );
    }

    /// 放宽时间戳不会让轨迹变短
    #[test]
    fn prop_stretching_stamps_never_shortens(
        start in joints(),
        waypoints in stamped_waypoints(),
        factor in 1.0..3.0f64,
    ) {
        let i = interpolator();
        let base = i.interpolate(start, &waypoints).unwrap();
        let slower = i.interpolate(start, &stretched(&waypoints, factor)).unwrap();
        prop_assert!(
            slower.duration().as_secs_f64() + 1e-6 >= base.duration().as_secs_f64(),
            "{:?} < {:?}",
            slower.duration(),
            base.duration()
        );
    }
}
