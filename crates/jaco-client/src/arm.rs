//! 机械臂门面
//!
//! [`JacoArm`] 把硬件闸门、状态采样、状态广播和五个目标接口组装在一起：
//!
//! | 接口 | 执行器 | 结果 |
//! |------|--------|------|
//! | 关节速度轨迹 | [`JointVelocityExecutor`] | Succeeded / Preempted / Aborted |
//! | 原始角度轨迹 | [`AngularExecutor`] | Succeeded / Preempted / Aborted |
//! | 笛卡尔轨迹 | [`CartesianExecutor`] | Succeeded / Preempted / Aborted |
//! | 夹爪 | [`GripperExecutor`] | Succeeded / Aborted |
//! | 回零 | [`HomeExecutor`] | Succeeded / Preempted / Aborted |
//!
//! 目标在调用线程上阻塞执行；不同接口的目标可以在不同线程上并行，
//! 同一接口上的新目标会抢占旧目标。
//!
//! # 示例
//!
//! ```rust,ignore
//! let arm = JacoArmBuilder::new().config(config).build(api)?;
//! let goal = TrajectoryGoal::joints(vec![JointWaypoint::new(target)]);
//! let outcome = arm.execute_trajectory(TrajectoryMode::JointVelocity, &goal)?;
//! assert!(outcome.is_success());
//! ```

use crate::config::{ArmConfig, ConfigError};
use crate::executor::{
    AngularExecutor, CartesianExecutor, ExecutorContext, GoalRunner, GripperExecutor,
    HomeExecutor, JointVelocityExecutor, MotionMode, joints_of,
};
use crate::goal::{GoalFeedback, GoalOutcome, GripperGoal, TrajectoryGoal};
use crate::kinematics::{DhChain, ForwardKinematics};
use crate::streaming::{self, AngularCommand, CartesianCommand};
use crate::types::{CartesianPose, GoalError, JointArray, Rad};
use crossbeam_channel::{Receiver, Sender};
use jaco_driver::{
    ArmApi, DriverError, GateMetricsSnapshot, HardwareGate, JointState, JointStateSampler,
    StateBroadcaster,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// 组装失败
#[derive(Debug, Error)]
pub enum ArmError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to start hardware gate: {0}")]
    Driver(#[from] DriverError),
}

/// 轨迹接口选择
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrajectoryMode {
    Angular,
    Cartesian,
    JointVelocity,
}

impl From<TrajectoryMode> for MotionMode {
    fn from(mode: TrajectoryMode) -> Self {
        match mode {
            TrajectoryMode::Angular => MotionMode::Angular,
            TrajectoryMode::Cartesian => MotionMode::Cartesian,
            TrajectoryMode::JointVelocity => MotionMode::JointVelocity,
        }
    }
}

/// [`JacoArm`] 的构建器
///
/// 缺省使用默认配置和 MICO 的 DH 正运动学。
pub struct JacoArmBuilder {
    config: ArmConfig,
    kinematics: Option<Arc<dyn ForwardKinematics>>,
}

impl JacoArmBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: ArmConfig) -> Self {
        self.config = config;
        self
    }

    /// 替换正运动学求解器
    pub fn kinematics(mut self, kinematics: Arc<dyn ForwardKinematics>) -> Self {
        self.kinematics = Some(kinematics);
        self
    }

    /// 校验配置、启动硬件线程并组装各接口
    pub fn build<A>(self, api: A) -> Result<JacoArm, ArmError>
    where
        A: ArmApi + 'static,
    {
        self.config.validate()?;
        let kinematics = self
            .kinematics
            .unwrap_or_else(|| Arc::new(DhChain::mico()));
        let config = Arc::new(self.config);

        let gate = Arc::new(HardwareGate::spawn(api, config.gate_config())?);
        let sampler = Arc::new(JointStateSampler::new(
            Arc::clone(&gate),
            config.sampler_config(),
        ));
        // 先采一次，让 joint_state() 在广播线程第一次运行前就有效
        if !sampler.sample().is_valid() {
            warn!("Initial joint state read failed, state is not valid yet");
        }
        let broadcaster = StateBroadcaster::spawn(Arc::clone(&sampler), config.state.publish_rate_hz);

        let ctx = ExecutorContext {
            gate: Arc::clone(&gate),
            sampler: Arc::clone(&sampler),
            kinematics: Arc::clone(&kinematics),
            config: Arc::clone(&config),
        };
        info!(
            "JACO arm ready ({}, control rate {} Hz)",
            config.state.arm_name, config.velocity_controller.control_rate_hz
        );

        Ok(JacoArm {
            joint_velocity: GoalRunner::new(JointVelocityExecutor::new(ctx.clone())),
            angular: GoalRunner::new(AngularExecutor::new(ctx.clone())),
            cartesian: GoalRunner::new(CartesianExecutor::new(ctx.clone())),
            gripper: GoalRunner::new(GripperExecutor::new(ctx.clone())),
            home: GoalRunner::new(HomeExecutor::new(ctx)),
            broadcaster,
            sampler,
            gate,
            kinematics,
            config,
        })
    }
}

impl Default for JacoArmBuilder {
    fn default() -> Self {
        Self {
            config: ArmConfig::default(),
            kinematics: None,
        }
    }
}

/// JACO/MICO 机械臂
///
/// 可以放进 `Arc` 在多个线程间共享。
pub struct JacoArm {
    joint_velocity: GoalRunner<JointVelocityExecutor>,
    angular: GoalRunner<AngularExecutor>,
    cartesian: GoalRunner<CartesianExecutor>,
    gripper: GoalRunner<GripperExecutor>,
    home: GoalRunner<HomeExecutor>,
    broadcaster: StateBroadcaster,
    sampler: Arc<JointStateSampler>,
    gate: Arc<HardwareGate>,
    kinematics: Arc<dyn ForwardKinematics>,
    config: Arc<ArmConfig>,
}

impl JacoArm {
    /// 执行一条轨迹，阻塞到终态
    ///
    /// # 错误
    ///
    /// - `InvalidGoal`: 空轨迹、时间戳倒序、非有限值，或模式与航点类型不匹配
    /// - `Estopped`: 急停激活
    pub fn execute_trajectory(
        &self,
        mode: TrajectoryMode,
        goal: &TrajectoryGoal,
    ) -> Result<GoalOutcome, GoalError> {
        self.run_trajectory(mode, goal, None)
    }

    /// 同 [`execute_trajectory`](Self::execute_trajectory)，每个周期向 `feedback` 推送进度
    pub fn execute_trajectory_with_feedback(
        &self,
        mode: TrajectoryMode,
        goal: &TrajectoryGoal,
        feedback: Sender<GoalFeedback>,
    ) -> Result<GoalOutcome, GoalError> {
        self.run_trajectory(mode, goal, Some(feedback))
    }

    fn run_trajectory(
        &self,
        mode: TrajectoryMode,
        goal: &TrajectoryGoal,
        feedback: Option<Sender<GoalFeedback>>,
    ) -> Result<GoalOutcome, GoalError> {
        match mode {
            TrajectoryMode::Angular => self.angular.run(&self.gate, goal, feedback),
            TrajectoryMode::Cartesian => self.cartesian.run(&self.gate, goal, feedback),
            TrajectoryMode::JointVelocity => self.joint_velocity.run(&self.gate, goal, feedback),
        }
    }

    /// 执行一个夹爪目标
    ///
    /// 结果只有 `Succeeded` 或 `Aborted`；被抢占时中止原因为 [`GoalError::Preempted`]。
    pub fn gripper(&self, goal: &GripperGoal) -> Result<GoalOutcome, GoalError> {
        let outcome = self.gripper.run(&self.gate, goal, None)?;
        Ok(match outcome {
            GoalOutcome::Preempted { final_error } => GoalOutcome::Aborted {
                reason: GoalError::Preempted,
                final_error,
            },
            other => other,
        })
    }

    /// 回零，阻塞到厂商报告完成
    pub fn home(&self) -> Result<GoalOutcome, GoalError> {
        self.home.run(&self.gate, &(), None)
    }

    /// 取消某个接口上正在运行的目标
    pub fn cancel(&self, mode: MotionMode) -> bool {
        match mode {
            MotionMode::Angular => self.angular.cancel(),
            MotionMode::Cartesian => self.cartesian.cancel(),
            MotionMode::JointVelocity => self.joint_velocity.cancel(),
            MotionMode::Gripper => self.gripper.cancel(),
            MotionMode::Home => self.home.cancel(),
        }
    }

    /// 某个接口上是否有目标在运行
    pub fn is_busy(&self, mode: MotionMode) -> bool {
        match mode {
            MotionMode::Angular => self.angular.slot().is_busy(),
            MotionMode::Cartesian => self.cartesian.slot().is_busy(),
            MotionMode::JointVelocity => self.joint_velocity.slot().is_busy(),
            MotionMode::Gripper => self.gripper.slot().is_busy(),
            MotionMode::Home => self.home.slot().is_busy(),
        }
    }

    /// 最近一次采样的关节状态（8 个条目，弧度归一化到 [-π, π]）
    pub fn joint_state(&self) -> Arc<JointState> {
        self.sampler.latest()
    }

    /// 立即经闸门读取一次关节状态
    pub fn sample_joint_state(&self) -> Arc<JointState> {
        self.sampler.sample()
    }

    pub fn joint_positions(&self) -> JointArray<Rad> {
        joints_of(&self.sampler.latest())
    }

    /// 由当前关节角经正运动学计算末端位姿
    pub fn cartesian_pose(&self) -> Result<CartesianPose, GoalError> {
        Ok(self.kinematics.forward(&self.joint_positions())?)
    }

    /// 厂商报告的末端位姿
    pub fn vendor_cartesian_pose(&self) -> Result<CartesianPose, GoalError> {
        let reading = self.gate.read_cartesian()?;
        Ok(CartesianPose::from_array(reading.to_array()))
    }

    /// 订阅周期性状态广播
    pub fn subscribe_state(&self) -> Receiver<Arc<JointState>> {
        self.broadcaster.subscribe()
    }

    /// 激活或解除急停
    ///
    /// 激活时所有在途目标以 `Estopped` 中止；解除后才能接受新的运动命令。
    pub fn set_estop(&self, engaged: bool) -> Result<(), GoalError> {
        if engaged {
            warn!("Engaging emergency stop");
        } else {
            info!("Releasing emergency stop");
        }
        Ok(self.gate.set_estop(engaged)?)
    }

    pub fn is_estopped(&self) -> bool {
        self.gate.is_estopped()
    }

    /// 清空硬件队列，在途目标以 `Erased` 中止
    pub fn erase_trajectories(&self) -> Result<(), GoalError> {
        Ok(self.gate.erase_trajectories()?)
    }

    /// 下发一个流式角度命令
    pub fn send_angular(&self, command: &AngularCommand) -> Result<(), GoalError> {
        let hardware = command.to_hardware(&self.config)?;
        streaming::dispatch(&self.gate, hardware, command.replace_queued)
    }

    /// 下发一个流式笛卡尔命令
    pub fn send_cartesian(&self, command: &CartesianCommand) -> Result<(), GoalError> {
        let hardware = command.to_hardware(&self.config)?;
        streaming::dispatch(&self.gate, hardware, command.replace_queued)
    }

    pub fn metrics(&self) -> GateMetricsSnapshot {
        self.gate.metrics()
    }

    pub fn config(&self) -> &ArmConfig {
        &self.config
    }

    /// 底层硬件闸门
    pub fn gate(&self) -> &Arc<HardwareGate> {
        &self.gate
    }
}

impl std::fmt::Debug for JacoArm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JacoArm")
            .field("arm_name", &self.config.state.arm_name)
            .field("estopped", &self.gate.is_estopped())
            .finish_non_exhaustive()
    }
}
