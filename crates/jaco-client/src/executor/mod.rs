//! 目标执行器
//!
//! 每种运动模式一个执行器，共享同一套流程：
//!
//! ```text
//! validate ──► 急停检查 ──► GoalSlot::begin（抢占旧目标）──► GoalContext
//!          ──► execute（控制循环）──► GoalOutcome
//! ```
//!
//! 校验失败和急停在接触硬件之前以 `Err` 返回；进入执行后的所有结束方式
//! （成功、抢占、中止）都以 [`GoalOutcome`] 返回。

mod angular;
mod cartesian;
mod gripper;
mod home;
mod joint_velocity;

pub use angular::AngularExecutor;
pub use cartesian::CartesianExecutor;
pub use gripper::GripperExecutor;
pub use home::HomeExecutor;
pub use joint_velocity::JointVelocityExecutor;

use crate::config::ArmConfig;
use crate::goal::{GoalContext, GoalFeedback, GoalOutcome};
use crate::kinematics::ForwardKinematics;
use crate::types::{GoalError, JointArray, Rad};
use crossbeam_channel::Sender;
use jaco_driver::{CancelReason, CancelToken, HardwareCommand, HardwareGate, JointState, JointStateSampler};
use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// 运动模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotionMode {
    /// 原始角度航点，交给控制器板的位置队列
    Angular,
    /// 笛卡尔航点，由控制器板自行平滑
    Cartesian,
    /// 本地插值 + 关节速度闭环
    JointVelocity,
    Gripper,
    Home,
}

impl fmt::Display for MotionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MotionMode::Angular => "angular",
            MotionMode::Cartesian => "cartesian",
            MotionMode::JointVelocity => "joint_velocity",
            MotionMode::Gripper => "gripper",
            MotionMode::Home => "home",
        };
        f.write_str(name)
    }
}

/// 执行器共享的依赖
#[derive(Clone)]
pub struct ExecutorContext {
    pub gate: Arc<HardwareGate>,
    pub sampler: Arc<JointStateSampler>,
    pub kinematics: Arc<dyn ForwardKinematics>,
    pub config: Arc<ArmConfig>,
}

impl ExecutorContext {
    /// 读取当前手臂关节角
    fn current_joints(&self) -> JointArray<Rad> {
        joints_of(&self.sampler.sample())
    }

    /// 手臂零速度（不影响手指）
    fn stop_arm(&self) {
        if let Err(e) = self.gate.send(HardwareCommand::angular_velocity([0.0; 6])) {
            warn!("Failed to command zero arm velocity: {}", e);
        }
    }

    /// 清空硬件队列（不取消其他目标）
    fn flush(&self) {
        if let Err(e) = self.gate.flush_motion() {
            warn!("Failed to flush queued motion: {}", e);
        }
    }
}

impl fmt::Debug for ExecutorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorContext")
            .field("gate", &self.gate.config())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

pub(crate) fn joints_of(state: &JointState) -> JointArray<Rad> {
    JointArray::new(state.arm_position().map(Rad))
}

/// 每个关节到目标的最短角距离（rad）
pub(crate) fn joint_error(current: &JointArray<Rad>, target: &JointArray<Rad>) -> JointArray<f64> {
    current.map_with(*target, |c, t| c.shortest_to(t).value())
}

/// 估计时长加余量；溢出时饱和到 `Duration::MAX`
pub(crate) fn goal_timeout(estimate_secs: f64, margin: Duration) -> Duration {
    Duration::try_from_secs_f64(estimate_secs)
        .unwrap_or(Duration::MAX)
        .saturating_add(margin)
}

pub(crate) fn aborted(reason: GoalError, final_error: f64) -> GoalOutcome {
    GoalOutcome::Aborted {
        reason,
        final_error,
    }
}

/// 一种运动模式的执行器
pub trait GoalExecutor: Send + Sync {
    type Goal;

    fn mode(&self) -> MotionMode;

    /// 接受前的静态校验，不接触硬件
    fn validate(&self, goal: &Self::Goal) -> Result<(), GoalError>;

    /// 运行到终态
    ///
    /// 每个周期开头检查 `ctx` 的取消令牌；返回前保证已下发零速度或清空队列。
    fn execute(&self, goal: &Self::Goal, ctx: &mut GoalContext) -> GoalOutcome;
}

/// 单个动作接口的目标槽
///
/// 同一时刻只有一个目标在运行。新目标先以 `Preempted` 取消旧目标，
/// 再等待旧目标的控制循环退出，因此两个目标的命令不会交错。
#[derive(Debug, Default)]
pub struct GoalSlot {
    current: Mutex<Option<CancelToken>>,
    run_lock: Mutex<()>,
}

impl GoalSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// 抢占当前目标并等待其结束
    pub fn begin(&self) -> (CancelToken, MutexGuard<'_, ()>) {
        let token = CancelToken::new();
        if let Some(previous) = self.current.lock().replace(token.clone())
            && previous.cancel(CancelReason::Preempted)
        {
            info!("Preempting in-flight goal");
        }
        let guard = self.run_lock.lock();
        (token, guard)
    }

    /// 客户端取消当前目标
    pub fn cancel(&self) -> bool {
        self.current
            .lock()
            .as_ref()
            .is_some_and(|token| token.cancel(CancelReason::Preempted))
    }

    pub fn is_busy(&self) -> bool {
        self.run_lock.is_locked()
    }
}

/// 执行器 + 目标槽
#[derive(Debug)]
pub struct GoalRunner<E> {
    executor: E,
    slot: GoalSlot,
}

impl<E: GoalExecutor> GoalRunner<E> {
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            slot: GoalSlot::new(),
        }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn slot(&self) -> &GoalSlot {
        &self.slot
    }

    /// 接受并执行一个目标
    ///
    /// # 错误
    ///
    /// - `InvalidGoal`: 校验失败
    /// - `Estopped`: 急停激活
    pub fn run(
        &self,
        gate: &HardwareGate,
        goal: &E::Goal,
        feedback: Option<Sender<GoalFeedback>>,
    ) -> Result<GoalOutcome, GoalError> {
        let mode = self.executor.mode();
        if let Err(e) = self.executor.validate(goal) {
            warn!("Rejected {} goal: {}", mode, e);
            return Err(e);
        }
        if gate.is_estopped() {
            warn!("Rejected {} goal: emergency stop is engaged", mode);
            return Err(GoalError::Estopped);
        }

        let (token, _running) = self.slot.begin();
        let mut ctx = GoalContext::new(gate, token);
        if let Some(tx) = feedback {
            ctx = ctx.with_feedback(tx);
        }

        // 等待期间可能已被更新的目标抢占，或被急停取消
        let outcome = match ctx.cancel_reason() {
            Some(reason) => GoalOutcome::from_cancel(reason, 0.0),
            None => {
                info!("Accepted {} goal", mode);
                self.executor.execute(goal, &mut ctx)
            },
        };

        match &outcome {
            GoalOutcome::Succeeded { final_error } => {
                info!("{} goal succeeded (final error: {:.4})", mode, final_error)
            },
            GoalOutcome::Preempted { final_error } => {
                warn!("{} goal preempted (final error: {:.4})", mode, final_error)
            },
            GoalOutcome::Aborted {
                reason,
                final_error,
            } => warn!(
                "{} goal aborted: {} (final error: {:.4})",
                mode, reason, final_error
            ),
        }
        Ok(outcome)
    }

    pub fn cancel(&self) -> bool {
        self.slot.cancel()
    }
}
