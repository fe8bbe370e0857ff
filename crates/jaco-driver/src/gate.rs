//! 硬件闸门（HardwareGate）
//!
//! 所有会触碰硬件的调用都经过一个独占厂商 API 的硬件线程：
//! 调用方把请求放进有界通道，并在一次性应答通道上等待结果。
//! 因此同一时刻最多只有一个硬件操作在进行，且急停状态只由硬件线程持有。
//!
//! # 急停语义
//!
//! - 激活：先取消所有在途目标，再清空硬件队列、下发零速度、停止厂商控制 API
//! - 激活期间：所有非零运动命令以 [`DriverError::Estopped`] 拒绝；零速度命令直接视为成功
//! - 解除：重启厂商控制 API 并切回角度控制
//!
//! # 示例
//!
//! ```rust,ignore
//! let gate = HardwareGate::spawn(api, GateConfig::default())?;
//! gate.send(HardwareCommand::angular_velocity([5.0, 0.0, 0.0, 0.0, 0.0, 0.0]))?;
//! gate.set_estop(true)?;
//! assert!(gate.is_estopped());
//! ```

use crate::api::{ArmApi, CartesianReading, RawJointReading};
use crate::cancel::{CancelReason, CancelToken, GoalRegistration, GoalRegistry};
use crate::command::{ControlMode, HardwareCommand};
use crate::error::{DriverError, VendorCode};
use crate::metrics::{GateMetrics, GateMetricsSnapshot};
use crossbeam_channel::{Receiver, RecvTimeoutError, SendTimeoutError, Sender, bounded};
use std::mem::ManuallyDrop;
use std::sync::Arc;
use std::thread::{JoinHandle, spawn};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// 闸门配置
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// 请求通道容量
    pub queue_capacity: usize,
    /// 等待硬件线程应答的超时
    pub reply_timeout: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 10,
            reply_timeout: Duration::from_millis(1000),
        }
    }
}

/// 一次完整的关节读数（位置、速度、力矩在同一个硬件操作中读取）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawJointSnapshot {
    pub position: RawJointReading,
    pub velocity: RawJointReading,
    pub force: RawJointReading,
}

type Reply<T> = Sender<Result<T, DriverError>>;

enum GateRequest {
    Send {
        command: HardwareCommand,
        replace_queued: bool,
        token: Option<CancelToken>,
        reply: Reply<bool>,
    },
    ReadJoints {
        reply: Reply<RawJointSnapshot>,
    },
    ReadCartesian {
        reply: Reply<CartesianReading>,
    },
    Erase {
        cancel_goals: bool,
        reply: Reply<()>,
    },
    Home {
        reply: Reply<()>,
    },
    IsHomed {
        reply: Reply<bool>,
    },
    SetEstop {
        engaged: bool,
        reply: Reply<()>,
    },
    QueryEstop {
        reply: Sender<bool>,
    },
}

/// 硬件闸门句柄
///
/// 可以放在 `Arc` 中被多个目标处理器和采样线程共享。
pub struct HardwareGate {
    /// 请求发送端，Drop 时必须先于 join 释放
    cmd_tx: ManuallyDrop<Sender<GateRequest>>,
    owner_thread: Option<JoinHandle<()>>,
    registry: Arc<GoalRegistry>,
    metrics: Arc<GateMetrics>,
    config: GateConfig,
}

impl HardwareGate {
    /// 启动硬件线程
    ///
    /// 在移交 API 之前先启动厂商控制 API 并选择角度控制模式；任何一步失败都直接返回。
    pub fn spawn<A>(mut api: A, config: GateConfig) -> Result<Self, DriverError>
    where
        A: ArmApi + 'static,
    {
        api.start_control_api()
            .map_err(|code| fault("start_control_api", code))?;
        api.set_control_mode(ControlMode::Angular)
            .map_err(|code| fault("set_control_mode", code))?;

        let (cmd_tx, cmd_rx) = bounded(config.queue_capacity.max(1));
        let registry = Arc::new(GoalRegistry::new());
        let metrics = Arc::new(GateMetrics::new());

        let owner = GateOwner {
            api,
            estopped: false,
            mode: ControlMode::Angular,
            registry: Arc::clone(&registry),
            metrics: Arc::clone(&metrics),
        };
        let owner_thread = spawn(move || owner.run(cmd_rx));

        info!(
            "Hardware gate started (queue capacity: {}, reply timeout: {:?})",
            config.queue_capacity, config.reply_timeout
        );

        Ok(Self {
            cmd_tx: ManuallyDrop::new(cmd_tx),
            owner_thread: Some(owner_thread),
            registry,
            metrics,
            config,
        })
    }

    fn request<T>(
        &self,
        make: impl FnOnce(Sender<T>) -> GateRequest,
    ) -> Result<T, DriverError> {
        let (reply_tx, reply_rx) = bounded(1);
        self.cmd_tx
            .send_timeout(make(reply_tx), self.config.reply_timeout)
            .map_err(|e| match e {
                SendTimeoutError::Timeout(_) => {
                    DriverError::ChannelFull(self.config.queue_capacity)
                },
                SendTimeoutError::Disconnected(_) => DriverError::ChannelClosed,
            })?;
        reply_rx
            .recv_timeout(self.config.reply_timeout)
            .map_err(|e| match e {
                RecvTimeoutError::Timeout => DriverError::Timeout,
                RecvTimeoutError::Disconnected => DriverError::ChannelClosed,
            })
    }

    /// 下发一个运动命令（追加到硬件队列末尾）
    pub fn send(&self, command: HardwareCommand) -> Result<(), DriverError> {
        self.request(|reply| GateRequest::Send {
            command,
            replace_queued: false,
            token: None,
            reply,
        })??;
        Ok(())
    }

    /// 先清空硬件队列再下发命令，两步在同一个硬件操作中完成
    pub fn send_replacing(&self, command: HardwareCommand) -> Result<(), DriverError> {
        self.request(|reply| GateRequest::Send {
            command,
            replace_queued: true,
            token: None,
            reply,
        })??;
        Ok(())
    }

    /// 以某个目标的名义下发命令
    ///
    /// 硬件线程在执行前检查令牌：令牌已取消时运动命令被丢弃并返回 `Ok(false)`。
    pub fn send_for_goal(
        &self,
        token: &CancelToken,
        command: HardwareCommand,
        replace_queued: bool,
    ) -> Result<bool, DriverError> {
        let token = token.clone();
        self.request(|reply| GateRequest::Send {
            command,
            replace_queued,
            token: Some(token),
            reply,
        })?
    }

    /// 读取关节位置、速度和力矩
    pub fn read_joints(&self) -> Result<RawJointSnapshot, DriverError> {
        self.request(|reply| GateRequest::ReadJoints { reply })?
    }

    /// 读取厂商计算的笛卡尔位姿
    pub fn read_cartesian(&self) -> Result<CartesianReading, DriverError> {
        self.request(|reply| GateRequest::ReadCartesian { reply })?
    }

    /// 清空硬件轨迹队列并让控制器回到空闲
    ///
    /// 所有在途目标以 [`CancelReason::Erased`] 取消，随后下发零速度。
    pub fn erase_trajectories(&self) -> Result<(), DriverError> {
        self.request(|reply| GateRequest::Erase {
            cancel_goals: true,
            reply,
        })?
    }

    /// 清空硬件队列并下发零速度，不影响在途目标
    pub fn flush_motion(&self) -> Result<(), DriverError> {
        self.request(|reply| GateRequest::Erase {
            cancel_goals: false,
            reply,
        })?
    }

    /// 启动厂商回零动作
    pub fn home(&self) -> Result<(), DriverError> {
        self.request(|reply| GateRequest::Home { reply })?
    }

    pub fn is_homed(&self) -> Result<bool, DriverError> {
        self.request(|reply| GateRequest::IsHomed { reply })?
    }

    /// 激活或解除急停
    ///
    /// 激活时即使部分硬件调用失败，急停标志也会保持激活，返回第一个故障。
    pub fn set_estop(&self, engaged: bool) -> Result<(), DriverError> {
        self.request(|reply| GateRequest::SetEstop { engaged, reply })?
    }

    /// 急停是否激活
    ///
    /// 无法联系硬件线程时返回 `true`。
    pub fn is_estopped(&self) -> bool {
        self.request(|reply| GateRequest::QueryEstop { reply })
            .unwrap_or(true)
    }

    /// 注册在途目标，使其能被急停和清空轨迹取消
    pub fn register_goal(&self, token: CancelToken) -> GoalRegistration {
        self.registry.register(token)
    }

    pub fn active_goals(&self) -> usize {
        self.registry.active_count()
    }

    pub fn metrics(&self) -> GateMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }
}

impl Drop for HardwareGate {
    fn drop(&mut self) {
        // 先真正 drop 发送端，硬件线程才能观察到 Disconnected
        unsafe {
            ManuallyDrop::drop(&mut self.cmd_tx);
        }

        let join_timeout = Duration::from_secs(2);
        if let Some(handle) = self.owner_thread.take()
            && let Err(_e) = handle.join_timeout(join_timeout)
        {
            error!(
                "Hardware gate thread panicked or failed to shut down within {:?}",
                join_timeout
            );
        }
    }
}

/// 带超时的线程 join
trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()> {
        let (tx, rx) = bounded(1);

        // 看门狗线程负责真正的 join；超时后它会继续运行到目标线程结束
        spawn(move || {
            let _ = tx.send(self.join().map(|_| ()));
        });

        match rx.recv_timeout(timeout) {
            Ok(join_result) => join_result,
            Err(RecvTimeoutError::Timeout) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "Thread join timeout",
            ))),
            Err(RecvTimeoutError::Disconnected) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "Thread panicked during join",
            ))),
        }
    }
}

fn fault(operation: &'static str, code: VendorCode) -> DriverError {
    DriverError::HardwareFault { operation, code }
}

/// 硬件线程状态（只在硬件线程内可变）
struct GateOwner<A: ArmApi> {
    api: A,
    estopped: bool,
    mode: ControlMode,
    registry: Arc<GoalRegistry>,
    metrics: Arc<GateMetrics>,
}

impl<A: ArmApi> GateOwner<A> {
    fn run(mut self, rx: Receiver<GateRequest>) {
        #[cfg(feature = "realtime")]
        {
            use thread_priority::*;

            match set_current_thread_priority(ThreadPriority::Max) {
                Ok(_) => info!("Hardware gate thread priority set to MAX (realtime)"),
                Err(e) => warn!(
                    "Failed to set hardware gate thread priority: {}. \
                    On Linux, you may need to run with CAP_SYS_NICE or use rtkit.",
                    e
                ),
            }
        }

        // 所有发送端释放后 recv 返回 Err，循环退出
        while let Ok(request) = rx.recv() {
            self.handle(request);
        }

        if !self.estopped
            && let Err(e) = self.send_zero()
        {
            warn!("Failed to zero velocity on gate shutdown: {}", e);
        }
        debug!("Hardware gate thread exited");
    }

    fn handle(&mut self, request: GateRequest) {
        // 应答通道的接收端可能已超时放弃，忽略发送错误
        match request {
            GateRequest::Send {
                command,
                replace_queued,
                token,
                reply,
            } => {
                let result = self.handle_send(&command, replace_queued, token.as_ref());
                let _ = reply.send(result);
            },
            GateRequest::ReadJoints { reply } => {
                let result = self.read_joints();
                match &result {
                    Ok(_) => GateMetrics::incr(&self.metrics.reads),
                    Err(_) => GateMetrics::incr(&self.metrics.read_failures),
                }
                let _ = reply.send(result);
            },
            GateRequest::ReadCartesian { reply } => {
                let result = self.call("cartesian_position", |api| api.cartesian_position());
                match &result {
                    Ok(_) => GateMetrics::incr(&self.metrics.reads),
                    Err(_) => GateMetrics::incr(&self.metrics.read_failures),
                }
                let _ = reply.send(result);
            },
            GateRequest::Erase {
                cancel_goals,
                reply,
            } => {
                let _ = reply.send(self.handle_erase(cancel_goals));
            },
            GateRequest::Home { reply } => {
                let _ = reply.send(self.handle_home());
            },
            GateRequest::IsHomed { reply } => {
                let _ = reply.send(self.call("is_home_reached", |api| api.is_home_reached()));
            },
            GateRequest::SetEstop { engaged, reply } => {
                let result = if engaged {
                    self.engage_estop()
                } else {
                    self.release_estop()
                };
                let _ = reply.send(result);
            },
            GateRequest::QueryEstop { reply } => {
                let _ = reply.send(self.estopped);
            },
        }
    }

    fn call<T>(
        &mut self,
        operation: &'static str,
        f: impl FnOnce(&mut A) -> Result<T, VendorCode>,
    ) -> Result<T, DriverError> {
        f(&mut self.api).map_err(|code| {
            GateMetrics::incr(&self.metrics.hardware_faults);
            error!("Vendor call {} failed with {}", operation, code);
            fault(operation, code)
        })
    }

    fn ensure_mode(&mut self, mode: ControlMode) -> Result<(), DriverError> {
        if self.mode != mode {
            self.call("set_control_mode", |api| api.set_control_mode(mode))?;
            debug!("Control mode switched {:?} -> {:?}", self.mode, mode);
            self.mode = mode;
        }
        Ok(())
    }

    fn handle_send(
        &mut self,
        command: &HardwareCommand,
        replace_queued: bool,
        token: Option<&CancelToken>,
    ) -> Result<bool, DriverError> {
        if !command.is_finite() {
            return Err(DriverError::InvalidInput(format!(
                "non-finite command component: {:?}",
                command
            )));
        }

        let zero = command.is_zero_motion();
        if self.estopped {
            if zero {
                // 控制 API 已停止，手臂本就静止
                return Ok(true);
            }
            GateMetrics::incr(&self.metrics.commands_rejected);
            return Err(DriverError::Estopped);
        }
        if !zero && token.is_some_and(|t| t.is_cancelled()) {
            trace!("Dropping motion command from cancelled goal");
            return Ok(false);
        }

        self.ensure_mode(command.position_type.control_mode())?;
        if replace_queued {
            self.call("erase_all_trajectories", |api| api.erase_all_trajectories())?;
            GateMetrics::incr(&self.metrics.erases);
        }
        self.call("send_basic_trajectory", |api| {
            api.send_basic_trajectory(command)
        })?;
        GateMetrics::incr(&self.metrics.commands_sent);
        Ok(true)
    }

    fn read_joints(&mut self) -> Result<RawJointSnapshot, DriverError> {
        let position = self.call("angular_position", |api| api.angular_position())?;
        let velocity = self.call("angular_velocity", |api| api.angular_velocity())?;
        let force = self.call("angular_force", |api| api.angular_force())?;
        Ok(RawJointSnapshot {
            position,
            velocity,
            force,
        })
    }

    fn send_zero(&mut self) -> Result<(), DriverError> {
        self.ensure_mode(ControlMode::Angular)?;
        self.call("send_basic_trajectory", |api| {
            api.send_basic_trajectory(&HardwareCommand::zero_velocity())
        })
    }

    fn handle_erase(&mut self, cancel_goals: bool) -> Result<(), DriverError> {
        if cancel_goals {
            let cancelled = self.registry.cancel_all(CancelReason::Erased);
            info!("Erasing trajectories ({} goal(s) cancelled)", cancelled);
        }
        if self.estopped {
            // 激活急停时队列已被清空
            return Ok(());
        }
        self.call("erase_all_trajectories", |api| api.erase_all_trajectories())?;
        GateMetrics::incr(&self.metrics.erases);
        self.send_zero()
    }

    fn handle_home(&mut self) -> Result<(), DriverError> {
        if self.estopped {
            GateMetrics::incr(&self.metrics.commands_rejected);
            return Err(DriverError::Estopped);
        }
        self.ensure_mode(ControlMode::Angular)?;
        self.call("erase_all_trajectories", |api| api.erase_all_trajectories())?;
        GateMetrics::incr(&self.metrics.erases);
        self.call("move_home", |api| api.move_home())
    }

    fn engage_estop(&mut self) -> Result<(), DriverError> {
        if self.estopped {
            return Ok(());
        }
        // 标志先置位，之后任何失败都不会让急停失效
        self.estopped = true;
        let cancelled = self.registry.cancel_all(CancelReason::Estopped);
        warn!("Emergency stop engaged ({} goal(s) cancelled)", cancelled);

        let mut first_error = None;
        if let Err(e) = self.call("erase_all_trajectories", |api| api.erase_all_trajectories()) {
            first_error.get_or_insert(e);
        }
        if let Err(e) = self.send_zero() {
            first_error.get_or_insert(e);
        }
        if let Err(e) = self.call("stop_control_api", |api| api.stop_control_api()) {
            first_error.get_or_insert(e);
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn release_estop(&mut self) -> Result<(), DriverError> {
        if !self.estopped {
            return Ok(());
        }
        self.call("start_control_api", |api| api.start_control_api())?;
        self.call("set_control_mode", |api| {
            api.set_control_mode(ControlMode::Angular)
        })?;
        self.mode = ControlMode::Angular;
        self.estopped = false;
        info!("Emergency stop released, control API restarted");
        Ok(())
    }
}
