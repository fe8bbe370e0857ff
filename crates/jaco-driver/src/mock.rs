//! 模拟机械臂
//!
//! 实现 [`ArmApi`]，按真实时间积分命令，用于没有硬件时的测试和演示：
//!
//! - 角速度命令在 `velocity_hold` 时间内有效（与真实硬件一样需要持续刷新）
//! - 角度位置命令进入 FIFO 队列，按 `position_speed` 逐点逼近
//! - 笛卡尔位置命令进入独立队列，只改变笛卡尔位姿（模拟不做运动学）
//! - 手指位置被限制在 `[0, finger_max]`
//! - 可以注入厂商错误码
//!
//! [`SimulatedArm`] 是可克隆的句柄，测试可以在闸门持有一份的同时检查另一份。

use crate::api::{ArmApi, CartesianReading, RawJointReading};
use crate::command::{ControlMode, HardwareCommand, PositionType};
use crate::error::VendorCode;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// 模拟参数
#[derive(Debug, Clone)]
pub struct SimulatedArmConfig {
    /// 初始关节角度（度）
    pub initial_joints: [f64; 6],
    /// 回零位置（度）
    pub home_joints: [f64; 6],
    /// 角度位置队列的播放速度（度/秒）
    pub position_speed: f64,
    /// 回零速度（度/秒）
    pub home_speed: f64,
    /// 速度命令的有效时长
    pub velocity_hold: Duration,
    /// 手指最大行程（原始单位）
    pub finger_max: f64,
    /// 手指位置命令的播放速度（原始单位/秒）
    pub finger_speed: f64,
    /// 初始笛卡尔位姿 `[x, y, z, θx, θy, θz]`
    pub initial_pose: [f64; 6],
    /// 笛卡尔平移速度（米/秒）
    pub cartesian_speed: f64,
    /// 笛卡尔旋转速度（弧度/秒）
    pub cartesian_angular_speed: f64,
}

impl Default for SimulatedArmConfig {
    fn default() -> Self {
        Self {
            initial_joints: [0.0; 6],
            home_joints: [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            position_speed: 90.0,
            home_speed: 60.0,
            velocity_hold: Duration::from_millis(60),
            finger_max: 6400.0,
            finger_speed: 3000.0,
            initial_pose: [0.2, -0.25, 0.5, 1.57, 0.0, 0.0],
            cartesian_speed: 0.2,
            cartesian_angular_speed: 1.0,
        }
    }
}

/// 厂商调用记录
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VendorCall {
    StartControlApi,
    StopControlApi,
    SetControlMode(ControlMode),
    AngularPosition,
    AngularVelocity,
    AngularForce,
    CartesianPosition,
    SendBasicTrajectory,
    EraseAllTrajectories,
    MoveHome,
    IsHomeReached,
}

impl VendorCall {
    fn is_read(self) -> bool {
        matches!(
            self,
            VendorCall::AngularPosition
                | VendorCall::AngularVelocity
                | VendorCall::AngularForce
                | VendorCall::CartesianPosition
                | VendorCall::IsHomeReached
        )
    }
}

/// 被硬件接受的命令及其时间戳
#[derive(Debug, Clone, Copy)]
pub struct RecordedCommand {
    pub command: HardwareCommand,
    pub at: Instant,
}

#[derive(Debug)]
struct SimState {
    config: SimulatedArmConfig,
    joints: [f64; 6],
    joint_rates: [f64; 6],
    fingers: [f64; 2],
    arm_velocity: Option<([f64; 6], Instant)>,
    finger_velocity: Option<([f64; 2], Instant)>,
    angular_queue: VecDeque<[f64; 6]>,
    finger_target: Option<[f64; 2]>,
    pose: [f64; 6],
    twist: Option<([f64; 6], Instant)>,
    cartesian_queue: VecDeque<[f64; 6]>,
    homing: bool,
    control_api_running: bool,
    mode: ControlMode,
    last_update: Instant,
    calls: Vec<VendorCall>,
    commands: Vec<RecordedCommand>,
    erase_count: usize,
    fail_calls: usize,
    fail_reads: usize,
    fail_sends: usize,
    fail_code: i32,
}

const SIM_SUBSTEP: Duration = Duration::from_millis(5);

fn step_toward(current: f64, target: f64, max_step: f64) -> f64 {
    let delta = target - current;
    if delta.abs() <= max_step {
        target
    } else {
        current + max_step * delta.signum()
    }
}

impl SimState {
    fn new(config: SimulatedArmConfig) -> Self {
        Self {
            joints: config.initial_joints,
            joint_rates: [0.0; 6],
            fingers: [0.0; 2],
            arm_velocity: None,
            finger_velocity: None,
            angular_queue: VecDeque::new(),
            finger_target: None,
            pose: config.initial_pose,
            twist: None,
            cartesian_queue: VecDeque::new(),
            homing: false,
            control_api_running: false,
            mode: ControlMode::Angular,
            last_update: Instant::now(),
            calls: Vec::new(),
            commands: Vec::new(),
            erase_count: 0,
            fail_calls: 0,
            fail_reads: 0,
            fail_sends: 0,
            fail_code: 0,
            config,
        }
    }

    /// 把模拟推进到 `now`（按 5ms 子步积分，队列点之间不会丢失时间）
    fn advance(&mut self, now: Instant) {
        let start = self.last_update;
        if now <= start {
            return;
        }
        let before = self.joints;
        let mut t = start;
        while t < now {
            let next = (t + SIM_SUBSTEP).min(now);
            self.step(t, next);
            t = next;
        }
        self.last_update = now;

        let dt = (now - start).as_secs_f64();
        for i in 0..6 {
            self.joint_rates[i] = (self.joints[i] - before[i]) / dt;
        }
    }

    fn step(&mut self, from: Instant, to: Instant) {
        let dt = (to - from).as_secs_f64();
        // 速度命令在 until 之前有效
        let held = |until: Instant| until.min(to).saturating_duration_since(from).as_secs_f64();

        if !self.control_api_running {
            self.arm_velocity = None;
            self.finger_velocity = None;
            self.twist = None;
            return;
        }

        if self.homing {
            let step = self.config.home_speed * dt;
            let mut reached = true;
            for (joint, home) in self.joints.iter_mut().zip(self.config.home_joints) {
                *joint = step_toward(*joint, home, step);
                reached &= (*joint - home).abs() < 1e-9;
            }
            if reached {
                self.homing = false;
            }
        } else if let Some(target) = self.angular_queue.front().copied() {
            let step = self.config.position_speed * dt;
            let mut reached = true;
            for (joint, goal) in self.joints.iter_mut().zip(target) {
                *joint = step_toward(*joint, goal, step);
                reached &= (*joint - goal).abs() < 1e-9;
            }
            if reached {
                self.angular_queue.pop_front();
            }
        } else if let Some((velocity, until)) = self.arm_velocity {
            let active_dt = held(until);
            for (joint, v) in self.joints.iter_mut().zip(velocity) {
                *joint += v * active_dt;
            }
            if to >= until {
                self.arm_velocity = None;
            }
        }

        if let Some(target) = self.finger_target {
            let step = self.config.finger_speed * dt;
            for (finger, goal) in self.fingers.iter_mut().zip(target) {
                *finger = step_toward(*finger, goal, step);
            }
            if self.fingers == target {
                self.finger_target = None;
            }
        } else if let Some((velocity, until)) = self.finger_velocity {
            let active_dt = held(until);
            for (finger, v) in self.fingers.iter_mut().zip(velocity) {
                *finger += v * active_dt;
            }
            if to >= until {
                self.finger_velocity = None;
            }
        }
        let finger_max = self.config.finger_max;
        for finger in self.fingers.iter_mut() {
            *finger = finger.clamp(0.0, finger_max);
        }

        if let Some(target) = self.cartesian_queue.front().copied() {
            let linear = self.config.cartesian_speed * dt;
            let angular = self.config.cartesian_angular_speed * dt;
            for (i, (axis, goal)) in self.pose.iter_mut().zip(target).enumerate() {
                let step = if i < 3 { linear } else { angular };
                *axis = step_toward(*axis, goal, step);
            }
            if self.pose == target {
                self.cartesian_queue.pop_front();
            }
        } else if let Some((twist, until)) = self.twist {
            let active_dt = held(until);
            for (axis, v) in self.pose.iter_mut().zip(twist) {
                *axis += v * active_dt;
            }
            if to >= until {
                self.twist = None;
            }
        }
    }

    fn enter(&mut self, call: VendorCall) -> Result<(), VendorCode> {
        self.advance(Instant::now());
        self.calls.push(call);
        if self.fail_calls > 0 {
            self.fail_calls -= 1;
            return Err(VendorCode(self.fail_code));
        }
        if call.is_read() && self.fail_reads > 0 {
            self.fail_reads -= 1;
            return Err(VendorCode(self.fail_code));
        }
        if call == VendorCall::SendBasicTrajectory && self.fail_sends > 0 {
            self.fail_sends -= 1;
            return Err(VendorCode(self.fail_code));
        }
        Ok(())
    }

    fn clamp_fingers(&self, fingers: [f64; 2]) -> [f64; 2] {
        fingers.map(|f| f.clamp(0.0, self.config.finger_max))
    }

    fn apply(&mut self, command: &HardwareCommand) {
        let now = Instant::now();
        let hold = now + self.config.velocity_hold;
        match command.position_type {
            PositionType::AngularVelocity => {
                if let Some(arm) = command.arm {
                    self.arm_velocity = Some((arm, hold));
                }
                if let Some(fingers) = command.fingers {
                    self.finger_target = None;
                    self.finger_velocity = Some((fingers, hold));
                }
            },
            PositionType::AngularPosition => {
                if let Some(arm) = command.arm {
                    self.angular_queue.push_back(arm);
                }
                if let Some(fingers) = command.fingers {
                    self.finger_target = Some(self.clamp_fingers(fingers));
                }
            },
            PositionType::CartesianPosition => {
                if let Some(arm) = command.arm {
                    self.cartesian_queue.push_back(arm);
                }
                if let Some(fingers) = command.fingers {
                    self.finger_target = Some(self.clamp_fingers(fingers));
                }
            },
            PositionType::CartesianVelocity => {
                if let Some(arm) = command.arm {
                    self.twist = Some((arm, hold));
                }
                if let Some(fingers) = command.fingers {
                    self.finger_target = None;
                    self.finger_velocity = Some((fingers, hold));
                }
            },
        }
        self.commands.push(RecordedCommand { command: *command, at: now });
    }
}

#[derive(Debug)]
struct SimShared {
    state: Mutex<SimState>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// 模拟机械臂句柄
#[derive(Debug, Clone)]
pub struct SimulatedArm {
    shared: Arc<SimShared>,
}

impl Default for SimulatedArm {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedArm {
    pub fn new() -> Self {
        Self::with_config(SimulatedArmConfig::default())
    }

    pub fn with_config(config: SimulatedArmConfig) -> Self {
        Self {
            shared: Arc::new(SimShared {
                state: Mutex::new(SimState::new(config)),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }),
        }
    }

    fn with_call<T>(
        &self,
        call: VendorCall,
        f: impl FnOnce(&mut SimState) -> T,
    ) -> Result<T, VendorCode> {
        let depth = self.shared.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.max_in_flight.fetch_max(depth, Ordering::SeqCst);
        let result = {
            let mut state = self.shared.state.lock();
            state.enter(call).map(|_| f(&mut state))
        };
        self.shared.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    /// 后续 `n` 次厂商调用（任意类型）返回 `code`
    pub fn fail_next_calls(&self, n: usize, code: i32) {
        let mut state = self.shared.state.lock();
        state.fail_calls = n;
        state.fail_code = code;
    }

    /// 后续 `n` 次读取调用返回 `code`
    pub fn fail_next_reads(&self, n: usize, code: i32) {
        let mut state = self.shared.state.lock();
        state.fail_reads = n;
        state.fail_code = code;
    }

    /// 后续 `n` 次 `send_basic_trajectory` 返回 `code`，读取不受影响
    pub fn fail_next_sends(&self, n: usize, code: i32) {
        let mut state = self.shared.state.lock();
        state.fail_sends = n;
        state.fail_code = code;
    }

    /// 直接设置关节角度（度），清除进行中的运动
    pub fn set_joints(&self, degrees: [f64; 6]) {
        let mut state = self.shared.state.lock();
        state.advance(Instant::now());
        state.joints = degrees;
        state.arm_velocity = None;
        state.angular_queue.clear();
    }

    pub fn set_fingers(&self, raw: [f64; 2]) {
        let mut state = self.shared.state.lock();
        state.advance(Instant::now());
        state.fingers = raw;
        state.finger_velocity = None;
        state.finger_target = None;
    }

    /// 当前关节角度（度）
    pub fn joints(&self) -> [f64; 6] {
        let mut state = self.shared.state.lock();
        state.advance(Instant::now());
        state.joints
    }

    pub fn fingers(&self) -> [f64; 2] {
        let mut state = self.shared.state.lock();
        state.advance(Instant::now());
        state.fingers
    }

    pub fn pose(&self) -> [f64; 6] {
        let mut state = self.shared.state.lock();
        state.advance(Instant::now());
        state.pose
    }

    pub fn control_api_running(&self) -> bool {
        self.shared.state.lock().control_api_running
    }

    pub fn control_mode(&self) -> ControlMode {
        self.shared.state.lock().mode
    }

    /// 硬件已接受的所有运动命令
    pub fn commands(&self) -> Vec<RecordedCommand> {
        self.shared.state.lock().commands.clone()
    }

    /// 所有厂商调用（包括失败的）
    pub fn vendor_calls(&self) -> Vec<VendorCall> {
        self.shared.state.lock().calls.clone()
    }

    pub fn erase_count(&self) -> usize {
        self.shared.state.lock().erase_count
    }

    /// 硬件队列中剩余的位置点数
    pub fn queued_points(&self) -> usize {
        let mut state = self.shared.state.lock();
        state.advance(Instant::now());
        state.angular_queue.len() + state.cartesian_queue.len()
    }

    /// 曾经同时进行的厂商调用的最大数量
    pub fn max_concurrent_calls(&self) -> usize {
        self.shared.max_in_flight.load(Ordering::SeqCst)
    }
}

impl ArmApi for SimulatedArm {
    fn start_control_api(&mut self) -> Result<(), VendorCode> {
        self.with_call(VendorCall::StartControlApi, |s| {
            s.control_api_running = true;
        })
    }

    fn stop_control_api(&mut self) -> Result<(), VendorCode> {
        self.with_call(VendorCall::StopControlApi, |s| {
            s.control_api_running = false;
            s.arm_velocity = None;
            s.finger_velocity = None;
            s.twist = None;
        })
    }

    fn set_control_mode(&mut self, mode: ControlMode) -> Result<(), VendorCode> {
        self.with_call(VendorCall::SetControlMode(mode), |s| s.mode = mode)
    }

    fn angular_position(&mut self) -> Result<RawJointReading, VendorCode> {
        self.with_call(VendorCall::AngularPosition, |s| RawJointReading {
            arm: s.joints,
            fingers: s.fingers,
        })
    }

    fn angular_velocity(&mut self) -> Result<RawJointReading, VendorCode> {
        self.with_call(VendorCall::AngularVelocity, |s| RawJointReading {
            arm: s.joint_rates,
            fingers: s.finger_velocity.map(|(v, _)| v).unwrap_or_default(),
        })
    }

    fn angular_force(&mut self) -> Result<RawJointReading, VendorCode> {
        self.with_call(VendorCall::AngularForce, |_| RawJointReading::default())
    }

    fn cartesian_position(&mut self) -> Result<CartesianReading, VendorCode> {
        self.with_call(VendorCall::CartesianPosition, |s| CartesianReading {
            position: [s.pose[0], s.pose[1], s.pose[2]],
            orientation: [s.pose[3], s.pose[4], s.pose[5]],
        })
    }

    fn send_basic_trajectory(&mut self, command: &HardwareCommand) -> Result<(), VendorCode> {
        self.with_call(VendorCall::SendBasicTrajectory, |s| s.apply(command))
    }

    fn erase_all_trajectories(&mut self) -> Result<(), VendorCode> {
        self.with_call(VendorCall::EraseAllTrajectories, |s| {
            s.angular_queue.clear();
            s.cartesian_queue.clear();
            s.finger_target = None;
            s.homing = false;
            s.erase_count += 1;
        })
    }

    fn move_home(&mut self) -> Result<(), VendorCode> {
        self.with_call(VendorCall::MoveHome, |s| {
            s.arm_velocity = None;
            s.angular_queue.clear();
            s.homing = true;
        })
    }

    fn is_home_reached(&mut self) -> Result<bool, VendorCode> {
        self.with_call(VendorCall::IsHomeReached, |s| {
            !s.homing
                && s.joints
                    .iter()
                    .zip(s.config.home_joints)
                    .all(|(j, h)| (j - h).abs() < 1e-6)
        })
    }
}
