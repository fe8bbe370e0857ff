//! 关节状态与采样
//!
//! [`JointStateSampler`] 是 [`JointState`] 的唯一写入者：每次采样都经过硬件闸门读取，
//! 转换单位后通过 `ArcSwap` 发布，读取端无锁。
//!
//! # 单位
//!
//! | 条目 | 位置 | 速度 | 力矩 |
//! |------|------|------|------|
//! | 关节 1-6 | 弧度，归一化到 [-π, π] | 弧度/秒 | 厂商原始值 |
//! | 手指 1-2 | 原始值 × `finger_scale` | 原始值 × `finger_scale` | 厂商原始值 |

use crate::gate::{HardwareGate, RawJointSnapshot};
use arc_swap::ArcSwap;
use std::f64::consts::PI;
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

/// 手臂关节数
pub const ARM_JOINTS: usize = 6;
/// 手指数
pub const FINGERS: usize = 2;
/// 状态条目总数
pub const STATE_JOINTS: usize = ARM_JOINTS + FINGERS;

/// 把角度归一化到 [-π, π]
pub fn normalize_angle(angle: f64) -> f64 {
    let mut a = angle % (2.0 * PI);
    if a > PI {
        a -= 2.0 * PI;
    } else if a < -PI {
        a += 2.0 * PI;
    }
    a
}

/// 关节状态快照
#[derive(Debug, Clone, PartialEq)]
pub struct JointState {
    /// 条目名称（`{arm}_joint_1..6`, `{arm}_joint_finger_1..2`）
    pub names: Arc<[String]>,
    pub position: [f64; STATE_JOINTS],
    pub velocity: [f64; STATE_JOINTS],
    pub effort: [f64; STATE_JOINTS],
    /// 未缩放的手指位置（原始单位）
    pub finger_raw: [f64; FINGERS],
    /// 成功采样的序号，0 表示尚未采样
    pub sequence: u64,
    pub sampled_at: Instant,
}

impl JointState {
    fn empty(names: Arc<[String]>) -> Self {
        Self {
            names,
            position: [0.0; STATE_JOINTS],
            velocity: [0.0; STATE_JOINTS],
            effort: [0.0; STATE_JOINTS],
            finger_raw: [0.0; FINGERS],
            sequence: 0,
            sampled_at: Instant::now(),
        }
    }

    /// 手臂关节位置（弧度）
    pub fn arm_position(&self) -> [f64; ARM_JOINTS] {
        let mut out = [0.0; ARM_JOINTS];
        out.copy_from_slice(&self.position[..ARM_JOINTS]);
        out
    }

    /// 是否已经有过一次成功采样
    pub fn is_valid(&self) -> bool {
        self.sequence > 0
    }
}

/// 采样配置
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// 手臂名称前缀
    pub arm_name: String,
    /// 手指原始单位到发布单位的比例
    pub finger_scale: f64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            arm_name: "mico".to_string(),
            finger_scale: 1.0 / 120.0,
        }
    }
}

/// 关节状态采样器
pub struct JointStateSampler {
    gate: Arc<HardwareGate>,
    latest: ArcSwap<JointState>,
    config: SamplerConfig,
}

impl JointStateSampler {
    pub fn new(gate: Arc<HardwareGate>, config: SamplerConfig) -> Self {
        let names: Arc<[String]> = (1..=ARM_JOINTS)
            .map(|i| format!("{}_joint_{}", config.arm_name, i))
            .chain((1..=FINGERS).map(|i| format!("{}_joint_finger_{}", config.arm_name, i)))
            .collect();
        Self {
            gate,
            latest: ArcSwap::from_pointee(JointState::empty(names)),
            config,
        }
    }

    /// 通过闸门读取一次新状态
    ///
    /// 读取失败时记录警告并返回上一次已知状态。
    pub fn sample(&self) -> Arc<JointState> {
        match self.gate.read_joints() {
            Ok(raw) => {
                let previous = self.latest.load();
                let state = Arc::new(self.convert(&raw, &previous));
                self.latest.store(Arc::clone(&state));
                state
            },
            Err(e) => {
                warn!("Joint state read failed, keeping last known state: {}", e);
                self.latest.load_full()
            },
        }
    }

    /// 最近一次发布的状态（不触发硬件读取）
    pub fn latest(&self) -> Arc<JointState> {
        self.latest.load_full()
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    fn convert(&self, raw: &RawJointSnapshot, previous: &JointState) -> JointState {
        let scale = self.config.finger_scale;
        let mut state = JointState {
            names: Arc::clone(&previous.names),
            position: [0.0; STATE_JOINTS],
            velocity: [0.0; STATE_JOINTS],
            effort: [0.0; STATE_JOINTS],
            finger_raw: raw.position.fingers,
            sequence: previous.sequence + 1,
            sampled_at: Instant::now(),
        };
        for i in 0..ARM_JOINTS {
            state.position[i] = normalize_angle(raw.position.arm[i].to_radians());
            state.velocity[i] = raw.velocity.arm[i].to_radians();
            state.effort[i] = raw.force.arm[i];
        }
        for i in 0..FINGERS {
            state.position[ARM_JOINTS + i] = raw.position.fingers[i] * scale;
            state.velocity[ARM_JOINTS + i] = raw.velocity.fingers[i] * scale;
            state.effort[ARM_JOINTS + i] = raw.force.fingers[i];
        }
        state
    }
}
