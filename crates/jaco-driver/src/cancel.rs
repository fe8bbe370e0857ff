//! 目标取消令牌与注册表
//!
//! 每个被接受的目标持有一个 [`CancelToken`]。控制循环在每个 tick 开头检查令牌；
//! 硬件线程在急停或清空轨迹时通过 [`GoalRegistry`] 取消所有在途目标。
//!
//! 令牌只记录第一次取消的原因，后续取消不会覆盖。

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

/// 取消原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CancelReason {
    /// 同一接口上的新目标或客户端取消
    Preempted = 1,
    /// 急停
    Estopped = 2,
    /// 清空轨迹
    Erased = 3,
}

impl CancelReason {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(CancelReason::Preempted),
            2 => Some(CancelReason::Estopped),
            3 => Some(CancelReason::Erased),
            _ => None,
        }
    }
}

const NOT_CANCELLED: u8 = 0;

/// 可克隆的取消令牌
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    state: Arc<AtomicU8>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// 请求取消
    ///
    /// 返回 `true` 表示本次调用设置了原因；已被取消的令牌保持原来的原因。
    pub fn cancel(&self, reason: CancelReason) -> bool {
        self.state
            .compare_exchange(
                NOT_CANCELLED,
                reason as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.load(Ordering::Acquire) != NOT_CANCELLED
    }

    pub fn reason(&self) -> Option<CancelReason> {
        CancelReason::from_u8(self.state.load(Ordering::Acquire))
    }

    /// 两个句柄是否指向同一个令牌
    pub fn same_as(&self, other: &CancelToken) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

/// 在途目标注册表
#[derive(Debug, Default)]
pub struct GoalRegistry {
    goals: Mutex<HashMap<u64, CancelToken>>,
    next_id: AtomicU64,
}

impl GoalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册令牌，返回的守卫在析构时自动注销
    pub fn register(self: &Arc<Self>, token: CancelToken) -> GoalRegistration {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.goals.lock().insert(id, token);
        GoalRegistration {
            registry: Arc::clone(self),
            id,
        }
    }

    /// 取消所有在途目标，返回本次实际被取消的数量
    pub fn cancel_all(&self, reason: CancelReason) -> usize {
        self.goals
            .lock()
            .values()
            .filter(|token| token.cancel(reason))
            .count()
    }

    pub fn active_count(&self) -> usize {
        self.goals.lock().len()
    }
}

/// 目标注册守卫（RAII）
#[derive(Debug)]
pub struct GoalRegistration {
    registry: Arc<GoalRegistry>,
    id: u64,
}

impl Drop for GoalRegistration {
    fn drop(&mut self) {
        self.registry.goals.lock().remove(&self.id);
    }
}
