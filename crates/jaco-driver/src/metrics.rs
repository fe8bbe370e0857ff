//! 硬件闸门指标
//!
//! 原子计数器，可以在任何线程读取，不引入锁竞争。

use std::sync::atomic::{AtomicU64, Ordering};

/// [`HardwareGate`](crate::HardwareGate) 运行指标
#[derive(Debug, Default)]
pub struct GateMetrics {
    /// 成功下发到硬件的运动命令数
    pub commands_sent: AtomicU64,

    /// 因急停被拒绝的命令数
    pub commands_rejected: AtomicU64,

    /// 厂商 API 返回非成功码的次数
    pub hardware_faults: AtomicU64,

    /// 成功的状态读取次数
    pub reads: AtomicU64,

    /// 失败的状态读取次数
    pub read_failures: AtomicU64,

    /// 清空轨迹队列的次数
    pub erases: AtomicU64,
}

impl GateMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> GateMetricsSnapshot {
        GateMetricsSnapshot {
            commands_sent: self.commands_sent.load(Ordering::Relaxed),
            commands_rejected: self.commands_rejected.load(Ordering::Relaxed),
            hardware_faults: self.hardware_faults.load(Ordering::Relaxed),
            reads: self.reads.load(Ordering::Relaxed),
            read_failures: self.read_failures.load(Ordering::Relaxed),
            erases: self.erases.load(Ordering::Relaxed),
        }
    }

    /// 重置所有计数器
    pub fn reset(&self) {
        self.commands_sent.store(0, Ordering::Relaxed);
        self.commands_rejected.store(0, Ordering::Relaxed);
        self.hardware_faults.store(0, Ordering::Relaxed);
        self.reads.store(0, Ordering::Relaxed);
        self.read_failures.store(0, Ordering::Relaxed);
        self.erases.store(0, Ordering::Relaxed);
    }

    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GateMetricsSnapshot {
    pub commands_sent: u64,
    pub commands_rejected: u64,
    pub hardware_faults: u64,
    pub reads: u64,
    pub read_failures: u64,
    pub erases: u64,
}

impl GateMetricsSnapshot {
    /// 读取失败率（百分比），没有读取时返回 0.0
    pub fn read_failure_rate(&self) -> f64 {
        let total = self.reads + self.read_failures;
        if total == 0 {
            return 0.0;
        }
        (self.read_failures as f64 / total as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_and_reset() {
        let metrics = GateMetrics::new();
        GateMetrics::incr(&metrics.commands_sent);
        GateMetrics::incr(&metrics.commands_sent);
        GateMetrics::incr(&metrics.read_failures);
        GateMetrics::incr(&metrics.reads);
        GateMetrics::incr(&metrics.reads);
        GateMetrics::incr(&metrics.reads);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.commands_sent, 2);
        assert!((snapshot.read_failure_rate() - 25.0).abs() < 1e-10);

        metrics.reset();
        assert_eq!(metrics.snapshot(), GateMetricsSnapshot::default());
        assert_eq!(metrics.snapshot().read_failure_rate(), 0.0);
    }
}
