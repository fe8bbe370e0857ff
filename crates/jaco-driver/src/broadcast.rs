//! 周期性关节状态广播
//!
//! 后台线程按固定频率调用 [`JointStateSampler::sample`]，把结果推给所有订阅者。
//! 订阅者来不及消费时丢弃该帧，接收端被丢弃后自动退订。

use crate::state::{JointState, JointStateSampler};
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{JoinHandle, spawn};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const SUBSCRIBER_CAPACITY: usize = 16;

type Subscribers = Arc<Mutex<Vec<Sender<Arc<JointState>>>>>;

/// 状态广播线程句柄
pub struct StateBroadcaster {
    subscribers: Subscribers,
    is_running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl StateBroadcaster {
    /// 以 `rate_hz` 启动广播线程
    pub fn spawn(sampler: Arc<JointStateSampler>, rate_hz: f64) -> Self {
        let subscribers: Subscribers = Arc::new(Mutex::new(Vec::new()));
        let is_running = Arc::new(AtomicBool::new(true));
        let period = Duration::from_secs_f64(1.0 / rate_hz.max(1e-3));

        let thread = {
            let subscribers = Arc::clone(&subscribers);
            let is_running = Arc::clone(&is_running);
            spawn(move || publish_loop(sampler, subscribers, is_running, period))
        };

        Self {
            subscribers,
            is_running,
            thread: Some(thread),
        }
    }

    /// 订阅状态流
    pub fn subscribe(&self) -> Receiver<Arc<JointState>> {
        let (tx, rx) = bounded(SUBSCRIBER_CAPACITY);
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl Drop for StateBroadcaster {
    fn drop(&mut self) {
        self.is_running.store(false, Ordering::Release);
        if let Some(handle) = self.thread.take()
            && handle.join().is_err()
        {
            warn!("State broadcaster thread panicked");
        }
    }
}

fn publish_loop(
    sampler: Arc<JointStateSampler>,
    subscribers: Subscribers,
    is_running: Arc<AtomicBool>,
    period: Duration,
) {
    let mut next_tick = Instant::now();
    while is_running.load(Ordering::Acquire) {
        next_tick += period;

        let state = sampler.sample();
        subscribers.lock().retain(|tx| match tx.try_send(Arc::clone(&state)) {
            Ok(()) | Err(TrySendError::Full(_)) => true,
            Err(TrySendError::Disconnected(_)) => false,
        });

        let now = Instant::now();
        if next_tick > now {
            spin_sleep::sleep(next_tick - now);
        } else {
            debug!(
                "State publish overrun by {:?} (period {:?})",
                now.duration_since(next_tick),
                period
            );
            next_tick = now;
        }
    }
    debug!("State broadcaster exited");
}
