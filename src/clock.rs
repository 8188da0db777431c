//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了失效时间戳使用的时钟。
//!
//! 时间戳是自 Unix 纪元以来的秒数（`f64`），精度为微秒。
//! 跨实例比较时间戳依赖各节点时钟大致同步，时钟偏差会直接表现为可读到旧值的窗口。

use std::sync::atomic::{AtomicU64, Ordering};

/// 时间戳（秒，微秒精度）
pub type Timestamp = f64;

/// 时钟特征
pub trait Clock: Send + Sync {
    /// 当前时间戳
    fn now(&self) -> Timestamp;
}

/// 系统墙上时钟
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        micros_to_timestamp(chrono::Utc::now().timestamp_micros())
    }
}

/// 手动时钟
///
/// 时间只在调用 `set` 或 `advance` 时变化，用于测试和确定性重放。
#[derive(Debug)]
pub struct ManualClock {
    bits: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            bits: AtomicU64::new(start.to_bits()),
        }
    }

    /// 设置当前时间
    pub fn set(&self, time: Timestamp) {
        self.bits.store(time.to_bits(), Ordering::SeqCst);
    }

    /// 时间前进 `secs` 秒，返回新的时间
    pub fn advance(&self, secs: f64) -> Timestamp {
        let mut current = self.bits.load(Ordering::SeqCst);
        loop {
            let next = (f64::from_bits(current) + secs).to_bits();
            match self
                .bits
                .compare_exchange(current, next, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return f64::from_bits(next),
                Err(actual) => current = actual,
            }
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}

/// 微秒整数转换为时间戳
pub fn micros_to_timestamp(micros: i64) -> Timestamp {
    micros as f64 / 1_000_000.0
}

/// 把时间戳格式化为 RFC 3339 字符串，用于日志和 CLI 输出
pub fn format_timestamp(time: Timestamp) -> String {
    let micros = (time * 1_000_000.0).round() as i64;
    match chrono::DateTime::from_timestamp_micros(micros) {
        Some(dt) => dt.to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
        None => format!("{time}"),
    }
}
