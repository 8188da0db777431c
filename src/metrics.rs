//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存系统的指标收集功能。
//!
//! 指标实例由 `CacheManager` 创建并显式传给每个 `Cacher`，不使用全局状态。

use dashmap::DashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{span, Level};

/// 请求计数的键：(服务, 存储层, 操作, 结果)
type RequestKey = (String, String, String, String);
/// 耗时的键：(服务, 存储层, 操作)
type DurationKey = (String, String, String);

/// 指标收集器
#[derive(Debug)]
pub struct Metrics {
    enabled: AtomicBool,
    /// 请求总数统计
    requests_total: DashMap<RequestKey, u64>,
    /// 操作耗时 -> (total_duration_secs, count)
    operation_duration: DashMap<DurationKey, (f64, u64)>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new(true)
    }
}

fn request_key(service: &str, layer: &str, op: &str, result: &str) -> RequestKey {
    (
        service.to_string(),
        layer.to_string(),
        op.to_string(),
        result.to_string(),
    )
}

fn duration_key(service: &str, layer: &str, op: &str) -> DurationKey {
    (service.to_string(), layer.to_string(), op.to_string())
}

/// 转义 Prometheus 标签值中的 `\`、`"` 和换行
fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

impl Metrics {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            requests_total: DashMap::new(),
            operation_duration: DashMap::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// 记录请求指标
    ///
    /// # 参数
    ///
    /// * `service` - 服务名称
    /// * `layer` - 存储层（L1/L2）
    /// * `op` - 操作类型
    /// * `result` - 操作结果（hit/miss/stale/...）
    pub fn record_request(&self, service: &str, layer: &str, op: &str, result: &str) {
        if !self.is_enabled() {
            return;
        }
        let span = span!(Level::TRACE, "cache_request", service, layer, op, result);
        let _enter = span.enter();
        *self
            .requests_total
            .entry(request_key(service, layer, op, result))
            .or_insert(0) += 1;
    }

    /// 记录操作耗时
    pub fn record_duration(&self, service: &str, layer: &str, op: &str, duration_secs: f64) {
        if !self.is_enabled() {
            return;
        }
        let mut entry = self
            .operation_duration
            .entry(duration_key(service, layer, op))
            .or_insert((0.0, 0));
        entry.0 += duration_secs;
        entry.1 += 1;
    }

    /// 读取某个请求计数
    pub fn request_count(&self, service: &str, layer: &str, op: &str, result: &str) -> u64 {
        self.requests_total
            .get(&request_key(service, layer, op, result))
            .map(|v| *v)
            .unwrap_or(0)
    }

    /// 读取某个操作的 (总耗时, 次数)
    pub fn duration(&self, service: &str, layer: &str, op: &str) -> Option<(f64, u64)> {
        self.operation_duration
            .get(&duration_key(service, layer, op))
            .map(|v| *v)
    }

    /// 以 Prometheus 文本格式输出所有指标
    pub fn render_prometheus(&self) -> String {
        let mut requests: Vec<(RequestKey, u64)> = self
            .requests_total
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect();
        requests.sort();
        let mut durations: Vec<(DurationKey, (f64, u64))> = self
            .operation_duration
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect();
        durations.sort_by(|a, b| a.0.cmp(&b.0));

        let mut output = String::new();
        for ((service, layer, op, result), v) in &requests {
            let _ = writeln!(
                output,
                "cache_requests_total{{service=\"{}\", layer=\"{}\", operation=\"{}\", result=\"{}\"}} {}",
                escape_label(service),
                escape_label(layer),
                escape_label(op),
                escape_label(result),
                v
            );
        }
        for ((service, layer, op), (total, count)) in &durations {
            let labels = format!(
                "service=\"{}\", layer=\"{}\", operation=\"{}\"",
                escape_label(service),
                escape_label(layer),
                escape_label(op)
            );
            let _ = writeln!(
                output,
                "cache_operation_duration_seconds_sum{{{}}} {}",
                labels, total
            );
            let _ = writeln!(
                output,
                "cache_operation_duration_seconds_count{{{}}} {}",
                labels, count
            );
        }
        output
    }
}
