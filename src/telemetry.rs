//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了日志和链路追踪的初始化。

use opentelemetry::global;
use opentelemetry::trace::TracerProvider;
use opentelemetry_sdk::trace::TracerProvider as SdkTracerProvider;
use std::sync::Once;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

/// 默认日志过滤规则，可被 `RUST_LOG` 覆盖
pub const DEFAULT_FILTER: &str = "info,pathcache=info";

/// 初始化日志和 OpenTelemetry tracing
///
/// 应用启动时调用一次。安装 fmt 层、`EnvFilter` 和 OpenTelemetry 层；
/// 如果全局 subscriber 已经存在，则保持不变。
///
/// # 参数
///
/// * `service_name` - 服务名称，作为 tracer 名称
pub fn init_tracing(service_name: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // 未配置 exporter 时 provider 不导出任何 span
    let provider = SdkTracerProvider::builder().build();
    global::set_tracer_provider(provider.clone());
    let tracer = provider.tracer(service_name.to_string());

    let subscriber = Registry::default()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(tracing_opentelemetry::layer().with_tracer(tracer));

    // 由应用层决定是否已有 subscriber，冲突时忽略
    let _ = tracing::subscriber::set_global_default(subscriber);
}

static INIT: Once = Once::new();

/// 测试用的日志初始化，只生效一次
pub fn setup_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_span_events(FmtSpan::CLOSE)
            .with_env_filter(EnvFilter::new("debug"))
            .with_test_writer()
            .try_init()
            .ok();
    });
}
