//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存管理器，负责按配置为每个服务构建 `Cacher`。
//!
//! 管理器是普通的值，由应用在启动时创建并显式传递，不注册任何全局实例。

use crate::backend::redis_provider::{DefaultRedisProvider, RedisProvider};
use crate::backend::{
    InvalidationStore, MemoryInvalidationStore, MokaValueStore, RedisInvalidationStore,
};
use crate::cacher::Cacher;
use crate::config::{Config, InvalidationBackend, ServiceConfig};
use crate::error::{CacheError, Result};
use crate::metrics::Metrics;
use crate::serialization::SerializerEnum;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// 缓存管理器
pub struct CacheManager {
    cachers: DashMap<String, Arc<Cacher>>,
    metrics: Arc<Metrics>,
}

impl CacheManager {
    /// 创建一个不含任何服务的管理器
    pub fn empty(metrics: Arc<Metrics>) -> Self {
        Self {
            cachers: DashMap::new(),
            metrics,
        }
    }

    /// 初始化缓存管理器
    ///
    /// 验证配置并为每个服务创建 `Cacher`
    pub async fn init(config: Config) -> Result<Self> {
        Self::init_with_provider(config, Arc::new(DefaultRedisProvider)).await
    }

    /// 使用指定的 Redis 连接提供者初始化
    #[instrument(skip(config, provider), level = "info", fields(service_count = config.services.len()))]
    pub async fn init_with_provider(
        config: Config,
        provider: Arc<dyn RedisProvider>,
    ) -> Result<Self> {
        config.validate().map_err(CacheError::ConfigError)?;

        info!(
            "Initializing CacheManager with {} services",
            config.services.len()
        );
        let manager = Self::empty(Arc::new(Metrics::new(config.global.enable_metrics)));

        for (name, service_cfg) in &config.services {
            let cacher = manager
                .build_cacher(name, service_cfg, &config, provider.clone())
                .await?;
            manager.register(cacher);
        }
        Ok(manager)
    }

    async fn build_cacher(
        &self,
        name: &str,
        service_cfg: &ServiceConfig,
        config: &Config,
        provider: Arc<dyn RedisProvider>,
    ) -> Result<Cacher> {
        let ttl = Duration::from_secs(service_cfg.effective_ttl(&config.global));
        let fast = Arc::new(MokaValueStore::with_config(&service_cfg.fast).with_default_ttl(ttl));

        let distributed: Arc<dyn InvalidationStore> = match service_cfg.invalidation.backend {
            InvalidationBackend::Memory => {
                warn!(
                    "Service '{}' uses the in-process invalidation store; invalidations will not reach other instances",
                    name
                );
                Arc::new(MemoryInvalidationStore::new())
            }
            InvalidationBackend::Redis => {
                let redis_cfg = service_cfg.invalidation.redis.as_ref().ok_or_else(|| {
                    CacheError::ConfigError(format!("缺少{}的Redis配置", name))
                })?;
                Arc::new(RedisInvalidationStore::new_with_provider(name, redis_cfg, provider).await?)
            }
        };

        let serializer = SerializerEnum::from_config(
            service_cfg
                .serialization
                .as_ref()
                .unwrap_or(&config.global.serialization),
            config.global.compress,
        );

        info!(
            "Service '{}' ready: backend={:?}, ttl={}s",
            name,
            service_cfg.invalidation.backend,
            ttl.as_secs()
        );
        Ok(Cacher::new(name, fast, distributed)
            .with_serializer(serializer)
            .with_metrics(self.metrics.clone()))
    }

    /// 注册一个手动构建的 Cacher，同名服务会被替换
    pub fn register(&self, cacher: Cacher) -> Arc<Cacher> {
        let cacher = Arc::new(cacher.with_metrics(self.metrics.clone()));
        self.cachers
            .insert(cacher.service_name().to_string(), cacher.clone());
        cacher
    }

    /// 获取指定服务的 Cacher
    pub fn cacher(&self, service: &str) -> Result<Arc<Cacher>> {
        self.cachers
            .get(service)
            .map(|r| r.value().clone())
            .ok_or_else(|| CacheError::ConfigError(format!("未找到服务{}", service)))
    }

    /// 所有已注册的服务名称（已排序）
    pub fn services(&self) -> Vec<String> {
        let mut names: Vec<String> = self.cachers.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// 关闭所有服务
    ///
    /// 清空每个服务的快速存储并注销所有服务；共享的失效标记保持不变。
    #[instrument(skip(self), level = "info")]
    pub async fn shutdown(&self) -> Result<()> {
        info!("开始关闭所有缓存服务...");
        let cachers: Vec<Arc<Cacher>> = self.cachers.iter().map(|e| e.value().clone()).collect();

        let mut errors = Vec::new();
        for cacher in cachers {
            match cacher.clear_fast().await {
                Ok(()) => info!("服务 {} 已关闭", cacher.service_name()),
                Err(e) => {
                    warn!("关闭服务 {} 时出错: {}", cacher.service_name(), e);
                    errors.push(format!("{}: {}", cacher.service_name(), e));
                }
            }
        }
        self.cachers.clear();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(CacheError::ShutdownError(format!(
                "部分服务关闭失败: {}",
                errors.join(", ")
            )))
        }
    }
}
