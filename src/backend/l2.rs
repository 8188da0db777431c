//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了基于 Redis 的共享失效标记存储（L2）。
//!
//! 每个被失效的前缀对应一个字符串键 `{key_prefix}:{service}:{prefix}`，
//! 值为失效时间戳的十进制表示。L2 只保存这些小标记，从不保存缓存值。

use super::redis_provider::{DefaultRedisProvider, RedisHandle, RedisProvider};
use super::InvalidationStore;
use crate::clock::Timestamp;
use crate::config::RedisConfig;
use crate::error::{CacheError, Result};
use async_trait::async_trait;
use redis::FromRedisValue;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, instrument};

/// Redis 失效标记存储
#[derive(Clone, Debug)]
pub struct RedisInvalidationStore {
    handle: RedisHandle,
    namespace: String,
    command_timeout: Duration,
    marker_ttl_secs: Option<u64>,
}

impl RedisInvalidationStore {
    /// 创建新的 Redis 失效标记存储
    ///
    /// # 参数
    ///
    /// * `service_name` - 服务名称，用于隔离不同服务的标记
    /// * `config` - Redis配置
    #[instrument(skip(config), level = "info", name = "init_redis_invalidation_store")]
    pub async fn new(service_name: &str, config: &RedisConfig) -> Result<Self> {
        Self::new_with_provider(service_name, config, Arc::new(DefaultRedisProvider)).await
    }

    /// 使用指定的连接提供者创建存储
    #[instrument(skip(config, provider), level = "info", fields(mode = ?config.mode))]
    pub async fn new_with_provider(
        service_name: &str,
        config: &RedisConfig,
        provider: Arc<dyn RedisProvider>,
    ) -> Result<Self> {
        let handle = provider.connect(config).await?;
        Ok(Self::from_handle(service_name, config, handle))
    }

    /// 在已建立的连接上创建存储
    pub fn from_handle(service_name: &str, config: &RedisConfig, handle: RedisHandle) -> Self {
        Self {
            handle,
            namespace: format!("{}:{}", config.key_prefix, service_name),
            command_timeout: Duration::from_millis(config.command_timeout_ms),
            marker_ttl_secs: config.invalidation_ttl_secs,
        }
    }

    /// 前缀对应的 Redis 键
    pub fn marker_key(&self, prefix: &str) -> String {
        marker_key(&self.namespace, prefix)
    }

    async fn query<T: FromRedisValue + Send>(&self, cmd: redis::Cmd) -> Result<T> {
        let fut = async {
            match &self.handle {
                RedisHandle::Standalone { manager, .. } => {
                    let mut conn = manager.clone();
                    cmd.query_async::<T>(&mut conn).await
                }
                RedisHandle::Cluster { client } => {
                    let mut conn = client.get_async_connection().await?;
                    cmd.query_async::<T>(&mut conn).await
                }
            }
        };
        match timeout(self.command_timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(CacheError::Timeout(format!(
                "Redis command timed out after {}ms",
                self.command_timeout.as_millis()
            ))),
        }
    }
}

fn marker_key(namespace: &str, prefix: &str) -> String {
    format!("{}:{}", namespace, prefix)
}

fn encode_timestamp(time: Timestamp) -> String {
    // f64 的 Display 输出可以无损解析回来
    time.to_string()
}

fn decode_timestamp(key: &str, raw: &str) -> Result<Timestamp> {
    raw.parse::<f64>().map_err(|e| {
        CacheError::BackendError(format!(
            "corrupt invalidation marker at '{}': {:?} ({})",
            key, raw, e
        ))
    })
}

#[async_trait]
impl InvalidationStore for RedisInvalidationStore {
    #[instrument(skip(self), level = "debug")]
    async fn record_invalidation(&self, prefix: &str, time: Timestamp) -> Result<bool> {
        let key = self.marker_key(prefix);
        let mut cmd = redis::cmd("SET");
        cmd.arg(&key).arg(encode_timestamp(time));
        if let Some(ttl) = self.marker_ttl_secs {
            cmd.arg("EX").arg(ttl);
        }
        let reply: Option<String> = self.query(cmd).await?;
        let accepted = reply.as_deref() == Some("OK");
        debug!("L2 marker recorded: key={}, accepted={}", key, accepted);
        Ok(accepted)
    }

    #[instrument(skip(self), level = "debug")]
    async fn latest_invalidation(&self, prefix: &str) -> Result<Option<Timestamp>> {
        let key = self.marker_key(prefix);
        let mut cmd = redis::cmd("GET");
        cmd.arg(&key);
        let raw: Option<String> = self.query(cmd).await?;
        raw.map(|raw| decode_timestamp(&key, &raw)).transpose()
    }

    #[instrument(skip(self), level = "debug")]
    async fn clear_invalidation(&self, prefix: &str) -> Result<()> {
        let key = self.marker_key(prefix);
        let mut cmd = redis::cmd("DEL");
        cmd.arg(&key);
        let removed: i64 = self.query(cmd).await?;
        debug!("L2 marker cleared: key={}, removed={}", key, removed);
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn ping(&self) -> Result<()> {
        let response: String = self.query(redis::cmd("PING")).await?;
        debug!("L2 ping: {}", response);
        Ok(())
    }

    fn marker_ttl(&self) -> Option<Duration> {
        self.marker_ttl_secs.map(Duration::from_secs)
    }
}
