//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了Redis连接提供者接口和默认实现。

use crate::{
    config::{RedisConfig, RedisMode},
    error::{CacheError, Result},
};
use async_trait::async_trait;
use redis::{aio::ConnectionManager, Client};
use secrecy::ExposeSecret;
use tokio::time::{timeout, Duration};

/// 已建立的 Redis 连接
#[derive(Clone)]
pub enum RedisHandle {
    /// 单机或哨兵模式，哨兵模式下 ConnectionManager 自动处理主从切换
    Standalone {
        client: Client,
        manager: ConnectionManager,
    },
    Cluster {
        client: redis::cluster::ClusterClient,
    },
}

impl std::fmt::Debug for RedisHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Standalone { .. } => write!(f, "RedisHandle::Standalone"),
            Self::Cluster { .. } => write!(f, "RedisHandle::Cluster"),
        }
    }
}

/// Redis连接提供者
///
/// 测试可以替换实现，避免依赖真实的 Redis
#[async_trait]
pub trait RedisProvider: Send + Sync {
    async fn connect(&self, config: &RedisConfig) -> Result<RedisHandle>;
}

pub struct DefaultRedisProvider;

impl DefaultRedisProvider {
    async fn standalone(&self, config: &RedisConfig) -> Result<RedisHandle> {
        let raw = config.connection_string.expose_secret();
        let connection_string = if config.enable_tls && !raw.starts_with("rediss://") {
            raw.replace("redis://", "rediss://")
        } else {
            raw.to_string()
        };

        let client = Client::open(connection_string.as_str())?;
        let manager = timeout(
            Duration::from_millis(config.connection_timeout_ms),
            client.get_connection_manager(),
        )
        .await
        .map_err(|_| {
            CacheError::Timeout(format!(
                "Connection timed out after {}ms",
                config.connection_timeout_ms
            ))
        })??;
        Ok(RedisHandle::Standalone { client, manager })
    }

    async fn cluster(&self, config: &RedisConfig) -> Result<RedisHandle> {
        let cluster_config = config.cluster.as_ref().ok_or_else(|| {
            CacheError::ConfigError("Cluster configuration is missing".to_string())
        })?;

        let mut builder = redis::cluster::ClusterClient::builder(cluster_config.nodes.clone());
        if let Some(password) = &config.password {
            builder = builder.password(password.expose_secret().to_string());
        }
        let client = builder.build()?;

        // 建立一次连接以尽早暴露配置错误
        timeout(
            Duration::from_millis(config.connection_timeout_ms),
            client.get_async_connection(),
        )
        .await
        .map_err(|_| {
            CacheError::Timeout(format!(
                "Cluster connection timed out after {}ms",
                config.connection_timeout_ms
            ))
        })??;
        Ok(RedisHandle::Cluster { client })
    }

    async fn sentinel(&self, config: &RedisConfig) -> Result<RedisHandle> {
        let sentinel_config = config.sentinel.as_ref().ok_or_else(|| {
            CacheError::ConfigError("Sentinel configuration is missing".to_string())
        })?;

        // redis+sentinel://[:password@]host:port[,host:port]/master_name
        let mut url = "redis+sentinel://".to_string();
        if let Some(password) = &config.password {
            url.push_str(&format!(":{}@", password.expose_secret()));
        }

        let nodes: Vec<&str> = sentinel_config
            .nodes
            .iter()
            .map(|n| {
                n.trim_start_matches("redis://")
                    .trim_start_matches("redis+sentinel://")
            })
            .collect();
        if nodes.is_empty() {
            return Err(CacheError::ConfigError(
                "No sentinel nodes provided".to_string(),
            ));
        }
        url.push_str(&nodes.join(","));
        url.push('/');
        url.push_str(&sentinel_config.master_name);

        let client = Client::open(url)?;
        let manager = timeout(
            Duration::from_millis(config.connection_timeout_ms),
            client.get_connection_manager(),
        )
        .await
        .map_err(|_| {
            CacheError::Timeout(format!(
                "Sentinel connection timed out after {}ms",
                config.connection_timeout_ms
            ))
        })??;
        Ok(RedisHandle::Standalone { client, manager })
    }
}

#[async_trait]
impl RedisProvider for DefaultRedisProvider {
    async fn connect(&self, config: &RedisConfig) -> Result<RedisHandle> {
        tracing::info!("Connecting invalidation store, mode={:?}", config.mode);
        match config.mode {
            RedisMode::Standalone => self.standalone(config).await,
            RedisMode::Cluster => self.cluster(config).await,
            RedisMode::Sentinel => self.sentinel(config).await,
        }
    }
}
