//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了快速存储（L1）的实现，基于 Moka 的进程内缓存。

use super::ValueStore;
use crate::config::FastStoreConfig;
use crate::error::Result;
use async_trait::async_trait;
use moka::future::Cache;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// 基于 Moka 的快速存储
///
/// 容量淘汰由 Moka 负责；每个条目额外保存自己的过期时刻，读取时惰性检查。
#[derive(Clone)]
pub struct MokaValueStore {
    // 值: (数据, 过期时间)
    cache: Cache<String, (Vec<u8>, Option<Instant>)>,
    default_ttl: Option<Duration>,
    max_key_length: usize,
    max_value_size: usize,
}

impl MokaValueStore {
    /// 创建新的快速存储
    ///
    /// # 参数
    ///
    /// * `capacity` - 最大条目数
    pub fn new(capacity: u64) -> Self {
        Self::with_config(&FastStoreConfig {
            max_capacity: capacity,
            ..Default::default()
        })
    }

    /// 按配置创建快速存储
    pub fn with_config(config: &FastStoreConfig) -> Self {
        Self {
            cache: Cache::builder().max_capacity(config.max_capacity).build(),
            default_ttl: None,
            max_key_length: config.max_key_length,
            max_value_size: config.max_value_size,
        }
    }

    /// 设置写入时未指定 ttl 的默认生存时间
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// 当前条目数（近似值）
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[async_trait]
impl ValueStore for MokaValueStore {
    #[instrument(skip(self), level = "debug")]
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.cache.get(key).await {
            Some((bytes, expire_at)) => {
                if let Some(expire_time) = expire_at {
                    if Instant::now() >= expire_time {
                        self.cache.remove(key).await;
                        debug!("L1 get: key={}, expired=true, removed", key);
                        return Ok(None);
                    }
                }
                debug!("L1 get: key={}, found=true", key);
                Ok(Some(bytes))
            }
            None => {
                debug!("L1 get: key={}, found=false", key);
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, value), level = "debug", fields(value_len = value.len()))]
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<bool> {
        if key.len() > self.max_key_length {
            warn!(
                "L1 set rejected: key length {} exceeds {}",
                key.len(),
                self.max_key_length
            );
            return Ok(false);
        }
        if value.len() > self.max_value_size {
            warn!(
                "L1 set rejected: key={}, value size {} exceeds {}",
                key,
                value.len(),
                self.max_value_size
            );
            return Ok(false);
        }

        let expire_at = ttl
            .filter(|ttl| !ttl.is_zero())
            .or(self.default_ttl)
            .map(|ttl| Instant::now() + ttl);
        self.cache.insert(key.to_string(), (value, expire_at)).await;
        debug!("L1 set: key={}, expire_at={:?}", key, expire_at);
        Ok(true)
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete(&self, key: &str) -> Result<()> {
        self.cache.remove(key).await;
        debug!("L1 delete: key={}", key);
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn clear(&self) -> Result<()> {
        self.cache.invalidate_all();
        debug!("L1 clear: 缓存已清空");
        Ok(())
    }

    fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }
}
