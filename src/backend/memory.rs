//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了进程内的失效标记存储。
//!
//! 只在单实例部署或测试中使用；多实例部署必须使用 Redis 后端，
//! 否则其他实例看不到这里记录的失效。

use super::InvalidationStore;
use crate::clock::Timestamp;
use crate::error::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, instrument};

/// 基于 DashMap 的失效标记存储
#[derive(Debug, Default)]
pub struct MemoryInvalidationStore {
    markers: DashMap<String, Timestamp>,
}

impl MemoryInvalidationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前保存的标记数量
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

#[async_trait]
impl InvalidationStore for MemoryInvalidationStore {
    #[instrument(skip(self), level = "debug")]
    async fn record_invalidation(&self, prefix: &str, time: Timestamp) -> Result<bool> {
        self.markers.insert(prefix.to_string(), time);
        debug!("memory marker recorded: prefix={}, time={}", prefix, time);
        Ok(true)
    }

    #[instrument(skip(self), level = "debug")]
    async fn latest_invalidation(&self, prefix: &str) -> Result<Option<Timestamp>> {
        Ok(self.markers.get(prefix).map(|entry| *entry.value()))
    }

    #[instrument(skip(self), level = "debug")]
    async fn clear_invalidation(&self, prefix: &str) -> Result<()> {
        self.markers.remove(prefix);
        debug!("memory marker cleared: prefix={}", prefix);
        Ok(())
    }

    fn is_shared(&self) -> bool {
        false
    }
}
