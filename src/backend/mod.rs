//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了 `Cacher` 依赖的两类存储接口及其实现。
//!
//! - `ValueStore`：节点本地的快速存储，保存完整的缓存值
//! - `InvalidationStore`：全局共享的失效标记存储，每个前缀只保存最近一次失效时间戳
//!
//! 单个键的操作是原子的，接口不提供任何跨键事务。

pub mod l1;
pub mod l2;
pub mod memory;
pub mod redis_provider;

use crate::clock::Timestamp;
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub use l1::MokaValueStore;
pub use l2::RedisInvalidationStore;
pub use memory::MemoryInvalidationStore;

/// 值存储接口
#[async_trait]
pub trait ValueStore: Send + Sync {
    /// 读取键对应的字节，不存在或已过期返回 None
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// 写入键值
    ///
    /// # 参数
    ///
    /// * `ttl` - 生存时间，None 或零表示使用存储自己的默认值
    ///
    /// # 返回值
    ///
    /// 返回存储是否接受了这次写入
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<bool>;

    /// 删除键
    async fn delete(&self, key: &str) -> Result<()>;

    /// 清空存储
    async fn clear(&self) -> Result<()> {
        Err(crate::error::CacheError::NotSupported("clear".to_string()))
    }

    /// 写入未指定 ttl 时使用的默认生存时间，None 表示永不过期
    fn default_ttl(&self) -> Option<Duration> {
        None
    }
}

/// 失效标记存储接口
#[async_trait]
pub trait InvalidationStore: Send + Sync {
    /// 记录前缀的失效时间戳，后写覆盖先写（不保留最大值）
    async fn record_invalidation(&self, prefix: &str, time: Timestamp) -> Result<bool>;

    /// 读取前缀最近一次的失效时间戳
    async fn latest_invalidation(&self, prefix: &str) -> Result<Option<Timestamp>>;

    /// 清除前缀的失效标记
    async fn clear_invalidation(&self, prefix: &str) -> Result<()>;

    /// 检查存储是否可用
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    /// 标记的保留时间，None 表示标记永不过期
    ///
    /// 标记过期后，它曾否决的值会重新可读，
    /// 因此值的生存时间不能超过这里返回的时长。
    fn marker_ttl(&self) -> Option<Duration> {
        None
    }

    /// 标记是否对所有实例可见
    fn is_shared(&self) -> bool {
        true
    }
}
