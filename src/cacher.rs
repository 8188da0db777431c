//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了带层级失效机制的两级缓存 `Cacher`。
//!
//! 值只写入节点本地的快速存储；共享存储只保存每个前缀最近一次的失效时间戳。
//! 读取时依次检查键的所有祖先前缀，只要任意前缀的失效时间不早于值的写入时间，
//! 该值即视为失效。失效操作只追加一个时间戳，从不枚举或删除已有条目。
//!
//! 假设有以下缓存：
//!
//! - `news/list/2`
//! - `news/list/3`
//! - `news/comments/134`
//!
//! 调用 `invalidate("news/list")` 使所有列表缓存失效，
//! 调用 `invalidate("news")` 使所有 `news` 下的缓存失效，而 `newsletter/1` 不受影响。

use crate::backend::{InvalidationStore, ValueStore};
use crate::clock::{Clock, SystemClock, Timestamp};
use crate::envelope::{Envelope, EnvelopeHeader, EnvelopeRef};
use crate::error::{CacheError, Result};
use crate::key_path;
use crate::metrics::Metrics;
use crate::serialization::{Serializer, SerializerEnum};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// 契约错误信息中展示的原始值长度上限
const PREVIEW_LEN: usize = 50;

/// 层级失效缓存
///
/// 构造一次后显式传给所有使用方，内部不持有任何全局状态。
#[derive(Clone)]
pub struct Cacher {
    service_name: String,
    fast: Arc<dyn ValueStore>,
    distributed: Arc<dyn InvalidationStore>,
    clock: Arc<dyn Clock>,
    serializer: SerializerEnum,
    metrics: Arc<Metrics>,
}

impl std::fmt::Debug for Cacher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cacher")
            .field("service_name", &self.service_name)
            .field("serializer", &self.serializer)
            .finish_non_exhaustive()
    }
}

impl Cacher {
    /// 创建新的 Cacher
    ///
    /// # 参数
    ///
    /// * `service_name` - 服务名称，用于日志和指标
    /// * `fast` - 节点本地的快速存储
    /// * `distributed` - 全局共享的失效标记存储
    pub fn new(
        service_name: impl Into<String>,
        fast: Arc<dyn ValueStore>,
        distributed: Arc<dyn InvalidationStore>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            fast,
            distributed,
            clock: Arc::new(SystemClock),
            serializer: SerializerEnum::default(),
            metrics: Arc::new(Metrics::default()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_serializer(mut self, serializer: SerializerEnum) -> Self {
        self.serializer = serializer;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// 当前时间戳
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// 失效标记是否对所有实例可见
    pub fn is_shared(&self) -> bool {
        self.distributed.is_shared()
    }

    /// 分布式写入实际使用的生存时间
    ///
    /// 不能超过标记的保留时间：标记过期后，被它否决的旧值会重新可读。
    fn distributed_ttl(&self, ttl: Option<Duration>) -> Option<Duration> {
        let ttl = ttl
            .filter(|ttl| !ttl.is_zero())
            .or_else(|| self.fast.default_ttl());
        match (ttl, self.distributed.marker_ttl()) {
            (Some(ttl), Some(marker_ttl)) => Some(ttl.min(marker_ttl)),
            (None, marker_ttl) => marker_ttl,
            (ttl, None) => ttl,
        }
    }

    /// 以当前时间使 `prefix` 及其下所有键失效
    ///
    /// `prefix` 可以是完整的键，也可以只是键的开头几段。
    /// 对从未使用过的前缀调用同样有效，会预先否决之前写入的值。
    pub async fn invalidate(&self, prefix: &str) -> Result<bool> {
        self.invalidate_at(prefix, self.clock.now()).await
    }

    /// 使 `prefix` 及其下所有写入时间不晚于 `time` 的键失效
    ///
    /// 只向失效标记存储写入一次，展开在读取时进行。
    #[instrument(skip(self), level = "debug", fields(service = %self.service_name))]
    pub async fn invalidate_at(&self, prefix: &str, time: Timestamp) -> Result<bool> {
        let accepted = self.distributed.record_invalidation(prefix, time).await?;
        let result = if accepted { "success" } else { "rejected" };
        self.metrics
            .record_request(&self.service_name, "L2", "invalidate", result);
        debug!("invalidate: prefix={}, time={}, accepted={}", prefix, time, accepted);
        Ok(accepted)
    }

    /// 判断以 `reference` 为写入时间的键 `key` 是否仍然有效
    ///
    /// 从根到叶检查每个祖先前缀，遇到不早于 `reference` 的失效时间立即返回 false。
    /// 时间相同视为失效。
    #[instrument(skip(self), level = "debug", fields(service = %self.service_name))]
    pub async fn is_valid(&self, key: &str, reference: Timestamp) -> Result<bool> {
        for prefix in key_path::ancestors(key) {
            if let Some(invalidated_at) = self.distributed.latest_invalidation(prefix).await? {
                if invalidated_at >= reference {
                    debug!(
                        "is_valid: key={} invalidated by prefix={} at {} (written at {})",
                        key, prefix, invalidated_at, reference
                    );
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// 列出 `key` 每个祖先前缀当前的失效时间戳，不做短路
    pub async fn explain(&self, key: &str) -> Result<Vec<(String, Option<Timestamp>)>> {
        let mut markers = Vec::with_capacity(key_path::depth(key));
        for prefix in key_path::ancestors(key) {
            let latest = self.distributed.latest_invalidation(prefix).await?;
            markers.push((prefix.to_string(), latest));
        }
        Ok(markers)
    }

    /// 读取前缀最近一次的失效时间戳
    pub async fn latest_invalidation(&self, prefix: &str) -> Result<Option<Timestamp>> {
        self.distributed.latest_invalidation(prefix).await
    }

    /// 清除前缀自身的失效标记（不影响祖先前缀）
    pub async fn clear_invalidation(&self, prefix: &str) -> Result<()> {
        self.distributed.clear_invalidation(prefix).await
    }

    /// 读取分布式缓存
    ///
    /// 值只从快速存储读取，共享存储只用于查失效时间戳。
    /// 不存在、已过期或已失效都返回 `None`，调用方无法也无需区分。
    /// 失效的值不会在这里被删除。
    ///
    /// # 错误
    ///
    /// 该键不是通过 `set_distributed` 写入时返回 `CacheError::ContractViolation`。
    #[instrument(skip(self), level = "debug", fields(service = %self.service_name))]
    pub async fn get_distributed<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        let start = Instant::now();
        let result = self.read_envelope::<T>(key).await;
        self.metrics.record_duration(
            &self.service_name,
            "cacher",
            "get_distributed",
            start.elapsed().as_secs_f64(),
        );
        result
    }

    async fn read_envelope<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        let bytes = match self.fast.get(key).await? {
            Some(bytes) => bytes,
            None => {
                self.metrics
                    .record_request(&self.service_name, "L1", "get_distributed", "miss");
                return Ok(None);
            }
        };

        let envelope = self.decode_envelope::<T>(key, &bytes)?;
        if self.is_valid(key, envelope.write_timestamp).await? {
            self.metrics
                .record_request(&self.service_name, "L1", "get_distributed", "hit");
            Ok(Some(envelope.into_data()))
        } else {
            self.metrics
                .record_request(&self.service_name, "L1", "get_distributed", "stale");
            Ok(None)
        }
    }

    fn decode_envelope<T: DeserializeOwned>(&self, key: &str, bytes: &[u8]) -> Result<Envelope<T>> {
        match self.serializer.deserialize::<Envelope<T>>(bytes) {
            Ok(envelope) => Ok(envelope),
            // 带时间戳说明确实是封装，只是数据类型不匹配
            Err(err) if self.serializer.deserialize::<EnvelopeHeader>(bytes).is_ok() => Err(err),
            Err(_) => {
                let preview_len = bytes.len().min(PREVIEW_LEN);
                Err(CacheError::ContractViolation(format!(
                    "key '{}' was requested through the distributed cache but was not written through it; \
                     use set_distributed for keys read with get_distributed [{}]",
                    key,
                    String::from_utf8_lossy(&bytes[..preview_len])
                )))
            }
        }
    }

    /// 是否存在一个有效的分布式缓存值
    pub async fn contains_distributed(&self, key: &str) -> Result<bool> {
        Ok(self.get_distributed::<IgnoredAny>(key).await?.is_some())
    }

    /// 写入分布式缓存
    ///
    /// 封装写入时间戳后写入快速存储，并清除该键自身的失效标记，
    /// 避免新值被一个晚于写入时间的同键标记立即否决。
    /// 祖先前缀的标记不会被清除，写入不能让兄弟键"复活"。
    /// 值的生存时间会被截断到标记的保留时间以内。
    /// 注意：清除同键标记后，其他实例上该键更早写入的本地副本也会重新可读。
    ///
    /// # 返回值
    ///
    /// 返回快速存储是否接受了这次写入
    #[instrument(skip(self, value), level = "debug", fields(service = %self.service_name))]
    pub async fn set_distributed<T: Serialize + ?Sized + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<bool> {
        let start = Instant::now();
        let write_timestamp = self.clock.now();
        let bytes = self.serializer.serialize(&EnvelopeRef {
            data: value,
            write_timestamp,
        })?;

        self.distributed.clear_invalidation(key).await?;
        let stored = self
            .fast
            .set(key, bytes, self.distributed_ttl(ttl))
            .await?;

        self.metrics.record_duration(
            &self.service_name,
            "cacher",
            "set_distributed",
            start.elapsed().as_secs_f64(),
        );
        debug!(
            "set_distributed: key={}, timestamp={}, stored={}",
            key, write_timestamp, stored
        );
        Ok(stored)
    }

    /// 删除分布式缓存
    ///
    /// 删除本地快速存储中的值，并以当前时间使该键失效，
    /// 这样其他实例本地残留的旧值在下次读取时也会被否决。
    #[instrument(skip(self), level = "debug", fields(service = %self.service_name))]
    pub async fn delete_distributed(&self, key: &str) -> Result<()> {
        self.fast.delete(key).await?;
        if !self.invalidate(key).await? {
            warn!("delete_distributed: invalidation marker for '{}' was not accepted", key);
        }
        Ok(())
    }

    /// 读取分布式缓存，未命中时调用 `loader` 生成并写入
    ///
    /// `loader` 只在缓存不存在或已失效时调用；
    /// 它返回 `None` 时本方法也返回 `None`，且不写入任何内容。
    pub async fn get_or_set_distributed<T, F, Fut>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        loader: F,
    ) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Option<T>>> + Send,
    {
        if let Some(value) = self.get_distributed::<T>(key).await? {
            return Ok(Some(value));
        }

        let value = match loader().await? {
            Some(value) => value,
            None => return Ok(None),
        };
        if !self.set_distributed(key, &value, ttl).await? {
            warn!("get_or_set_distributed: fast store rejected '{}'", key);
        }
        Ok(Some(value))
    }

    /// 直接读取快速存储，不做失效检查
    ///
    /// 只适合单进程启动阶段的配置类缓存；多实例部署下其他实例无法感知这里的变化。
    #[instrument(skip(self), level = "debug", fields(service = %self.service_name))]
    pub async fn get_fast<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.fast.get(key).await? {
            Some(bytes) => {
                self.metrics
                    .record_request(&self.service_name, "L1", "get_fast", "hit");
                Ok(Some(self.serializer.deserialize(&bytes)?))
            }
            None => {
                self.metrics
                    .record_request(&self.service_name, "L1", "get_fast", "miss");
                Ok(None)
            }
        }
    }

    /// 直接写入快速存储，不参与失效机制
    ///
    /// 通过这里写入的键不能再用 `get_distributed` 读取。
    #[instrument(skip(self, value), level = "debug", fields(service = %self.service_name))]
    pub async fn set_fast<T: Serialize + ?Sized + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<bool> {
        let bytes = self.serializer.serialize(value)?;
        self.fast.set(key, bytes, ttl).await
    }

    /// 清空本节点的快速存储
    pub async fn clear_fast(&self) -> Result<()> {
        self.fast.clear().await
    }

    /// 检查失效标记存储是否可用
    pub async fn ping(&self) -> Result<()> {
        self.distributed.ping().await
    }
}
