//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存系统的配置结构和解析逻辑。

use crate::error::{CacheError, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

pub const CONFIG_VERSION: u32 = 1;

/// 30 天（秒）
const MAX_TTL_SECS: u64 = 86400 * 30;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub config_version: Option<u32>,
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub services: HashMap<String, ServiceConfig>,
}

/// 全局配置
///
/// 定义适用于所有服务的默认配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct GlobalConfig {
    /// 快速存储的默认过期时间（秒）
    pub default_ttl: u64,
    /// 序列化类型
    pub serialization: SerializationType,
    /// 是否压缩写入快速存储的值
    pub compress: bool,
    /// 是否启用指标收集
    pub enable_metrics: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            default_ttl: 300,
            serialization: SerializationType::Json,
            compress: false,
            enable_metrics: true,
        }
    }
}

/// 服务配置
///
/// 每个服务对应一个独立的 `Cacher`
#[derive(Deserialize, Clone, Debug, Default)]
pub struct ServiceConfig {
    /// 缓存过期时间（秒），可覆盖全局配置
    #[serde(default)]
    pub ttl: Option<u64>,
    /// 序列化类型，可覆盖全局配置
    #[serde(default)]
    pub serialization: Option<SerializationType>,
    /// 快速存储（L1）配置
    #[serde(default)]
    pub fast: FastStoreConfig,
    /// 失效标记存储（L2）配置
    #[serde(default)]
    pub invalidation: InvalidationConfig,
}

impl ServiceConfig {
    /// 计算服务的有效 TTL
    pub fn effective_ttl(&self, global: &GlobalConfig) -> u64 {
        self.ttl.unwrap_or(global.default_ttl)
    }
}

/// 序列化类型枚举
#[derive(Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SerializationType {
    /// JSON序列化
    #[default]
    Json,
}

/// 快速存储配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct FastStoreConfig {
    /// 最大缓存条目数
    pub max_capacity: u64,
    /// 键的最大长度
    pub max_key_length: usize,
    /// 值的最大大小（字节）
    pub max_value_size: usize,
}

impl Default for FastStoreConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10000,
            max_key_length: 256,
            max_value_size: 1024 * 1024, // 1MB
        }
    }
}

/// 失效标记存储后端类型
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum InvalidationBackend {
    /// 进程内存储，仅适用于单实例
    #[default]
    Memory,
    /// Redis，多实例共享
    Redis,
}

/// 失效标记存储配置
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct InvalidationConfig {
    pub backend: InvalidationBackend,
    pub redis: Option<RedisConfig>,
}

/// Redis配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct RedisConfig {
    /// Redis模式
    pub mode: RedisMode,
    /// 连接字符串
    pub connection_string: SecretString,
    /// 连接超时时间（毫秒）
    pub connection_timeout_ms: u64,
    /// 命令执行超时时间（毫秒）
    pub command_timeout_ms: u64,
    /// Redis 密码（可选）
    pub password: Option<SecretString>,
    /// 是否启用 TLS
    pub enable_tls: bool,
    /// 哨兵配置
    pub sentinel: Option<SentinelConfig>,
    /// 集群配置
    pub cluster: Option<ClusterConfig>,
    /// 失效标记键前缀
    pub key_prefix: String,
    /// 失效标记的过期时间（秒），None 表示永不过期
    ///
    /// 必须不小于服务 TTL，否则标记可能先于它要否决的值过期
    pub invalidation_ttl_secs: Option<u64>,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            mode: RedisMode::Standalone,
            connection_string: SecretString::new("redis://localhost:6379".to_string().into()),
            connection_timeout_ms: 5000,
            command_timeout_ms: 3000,
            password: None,
            enable_tls: false,
            sentinel: None,
            cluster: None,
            key_prefix: "pathcache:invalidate".to_string(),
            invalidation_ttl_secs: None,
        }
    }
}

/// 哨兵配置
#[derive(Deserialize, Clone, Debug)]
pub struct SentinelConfig {
    /// 主节点名称
    pub master_name: String,
    /// 哨兵节点列表
    pub nodes: Vec<String>,
}

/// 集群配置
#[derive(Deserialize, Clone, Debug)]
pub struct ClusterConfig {
    /// 初始节点列表
    pub nodes: Vec<String>,
}

/// Redis模式枚举
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RedisMode {
    /// 单机模式
    #[default]
    Standalone,
    /// 哨兵模式
    Sentinel,
    /// 集群模式
    Cluster,
}

impl Config {
    /// 从 TOML 字符串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| CacheError::ConfigError(e.to_string()))
    }

    /// 从 TOML 文件加载配置
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// 验证配置
    ///
    /// 检查配置的有效性，确保所有必需的字段都已设置，并且值在合理范围内
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(version) = &self.config_version {
            if *version > CONFIG_VERSION {
                return Err(format!(
                    "Configuration version {} is not supported. Current version is {}.",
                    version, CONFIG_VERSION
                ));
            }
        }

        if self.global.default_ttl == 0 {
            return Err("Global default_ttl cannot be zero".to_string());
        }

        if self.global.default_ttl > MAX_TTL_SECS {
            return Err("Global default_ttl cannot exceed 30 days (2592000 seconds)".to_string());
        }

        for (name, service) in &self.services {
            if name.is_empty() {
                return Err("Service name cannot be empty".to_string());
            }

            if name.len() > 64 {
                return Err(format!(
                    "Service name '{}' exceeds maximum length of 64 characters",
                    name
                ));
            }

            // ':' 是 Redis 标记键的分隔符
            if name.contains(':') {
                return Err(format!("Service name '{}' cannot contain ':'", name));
            }

            let service_ttl = service.effective_ttl(&self.global);
            if service_ttl == 0 {
                return Err(format!("Service '{}' TTL cannot be zero", name));
            }

            if service_ttl > MAX_TTL_SECS {
                return Err(format!("Service '{}' TTL cannot exceed 30 days", name));
            }

            Self::validate_fast(name, &service.fast)?;
            Self::validate_invalidation(name, &service.invalidation, service_ttl)?;
        }

        Ok(())
    }

    fn validate_fast(name: &str, fast: &FastStoreConfig) -> std::result::Result<(), String> {
        if fast.max_capacity == 0 {
            return Err(format!("Service '{}' fast max_capacity cannot be zero", name));
        }

        if fast.max_capacity > 10_000_000 {
            return Err(format!(
                "Service '{}' fast max_capacity cannot exceed 10,000,000",
                name
            ));
        }

        if fast.max_key_length == 0 || fast.max_key_length > 1024 {
            return Err(format!(
                "Service '{}' max_key_length must be between 1 and 1024",
                name
            ));
        }

        if fast.max_value_size == 0 || fast.max_value_size > 10 * 1024 * 1024 {
            return Err(format!(
                "Service '{}' max_value_size must be between 1 and 10MB",
                name
            ));
        }

        Ok(())
    }

    fn validate_invalidation(
        name: &str,
        invalidation: &InvalidationConfig,
        service_ttl: u64,
    ) -> std::result::Result<(), String> {
        let redis = match (invalidation.backend, &invalidation.redis) {
            (InvalidationBackend::Memory, _) => return Ok(()),
            (InvalidationBackend::Redis, None) => {
                return Err(format!(
                    "Service '{}' uses the redis invalidation backend but has no [invalidation.redis] section",
                    name
                ))
            }
            (InvalidationBackend::Redis, Some(redis)) => redis,
        };

        if !(100..=30000).contains(&redis.connection_timeout_ms) {
            return Err(format!(
                "Service '{}' connection_timeout_ms must be between 100 and 30000 ms",
                name
            ));
        }

        if !(100..=60000).contains(&redis.command_timeout_ms) {
            return Err(format!(
                "Service '{}' command_timeout_ms must be between 100 and 60000 ms",
                name
            ));
        }

        if redis.key_prefix.is_empty() || redis.key_prefix.contains(char::is_whitespace) {
            return Err(format!(
                "Service '{}' key_prefix must be non-empty and contain no whitespace",
                name
            ));
        }

        match redis.mode {
            RedisMode::Cluster if redis.cluster.as_ref().map_or(true, |c| c.nodes.is_empty()) => {
                return Err(format!(
                    "Service '{}' cluster mode requires at least one cluster node",
                    name
                ));
            }
            RedisMode::Sentinel
                if redis.sentinel.as_ref().map_or(true, |s| s.nodes.is_empty()) =>
            {
                return Err(format!(
                    "Service '{}' sentinel mode requires at least one sentinel node",
                    name
                ));
            }
            _ => {}
        }

        if let Some(marker_ttl) = redis.invalidation_ttl_secs {
            if marker_ttl < service_ttl {
                return Err(format!(
                    "Service '{}' configuration error: invalidation_ttl_secs ({}) must be >= service TTL ({})",
                    name, marker_ttl, service_ttl
                ));
            }
        }

        Ok(())
    }
}
