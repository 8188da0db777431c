//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存系统的错误类型和处理机制。

use thiserror::Error;

/// 缓存系统错误类型枚举
///
/// 后端错误原样向上传播，不做重试；
/// 失效导致的"读到旧值"不是错误，而是返回 `None`。
#[derive(Error, Debug)]
pub enum CacheError {
    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// 调用方混用了分布式读写与普通读写
    ///
    /// 通过 `set_fast` 写入的值被 `get_distributed` 读取时返回此错误，
    /// 绝不能降级为缓存未命中。
    #[error("Contract violation: {0}")]
    ContractViolation(String),

    /// 配置错误
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// 操作不支持
    #[error("Operation not supported: {0}")]
    NotSupported(String),

    /// Redis错误
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    /// IO错误
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// 后端错误
    #[error("Backend error: {0}")]
    BackendError(String),

    /// 超时错误
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// 关闭错误
    #[error("Shutdown error: {0}")]
    ShutdownError(String),
}

impl CacheError {
    /// 是否为存储后端故障（包括 Redis 错误和超时）
    pub fn is_backend(&self) -> bool {
        matches!(
            self,
            CacheError::BackendError(_) | CacheError::RedisError(_) | CacheError::Timeout(_)
        )
    }
}

/// 缓存操作结果类型别名
///
/// 简化错误处理，所有缓存操作都返回此类型
pub type Result<T> = std::result::Result<T, CacheError>;
