//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了分布式缓存条目的封装格式。
//!
//! 持久化布局固定为两个字段：`{"data": ..., "timestamp": <秒>}`，
//! 以便不同实例之间互相读取。

use crate::clock::Timestamp;
use serde::{Deserialize, Serialize};

/// 分布式缓存封装
///
/// 只能通过 `Cacher::set_distributed` 写入、`Cacher::get_distributed` 读取。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// 实际缓存的数据
    pub data: T,
    /// 写入时间戳
    #[serde(rename = "timestamp")]
    pub write_timestamp: Timestamp,
}

impl<T> Envelope<T> {
    pub fn new(data: T, write_timestamp: Timestamp) -> Self {
        Self {
            data,
            write_timestamp,
        }
    }

    pub fn into_data(self) -> T {
        self.data
    }
}

/// 只读取写入时间戳，用于判断字节是否是一个封装
#[derive(Debug, Deserialize)]
pub(crate) struct EnvelopeHeader {
    #[serde(rename = "timestamp")]
    #[allow(dead_code)]
    pub write_timestamp: Timestamp,
}

/// 借用形式的封装，写入时避免克隆数据
#[derive(Serialize)]
pub(crate) struct EnvelopeRef<'a, T: ?Sized> {
    pub data: &'a T,
    #[serde(rename = "timestamp")]
    pub write_timestamp: Timestamp,
}
