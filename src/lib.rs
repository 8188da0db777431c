//! pathcache - 带层级失效的两级缓存库
//!
//! 缓存值保存在每个实例本地的快速存储（L1）中，
//! 共享存储（L2）只保存按斜杠路径前缀记录的失效时间戳。
//! 失效某个前缀会让所有实例上、该前缀下更早写入的值在读取时被视为未命中。

#![doc(html_root_url = "https://docs.rs/pathcache/0.1.0")]

pub use serde;
pub use serde::{Deserialize, Serialize};
pub use serde_json;
pub use tokio;

pub mod backend;
pub mod cacher;
pub mod cli;
pub mod clock;
pub mod config;
pub mod envelope;
pub mod error;
pub mod key_path;
pub mod manager;
pub mod metrics;
pub mod serialization;
pub mod telemetry;

// Re-export commonly used items
pub use backend::{InvalidationStore, ValueStore};
pub use cacher::Cacher;
pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use config::Config;
pub use envelope::Envelope;
pub use error::{CacheError, Result};
pub use manager::CacheManager;

/// pathcache 版本号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
