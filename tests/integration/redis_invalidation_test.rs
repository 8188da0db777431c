//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! Redis 失效标记存储集成测试
//!
//! 需要本地 Redis（或设置 `REDIS_URL`），不可用时跳过。

#[path = "../common/mod.rs"]
mod common;

use async_trait::async_trait;
use pathcache::backend::redis_provider::{RedisHandle, RedisProvider};
use pathcache::backend::{InvalidationStore, RedisInvalidationStore};
use pathcache::clock::ManualClock;
use pathcache::config::{Config, RedisConfig};
use pathcache::{CacheError, CacheManager};
use secrecy::SecretString;
use std::sync::Arc;

fn redis_config(key_prefix: &str) -> RedisConfig {
    RedisConfig {
        connection_string: SecretString::new(common::redis_url().into()),
        key_prefix: key_prefix.to_string(),
        invalidation_ttl_secs: Some(600),
        ..Default::default()
    }
}

macro_rules! require_redis {
    ($name:expr) => {
        if !common::is_redis_available().await {
            println!("Skipping {}: Redis not available", $name);
            return;
        }
    };
}

/// 测试标记的写入、读取和清除
#[tokio::test]
async fn test_redis_marker_roundtrip() {
    common::setup_logging();
    require_redis!("test_redis_marker_roundtrip");

    let service = common::generate_unique_service_name("redis_marker");
    let store = RedisInvalidationStore::new(&service, &redis_config("pathcache:test"))
        .await
        .unwrap();

    store.ping().await.unwrap();
    assert_eq!(store.latest_invalidation("news/list").await.unwrap(), None);

    assert!(store
        .record_invalidation("news/list", 1_700_000_000.123456)
        .await
        .unwrap());
    assert_eq!(
        store.latest_invalidation("news/list").await.unwrap(),
        Some(1_700_000_000.123456)
    );

    // 后写覆盖
    store.record_invalidation("news/list", 5.0).await.unwrap();
    assert_eq!(store.latest_invalidation("news/list").await.unwrap(), Some(5.0));

    store.clear_invalidation("news/list").await.unwrap();
    assert_eq!(store.latest_invalidation("news/list").await.unwrap(), None);
}

/// 测试标记带有过期时间
#[tokio::test]
async fn test_redis_marker_has_ttl() {
    require_redis!("test_redis_marker_has_ttl");

    let service = common::generate_unique_service_name("redis_ttl");
    let store = RedisInvalidationStore::new(&service, &redis_config("pathcache:test"))
        .await
        .unwrap();
    store.record_invalidation("a", 1.0).await.unwrap();

    let client = redis::Client::open(common::redis_url()).unwrap();
    let mut conn = client.get_multiplexed_async_connection().await.unwrap();
    let ttl: i64 = redis::cmd("TTL")
        .arg(store.marker_key("a"))
        .query_async(&mut conn)
        .await
        .unwrap();
    assert!(ttl > 0 && ttl <= 600, "unexpected TTL {}", ttl);

    store.clear_invalidation("a").await.unwrap();
}

/// 测试损坏的标记作为后端错误上报
#[tokio::test]
async fn test_redis_corrupt_marker_is_backend_error() {
    require_redis!("test_redis_corrupt_marker_is_backend_error");

    let service = common::generate_unique_service_name("redis_corrupt");
    let store = RedisInvalidationStore::new(&service, &redis_config("pathcache:test"))
        .await
        .unwrap();

    let client = redis::Client::open(common::redis_url()).unwrap();
    let mut conn = client.get_multiplexed_async_connection().await.unwrap();
    let _: () = redis::cmd("SET")
        .arg(store.marker_key("broken"))
        .arg("not-a-number")
        .query_async(&mut conn)
        .await
        .unwrap();

    let err = store.latest_invalidation("broken").await.unwrap_err();
    assert!(err.is_backend());

    store.clear_invalidation("broken").await.unwrap();
}

/// 测试两个各自连接 Redis 的实例之间的失效传播
#[tokio::test]
async fn test_redis_invalidation_across_instances() {
    require_redis!("test_redis_invalidation_across_instances");

    let service = common::generate_unique_service_name("redis_multi");
    let config = redis_config("pathcache:test");
    let clock = Arc::new(ManualClock::new(100.0));

    let a = common::instance(
        &service,
        Arc::new(RedisInvalidationStore::new(&service, &config).await.unwrap()),
        clock.clone(),
    );
    let b = common::instance(
        &service,
        Arc::new(RedisInvalidationStore::new(&service, &config).await.unwrap()),
        clock.clone(),
    );

    a.set_distributed("news/list/2", &vec![1, 2], None).await.unwrap();
    b.set_distributed("news/list/2", &vec![1, 2], None).await.unwrap();

    b.invalidate_at("news/list", 150.0).await.unwrap();
    assert_eq!(a.get_distributed::<Vec<u32>>("news/list/2").await.unwrap(), None);

    clock.set(200.0);
    a.set_distributed("news/list/2", &vec![3], None).await.unwrap();
    assert_eq!(
        a.get_distributed::<Vec<u32>>("news/list/2").await.unwrap(),
        Some(vec![3])
    );
    // b 的本地副本仍写于 100
    assert_eq!(b.get_distributed::<Vec<u32>>("news/list/2").await.unwrap(), None);

    a.clear_invalidation("news/list").await.unwrap();
}

/// 测试通过 TOML 配置构建 Redis 后端的服务
#[tokio::test]
async fn test_manager_with_redis_backend() {
    require_redis!("test_manager_with_redis_backend");

    let service = common::generate_unique_service_name("redis_manager");
    let toml = format!(
        r#"
        [services.{service}]
        ttl = 60

        [services.{service}.invalidation]
        backend = "redis"

        [services.{service}.invalidation.redis]
        connection_string = "{url}"
        key_prefix = "pathcache:test"
        invalidation_ttl_secs = 120
        "#,
        service = service,
        url = common::redis_url()
    );

    let manager = CacheManager::init(Config::from_toml_str(&toml).unwrap())
        .await
        .unwrap();
    let cacher = manager.cacher(&service).unwrap();
    cacher.ping().await.unwrap();

    cacher.set_distributed("k", &"v", None).await.unwrap();
    assert_eq!(
        cacher.get_distributed::<String>("k").await.unwrap(),
        Some("v".to_string())
    );
    cacher.delete_distributed("k").await.unwrap();
    assert_eq!(cacher.get_distributed::<String>("k").await.unwrap(), None);

    cacher.clear_invalidation("k").await.unwrap();
    manager.shutdown().await.unwrap();
}

struct UnreachableProvider;

#[async_trait]
impl RedisProvider for UnreachableProvider {
    async fn connect(&self, _config: &RedisConfig) -> pathcache::Result<RedisHandle> {
        Err(CacheError::Timeout("Connection timed out after 100ms".to_string()))
    }
}

/// 测试 Redis 不可达时初始化失败并上报后端错误
#[tokio::test]
async fn test_manager_init_fails_when_redis_unreachable() {
    let toml = r#"
        [services.web.invalidation]
        backend = "redis"

        [services.web.invalidation.redis]
        connection_string = "redis://10.255.255.1:6379"
        "#;

    let result = CacheManager::init_with_provider(
        Config::from_toml_str(toml).unwrap(),
        Arc::new(UnreachableProvider),
    )
    .await;
    match result {
        Err(err) => assert!(err.is_backend()),
        Ok(_) => panic!("expected initialization to fail"),
    }
}
