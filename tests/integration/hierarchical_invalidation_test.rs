//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 层级失效集成测试

#[path = "../common/mod.rs"]
mod common;

use pathcache::key_path::ancestors;
use pathcache::CacheError;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
struct Page {
    items: Vec<u32>,
}

/// 端到端场景：写入、失效祖先、重新写入
#[tokio::test]
async fn test_news_list_scenario() {
    common::setup_logging();
    let (cacher, clock) = common::memory_instance("news", 100.0);

    cacher
        .set_distributed("news/list/2", &Page { items: vec![1, 2] }, None)
        .await
        .unwrap();
    assert_eq!(
        cacher.get_distributed::<Page>("news/list/2").await.unwrap(),
        Some(Page { items: vec![1, 2] })
    );

    assert!(cacher.invalidate_at("news/list", 150.0).await.unwrap());
    clock.set(160.0);
    assert_eq!(cacher.get_distributed::<Page>("news/list/2").await.unwrap(), None);

    clock.set(200.0);
    cacher
        .set_distributed("news/list/2", &Page { items: vec![3] }, None)
        .await
        .unwrap();
    assert_eq!(
        cacher.get_distributed::<Page>("news/list/2").await.unwrap(),
        Some(Page { items: vec![3] })
    );
}

/// 测试每个祖先前缀的失效都会否决更早的写入
#[tokio::test]
async fn test_invalidating_any_ancestor_hides_earlier_write() {
    let key = "shop/catalog/shoes/42";
    for prefix in ancestors(key) {
        let (cacher, _clock) = common::memory_instance("shop", 10.0);
        cacher.set_distributed(key, &"boots", None).await.unwrap();

        cacher.invalidate_at(prefix, 20.0).await.unwrap();
        assert_eq!(
            cacher.get_distributed::<String>(key).await.unwrap(),
            None,
            "invalidating '{}' should hide '{}'",
            prefix,
            key
        );
    }
}

/// 测试晚于祖先失效的写入仍然有效
#[tokio::test]
async fn test_later_write_survives_earlier_invalidation() {
    let key = "shop/catalog/shoes/42";
    for prefix in ancestors(key) {
        let (cacher, clock) = common::memory_instance("shop", 10.0);
        cacher.invalidate(prefix).await.unwrap();

        clock.set(20.0);
        cacher.set_distributed(key, &"boots", None).await.unwrap();
        assert_eq!(
            cacher.get_distributed::<String>(key).await.unwrap(),
            Some("boots".to_string()),
            "write after invalidating '{}' should be readable",
            prefix
        );
    }
}

/// 测试失效时间与写入时间相同时视为失效
#[tokio::test]
async fn test_tie_favours_invalidation() {
    let (cacher, _clock) = common::memory_instance("tie", 50.0);
    cacher.set_distributed("a/b", &1u32, None).await.unwrap();
    cacher.invalidate_at("a", 50.0).await.unwrap();
    assert_eq!(cacher.get_distributed::<u32>("a/b").await.unwrap(), None);
}

/// 测试按路径段匹配而不是按字符串前缀匹配
#[tokio::test]
async fn test_prefix_scoping_respects_segment_boundaries() {
    let (cacher, clock) = common::memory_instance("scope", 1.0);
    cacher.set_distributed("news", &"front", None).await.unwrap();
    cacher.set_distributed("news/list/2", &"page", None).await.unwrap();
    cacher.set_distributed("newsletter/1", &"issue", None).await.unwrap();

    clock.set(2.0);
    cacher.invalidate("news").await.unwrap();

    assert_eq!(cacher.get_distributed::<String>("news").await.unwrap(), None);
    assert_eq!(cacher.get_distributed::<String>("news/list/2").await.unwrap(), None);
    assert_eq!(
        cacher.get_distributed::<String>("newsletter/1").await.unwrap(),
        Some("issue".to_string())
    );
}

/// 测试重复失效是幂等的
#[tokio::test]
async fn test_invalidate_is_idempotent() {
    let (cacher, _clock) = common::memory_instance("idem", 0.0);
    cacher.invalidate_at("users/7", 30.0).await.unwrap();
    let first = cacher.latest_invalidation("users/7").await.unwrap();
    cacher.invalidate_at("users/7", 30.0).await.unwrap();
    assert_eq!(cacher.latest_invalidation("users/7").await.unwrap(), first);
    assert_eq!(first, Some(30.0));
}

/// 测试失效标记是后写覆盖，不保留最大值
#[tokio::test]
async fn test_invalidation_marker_is_last_write_wins() {
    let (cacher, _clock) = common::memory_instance("lww", 0.0);
    cacher.invalidate_at("users", 300.0).await.unwrap();
    cacher.invalidate_at("users", 100.0).await.unwrap();
    assert_eq!(cacher.latest_invalidation("users").await.unwrap(), Some(100.0));

    // 边界回退后，200 时写入的值重新可见
    assert!(cacher.is_valid("users/1", 200.0).await.unwrap());
}

/// 测试失效从未写入过的前缀会预先否决旧值
#[tokio::test]
async fn test_invalidate_unused_prefix() {
    let (cacher, clock) = common::memory_instance("fresh", 0.0);
    clock.set(5.0);
    cacher.invalidate("reports/2024").await.unwrap();
    assert!(!cacher.is_valid("reports/2024/q1", 4.0).await.unwrap());
    assert!(cacher.is_valid("reports/2024/q1", 6.0).await.unwrap());
    assert!(cacher.is_valid("reports/2023/q1", 4.0).await.unwrap());
}

/// 测试写入只清除自身标记，不清除祖先标记
#[tokio::test]
async fn test_write_clears_only_its_own_marker() {
    let (cacher, clock) = common::memory_instance("own", 0.0);
    cacher.invalidate_at("blog", 10.0).await.unwrap();
    cacher.invalidate_at("blog/post/1", 10.0).await.unwrap();

    clock.set(20.0);
    cacher.set_distributed("blog/post/1", &"body", None).await.unwrap();

    assert_eq!(cacher.latest_invalidation("blog/post/1").await.unwrap(), None);
    assert_eq!(cacher.latest_invalidation("blog").await.unwrap(), Some(10.0));
}

/// 测试读穿加载只在缓存缺失或失效时调用 loader
#[tokio::test]
async fn test_get_or_set_distributed_reloads_after_invalidation() {
    use std::sync::atomic::{AtomicU32, Ordering};

    let (cacher, clock) = common::memory_instance("loader", 1.0);
    let calls = AtomicU32::new(0);
    let counter = &calls;

    let load = move || async move {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok::<_, CacheError>(Some(Page { items: vec![n] }))
    };

    let first = cacher
        .get_or_set_distributed("feed/home", None, load)
        .await
        .unwrap();
    let second = cacher
        .get_or_set_distributed("feed/home", None, load)
        .await
        .unwrap();
    assert_eq!(first, Some(Page { items: vec![1] }));
    assert_eq!(second, first);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    clock.set(2.0);
    cacher.invalidate("feed").await.unwrap();
    clock.set(3.0);
    let third = cacher
        .get_or_set_distributed("feed/home", None, load)
        .await
        .unwrap();
    assert_eq!(third, Some(Page { items: vec![2] }));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

/// 测试 loader 返回 None 时不写入任何内容
#[tokio::test]
async fn test_get_or_set_distributed_loader_none() {
    let (cacher, _clock) = common::memory_instance("loader_none", 1.0);
    let value = cacher
        .get_or_set_distributed::<Page, _, _>("missing", None, || async { Ok::<_, CacheError>(None) })
        .await
        .unwrap();
    assert_eq!(value, None);
    assert!(!cacher.contains_distributed("missing").await.unwrap());
}

/// 测试 contains_distributed 反映失效状态
#[tokio::test]
async fn test_contains_distributed() {
    let (cacher, clock) = common::memory_instance("contains", 1.0);
    cacher
        .set_distributed("cfg/site", &Page { items: vec![9] }, None)
        .await
        .unwrap();
    assert!(cacher.contains_distributed("cfg/site").await.unwrap());

    clock.set(2.0);
    cacher.invalidate("cfg").await.unwrap();
    assert!(!cacher.contains_distributed("cfg/site").await.unwrap());
}

/// 测试快速存储过期的条目表现为缺失
#[tokio::test]
async fn test_expired_value_reads_as_absent() {
    let (cacher, _clock) = common::memory_instance("ttl", 1.0);
    cacher
        .set_distributed("short", &"lived", Some(std::time::Duration::from_millis(50)))
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(120)).await;
    assert_eq!(cacher.get_distributed::<String>("short").await.unwrap(), None);
}
