//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 分布式读写约定测试

#[path = "../common/mod.rs"]
mod common;

use pathcache::CacheError;

/// 测试普通写入的值不能通过分布式读取
#[tokio::test]
async fn test_plain_value_read_distributed_is_contract_violation() {
    common::setup_logging();
    let (cacher, _clock) = common::memory_instance("contract", 1.0);

    assert!(cacher.set_fast("x", &"plainvalue", None).await.unwrap());
    let err = cacher.get_distributed::<String>("x").await.unwrap_err();
    match err {
        CacheError::ContractViolation(msg) => {
            assert!(msg.contains("'x'"));
            assert!(msg.contains("plainvalue"));
        }
        other => panic!("expected ContractViolation, got {:?}", other),
    }
}

/// 测试结构化的普通值同样会被识别
#[tokio::test]
async fn test_plain_object_without_timestamp_is_contract_violation() {
    let (cacher, _clock) = common::memory_instance("contract_obj", 1.0);
    cacher
        .set_fast("settings", &serde_json::json!({ "data": 1 }), None)
        .await
        .unwrap();

    let err = cacher.get_distributed::<u32>("settings").await.unwrap_err();
    assert!(matches!(err, CacheError::ContractViolation(_)));
    assert!(!err.is_backend());

    // contains_distributed 同样不能把它当作未命中
    assert!(matches!(
        cacher.contains_distributed("settings").await,
        Err(CacheError::ContractViolation(_))
    ));
}

/// 测试封装内数据类型不匹配属于序列化错误
#[tokio::test]
async fn test_envelope_with_wrong_payload_type_is_serialization_error() {
    let (cacher, _clock) = common::memory_instance("contract_type", 1.0);
    cacher.set_distributed("count", &"not a number", None).await.unwrap();

    let err = cacher.get_distributed::<u64>("count").await.unwrap_err();
    assert!(matches!(err, CacheError::Serialization(_)));
}

/// 测试分布式写入的值仍可通过普通读取拿到封装
#[tokio::test]
async fn test_distributed_value_is_visible_as_envelope_through_fast_path() {
    let (cacher, _clock) = common::memory_instance("contract_fast", 42.0);
    cacher.set_distributed("k", &vec![1, 2, 3], None).await.unwrap();

    let raw: serde_json::Value = cacher.get_fast("k").await.unwrap().unwrap();
    assert_eq!(raw["data"], serde_json::json!([1, 2, 3]));
    assert_eq!(raw["timestamp"], serde_json::json!(42.0));
}
