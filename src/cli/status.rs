//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了服务状态查询命令的实现。

use crate::cli::StatusArgs;
use crate::manager::CacheManager;
use anyhow::{Context, Result};

pub async fn execute(manager: &CacheManager, args: &StatusArgs) -> Result<()> {
    let services = match &args.service {
        Some(name) => {
            manager
                .cacher(name)
                .with_context(|| format!("Service '{}' not found", name))?;
            vec![name.clone()]
        }
        None => manager.services(),
    };

    if services.is_empty() {
        println!("No cache services configured.");
        return Ok(());
    }

    println!("=== Cache Services Status ===\n");
    let mut unhealthy = 0;
    for name in &services {
        let cacher = manager.cacher(name)?;
        match cacher.ping().await {
            Ok(()) if cacher.is_shared() => println!("Service: {:<24} ✅ REACHABLE", name),
            Ok(()) => println!(
                "Service: {:<24} ⚠️  LOCAL ONLY (invalidations do not reach other instances)",
                name
            ),
            Err(e) => {
                unhealthy += 1;
                println!("Service: {:<24} ❌ UNREACHABLE ({})", name, e);
            }
        }
    }

    if unhealthy > 0 {
        anyhow::bail!("{} of {} services unreachable", unhealthy, services.len());
    }
    Ok(())
}
