//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了失效和清除标记命令的实现。

use crate::cli::{shared_cacher, ClearArgs, InvalidateArgs};
use crate::clock::format_timestamp;
use crate::manager::CacheManager;
use anyhow::{bail, Result};

pub async fn execute_invalidate(manager: &CacheManager, args: &InvalidateArgs) -> Result<()> {
    let cacher = shared_cacher(manager, &args.service)?;

    let time = args.at.unwrap_or_else(|| cacher.now());
    if !cacher.invalidate_at(&args.prefix, time).await? {
        bail!("Invalidation store rejected the marker for '{}'", args.prefix);
    }

    println!(
        "✅ Invalidated '{}' in service '{}' as of {} ({})",
        args.prefix,
        args.service,
        format_timestamp(time),
        time
    );
    Ok(())
}

pub async fn execute_clear(manager: &CacheManager, args: &ClearArgs) -> Result<()> {
    let cacher = shared_cacher(manager, &args.service)?;

    if !args.yes {
        println!(
            "Removing the marker for '{}' makes stale entries under exactly this prefix readable again.",
            args.prefix
        );
        print!("Do you want to continue? [y/N]: ");
        std::io::Write::flush(&mut std::io::stdout())?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        if input.trim().to_lowercase() != "y" {
            println!("Operation cancelled.");
            return Ok(());
        }
    }

    cacher.clear_invalidation(&args.prefix).await?;
    println!("✅ Marker for '{}' removed", args.prefix);
    Ok(())
}
