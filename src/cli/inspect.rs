//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了失效标记查看命令的实现。

use crate::cli::{shared_cacher, InspectArgs};
use crate::clock::{format_timestamp, Timestamp};
use crate::manager::CacheManager;
use anyhow::Result;
use std::fmt::Write;

pub async fn execute(manager: &CacheManager, args: &InspectArgs) -> Result<()> {
    let cacher = shared_cacher(manager, &args.service)?;

    let markers = cacher.explain(&args.key).await?;
    print!("{}", render_inspection(&args.key, &markers, args.written_at));
    Ok(())
}

/// 渲染每个祖先前缀的标记；给出写入时间时附带有效性结论
pub fn render_inspection(
    key: &str,
    markers: &[(String, Option<Timestamp>)],
    written_at: Option<Timestamp>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Invalidation markers for '{}' ===", key);

    let mut blocker = None;
    for (prefix, marker) in markers {
        match marker {
            Some(time) => {
                let _ = writeln!(out, "  {:<40} {}", prefix, format_timestamp(*time));
                if let Some(written) = written_at {
                    if blocker.is_none() && *time >= written {
                        blocker = Some(prefix.as_str());
                    }
                }
            }
            None => {
                let _ = writeln!(out, "  {:<40} -", prefix);
            }
        }
    }

    if let Some(written) = written_at {
        match blocker {
            Some(prefix) => {
                let _ = writeln!(
                    out,
                    "Verdict: STALE (written {}, invalidated by '{}')",
                    format_timestamp(written),
                    prefix
                );
            }
            None => {
                let _ = writeln!(out, "Verdict: VALID (written {})", format_timestamp(written));
            }
        }
    }
    out
}
