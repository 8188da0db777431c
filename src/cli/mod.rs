//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了CLI命令行接口。
//!
//! CLI 只操作共享的失效标记存储；它所在进程的快速存储总是空的，
//! 进程内的标记存储在命令结束后即丢失，所以这类服务会被拒绝。

use crate::cacher::Cacher;
use crate::config::Config;
use crate::manager::CacheManager;
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "pathcache")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[arg(
        short,
        long,
        default_value = "pathcache.toml",
        help = "Path to the TOML configuration file"
    )]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(name = "invalidate", about = "Invalidate a key prefix across all instances")]
    Invalidate(InvalidateArgs),

    #[command(name = "clear", about = "Remove the invalidation marker of an exact prefix")]
    Clear(ClearArgs),

    #[command(name = "inspect", about = "Show the invalidation markers on every ancestor of a key")]
    Inspect(InspectArgs),

    #[command(name = "status", about = "Check that each service's invalidation store is reachable")]
    Status(StatusArgs),
}

#[derive(Parser, Debug)]
pub struct InvalidateArgs {
    #[arg(help = "Service name")]
    pub service: String,

    #[arg(help = "Key prefix, e.g. news/list")]
    pub prefix: String,

    #[arg(long, help = "Invalidation time in seconds since the Unix epoch (default: now)")]
    pub at: Option<f64>,
}

#[derive(Parser, Debug)]
pub struct ClearArgs {
    #[arg(help = "Service name")]
    pub service: String,

    #[arg(help = "Exact prefix whose marker is removed")]
    pub prefix: String,

    #[arg(short, long, help = "Skip confirmation")]
    pub yes: bool,
}

#[derive(Parser, Debug)]
pub struct InspectArgs {
    #[arg(help = "Service name")]
    pub service: String,

    #[arg(help = "Cache key, e.g. news/list/2")]
    pub key: String,

    #[arg(
        long,
        help = "Write time of a cached value; reports whether it would still be valid"
    )]
    pub written_at: Option<f64>,
}

#[derive(Parser, Debug)]
pub struct StatusArgs {
    #[arg(short, long, help = "Service name to query")]
    pub service: Option<String>,
}

mod inspect;
mod invalidate;
mod status;

pub use inspect::render_inspection;

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    crate::telemetry::init_tracing("pathcache-cli");
    run_with(cli).await
}

/// 执行已解析的命令
pub async fn run_with(cli: Cli) -> Result<()> {
    let config = Config::from_file(&cli.config)
        .with_context(|| format!("Failed to load config '{}'", cli.config.display()))?;
    let manager = CacheManager::init(config)
        .await
        .context("Failed to initialize cache services")?;
    execute(&manager, &cli.command).await
}

/// 在已初始化的管理器上执行命令
pub async fn execute(manager: &CacheManager, command: &Commands) -> Result<()> {
    match command {
        Commands::Invalidate(args) => invalidate::execute_invalidate(manager, args).await,
        Commands::Clear(args) => invalidate::execute_clear(manager, args).await,
        Commands::Inspect(args) => inspect::execute(manager, args).await,
        Commands::Status(args) => status::execute(manager, args).await,
    }
}

/// 取得服务的 Cacher，要求其失效标记对所有实例可见
pub(crate) fn shared_cacher(manager: &CacheManager, service: &str) -> Result<Arc<Cacher>> {
    let cacher = manager
        .cacher(service)
        .with_context(|| format!("Service '{}' not found", service))?;
    if !cacher.is_shared() {
        bail!(
            "Service '{}' uses a process-local invalidation store; \
             markers written here are not shared. Configure backend = \"redis\" for it",
            service
        );
    }
    Ok(cacher)
}
