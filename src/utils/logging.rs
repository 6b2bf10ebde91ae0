/// 日志工具模块
///
/// 提供日志初始化和输出格式的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// 初始化日志
///
/// `RUST_LOG` 优先；否则默认 info，`verbose` 时为 debug
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!(
        "🚀 程序启动 - {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("🌐 任务服务器: {}", config.server_url);
    info!("💬 聊天页面: {}", config.chat_url);
    info!(
        "⏱️ 空闲轮询 {:?} | 任务间隔 {:?} | 等待策略 {:?}",
        config.idle_interval, config.task_pacing, config.settle_strategy
    );
    info!("{}", "=".repeat(60));
}

/// 记录批次开始信息
///
/// # 参数
/// - `batch_num`: 批次编号
/// - `size`: 本批任务数
pub fn log_batch_start(batch_num: u64, size: usize) {
    info!("\n{}", "=".repeat(60));
    info!(
        "📦 [{}] 第 {} 批，共 {} 个任务",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        batch_num,
        size
    );
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
pub fn log_batch_complete(batch_num: u64, completed: usize, total: usize) {
    info!("\n{}", "─".repeat(60));
    info!("✓ 第 {} 批完成: 成功 {}/{}", batch_num, completed, total);
    info!("{}", "─".repeat(60));
}

/// 打印退出时的累计统计
pub fn print_final_stats(batches: u64, completed: usize, failed: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📊 运行统计");
    info!(
        "退出时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("📦 批次: {}", batches);
    info!("✅ 成功: {}/{}", completed, completed + failed);
    info!("❌ 失败: {}", failed);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
