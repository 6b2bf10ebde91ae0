use anyhow::Result;
use prompt_worker::utils::logging;
use prompt_worker::{open_chat_surface, Config, Worker};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::load()?;

    // 初始化日志
    logging::init(config.verbose_logging);
    logging::log_startup(&config);

    let owns_browser = config.browser_debug_port.is_none();
    let (mut browser, surface) = open_chat_surface(&config).await?;

    let mut worker = Worker::initialize(config, surface).await?;
    worker
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("⚠️ 监听退出信号失败: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    // 连接的是别人的浏览器就不要关掉
    if owns_browser {
        if let Err(e) = browser.close().await {
            warn!("⚠️ 关闭浏览器失败: {}", e);
        }
    }
    info!("👋 已退出");
    Ok(())
}
