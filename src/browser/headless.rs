use std::path::Path;

use anyhow::Result;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

/// 启动浏览器并导航到聊天页
///
/// 默认有界面启动，首次运行时可以在窗口里手动登录
pub async fn launch_browser(
    url: &str,
    headless: bool,
    locale: &str,
    executable: Option<&Path>,
) -> Result<(Browser, Page)> {
    info!("🚀 启动浏览器 (headless: {})...", headless);
    debug!("目标 URL: {}", url);

    let mut builder = BrowserConfig::builder();
    builder = if headless {
        builder.new_headless_mode()
    } else {
        builder.with_head()
    };
    if let Some(path) = executable {
        builder = builder.chrome_executable(path);
    }

    let config = builder
        .args(vec![
            "--disable-gpu".to_string(),
            "--no-sandbox".to_string(),            // 禁用沙盒，防止权限问题导致的崩溃
            "--disable-dev-shm-usage".to_string(), // 防止共享内存不足
            format!("--lang={}", locale),
        ])
        .build()
        .map_err(|e| {
            error!("配置浏览器失败: {}", e);
            anyhow::anyhow!("配置浏览器失败: {}", e)
        })?;

    let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        anyhow::anyhow!("启动浏览器失败: {}", e)
    })?;
    debug!("浏览器启动成功");

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 添加短暂延迟以等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    let page = browser.new_page(url).await.map_err(|e| {
        error!("创建页面失败: {}", e);
        anyhow::anyhow!("创建页面失败: {}", e)
    })?;

    info!("✅ 浏览器已导航到: {}", url);
    Ok((browser, page))
}
