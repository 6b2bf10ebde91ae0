use anyhow::{Context, Result};
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

/// 连接到已经打开的浏览器，复用其中的聊天页或新建一个
///
/// 适合在自己的浏览器里手动登录后，让 worker 接管
pub async fn connect_to_browser_and_page(port: u16, chat_url: &str) -> Result<(Browser, Page)> {
    let browser_url = format!("http://localhost:{}", port);
    info!("正在连接到浏览器: {}", browser_url);

    let (browser, mut handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("连接浏览器失败: {}", e);
        e
    })?;
    debug!("浏览器连接成功");

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

    let pages = browser.pages().await?;
    debug!("获取到 {} 个页面", pages.len());

    for p in pages.iter() {
        if let Ok(Some(url)) = p.url().await {
            debug!("检查页面: {}", url);
            if url.starts_with(chat_url) {
                info!("✓ 复用已打开的聊天页: {}", url);
                return Ok((browser, p.clone()));
            }
        }
    }

    debug!("未找到聊天页，创建新页面并导航到: {}", chat_url);
    let page = browser
        .new_page(chat_url)
        .await
        .with_context(|| format!("创建页面并导航到 {} 失败", chat_url))?;
    info!("已导航到: {}", chat_url);

    Ok((browser, page))
}
