pub mod connection;
pub mod headless;

pub use connection::connect_to_browser_and_page;
pub use headless::launch_browser;

use anyhow::{Context, Result};
use chromiumoxide::cdp::browser_protocol::browser::{GrantPermissionsParams, PermissionType};
use chromiumoxide::Browser;
use reqwest::Url;
use tracing::{info, warn};

use crate::config::Config;
use crate::infrastructure::ChromiumSurface;

/// 打开聊天页
///
/// 配置了调试端口时连接已有浏览器，否则自己启动一个
pub async fn open_chat_surface(config: &Config) -> Result<(Browser, ChromiumSurface)> {
    let (browser, page) = match config.browser_debug_port {
        Some(port) => connect_to_browser_and_page(port, &config.chat_url).await?,
        None => {
            launch_browser(
                &config.chat_url,
                config.headless,
                &config.locale,
                config.chrome_executable.as_deref(),
            )
            .await?
        }
    };

    if let Err(e) = grant_clipboard_access(&browser, &config.chat_url).await {
        warn!("⚠️ 授予剪贴板权限失败: {:#}，回复将改为读取页面文本", e);
    }

    Ok((browser, ChromiumSurface::new(page)))
}

/// 允许聊天页读写剪贴板
async fn grant_clipboard_access(browser: &Browser, chat_url: &str) -> Result<()> {
    let origin = Url::parse(chat_url)
        .with_context(|| format!("无效的聊天地址: {}", chat_url))?
        .origin()
        .ascii_serialization();

    let mut params = GrantPermissionsParams::new(vec![
        PermissionType::ClipboardReadWrite,
        PermissionType::ClipboardSanitizedWrite,
    ]);
    params.origin = Some(origin.clone());
    browser.execute(params).await?;

    info!("✓ 已授予剪贴板权限: {}", origin);
    Ok(())
}
