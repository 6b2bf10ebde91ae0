//! 联网搜索开关 - 业务能力层

use tracing::{debug, warn};

use crate::infrastructure::{ChatSurface, ControlLocator};

/// 开关探测结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// 本来就是打开的，没有点击
    AlreadyEnabled,
    /// 原本关闭，已点击打开
    Enabled,
    /// 页面上没有这个开关，或者探测失败
    Absent,
}

/// 确保联网搜索打开
///
/// 尽力而为：任何失败都归为 `Absent`，不会让任务失败
pub async fn ensure_search_mode<S: ChatSurface>(surface: &S, toggle_label: &str) -> SearchMode {
    let locator = ControlLocator::role("button", toggle_label);

    let toggle = match surface.find_control(&locator).await {
        Ok(Some(toggle)) => toggle,
        Ok(None) => {
            debug!("页面上没有「{}」开关", toggle_label);
            return SearchMode::Absent;
        }
        Err(e) => {
            warn!("⚠️ 查找「{}」开关失败: {}", toggle_label, e);
            return SearchMode::Absent;
        }
    };

    match surface.is_toggled_on(&toggle).await {
        Ok(true) => return SearchMode::AlreadyEnabled,
        Ok(false) => {}
        Err(e) => {
            warn!("⚠️ 读取「{}」开关状态失败: {}", toggle_label, e);
            return SearchMode::Absent;
        }
    }

    match surface.click(&toggle).await {
        Ok(()) => SearchMode::Enabled,
        Err(e) => {
            warn!("⚠️ 打开「{}」失败: {}", toggle_label, e);
            SearchMode::Absent
        }
    }
}
