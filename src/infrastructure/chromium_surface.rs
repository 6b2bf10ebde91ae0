//! Chromium 聊天页面 - 基础设施层
//!
//! 唯一持有 `Page` 的地方，把 `ChatSurface` 能力落到 CDP 调用和页面脚本上

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::input::InsertTextParams;
use chromiumoxide::cdp::browser_protocol::network::{
    Cookie, CookieParam, CookieSameSite, TimeSinceEpoch,
};
use chromiumoxide::{Element, Page};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::infrastructure::chat_surface::{ChatSurface, ControlLocator, Hyperlink};
use crate::models::{OriginStorage, SessionSnapshot, StorageEntry, StoredCookie};

/// 定位到的元素会被打上这个属性，再用 CSS 选择器取回
const REF_ATTRIBUTE: &str = "data-prompt-worker-ref";

pub struct ChromiumSurface {
    page: Page,
    next_ref: AtomicU64,
}

impl ChromiumSurface {
    pub fn new(page: Page) -> Self {
        Self {
            page,
            next_ref: AtomicU64::new(1),
        }
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> Result<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }

    async fn current_origin(&self) -> Result<Option<String>> {
        let origin: String = self.eval_as("location.origin").await?;
        Ok(origin.starts_with("http").then_some(origin))
    }
}

#[derive(Debug, Deserialize)]
struct LocateOutcome {
    found: bool,
}

#[derive(Debug, Deserialize)]
struct VisibleText {
    found: bool,
    #[serde(default)]
    text: String,
}

#[async_trait]
impl ChatSurface for ChromiumSurface {
    type Control = Element;

    async fn navigate(&self, url: &str) -> Result<()> {
        debug!("导航到: {}", url);
        self.page
            .goto(url)
            .await
            .with_context(|| format!("导航到 {} 失败", url))?;
        Ok(())
    }

    async fn find_control(&self, locator: &ControlLocator) -> Result<Option<Element>> {
        let ref_id = self.next_ref.fetch_add(1, Ordering::Relaxed).to_string();
        let script = locate_script(locator, &ref_id)?;

        let outcome: LocateOutcome = self
            .eval_as(script)
            .await
            .with_context(|| format!("定位控件失败: {:?}", locator))?;
        if !outcome.found {
            debug!("未找到控件: {:?}", locator);
            return Ok(None);
        }

        let selector = format!("[{}=\"{}\"]", REF_ATTRIBUTE, ref_id);
        let element = self.page.find_element(selector).await?;
        Ok(Some(element))
    }

    async fn is_toggled_on(&self, control: &Element) -> Result<bool> {
        let returns = control
            .call_js_fn(
                r#"function() {
                    const state = this.getAttribute('aria-pressed') ?? this.getAttribute('aria-checked');
                    if (state !== null) return state === 'true';
                    const cls = this.getAttribute('class') || '';
                    return /(^|[-_\s])(selected|active|checked)($|[-_\s])/i.test(cls);
                }"#,
                false,
            )
            .await?;
        Ok(returns
            .result
            .value
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }

    async fn fill_text(&self, control: &Element, text: &str) -> Result<()> {
        control.click().await?;
        // 用原生 setter 清空，React 之类的框架才能感知到变化
        control
            .call_js_fn(
                r#"function() {
                    if ('value' in this) {
                        const desc = Object.getOwnPropertyDescriptor(Object.getPrototypeOf(this), 'value');
                        if (desc && desc.set) { desc.set.call(this, ''); } else { this.value = ''; }
                    } else {
                        this.textContent = '';
                    }
                    this.dispatchEvent(new Event('input', { bubbles: true }));
                }"#,
                false,
            )
            .await?;
        // 整段插入，换行不会被当成回车发送
        self.page.execute(InsertTextParams::new(text)).await?;
        Ok(())
    }

    async fn click(&self, control: &Element) -> Result<()> {
        control.click().await?;
        Ok(())
    }

    async fn wait_fixed(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    async fn read_clipboard(&self) -> Result<String> {
        // 剪贴板只允许在获得焦点的页面里读
        if let Err(e) = self.page.bring_to_front().await {
            debug!("切换到前台失败: {}", e);
        }
        self.eval_as("(async () => await navigator.clipboard.readText())()")
            .await
            .context("读取剪贴板失败")
    }

    async fn read_visible_text(&self, selector: &str) -> Result<Option<String>> {
        let script = format!(
            r#"
            (() => {{
                const nodes = document.querySelectorAll({});
                if (nodes.length === 0) return {{ found: false }};
                return {{ found: true, text: nodes[nodes.length - 1].innerText || '' }};
            }})()
            "#,
            serde_json::to_string(selector)?
        );
        let visible: VisibleText = self.eval_as(script).await?;
        Ok(visible.found.then_some(visible.text))
    }

    async fn links(&self) -> Result<Vec<Hyperlink>> {
        self.eval_as(
            r#"
            Array.from(document.querySelectorAll('a[href]')).map(a => ({
                href: a.href,
                text: (a.innerText || a.textContent || '').trim()
            }))
            "#,
        )
        .await
        .context("读取页面链接失败")
    }

    async fn export_state(&self) -> Result<SessionSnapshot> {
        let cookies = self
            .page
            .get_cookies()
            .await
            .context("读取 cookies 失败")?
            .into_iter()
            .map(stored_cookie)
            .collect();

        let mut origins = Vec::new();
        if let Some(origin) = self.current_origin().await? {
            let local_storage: Vec<StorageEntry> = self
                .eval_as(
                    r#"
                    Object.keys(localStorage).map(name => ({
                        name,
                        value: localStorage.getItem(name) ?? ''
                    }))
                    "#,
                )
                .await
                .context("读取 localStorage 失败")?;
            if !local_storage.is_empty() {
                origins.push(OriginStorage {
                    origin,
                    local_storage,
                });
            }
        }

        Ok(SessionSnapshot { cookies, origins })
    }

    async fn import_state(&self, snapshot: &SessionSnapshot) -> Result<()> {
        if !snapshot.cookies.is_empty() {
            let params = snapshot.cookies.iter().map(cookie_param).collect();
            self.page
                .set_cookies(params)
                .await
                .context("写入 cookies 失败")?;
        }

        // localStorage 只能在同源页面里写
        for origin in &snapshot.origins {
            if origin.local_storage.is_empty() {
                continue;
            }
            self.navigate(&origin.origin).await?;
            let script = format!(
                r#"
                (() => {{
                    for (const {{ name, value }} of {}) localStorage.setItem(name, value);
                    return true;
                }})()
                "#,
                serde_json::to_string(&origin.local_storage)?
            );
            self.eval(script)
                .await
                .with_context(|| format!("写入 {} 的 localStorage 失败", origin.origin))?;
        }
        Ok(())
    }
}

/// 生成定位脚本：找到目标元素后给它打上引用属性
///
/// 按角色定位时只看可见元素，名称匹配可访问名称（aria-label、placeholder、文本等）
fn locate_script(locator: &ControlLocator, ref_id: &str) -> Result<String> {
    let (mode, role_or_selector, name, nth) = match locator {
        ControlLocator::Role { role, name, nth } => ("role", role.as_str(), name.as_deref(), *nth),
        ControlLocator::Css { selector, nth } => ("css", selector.as_str(), None, *nth),
    };

    Ok(format!(
        r#"
        (() => {{
            const mode = {mode};
            const target = {target};
            const name = {name};
            const nth = {nth};
            const implicit = {{
                button: "button, [role='button'], input[type='button'], input[type='submit']",
                textbox: "textarea, input:not([type]), input[type='text'], input[type='search'], [contenteditable='true'], [role='textbox']",
                link: "a[href], [role='link']"
            }};
            const visible = el => el.getClientRects().length > 0 && getComputedStyle(el).visibility !== 'hidden';
            const accName = el => (
                el.getAttribute('aria-label')
                || el.getAttribute('placeholder')
                || el.getAttribute('title')
                || el.innerText
                || el.value
                || ''
            ).trim();

            let candidates;
            if (mode === 'role') {{
                candidates = Array.from(document.querySelectorAll(implicit[target] || `[role='${{target}}']`)).filter(visible);
                if (name !== null) {{
                    const exact = candidates.filter(el => accName(el) === name);
                    candidates = exact.length > 0 ? exact : candidates.filter(el => accName(el).includes(name));
                }}
            }} else {{
                candidates = Array.from(document.querySelectorAll(target));
            }}

            const el = candidates[nth];
            if (!el) return {{ found: false }};
            el.setAttribute({attr}, {ref_id});
            return {{ found: true }};
        }})()
        "#,
        mode = serde_json::to_string(mode)?,
        target = serde_json::to_string(role_or_selector)?,
        name = serde_json::to_string(&name)?,
        nth = nth,
        attr = serde_json::to_string(REF_ATTRIBUTE)?,
        ref_id = serde_json::to_string(ref_id)?,
    ))
}

fn stored_cookie(cookie: Cookie) -> StoredCookie {
    let same_site = cookie.same_site.map(|s| {
        match s {
            CookieSameSite::Strict => "Strict",
            CookieSameSite::Lax => "Lax",
            CookieSameSite::None => "None",
        }
        .to_string()
    });
    StoredCookie {
        name: cookie.name,
        value: cookie.value,
        domain: cookie.domain,
        path: cookie.path,
        expires: if cookie.session { -1.0 } else { cookie.expires },
        http_only: cookie.http_only,
        secure: cookie.secure,
        same_site,
    }
}

fn cookie_param(cookie: &StoredCookie) -> CookieParam {
    let mut param = CookieParam::new(cookie.name.clone(), cookie.value.clone());
    param.domain = Some(cookie.domain.clone());
    param.path = Some(cookie.path.clone());
    param.secure = Some(cookie.secure);
    param.http_only = Some(cookie.http_only);
    param.same_site = match cookie.same_site.as_deref() {
        Some("Strict") => Some(CookieSameSite::Strict),
        Some("Lax") => Some(CookieSameSite::Lax),
        Some("None") => Some(CookieSameSite::None),
        _ => None,
    };
    if !cookie.is_session() {
        param.expires = Some(TimeSinceEpoch::new(cookie.expires));
    }
    param
}
