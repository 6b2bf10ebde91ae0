//! 回复提取 - 业务能力层
//!
//! 只负责从已经渲染好的页面上取出回复正文和引用链接

use std::collections::HashSet;

use anyhow::Result;
use reqwest::Url;
use tracing::{debug, warn};

use crate::config::{Config, CITATION_LIMIT};
use crate::error::DriverError;
use crate::infrastructure::{ChatSurface, ControlLocator, Hyperlink};
use crate::models::{Citation, ExtractionPath};

pub struct ReplyExtractor {
    copy_button: ControlLocator,
    reply_selector: String,
    provider_domain: String,
    max_citations: usize,
}

impl ReplyExtractor {
    pub fn new(config: &Config) -> Self {
        Self {
            copy_button: ControlLocator::css(config.selectors.copy_button_selector.clone()),
            reply_selector: config.selectors.reply_selector.clone(),
            provider_domain: config.provider_domain.clone(),
            max_citations: config.max_citations.min(CITATION_LIMIT),
        }
    }

    /// 提取回复正文
    ///
    /// 先点复制按钮读剪贴板，失败再直接读最后一个回复块的可见文本
    pub async fn extract_text<S: ChatSurface>(
        &self,
        surface: &S,
    ) -> Result<(String, ExtractionPath)> {
        match self.copy_via_clipboard(surface).await {
            Ok(text) => Ok((text, ExtractionPath::Clipboard)),
            Err(e) => {
                warn!("⚠️ 复制回复失败: {}，改为读取页面文本", e);
                let text = surface
                    .read_visible_text(&self.reply_selector)
                    .await?
                    .ok_or(DriverError::ReplyNotRendered)?;
                Ok((text, ExtractionPath::VisibleText))
            }
        }
    }

    async fn copy_via_clipboard<S: ChatSurface>(&self, surface: &S) -> Result<String> {
        let copy_button = surface
            .find_control(&self.copy_button)
            .await?
            .ok_or_else(|| DriverError::control_not_found("复制按钮"))?;
        surface.click(&copy_button).await?;

        let text = surface.read_clipboard().await?;
        if text.trim().is_empty() {
            return Err(DriverError::EmptyClipboard.into());
        }
        debug!("剪贴板读取到 {} 个字符", text.chars().count());
        Ok(text)
    }

    /// 提取引用链接
    pub async fn extract_citations<S: ChatSurface>(&self, surface: &S) -> Result<Vec<Citation>> {
        let links = surface.links().await?;
        let citations = collect_citations(&links, &self.provider_domain, self.max_citations);
        debug!(
            "页面共有 {} 个链接，保留 {} 个引用",
            links.len(),
            citations.len()
        );
        Ok(citations)
    }
}

/// 从页面链接中筛出引用
///
/// 只要 http/https 链接，排除聊天服务自己的域名（含子域名），
/// 同一 URL 只保留第一次出现，按出现顺序截取前 `max` 个
pub fn collect_citations(links: &[Hyperlink], provider_domain: &str, max: usize) -> Vec<Citation> {
    let mut seen = HashSet::new();

    links
        .iter()
        .filter_map(|link| {
            let url = Url::parse(link.href.trim()).ok()?;
            if !matches!(url.scheme(), "http" | "https") {
                return None;
            }
            if is_provider_host(url.host_str()?, provider_domain) {
                return None;
            }
            Some(Citation {
                url: link.href.trim().to_string(),
                title: link.text.trim().to_string(),
            })
        })
        .filter(|citation| seen.insert(citation.url.clone()))
        .take(max)
        .collect()
}

fn is_provider_host(host: &str, provider_domain: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    let domain = provider_domain.trim_start_matches('.').to_ascii_lowercase();
    host == domain || host.ends_with(&format!(".{}", domain))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::fake_surface::{FakeState, FakeSurface};

    fn link(href: &str, text: &str) -> Hyperlink {
        Hyperlink {
            href: href.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_self_domain_links_are_not_citations() {
        let links = vec![
            link("https://chat.deepseek.com/x", "新对话"),
            link("https://example.com/y", " Example "),
            link("https://deepseek.com/privacy", "隐私"),
            link("https://notdeepseek.com/z", "别人家"),
        ];

        let citations = collect_citations(&links, "deepseek.com", 10);

        assert_eq!(
            citations,
            vec![
                Citation {
                    url: "https://example.com/y".to_string(),
                    title: "Example".to_string(),
                },
                Citation {
                    url: "https://notdeepseek.com/z".to_string(),
                    title: "别人家".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_citations_capped_in_first_seen_order() {
        let links: Vec<Hyperlink> = (0..25)
            .map(|i| link(&format!("https://site{}.example/article", i), "a"))
            .collect();

        let citations = collect_citations(&links, "deepseek.com", 10);

        assert_eq!(citations.len(), 10);
        assert_eq!(citations[0].url, "https://site0.example/article");
        assert_eq!(citations[9].url, "https://site9.example/article");
    }

    #[test]
    fn test_duplicates_and_non_http_are_skipped() {
        let links = vec![
            link("javascript:void(0)", "x"),
            link("mailto:someone@example.com", "mail"),
            link("https://example.com/a", "first"),
            link("https://example.com/a", "second"),
            link("not a url", "?"),
        ];

        let citations = collect_citations(&links, "deepseek.com", 10);

        assert_eq!(citations.len(), 1);
        assert_eq!(citations[0].title, "first");
    }

    #[tokio::test]
    async fn test_primary_path_reads_clipboard() {
        let surface = FakeSurface::default();
        let extractor = ReplyExtractor::new(&Config::default());

        let (text, path) = extractor.extract_text(&surface).await.unwrap();

        assert_eq!(text, "复制的回复");
        assert_eq!(path, ExtractionPath::Clipboard);
        assert_eq!(surface.calls(), vec!["click:copy", "clipboard"]);
    }

    #[tokio::test]
    async fn test_clipboard_failure_falls_back_to_visible_text() {
        let surface = FakeSurface::new(FakeState {
            clipboard: None,
            ..Default::default()
        });
        let extractor = ReplyExtractor::new(&Config::default());

        let (text, path) = extractor.extract_text(&surface).await.unwrap();

        assert_eq!(text, "可见的回复");
        assert_eq!(path, ExtractionPath::VisibleText);
    }

    #[tokio::test]
    async fn test_empty_clipboard_falls_back() {
        let surface = FakeSurface::new(FakeState {
            clipboard: Some("  ".to_string()),
            has_copy_button: true,
            ..Default::default()
        });
        let extractor = ReplyExtractor::new(&Config::default());

        let (_, path) = extractor.extract_text(&surface).await.unwrap();
        assert_eq!(path, ExtractionPath::VisibleText);
    }

    #[tokio::test]
    async fn test_fallback_without_reply_fails() {
        let surface = FakeSurface::new(FakeState {
            has_copy_button: false,
            reply_texts: [None].into(),
            ..Default::default()
        });
        let extractor = ReplyExtractor::new(&Config::default());

        let err = extractor.extract_text(&surface).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DriverError>(),
            Some(DriverError::ReplyNotRendered)
        ));
        assert_eq!(surface.count("clipboard"), 0);
    }
}
