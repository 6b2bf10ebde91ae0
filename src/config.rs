use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// 引用链接数量的硬上限
pub const CITATION_LIMIT: usize = 10;

/// 等待回复完成的策略
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettleStrategy {
    /// 固定等待一段时间
    Fixed,
    /// 轮询回复内容，直到连续几次不再变化
    Stable,
}

impl FromStr for SettleStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(SettleStrategy::Fixed),
            "stable" => Ok(SettleStrategy::Stable),
            other => Err(format!("未知的等待策略: {}", other)),
        }
    }
}

/// 聊天页面上的控件定位方式
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ChatSelectors {
    /// 联网搜索开关的可访问名称
    pub search_toggle_label: String,
    /// 输入框的可访问名称
    pub input_label: String,
    /// 发送按钮是页面上第几个按钮（从 0 开始）
    pub send_button_index: usize,
    /// 回复下方复制按钮的 CSS 选择器
    pub copy_button_selector: String,
    /// 回复正文块的 CSS 选择器
    pub reply_selector: String,
}

impl Default for ChatSelectors {
    fn default() -> Self {
        Self {
            search_toggle_label: "联网搜索".to_string(),
            input_label: "给 DeepSeek 发送消息".to_string(),
            send_button_index: 4,
            copy_button_selector: ".ds-flex._965abe9 > div".to_string(),
            reply_selector: ".ds-markdown".to_string(),
        }
    }
}

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 任务服务器地址
    pub server_url: String,
    /// 聊天页面地址
    pub chat_url: String,
    /// 聊天服务自己的域名，指向它的链接不算引用
    pub provider_domain: String,
    /// 会话快照文件
    pub session_file: PathBuf,
    /// 浏览器调试端口，设置后连接已有浏览器而不是自己启动
    pub browser_debug_port: Option<u16>,
    /// 自己启动浏览器时使用的可执行文件
    pub chrome_executable: Option<PathBuf>,
    pub headless: bool,
    /// 浏览器界面语言
    pub locale: String,
    /// 队列为空时的休眠时间
    pub idle_interval: Duration,
    /// 两个任务之间的间隔
    pub task_pacing: Duration,
    // --- 等待回复完成 ---
    pub settle_strategy: SettleStrategy,
    pub settle_duration: Duration,
    pub settle_poll_interval: Duration,
    pub settle_stable_rounds: u32,
    pub settle_timeout: Duration,
    /// 每个回复最多保留的引用数
    pub max_citations: usize,
    /// HTTP 请求超时
    pub http_timeout: Duration,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    pub selectors: ChatSelectors,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080".to_string(),
            chat_url: "https://chat.deepseek.com/".to_string(),
            provider_domain: "deepseek.com".to_string(),
            session_file: PathBuf::from("auth.json"),
            browser_debug_port: None,
            chrome_executable: None,
            headless: false,
            locale: "zh-CN".to_string(),
            idle_interval: Duration::from_secs(60),
            task_pacing: Duration::from_secs(5),
            settle_strategy: SettleStrategy::Fixed,
            settle_duration: Duration::from_secs(15),
            settle_poll_interval: Duration::from_millis(1000),
            settle_stable_rounds: 3,
            settle_timeout: Duration::from_secs(120),
            max_citations: CITATION_LIMIT,
            http_timeout: Duration::from_secs(30),
            verbose_logging: false,
            selectors: ChatSelectors::default(),
        }
    }
}

/// TOML 配置文件，所有字段可选
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    server_url: Option<String>,
    chat_url: Option<String>,
    provider_domain: Option<String>,
    session_file: Option<PathBuf>,
    browser_debug_port: Option<u16>,
    chrome_executable: Option<PathBuf>,
    headless: Option<bool>,
    locale: Option<String>,
    idle_interval_secs: Option<u64>,
    task_pacing_secs: Option<u64>,
    settle_strategy: Option<SettleStrategy>,
    settle_secs: Option<u64>,
    settle_poll_millis: Option<u64>,
    settle_stable_rounds: Option<u32>,
    settle_timeout_secs: Option<u64>,
    max_citations: Option<usize>,
    http_timeout_secs: Option<u64>,
    verbose_logging: Option<bool>,
    selectors: Option<ChatSelectors>,
}

impl Config {
    /// 默认值 ← 配置文件 ← 环境变量
    ///
    /// 配置文件路径取 `WORKER_CONFIG`，未设置时若当前目录有 `worker.toml` 则使用它
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(path) = config_file_path() {
            config = config.merge_file(&path)?;
        }
        Ok(config.merge_env())
    }

    /// 只从环境变量读取，解析失败的值回落到默认值
    pub fn from_env() -> Self {
        Self::default().merge_env()
    }

    /// 用 TOML 文件中出现的字段覆盖当前配置
    pub fn merge_file(self, path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ConfigFile = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.apply(file))
    }

    fn apply(mut self, file: ConfigFile) -> Self {
        if let Some(v) = file.server_url {
            self.server_url = v;
        }
        if let Some(v) = file.chat_url {
            self.chat_url = v;
        }
        if let Some(v) = file.provider_domain {
            self.provider_domain = v;
        }
        if let Some(v) = file.session_file {
            self.session_file = v;
        }
        if file.browser_debug_port.is_some() {
            self.browser_debug_port = file.browser_debug_port;
        }
        if file.chrome_executable.is_some() {
            self.chrome_executable = file.chrome_executable;
        }
        if let Some(v) = file.headless {
            self.headless = v;
        }
        if let Some(v) = file.locale {
            self.locale = v;
        }
        if let Some(v) = file.idle_interval_secs {
            self.idle_interval = Duration::from_secs(v);
        }
        if let Some(v) = file.task_pacing_secs {
            self.task_pacing = Duration::from_secs(v);
        }
        if let Some(v) = file.settle_strategy {
            self.settle_strategy = v;
        }
        if let Some(v) = file.settle_secs {
            self.settle_duration = Duration::from_secs(v);
        }
        if let Some(v) = file.settle_poll_millis {
            self.settle_poll_interval = Duration::from_millis(v);
        }
        if let Some(v) = file.settle_stable_rounds {
            self.settle_stable_rounds = v;
        }
        if let Some(v) = file.settle_timeout_secs {
            self.settle_timeout = Duration::from_secs(v);
        }
        if let Some(v) = file.max_citations {
            self.max_citations = v.min(CITATION_LIMIT);
        }
        if let Some(v) = file.http_timeout_secs {
            self.http_timeout = Duration::from_secs(v);
        }
        if let Some(v) = file.verbose_logging {
            self.verbose_logging = v;
        }
        if let Some(v) = file.selectors {
            self.selectors = v;
        }
        self
    }

    fn merge_env(self) -> Self {
        let d = self;
        Self {
            server_url: std::env::var("SERVER_URL").unwrap_or(d.server_url),
            chat_url: std::env::var("CHAT_URL").unwrap_or(d.chat_url),
            provider_domain: std::env::var("PROVIDER_DOMAIN").unwrap_or(d.provider_domain),
            session_file: std::env::var("SESSION_FILE").map(PathBuf::from).unwrap_or(d.session_file),
            browser_debug_port: env_parse("BROWSER_DEBUG_PORT").or(d.browser_debug_port),
            chrome_executable: std::env::var("CHROME_EXECUTABLE").ok().map(PathBuf::from).or(d.chrome_executable),
            headless: env_parse("HEADLESS").unwrap_or(d.headless),
            locale: std::env::var("BROWSER_LOCALE").unwrap_or(d.locale),
            idle_interval: env_parse("IDLE_INTERVAL_SECS").map(Duration::from_secs).unwrap_or(d.idle_interval),
            task_pacing: env_parse("TASK_PACING_SECS").map(Duration::from_secs).unwrap_or(d.task_pacing),
            settle_strategy: env_parse("SETTLE_STRATEGY").unwrap_or(d.settle_strategy),
            settle_duration: env_parse("SETTLE_SECS").map(Duration::from_secs).unwrap_or(d.settle_duration),
            settle_poll_interval: env_parse("SETTLE_POLL_MILLIS").map(Duration::from_millis).unwrap_or(d.settle_poll_interval),
            settle_stable_rounds: env_parse("SETTLE_STABLE_ROUNDS").unwrap_or(d.settle_stable_rounds),
            settle_timeout: env_parse("SETTLE_TIMEOUT_SECS").map(Duration::from_secs).unwrap_or(d.settle_timeout),
            max_citations: env_parse::<usize>("MAX_CITATIONS").map(|v| v.min(CITATION_LIMIT)).unwrap_or(d.max_citations),
            http_timeout: env_parse("HTTP_TIMEOUT_SECS").map(Duration::from_secs).unwrap_or(d.http_timeout),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(d.verbose_logging),
            selectors: d.selectors,
        }
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn config_file_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("WORKER_CONFIG") {
        return Some(PathBuf::from(path));
    }
    let default = PathBuf::from("worker.toml");
    default.exists().then_some(default)
}
