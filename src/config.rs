use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ScraperError;

/// 既定のコマンドトークン
pub const DEFAULT_COMMAND_PREFIX: &str = "$Check";
/// 既定のURLリストファイル
pub const DEFAULT_LISTING_FILE: &str = "list.txt";

/// ページ描画待ちの時間設定
///
/// 固定スリープはページ側の描画完了を待つためのヒューリスティック。
/// ネットワークアイドル判定と組み合わせて使う。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlePolicy {
    /// 初回ナビゲーション後の待機
    pub after_navigation: Duration,
    /// 通貨選択肢の表示後の待機
    pub after_options: Duration,
    /// 抽出直前の待機
    pub before_extract: Duration,
    /// 通貨ピッカー出現待ちの上限
    pub picker_timeout: Duration,
    /// 通貨選択肢の出現待ちの上限
    pub options_timeout: Duration,
    /// 通貨変更後のナビゲーション待ちの上限
    pub navigation_timeout: Duration,
    /// ネットワークアイドル待ちの上限
    pub network_idle_timeout: Duration,
}

impl Default for SettlePolicy {
    fn default() -> Self {
        Self {
            after_navigation: Duration::from_secs(1),
            after_options: Duration::from_secs(1),
            before_extract: Duration::from_secs(1),
            picker_timeout: Duration::from_secs(20),
            options_timeout: Duration::from_secs(10),
            navigation_timeout: Duration::from_secs(30),
            network_idle_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub headless: bool,
    pub debug: bool,
    pub chrome_path: Option<PathBuf>,
    pub window_size: (u32, u32),
    /// 選択する通貨のラベル
    pub currency_label: String,
    /// 価格テキストの先頭マーカー
    pub price_marker: String,
    pub settle: SettlePolicy,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            headless: true,
            debug: false,
            chrome_path: None,
            window_size: (1920, 1080),
            currency_label: "USD".to_string(),
            price_marker: "US$".to_string(),
            settle: SettlePolicy::default(),
        }
    }
}

impl ScraperConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// 環境変数 (HEADLESS, CHROME_PATH/CHROMIUM_PATH, SCRAPER_DEBUG) から構築
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(headless) = env_flag("HEADLESS") {
            config.headless = headless;
        }
        if let Some(debug) = env_flag("SCRAPER_DEBUG") {
            config.debug = debug;
        }
        config.chrome_path = env::var("CHROME_PATH")
            .or_else(|_| env::var("CHROMIUM_PATH"))
            .ok()
            .map(PathBuf::from);
        if let Some((label, marker)) =
            currency_override(env::var("CURRENCY_LABEL").ok(), env::var("PRICE_MARKER").ok())
        {
            config = config.with_currency(label, marker);
        }
        config
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_chrome_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.chrome_path = Some(path.into());
        self
    }

    pub fn with_currency(mut self, label: impl Into<String>, price_marker: impl Into<String>) -> Self {
        self.currency_label = label.into();
        self.price_marker = price_marker.into();
        self
    }

    pub fn with_settle(mut self, settle: SettlePolicy) -> Self {
        self.settle = settle;
        self
    }
}

/// Bot の起動設定
#[derive(Clone)]
pub struct BotConfig {
    pub token: String,
    pub command_prefix: String,
    pub listing_file: PathBuf,
    pub scraper: ScraperConfig,
}

impl std::fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("token", &"***")
            .field("command_prefix", &self.command_prefix)
            .field("listing_file", &self.listing_file)
            .field("scraper", &self.scraper)
            .finish()
    }
}

impl BotConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            command_prefix: DEFAULT_COMMAND_PREFIX.to_string(),
            listing_file: PathBuf::from(DEFAULT_LISTING_FILE),
            scraper: ScraperConfig::default(),
        }
    }

    /// `.env` と環境変数から読み込む。BOT_TOKEN が無ければエラー
    pub fn from_env() -> Result<Self, ScraperError> {
        let _ = dotenvy::dotenv();

        let token = env::var("BOT_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ScraperError::Config("BOT_TOKEN must be set".into()))?;

        let mut config = Self::new(token).with_scraper(ScraperConfig::from_env());
        if let Ok(prefix) = env::var("COMMAND_PREFIX") {
            config = config.with_command_prefix(prefix);
        }
        if let Ok(path) = env::var("LISTING_FILE") {
            config = config.with_listing_file(path);
        }
        Ok(config)
    }

    pub fn with_command_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.command_prefix = prefix.into();
        self
    }

    pub fn with_listing_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.listing_file = path.into();
        self
    }

    pub fn with_scraper(mut self, scraper: ScraperConfig) -> Self {
        self.scraper = scraper;
        self
    }
}

/// 通貨ラベルと価格マーカーは両方指定された場合のみ上書き
fn currency_override(label: Option<String>, marker: Option<String>) -> Option<(String, String)> {
    match (label, marker) {
        (Some(label), Some(marker)) if !label.trim().is_empty() && !marker.trim().is_empty() => {
            Some((label.trim().to_string(), marker.trim().to_string()))
        }
        _ => None,
    }
}

fn env_flag(key: &str) -> Option<bool> {
    let value = env::var(key).ok()?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scraper_config_defaults() {
        let config = ScraperConfig::default();
        assert!(config.headless);
        assert_eq!(config.window_size, (1920, 1080));
        assert_eq!(config.currency_label, "USD");
        assert_eq!(config.price_marker, "US$");
        assert_eq!(config.settle.picker_timeout, Duration::from_secs(20));
        assert_eq!(config.settle.options_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_scraper_config_builder() {
        let settle = SettlePolicy {
            before_extract: Duration::from_millis(10),
            ..Default::default()
        };
        let config = ScraperConfig::new()
            .with_headless(false)
            .with_debug(true)
            .with_chrome_path("/usr/bin/chromium")
            .with_currency("EUR", "€")
            .with_settle(settle.clone());

        assert!(!config.headless);
        assert!(config.debug);
        assert_eq!(config.chrome_path, Some(PathBuf::from("/usr/bin/chromium")));
        assert_eq!(config.currency_label, "EUR");
        assert_eq!(config.price_marker, "€");
        assert_eq!(config.settle, settle);
    }

    #[test]
    fn test_currency_override_needs_both_values() {
        assert_eq!(
            currency_override(Some("EUR".into()), Some(" € ".into())),
            Some(("EUR".to_string(), "€".to_string()))
        );
        assert_eq!(currency_override(Some("EUR".into()), None), None);
        assert_eq!(currency_override(None, Some("€".into())), None);
        assert_eq!(currency_override(Some(" ".into()), Some("€".into())), None);
    }

    #[test]
    fn test_bot_config_builder() {
        let config = BotConfig::new("token")
            .with_command_prefix("!check")
            .with_listing_file("/tmp/urls.txt");

        assert_eq!(config.token, "token");
        assert_eq!(config.command_prefix, "!check");
        assert_eq!(config.listing_file, PathBuf::from("/tmp/urls.txt"));
    }

    #[test]
    fn test_bot_config_debug_hides_token() {
        let config = BotConfig::new("secret-token");
        let printed = format!("{:?}", config);
        assert!(!printed.contains("secret-token"));
        assert_eq!(config.command_prefix, DEFAULT_COMMAND_PREFIX);
    }
}
