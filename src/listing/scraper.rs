//! リスティング スクレイパー実装
//!
//! URLごとに新しいブラウザを起動し、通貨をUSDに切り替えてから4項目を抽出する

use std::path::PathBuf;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::traits::Scraper;

use super::types::{ListingRecord, RawListing};

const CURRENCY_PICKER_SELECTOR: &str = r#"[data-testid="header-currency-picker-trigger"]"#;
const CURRENCY_OPTION_SELECTOR: &str = r#"[data-testid="selection-item"] span"#;
const ACTIVE_IMAGE_SELECTOR: &str = ".active-image img";
const TITLE_SELECTOR: &str = ".pp-header__title";
const ROOM_SIZE_SELECTOR: &str = r#"[data-name-en="room size"] .bui-badge"#;

/// 要素出現チェックの間隔（ミリ秒）
const ELEMENT_POLL_INTERVAL_MS: u64 = 250;
/// ネットワークアイドル判定のインターバル（ミリ秒）
const NETWORK_IDLE_CHECK_INTERVAL_MS: u64 = 500;
/// 連続何回アイドルならOKとするか
const REQUIRED_IDLE_CHECKS: u32 = 3;
/// 通貨選択前のドキュメントに付ける印（リロードで消える）
const RELOAD_MARKER: &str = "__listingCheckerBeforeReload";

/// URL 1件分のブラウザセッション
struct BrowserSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    user_data_dir: PathBuf,
}

impl BrowserSession {
    async fn launch(config: &ScraperConfig) -> Result<Self, ScraperError> {
        debug!("Launching browser session...");

        // セッション毎に独立したユーザーデータディレクトリ
        let unique_id = format!(
            "{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        );
        let user_data_dir = std::env::temp_dir().join(format!("listing-checker-{}", unique_id));

        let (width, height) = config.window_size;
        let mut builder = BrowserConfig::builder()
            .user_data_dir(&user_data_dir)
            .window_size(width, height)
            .viewport(None);

        if let Some(chrome_path) = &config.chrome_path {
            builder = builder.chrome_executable(chrome_path);
        }

        if !config.headless {
            builder = builder.with_head();
        }

        builder = builder
            .no_sandbox()
            .request_timeout(Duration::from_secs(60))
            .arg("--start-maximized")
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage");

        if config.debug {
            builder = builder.arg("--enable-logging=stderr").arg("--v=1");
        }

        let browser_config = builder
            .build()
            .map_err(|e| ScraperError::BrowserInit(format!("ブラウザ設定エラー: {}", e)))?;

        let (mut browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;

        // ブラウザイベントハンドラをバックグラウンドで実行
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler error: {:?}", e);
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.close().await;
                let _ = browser.wait().await;
                handler_task.abort();
                return Err(ScraperError::BrowserInit(e.to_string()));
            }
        };

        Ok(Self {
            browser,
            page,
            handler: handler_task,
            user_data_dir,
        })
    }

    /// ブラウザを終了しユーザーデータを削除
    async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            debug!("Failed to close browser: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            debug!("Failed to wait for browser exit: {}", e);
        }
        self.handler.abort();

        if let Err(e) = tokio::fs::remove_dir_all(&self.user_data_dir).await {
            debug!("Failed to remove {:?}: {}", self.user_data_dir, e);
        }
        debug!("Browser session closed");
    }
}

/// 宿泊リスティング スクレイパー
#[derive(Debug, Clone)]
pub struct ListingScraper {
    config: ScraperConfig,
}

impl ListingScraper {
    pub fn new(config: ScraperConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    /// ナビゲーション → 通貨選択 → 抽出
    async fn visit(&self, page: &Page, url: &str) -> Result<ListingRecord, ScraperError> {
        let settle = &self.config.settle;

        page.goto(url)
            .await
            .map_err(|e| ScraperError::Navigation(e.to_string()))?;
        self.wait_request_idle(page).await;
        sleep(settle.after_navigation).await;
        info!("Visited URL: {}", url);

        // 通貨選択後のリロード検出用に現在のドキュメントへ印を付ける
        page.evaluate(format!("window.{} = true", RELOAD_MARKER).as_str())
            .await
            .map_err(|e| ScraperError::JavaScript(e.to_string()))?;

        let clicked = self.select_currency(page).await?;

        // 通貨選択の成否に関わらずリロード完了を待つ
        let reloaded = self.wait_for_reload(page).await;
        self.wait_request_idle(page).await;
        info!(
            "Visited URL after currency change: {} (clicked={}, reloaded={})",
            url, clicked, reloaded
        );

        sleep(settle.before_extract).await;
        let raw = self.extract(page).await?;

        let missing = raw.missing_fields();
        if !missing.is_empty() {
            warn!("Missing elements for {}: {:?}", url, missing);
        }
        raw.into_record()
    }

    /// 通貨ピッカーを開いて対象通貨を選ぶ。選択できたかを返す
    ///
    /// 待機のタイムアウトはエラー。待機後に要素や選択肢が無い場合はログのみ。
    async fn select_currency(&self, page: &Page) -> Result<bool, ScraperError> {
        let settle = &self.config.settle;

        self.wait_for_visible(page, CURRENCY_PICKER_SELECTOR, settle.picker_timeout)
            .await?;

        let picker = match page.find_element(CURRENCY_PICKER_SELECTOR).await {
            Ok(element) => element,
            Err(e) => {
                let err = ScraperError::ElementNotFound(format!("通貨ピッカー: {}", e));
                warn!("Currency selection skipped: {}", err);
                return Ok(false);
            }
        };
        picker
            .click()
            .await
            .map_err(|e| ScraperError::Navigation(format!("通貨ピッカークリック: {}", e)))?;

        self.wait_for_visible(page, CURRENCY_OPTION_SELECTOR, settle.options_timeout)
            .await?;
        sleep(settle.after_options).await;

        let script = format!(
            r#"
            (() => {{
                const label = {label};
                const items = document.querySelectorAll({selector});
                const option = Array.from(items).find(el => (el.innerText || '').includes(label));
                if (option) {{
                    option.click();
                    return true;
                }}
                return false;
            }})()
            "#,
            label = js_string(&self.config.currency_label),
            selector = js_string(CURRENCY_OPTION_SELECTOR),
        );

        let selected = page
            .evaluate(script.as_str())
            .await
            .map_err(|e| ScraperError::JavaScript(e.to_string()))?
            .into_value::<bool>()
            .unwrap_or(false);

        if selected {
            info!("{} currency option selected", self.config.currency_label);
        } else {
            warn!("{} currency option not found", self.config.currency_label);
        }
        Ok(selected)
    }

    /// 描画済みページから4項目を取得
    async fn extract(&self, page: &Page) -> Result<RawListing, ScraperError> {
        let script = format!(
            r#"
            (() => {{
                const marker = {marker};
                const image = document.querySelector({image});
                let price = null;
                for (const div of document.querySelectorAll('div')) {{
                    const text = div.innerText;
                    if (text && text.startsWith(marker)) {{
                        price = text;
                        break;
                    }}
                }}
                const title = document.querySelector({title});
                const roomSize = document.querySelector({room_size});
                return {{
                    image: image ? image.src : null,
                    price: price,
                    title: title ? title.innerText.trim() : null,
                    roomSize: roomSize ? roomSize.innerText : null,
                }};
            }})()
            "#,
            marker = js_string(&self.config.price_marker),
            image = js_string(ACTIVE_IMAGE_SELECTOR),
            title = js_string(TITLE_SELECTOR),
            room_size = js_string(ROOM_SIZE_SELECTOR),
        );

        page.evaluate(script.as_str())
            .await
            .map_err(|e| ScraperError::JavaScript(e.to_string()))?
            .into_value::<RawListing>()
            .map_err(|e| ScraperError::JavaScript(format!("抽出結果の変換: {}", e)))
    }

    /// セレクタに一致する要素が表示されるまで待機
    async fn wait_for_visible(
        &self,
        page: &Page,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), ScraperError> {
        let script = format!(
            r#"
            (() => {{
                const el = document.querySelector({});
                if (!el) return false;
                const rect = el.getBoundingClientRect();
                const style = window.getComputedStyle(el);
                return style.visibility !== 'hidden' && (rect.width > 0 || rect.height > 0);
            }})()
            "#,
            js_string(selector)
        );

        let start = Instant::now();
        while start.elapsed() < timeout {
            match page.evaluate(script.as_str()).await {
                Ok(val) => {
                    if val.into_value::<bool>().unwrap_or(false) {
                        debug!("{} visible after {:?}", selector, start.elapsed());
                        return Ok(());
                    }
                }
                Err(e) => debug!("Visibility check error for {}: {}", selector, e),
            }
            sleep(Duration::from_millis(ELEMENT_POLL_INTERVAL_MS)).await;
        }

        Err(ScraperError::Timeout(format!(
            "{} が {:?} 以内に表示されませんでした",
            selector, timeout
        )))
    }

    /// 印を付けたドキュメントが置き換わり、読み込みが完了するまで待機
    ///
    /// クリックが無くても必ず待つ。タイムアウトしたら false を返して続行する。
    async fn wait_for_reload(&self, page: &Page) -> bool {
        let timeout = self.config.settle.navigation_timeout;
        let script = format!(
            "window.{} === undefined && document.readyState === 'complete'",
            RELOAD_MARKER
        );

        let start = Instant::now();
        while start.elapsed() < timeout {
            match page.evaluate(script.as_str()).await {
                Ok(val) => {
                    if val.into_value::<bool>().unwrap_or(false) {
                        debug!("Page reloaded after {:?}", start.elapsed());
                        return true;
                    }
                }
                // 遷移中は実行コンテキストが無くなることがある
                Err(e) => debug!("Reload check error: {}", e),
            }
            sleep(Duration::from_millis(ELEMENT_POLL_INTERVAL_MS)).await;
        }

        warn!(
            "No reload within {:?}, proceeding with the current page",
            timeout
        );
        false
    }

    /// ネットワークリクエストがアイドル状態になるまで待機
    ///
    /// 読み込み完了かつリソース数が変化しない状態が続けばアイドルとみなす。
    /// タイムアウトしても処理は続行する。
    async fn wait_request_idle(&self, page: &Page) {
        let start = Instant::now();
        let timeout = self.config.settle.network_idle_timeout;
        let mut idle_count = 0;
        let mut last_count: Option<u64> = None;

        while start.elapsed() < timeout {
            let result = page
                .evaluate(
                    r#"
                    (() => {
                        let count = 0;
                        try { count = performance.getEntriesByType('resource').length; } catch (_) {}
                        return { ready: document.readyState === 'complete', count: count };
                    })()
                "#,
                )
                .await;

            match result.map(|val| val.into_value::<serde_json::Value>()) {
                Ok(Ok(info)) => {
                    let ready = info.get("ready").and_then(|v| v.as_bool()).unwrap_or(false);
                    let count = info.get("count").and_then(|v| v.as_u64());
                    if ready && count.is_some() && count == last_count {
                        idle_count += 1;
                        if idle_count >= REQUIRED_IDLE_CHECKS {
                            debug!("Network idle after {:?}", start.elapsed());
                            return;
                        }
                    } else {
                        idle_count = 0;
                    }
                    last_count = count;
                }
                Ok(Err(e)) => {
                    debug!("Network idle check decode error: {}", e);
                    idle_count = 0;
                }
                Err(e) => {
                    debug!("Network idle check error: {}", e);
                    idle_count = 0;
                }
            }

            sleep(Duration::from_millis(NETWORK_IDLE_CHECK_INTERVAL_MS)).await;
        }

        warn!(
            "Network idle timeout after {:?}, proceeding anyway",
            start.elapsed()
        );
    }

    /// デバッグ用スクリーンショットをログ出力
    async fn log_screenshot(&self, page: &Page, url: &str) {
        match page
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
        {
            Ok(screenshot) => {
                use base64::Engine;
                let encoded = base64::engine::general_purpose::STANDARD.encode(&screenshot);
                debug!("Screenshot for {}: data:image/png;base64,{}", url, encoded);
            }
            Err(e) => debug!("Failed to take screenshot: {}", e),
        }
    }
}

#[async_trait]
impl Scraper for ListingScraper {
    async fn scrape(&self, url: &str) -> Result<ListingRecord, ScraperError> {
        let session = BrowserSession::launch(&self.config).await?;

        let result = self.visit(&session.page, url).await;
        if result.is_err() && self.config.debug {
            self.log_screenshot(&session.page, url).await;
        }

        // 成否に関わらず必ず閉じる
        session.close().await;
        result
    }
}

/// JavaScript 文字列リテラルとして埋め込む
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}
