//! 取得結果のカード化と送信

use std::convert::Infallible;
use std::path::Path;

use chrono::{NaiveDate, Utc};
use tower::{Service, ServiceExt};
use tracing::{debug, error, info, warn};

use crate::error::ScraperError;
use crate::listing::{ListingRecord, Outcome};
use crate::traits::Notifier;
use crate::url::normalize_listing_url;
use crate::url_list::read_url_list;

/// カードのアクセントカラー (#0099ff)
pub const CARD_COLOUR: u32 = 0x0099ff;

pub const CONFIRMATION_TEXT: &str = "Details have been sent to your DM.";
pub const DM_FAILED_TEXT: &str = "Failed to send details via DM.";
pub const LIST_UNREADABLE_TEXT: &str = "Could not read the listing list.";

pub fn failure_notice(url: &str) -> String {
    format!("Failed to fetch data for URL: {}", url)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// チャットに送るリスティングカード
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingCard {
    pub title: String,
    pub image: String,
    pub url: String,
    pub fields: Vec<CardField>,
    pub colour: u32,
}

impl ListingCard {
    pub fn from_record(record: &ListingRecord, url: &str) -> Self {
        Self {
            title: record.title.clone(),
            image: record.image.clone(),
            url: url.to_string(),
            fields: vec![
                CardField {
                    name: "Price".into(),
                    value: record.price.clone(),
                    inline: true,
                },
                CardField {
                    name: "Room Size".into(),
                    value: record.room_size.clone(),
                    inline: true,
                },
            ],
            colour: CARD_COLOUR,
        }
    }
}

/// バッチ処理の集計
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub succeeded: usize,
    pub failed: Vec<String>,
    /// カードをDMで届けられたか（カードが無い場合は true）
    pub delivered: bool,
}

/// URLを1件ずつ順番に処理し、結果を送信する
///
/// 失敗URLはその場でチャンネルに通知。成功分は最後にまとめてDMで送り、
/// 成功の有無に関わらず完了通知をチャンネルに投稿する。
pub async fn run_batch<S, N>(service: &mut S, notifier: &N, urls: Vec<String>) -> BatchReport
where
    S: Service<String, Response = Outcome, Error = Infallible>,
    N: Notifier + ?Sized,
{
    let mut cards = Vec::new();
    let mut failed = Vec::new();

    for url in urls {
        let outcome = match service.ready().await {
            Ok(svc) => svc.call(url).await,
            Err(e) => Err(e),
        };
        let outcome = outcome.unwrap_or_else(|never| match never {});
        debug!(
            "Processed {} (success={})",
            outcome.url(),
            outcome.is_success()
        );

        match outcome {
            Outcome::Success { record, url } => {
                cards.push(ListingCard::from_record(&record, &url));
            }
            Outcome::Failure { url, .. } => {
                if let Err(e) = notifier.notify_channel(&failure_notice(&url)).await {
                    warn!("Failed to post failure notice for {}: {}", url, e);
                }
                failed.push(url);
            }
        }
    }

    let delivered = if cards.is_empty() {
        true
    } else {
        match notifier.send_private(&cards).await {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to send {} cards via DM: {}", cards.len(), e);
                false
            }
        }
    };

    let closing = if delivered {
        CONFIRMATION_TEXT
    } else {
        DM_FAILED_TEXT
    };
    if let Err(e) = notifier.notify_channel(closing).await {
        warn!("Failed to post confirmation: {}", e);
    }

    info!(
        "Batch finished: {} succeeded, {} failed",
        cards.len(),
        failed.len()
    );

    BatchReport {
        succeeded: cards.len(),
        failed,
        delivered,
    }
}

/// チェックコマンド本体: リスト読み込み → 正規化 → バッチ処理
pub async fn check_listings<S, N>(
    listing_file: &Path,
    today: NaiveDate,
    service: &mut S,
    notifier: &N,
) -> Result<BatchReport, ScraperError>
where
    S: Service<String, Response = Outcome, Error = Infallible>,
    N: Notifier + ?Sized,
{
    let urls = match read_url_list(listing_file).await {
        Ok(urls) => urls,
        Err(e) => {
            error!("{}", e);
            if let Err(notify_err) = notifier.notify_channel(LIST_UNREADABLE_TEXT).await {
                warn!("Failed to post list error: {}", notify_err);
            }
            return Err(e);
        }
    };

    let urls = urls
        .iter()
        .map(|url| normalize_listing_url(url, today))
        .collect::<Vec<_>>();
    info!("Checking {} listings", urls.len());

    Ok(run_batch(service, notifier, urls).await)
}

/// 今日 (UTC) を基準に `check_listings` を実行
pub async fn check_listings_today<S, N>(
    listing_file: &Path,
    service: &mut S,
    notifier: &N,
) -> Result<BatchReport, ScraperError>
where
    S: Service<String, Response = Outcome, Error = Infallible>,
    N: Notifier + ?Sized,
{
    check_listings(listing_file, Utc::now().date_naive(), service, notifier).await
}
