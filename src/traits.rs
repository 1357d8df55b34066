use async_trait::async_trait;

use crate::dispatch::ListingCard;
use crate::error::ScraperError;
use crate::listing::ListingRecord;

#[async_trait]
pub trait Scraper: Send + Sync {
    /// 正規化済みURLのリスティングを取得（4項目すべて揃った場合のみ Ok）
    async fn scrape(&self, url: &str) -> Result<ListingRecord, ScraperError>;
}

/// 結果の送信先
#[async_trait]
pub trait Notifier: Send + Sync {
    /// コマンドを受けたチャンネルへのテキスト通知
    async fn notify_channel(&self, text: &str) -> Result<(), ScraperError>;

    /// コマンド実行ユーザーへのカード一括送信
    async fn send_private(&self, cards: &[ListingCard]) -> Result<(), ScraperError>;
}
