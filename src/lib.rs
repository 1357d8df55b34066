//! リスティング価格チェックBot
//!
//! - URLリストの日付・人数パラメータを正規化
//! - ヘッドレスブラウザで価格・タイトル・画像・部屋サイズを取得
//! - 結果をDiscordのDMにカードとして送信
//!
//! # スクレイパー使用例
//!
//! ```rust,ignore
//! use listing_checker::{normalize_listing_url_today, ListingScraper, Scraper, ScraperConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let scraper = ListingScraper::new(ScraperConfig::new().with_headless(false));
//!
//!     let url = normalize_listing_url_today("https://www.example.com/hotel/abc.html?x=1");
//!     let record = scraper.scrape(&url).await.unwrap();
//!     println!("{}: {}", record.title, record.price);
//! }
//! ```
//!
//! # Bot 使用例
//!
//! ```rust,ignore
//! use listing_checker::{Bot, BotConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = BotConfig::from_env().unwrap();
//!     Bot::new(config).run().await.unwrap();
//! }
//! ```

pub mod bot;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod listing;
pub mod service;
pub mod traits;
pub mod url;
pub mod url_list;

// 主要な型をリエクスポート
pub use bot::{Bot, DiscordNotifier};
pub use config::{BotConfig, ScraperConfig, SettlePolicy};
pub use dispatch::{check_listings, run_batch, BatchReport, ListingCard};
pub use error::ScraperError;
pub use listing::{ListingRecord, ListingScraper, Outcome, RawListing};
pub use service::ListingService;
pub use traits::{Notifier, Scraper};
pub use url::{normalize_listing_url, normalize_listing_url_today};
pub use url_list::read_url_list;
