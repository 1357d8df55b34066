//! リスティング スクレイパーモジュール
//!
//! 宿泊リスティングページから価格・タイトル・画像・部屋サイズを取得する

mod scraper;
mod types;

pub use scraper::ListingScraper;
pub use types::{ListingRecord, Outcome, RawListing};
