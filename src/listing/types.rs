//! リスティング関連の型定義

use serde::{Deserialize, Serialize};

use crate::error::ScraperError;

/// ページスクリプトから返る抽出結果（各項目は見つからなければ null）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawListing {
    pub title: Option<String>,
    pub image: Option<String>,
    pub price: Option<String>,
    pub room_size: Option<String>,
}

impl RawListing {
    /// 取得できなかった項目名（空文字も未取得扱い）
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("image", &self.image),
            ("price", &self.price),
            ("title", &self.title),
            ("roomSize", &self.room_size),
        ]
        .into_iter()
        .filter(|(_, value)| value.as_deref().map_or(true, str::is_empty))
        .map(|(name, _)| name)
        .collect()
    }

    /// 4項目すべて揃っている場合のみレコードに変換
    pub fn into_record(self) -> Result<ListingRecord, ScraperError> {
        let missing = self.missing_fields();
        match (self.title, self.image, self.price, self.room_size) {
            (Some(title), Some(image), Some(price), Some(room_size)) if missing.is_empty() => {
                Ok(ListingRecord {
                    title,
                    image,
                    price,
                    room_size,
                })
            }
            _ => Err(ScraperError::MissingFields(missing)),
        }
    }
}

/// 抽出済みリスティング
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub title: String,
    pub image: String,
    pub price: String,
    pub room_size: String,
}

/// URL 1件ごとの処理結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success { record: ListingRecord, url: String },
    Failure { url: String, reason: String },
}

impl Outcome {
    pub fn url(&self) -> &str {
        match self {
            Outcome::Success { url, .. } | Outcome::Failure { url, .. } => url,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }
}
