use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("ブラウザ初期化エラー: {0}")]
    BrowserInit(String),

    #[error("ナビゲーションエラー: {0}")]
    Navigation(String),

    #[error("タイムアウト: {0}")]
    Timeout(String),

    #[error("要素が見つかりません: {0}")]
    ElementNotFound(String),

    #[error("JavaScript実行エラー: {0}")]
    JavaScript(String),

    /// 必須項目の一部が取得できなかった（部分的な結果は採用しない）
    #[error("必須項目が見つかりません: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("URLリストを読み込めません ({path:?}): {source}")]
    UrlList {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("メッセージ送信エラー: {0}")]
    Delivery(String),

    #[error("設定エラー: {0}")]
    Config(String),
}

impl From<serenity::Error> for ScraperError {
    fn from(e: serenity::Error) -> Self {
        ScraperError::Delivery(e.to_string())
    }
}
