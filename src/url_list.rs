//! URLリストファイルの読み込み

use std::path::Path;

use tracing::debug;

use crate::error::ScraperError;

/// 改行区切りのURLリストを読み込む。空行・空白のみの行は除外
pub async fn read_url_list(path: impl AsRef<Path>) -> Result<Vec<String>, ScraperError> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ScraperError::UrlList {
            path: path.to_path_buf(),
            source,
        })?;

    let urls = parse_url_list(&content);
    debug!("Loaded {} URLs from {:?}", urls.len(), path);
    Ok(urls)
}

pub fn parse_url_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_blank_lines() {
        let urls = parse_url_list("https://a.example/1?x=1\n\n  \r\nhttps://b.example/2?y=2\r\n");
        assert_eq!(urls, vec!["https://a.example/1?x=1", "https://b.example/2?y=2"]);
    }

    #[tokio::test]
    async fn test_read_url_list_from_file() {
        let path = std::env::temp_dir().join(format!("listing-checker-{}.txt", std::process::id()));
        tokio::fs::write(&path, "https://a.example/1?x=1\n\nhttps://b.example/2?y=2\n")
            .await
            .unwrap();

        let urls = read_url_list(&path).await.unwrap();
        let _ = tokio::fs::remove_file(&path).await;

        assert_eq!(urls.len(), 2);
        assert_eq!(urls[1], "https://b.example/2?y=2");
    }

    #[tokio::test]
    async fn test_missing_file_is_reported() {
        let err = read_url_list("/nonexistent/listing-checker/list.txt")
            .await
            .unwrap_err();
        assert!(matches!(err, ScraperError::UrlList { .. }));
    }
}
