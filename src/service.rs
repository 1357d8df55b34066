use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tower::Service;
use tracing::{error, info};

use crate::listing::Outcome;
use crate::traits::Scraper;

/// tower::Serviceを実装したリスティング取得サービス
///
/// 正規化済みURLを受け取り、スクレイプ結果を必ず `Outcome` として返す。
/// 失敗はここで `Outcome::Failure` に変換され、呼び出し側へは伝播しない。
pub struct ListingService<S> {
    scraper: Arc<S>,
}

impl<S> ListingService<S> {
    pub fn new(scraper: Arc<S>) -> Self {
        Self { scraper }
    }
}

impl<S> Clone for ListingService<S> {
    fn clone(&self) -> Self {
        Self {
            scraper: Arc::clone(&self.scraper),
        }
    }
}

impl<S> Service<String> for ListingService<S>
where
    S: Scraper + 'static,
{
    type Response = Outcome;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, url: String) -> Self::Future {
        let scraper = Arc::clone(&self.scraper);

        Box::pin(async move {
            info!("スクレイピング開始: {}", url);

            let outcome = match scraper.scrape(&url).await {
                Ok(record) => {
                    info!("スクレイピング完了: {} ({})", record.title, url);
                    Outcome::Success { record, url }
                }
                Err(e) => {
                    error!("Error while processing URL: {}: {}", url, e);
                    Outcome::Failure {
                        reason: e.to_string(),
                        url,
                    }
                }
            };

            Ok(outcome)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScraperError;
    use crate::listing::ListingRecord;
    use async_trait::async_trait;
    use tower::ServiceExt;

    struct FixedScraper;

    #[async_trait]
    impl Scraper for FixedScraper {
        async fn scrape(&self, url: &str) -> Result<ListingRecord, ScraperError> {
            if url.contains("broken") {
                return Err(ScraperError::MissingFields(vec!["price"]));
            }
            Ok(ListingRecord {
                title: "Inn".into(),
                image: "https://cdn.example.com/inn.jpg".into(),
                price: "US$ 80".into(),
                room_size: "18 m²".into(),
            })
        }
    }

    #[tokio::test]
    async fn test_success_becomes_outcome() {
        let service = ListingService::new(Arc::new(FixedScraper));
        let outcome = service
            .oneshot("https://example.com/inn?x=1".to_string())
            .await
            .unwrap();

        assert!(outcome.is_success());
        assert_eq!(outcome.url(), "https://example.com/inn?x=1");
    }

    #[tokio::test]
    async fn test_error_becomes_failure_outcome() {
        let service = ListingService::new(Arc::new(FixedScraper));
        let outcome = service
            .oneshot("https://example.com/broken?x=1".to_string())
            .await
            .unwrap();

        match outcome {
            Outcome::Failure { url, reason } => {
                assert_eq!(url, "https://example.com/broken?x=1");
                assert!(reason.contains("price"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
