use listing_checker::{normalize_listing_url_today, ListingScraper, Scraper, ScraperConfig};

#[tokio::main]
async fn main() {
    // ログ設定
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    // 引数または環境変数からURLを取得
    let url = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("LISTING_URL").ok())
        .expect("usage: scrape_listing <URL> (or set LISTING_URL)");

    let url = normalize_listing_url_today(&url);
    let config = ScraperConfig::from_env()
        .with_headless(false) // デバッグ用に表示モード
        .with_debug(true);
    let scraper = ListingScraper::new(config);

    println!("=== Listing Scraper Test ===");
    println!("URL: {}", url);

    match scraper.scrape(&url).await {
        Ok(record) => {
            println!("成功!");
            println!("  Title:     {}", record.title);
            println!("  Price:     {}", record.price);
            println!("  Room Size: {}", record.room_size);
            println!("  Image:     {}", record.image);
        }
        Err(e) => {
            eprintln!("エラー: {}", e);
        }
    }
}
