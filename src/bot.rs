//! Discord Bot
//!
//! コマンドメッセージを受けてリスティングをチェックし、結果を返信する

use std::sync::Arc;

use async_trait::async_trait;
use serenity::all::{
    ChannelId, Client, Context, CreateEmbed, CreateMessage, EventHandler, GatewayIntents, Http,
    Message, Ready, UserId,
};
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::config::BotConfig;
use crate::dispatch::{check_listings_today, ListingCard};
use crate::error::ScraperError;
use crate::listing::ListingScraper;
use crate::service::ListingService;
use crate::traits::Notifier;

/// 1メッセージに添付できる埋め込みの上限
pub const MAX_EMBEDS_PER_MESSAGE: usize = 10;

pub fn card_embed(card: &ListingCard) -> CreateEmbed {
    CreateEmbed::new()
        .title(&card.title)
        .image(&card.image)
        .url(&card.url)
        .colour(card.colour)
        .fields(
            card.fields
                .iter()
                .map(|field| (field.name.clone(), field.value.clone(), field.inline)),
        )
}

/// カードを上限ごとに分けた埋め込み
pub fn embed_batches(cards: &[ListingCard]) -> Vec<Vec<CreateEmbed>> {
    cards
        .chunks(MAX_EMBEDS_PER_MESSAGE)
        .map(|chunk| chunk.iter().map(card_embed).collect())
        .collect()
}

/// ゲートウェイ接続の失敗（不正なトークン等）は設定エラーとして扱う
fn start_error(e: serenity::Error) -> ScraperError {
    ScraperError::Config(format!("Discordログイン: {}", e))
}

pub fn is_command(prefix: &str, content: &str) -> bool {
    content.starts_with(prefix)
}

/// コマンドを受けたチャンネルと実行ユーザーへの送信
pub struct DiscordNotifier {
    http: Arc<Http>,
    channel_id: ChannelId,
    user_id: UserId,
}

impl DiscordNotifier {
    pub fn new(http: Arc<Http>, channel_id: ChannelId, user_id: UserId) -> Self {
        Self {
            http,
            channel_id,
            user_id,
        }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn notify_channel(&self, text: &str) -> Result<(), ScraperError> {
        self.channel_id.say(&self.http, text).await?;
        Ok(())
    }

    async fn send_private(&self, cards: &[ListingCard]) -> Result<(), ScraperError> {
        for embeds in embed_batches(cards) {
            self.user_id
                .direct_message(&*self.http, CreateMessage::new().embeds(embeds))
                .await?;
        }
        info!("Sent {} cards to user {}", cards.len(), self.user_id);
        Ok(())
    }
}

/// メッセージイベントハンドラ
pub struct Handler {
    config: BotConfig,
    scraper: Arc<ListingScraper>,
    // 同時に開くブラウザを1つに保つ
    batch_lock: Mutex<()>,
}

impl Handler {
    pub fn new(config: BotConfig) -> Self {
        let scraper = Arc::new(ListingScraper::new(config.scraper.clone()));
        Self {
            config,
            scraper,
            batch_lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("Bot is online as {}", ready.user.name);
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot || !is_command(&self.config.command_prefix, &msg.content) {
            return;
        }

        info!(
            "Check requested by {} in channel {}",
            msg.author.name, msg.channel_id
        );
        let _guard = self.batch_lock.lock().await;

        let notifier = DiscordNotifier::new(ctx.http.clone(), msg.channel_id, msg.author.id);
        let mut service = ListingService::new(Arc::clone(&self.scraper));

        if let Err(e) =
            check_listings_today(&self.config.listing_file, &mut service, &notifier).await
        {
            error!("Check command failed: {}", e);
        }
    }
}

/// Bot のライフサイクル（ログイン → 実行 → 切断）
pub struct Bot {
    config: BotConfig,
}

impl Bot {
    pub fn new(config: BotConfig) -> Self {
        Self { config }
    }

    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT
    }

    /// ログインしてイベントを処理。Ctrl-C で全シャードを切断して終了
    pub async fn run(self) -> Result<(), ScraperError> {
        let handler = Handler::new(self.config.clone());

        let mut client = Client::builder(&self.config.token, Self::intents())
            .event_handler(handler)
            .await
            .map_err(|e| ScraperError::Config(format!("Discordクライアント初期化: {}", e)))?;

        let shard_manager = client.shard_manager.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutting down...");
                shard_manager.shutdown_all().await;
            }
        });

        info!("Bot is starting...");
        client.start().await.map_err(start_error)?;

        info!("Bot disconnected");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::CardField;

    fn card(n: usize) -> ListingCard {
        ListingCard {
            title: format!("Listing {}", n),
            image: format!("https://cdn.example.com/{}.jpg", n),
            url: format!("https://example.com/{}?x=1", n),
            fields: vec![CardField {
                name: "Price".into(),
                value: "US$ 90".into(),
                inline: true,
            }],
            colour: 0x0099ff,
        }
    }

    #[test]
    fn test_card_embed_contents() {
        let value = serde_json::to_value(card_embed(&card(1))).unwrap();

        assert_eq!(value["title"], "Listing 1");
        assert_eq!(value["url"], "https://example.com/1?x=1");
        assert_eq!(value["image"]["url"], "https://cdn.example.com/1.jpg");
        assert_eq!(value["fields"][0]["name"], "Price");
        assert_eq!(value["fields"][0]["value"], "US$ 90");
        assert_eq!(value["fields"][0]["inline"], true);
    }

    #[test]
    fn test_embed_batches_respect_limit() {
        let cards: Vec<_> = (0..23).map(card).collect();
        let sizes: Vec<_> = embed_batches(&cards).iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![10, 10, 3]);
        assert!(embed_batches(&[]).is_empty());
    }

    #[test]
    fn test_is_command() {
        assert!(is_command("$Check", "$Check"));
        assert!(is_command("$Check", "$Check please"));
        assert!(!is_command("$Check", "check"));
        assert!(!is_command("$Check", "hello $Check"));
    }

    #[test]
    fn test_start_failure_is_config_error() {
        let err = start_error(serenity::Error::Other("invalid token"));
        assert!(matches!(err, ScraperError::Config(_)));
        assert!(err.to_string().contains("invalid token"));
    }

    #[test]
    fn test_intents_include_message_content() {
        assert!(Bot::intents().contains(GatewayIntents::MESSAGE_CONTENT));
    }
}
