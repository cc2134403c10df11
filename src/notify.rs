use futures::future::{BoxFuture, FutureExt};
use log::{debug, warn};
use reqwest::{Client, Url};
use serde::Serialize;

const TELEGRAM_API: &str = "https://api.telegram.org/";

/// Sends status messages somewhere a human will see them. Delivery is best effort:
/// the result only says whether the message went through.
pub trait Notifier: Send + Sync {
    fn notify<'a>(&'a self, message: &'a str) -> BoxFuture<'a, bool>;
}

pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify<'a>(&'a self, _: &'a str) -> BoxFuture<'a, bool> {
        futures::future::ready(false).boxed()
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

pub struct TelegramNotifier {
    client: Client,
    api: Url,
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self::with_api(
            TELEGRAM_API.parse().expect("correct telegram url"),
            token,
            chat_id,
        )
    }

    pub fn with_api(api: Url, token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api,
            token: token.into(),
            chat_id: chat_id.into(),
        }
    }

    async fn send(&self, text: &str) -> anyhow::Result<()> {
        let url = self.api.join(&format!("bot{}/sendMessage", self.token))?;
        self.client
            .post(url)
            .json(&SendMessage {
                chat_id: &self.chat_id,
                text,
            })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

impl Notifier for TelegramNotifier {
    fn notify<'a>(&'a self, message: &'a str) -> BoxFuture<'a, bool> {
        async move {
            match self.send(message).await {
                Ok(()) => {
                    debug!("Telegram notification sent");
                    true
                }
                Err(err) => {
                    // The token is part of the url, keep it out of the logs.
                    warn!(
                        "Failed to send telegram notification: {}",
                        err.to_string().replace(&self.token, "***")
                    );
                    false
                }
            }
        }
        .boxed()
    }
}

/// Telegram when both the bot token and the chat id are set, nothing otherwise.
pub fn from_settings(token: Option<&str>, chat_id: Option<&str>) -> Box<dyn Notifier> {
    match (token, chat_id) {
        (Some(token), Some(chat_id)) if !token.is_empty() && !chat_id.is_empty() => {
            Box::new(TelegramNotifier::new(token, chat_id))
        }
        _ => Box::new(NullNotifier),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn posts_message_to_bot_api() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/botTOKEN/sendMessage")
            .match_body(Matcher::Json(serde_json::json!({
                "chat_id": "123",
                "text": "done"
            })))
            .with_body("{\"ok\":true}")
            .create_async()
            .await;

        let notifier =
            TelegramNotifier::with_api(Url::parse(&server.url()).unwrap(), "TOKEN", "123");
        assert!(notifier.notify("done").await);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn delivery_failure_is_reported_not_raised() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/botTOKEN/sendMessage")
            .with_status(401)
            .create_async()
            .await;

        let notifier =
            TelegramNotifier::with_api(Url::parse(&server.url()).unwrap(), "TOKEN", "123");
        assert!(!notifier.notify("done").await);
    }

    #[tokio::test]
    async fn missing_settings_disable_notifications() {
        assert!(!from_settings(Some("token"), None).notify("x").await);
        assert!(!from_settings(Some(""), Some("1")).notify("x").await);
    }
}
