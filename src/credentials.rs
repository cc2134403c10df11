use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
};

use futures::future::{BoxFuture, FutureExt};
use log::{debug, info};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{LitresError, Result};

/// Browser whose user agent is sent along with the session cookies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Browser {
    Chrome,
    #[default]
    Firefox,
    Edge,
    Safari,
}

impl Browser {
    pub fn user_agent(self) -> &'static str {
        match self {
            Browser::Chrome => "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
            Browser::Firefox => "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:127.0) Gecko/20100101 Firefox/127.0",
            Browser::Edge => "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36 Edg/126.0.0.0",
            Browser::Safari => "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_5) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15",
        }
    }
}

/// Cookies plus user agent of an authenticated session. Read-only once built.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCredentials {
    cookies: BTreeMap<String, String>,
    user_agent: String,
}

impl fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredentials")
            .field("cookies", &self.cookies.keys().collect::<Vec<_>>())
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl SessionCredentials {
    pub fn new(cookies: BTreeMap<String, String>, user_agent: impl Into<String>) -> Self {
        Self {
            cookies,
            user_agent: user_agent.into(),
        }
    }

    pub fn cookies(&self) -> &BTreeMap<String, String> {
        &self.cookies
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Value for the `Cookie` request header.
    pub fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Store cookies as a plain `{name: value}` json object.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.cookies)?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| LitresError::filesystem(path, e))?;
        info!("Saved {} cookies to {}", self.cookies.len(), path.display());
        Ok(())
    }
}

/// Layout of a json cookie file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CookieFormat {
    /// Guess from the json shape.
    #[default]
    Auto,
    /// `{"name": "value", ...}`
    Dict,
    /// `[{"name": "...", "value": "...", "domain": ...}, ...]` as exported by EditThisCookie.
    EditThisCookie,
}

#[derive(Deserialize)]
struct ExportedCookie {
    name: String,
    value: String,
}

fn cookies_from_dict(value: Value) -> Option<BTreeMap<String, String>> {
    match value {
        Value::Object(map) => Some(
            map.into_iter()
                .filter_map(|(name, value)| match value {
                    Value::String(s) => Some((name, s)),
                    Value::Null => None,
                    other => Some((name, other.to_string())),
                })
                .collect(),
        ),
        _ => None,
    }
}

fn cookies_from_export(value: Value) -> Option<BTreeMap<String, String>> {
    let list = serde_json::from_value::<Vec<ExportedCookie>>(value).ok()?;
    Some(list.into_iter().map(|c| (c.name, c.value)).collect())
}

pub fn parse_cookie_json(text: &str, format: CookieFormat) -> Result<BTreeMap<String, String>> {
    let value: Value = serde_json::from_str(text)?;
    let parsed = match format {
        CookieFormat::Dict => cookies_from_dict(value),
        CookieFormat::EditThisCookie => cookies_from_export(value),
        CookieFormat::Auto => match value {
            Value::Array(_) => cookies_from_export(value),
            _ => cookies_from_dict(value),
        },
    };

    parsed.ok_or_else(|| {
        LitresError::Credentials(format!("cookie file is not in {:?} format", format))
    })
}

/// Parse a `name=value; name2=value2` header string.
pub fn parse_cookie_header(header: &str) -> BTreeMap<String, String> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            (!name.is_empty()).then(|| (name.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// A way of obtaining session credentials before any book is fetched.
pub trait CredentialSource: Send + Sync {
    fn describe(&self) -> String;
    fn load(&self) -> BoxFuture<'_, Result<SessionCredentials>>;
}

pub struct CookieFile {
    path: PathBuf,
    format: CookieFormat,
    browser: Browser,
}

impl CookieFile {
    pub fn new(path: impl Into<PathBuf>, format: CookieFormat, browser: Browser) -> Self {
        Self {
            path: path.into(),
            format,
            browser,
        }
    }
}

impl CredentialSource for CookieFile {
    fn describe(&self) -> String {
        format!("cookie file {}", self.path.display())
    }

    fn load(&self) -> BoxFuture<'_, Result<SessionCredentials>> {
        async move {
            if !self.path.is_file() {
                return Err(LitresError::Credentials(format!(
                    "cookie file not found: {}",
                    self.path.display()
                )));
            }
            let text = tokio::fs::read_to_string(&self.path)
                .await
                .map_err(|e| LitresError::filesystem(&self.path, e))?;
            let cookies = parse_cookie_json(&text, self.format)?;
            debug!("Loaded {} cookies from {}", cookies.len(), self.path.display());
            Ok(SessionCredentials::new(cookies, self.browser.user_agent()))
        }
        .boxed()
    }
}

pub struct InlineCookies {
    header: String,
    browser: Browser,
}

impl InlineCookies {
    pub fn new(header: impl Into<String>, browser: Browser) -> Self {
        Self {
            header: header.into(),
            browser,
        }
    }
}

impl CredentialSource for InlineCookies {
    fn describe(&self) -> String {
        "cookies from the command line".to_string()
    }

    fn load(&self) -> BoxFuture<'_, Result<SessionCredentials>> {
        let cookies = parse_cookie_header(&self.header);
        let result = if cookies.is_empty() {
            Err(LitresError::Credentials("no cookies given".to_string()))
        } else {
            Ok(SessionCredentials::new(cookies, self.browser.user_agent()))
        };
        futures::future::ready(result).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dict_cookie_file() {
        let cookies =
            parse_cookie_json(r#"{"SID": "abc", "n": 5}"#, CookieFormat::Dict).unwrap();
        assert_eq!(cookies["SID"], "abc");
        assert_eq!(cookies["n"], "5");
    }

    #[test]
    fn parses_edit_this_cookie_export() {
        let json = r#"[
            {"domain": ".litres.ru", "name": "SID", "value": "abc", "httpOnly": true},
            {"domain": ".litres.ru", "name": "lang", "value": "ru"}
        ]"#;
        let cookies = parse_cookie_json(json, CookieFormat::EditThisCookie).unwrap();
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies["lang"], "ru");
        assert_eq!(parse_cookie_json(json, CookieFormat::Auto).unwrap(), cookies);
    }

    #[test]
    fn rejects_mismatched_format() {
        let err = parse_cookie_json(r#"{"SID": "abc"}"#, CookieFormat::EditThisCookie);
        assert!(matches!(err, Err(LitresError::Credentials(_))));
        let err = parse_cookie_json(r#"[{"name": "SID", "value": "abc"}]"#, CookieFormat::Dict);
        assert!(matches!(err, Err(LitresError::Credentials(_))));
    }

    #[test]
    fn renders_and_parses_cookie_header() {
        let cookies = parse_cookie_header("b=2; a=1;; =skip; broken");
        assert_eq!(cookies.len(), 2);
        let creds = SessionCredentials::new(cookies, Browser::Chrome.user_agent());
        assert_eq!(creds.cookie_header(), "a=1; b=2");
    }

    #[test]
    fn debug_hides_cookie_values() {
        let creds = SessionCredentials::new(parse_cookie_header("SID=secret"), "ua");
        let text = format!("{:?}", creds);
        assert!(text.contains("SID"));
        assert!(!text.contains("secret"));
    }

    #[tokio::test]
    async fn cookie_file_round_trips_through_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        let creds = SessionCredentials::new(parse_cookie_header("SID=abc; lang=ru"), "ua");
        creds.save(&path).await.unwrap();

        let loaded = CookieFile::new(&path, CookieFormat::Dict, Browser::Firefox)
            .load()
            .await
            .unwrap();
        assert_eq!(loaded.cookies(), creds.cookies());
        assert_eq!(loaded.user_agent(), Browser::Firefox.user_agent());
    }

    #[tokio::test]
    async fn missing_cookie_file_is_a_credential_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = CookieFile::new(dir.path().join("nope.json"), CookieFormat::Auto, Browser::Chrome);
        assert!(matches!(source.load().await, Err(LitresError::Credentials(_))));
    }

    #[tokio::test]
    async fn empty_inline_cookies_are_rejected() {
        let source = InlineCookies::new("   ", Browser::Chrome);
        assert!(matches!(source.load().await, Err(LitresError::Credentials(_))));
    }
}
