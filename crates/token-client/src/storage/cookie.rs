use std::sync::Arc;

use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::Url;

use super::{check_key, is_token_key, TokenStorage, AVAILABILITY_KEY};
use crate::error::{StorageError, StorageResult};

/// Tokens kept as cookies for the API origin.
///
/// The jar can be handed to the HTTP client so the tokens travel with
/// every request to that origin.
#[derive(Clone)]
pub struct CookieStorage {
    jar: Arc<Jar>,
    url: Url,
}

impl std::fmt::Debug for CookieStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieStorage")
            .field("url", &self.url.as_str())
            .finish()
    }
}

impl CookieStorage {
    pub fn new(jar: Arc<Jar>, url: Url) -> Self {
        Self { jar, url }
    }

    /// The jar to share with a `reqwest::Client`.
    pub fn jar(&self) -> Arc<Jar> {
        self.jar.clone()
    }

    fn attributes(&self) -> &'static str {
        if self.url.scheme() == "https" {
            "Path=/; SameSite=Strict; Secure"
        } else {
            "Path=/; SameSite=Strict"
        }
    }

    /// All name/value pairs currently sent to the origin.
    fn entries(&self) -> Vec<(String, String)> {
        let Some(header) = self.jar.cookies(&self.url) else {
            return Vec::new();
        };
        let Ok(header) = header.to_str() else {
            return Vec::new();
        };
        header
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()
    }
}

/// RFC 6265 cookie-octet
fn is_cookie_value(value: &str) -> bool {
    value
        .bytes()
        .all(|b| matches!(b, 0x21 | 0x23..=0x2B | 0x2D..=0x3A | 0x3C..=0x5B | 0x5D..=0x7E))
}

#[async_trait]
impl TokenStorage for CookieStorage {
    async fn set_token(&self, key: &str, value: &str) -> StorageResult<()> {
        check_key(key)?;
        if !is_cookie_value(value) {
            return Err(StorageError::InvalidValue(key.to_string()));
        }
        let cookie = format!("{}={}; {}", key, value, self.attributes());
        self.jar.add_cookie_str(&cookie, &self.url);
        Ok(())
    }

    async fn get_token(&self, key: &str) -> StorageResult<Option<String>> {
        check_key(key)?;
        Ok(self
            .entries()
            .into_iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value))
    }

    async fn remove_token(&self, key: &str) -> StorageResult<()> {
        check_key(key)?;
        let cookie = format!(
            "{}=; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; {}",
            key,
            self.attributes()
        );
        self.jar.add_cookie_str(&cookie, &self.url);
        Ok(())
    }

    async fn clear(&self) -> StorageResult<()> {
        for (name, _) in self.entries() {
            if is_token_key(&name) {
                self.remove_token(&name).await?;
            }
        }
        Ok(())
    }

    async fn is_available(&self) -> bool {
        if self.set_token(AVAILABILITY_KEY, "1").await.is_err() {
            return false;
        }
        let readable = matches!(self.get_token(AVAILABILITY_KEY).await, Ok(Some(_)));
        let removed = self.remove_token(AVAILABILITY_KEY).await.is_ok();
        readable && removed
    }

    fn name(&self) -> &'static str {
        "cookie"
    }
}
