//! Cookie jar that outlives the process.
//!
//! Wraps a [`Jar`] and mirrors every `Set-Cookie` header the backend sends
//! into client storage under [`keys::COOKIES`], one entry per cookie name.
//! Opening the jar replays the stored headers, so a cookie session started by
//! one run is still there in the next.
use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::HeaderValue;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::storage::{keys, ClientStorage};

/// A `Set-Cookie` header and the URL that sent it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StoredCookie {
    url: String,
    header: String,
}

pub struct PersistentCookies {
    jar: RwLock<Jar>,
    stored: Mutex<BTreeMap<String, StoredCookie>>,
    storage: Arc<dyn ClientStorage>,
}

impl PersistentCookies {
    /// Build the jar from whatever `storage` kept from earlier runs
    pub fn open(storage: Arc<dyn ClientStorage>) -> Self {
        let stored = match storage.get_json::<BTreeMap<String, StoredCookie>>(keys::COOKIES) {
            Ok(stored) => stored.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "could not read stored cookies");
                BTreeMap::new()
            },
        };

        let jar = Jar::default();
        for (name, cookie) in &stored {
            match Url::parse(&cookie.url) {
                Ok(url) => jar.add_cookie_str(&cookie.header, &url),
                Err(e) => warn!(cookie = %name, error = %e, "skipping stored cookie"),
            }
        }
        if !stored.is_empty() {
            debug!(count = stored.len(), "cookies restored");
        }

        Self {
            jar: RwLock::new(jar),
            stored: Mutex::new(stored),
            storage,
        }
    }

    /// Names of the cookies currently kept
    pub fn names(&self) -> Vec<String> {
        self.stored.lock().keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.stored.lock().is_empty()
    }

    /// Forget every cookie, in memory and in storage
    pub fn clear(&self) {
        *self.jar.write() = Jar::default();
        self.stored.lock().clear();
        if let Err(e) = self.storage.remove(keys::COOKIES) {
            warn!(error = %e, "could not clear stored cookies");
        }
    }

    fn remember(&self, headers: &[&HeaderValue], url: &Url) {
        let mut stored = self.stored.lock();
        let mut changed = false;

        for header in headers {
            let Ok(text) = header.to_str() else {
                continue;
            };
            let Some((name, live)) = parse_set_cookie(text) else {
                continue;
            };
            if live {
                let cookie = StoredCookie {
                    url: url.to_string(),
                    header: text.to_string(),
                };
                changed |= stored.insert(name, cookie.clone()).as_ref() != Some(&cookie);
            } else {
                changed |= stored.remove(&name).is_some();
            }
        }

        if changed {
            if let Err(e) = self.storage.set_json(keys::COOKIES, &*stored) {
                warn!(error = %e, "could not persist cookies");
            }
        }
    }
}

impl CookieStore for PersistentCookies {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let headers: Vec<&HeaderValue> = cookie_headers.collect();
        self.jar.read().set_cookies(&mut headers.iter().copied(), url);
        self.remember(&headers, url);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.jar.read().cookies(url)
    }
}

/// Cookie name and whether the header sets it (`true`) or clears it. An
/// empty value or a non-positive `Max-Age` clears.
fn parse_set_cookie(header: &str) -> Option<(String, bool)> {
    let mut parts = header.split(';');
    let (name, value) = parts.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let expired = parts.any(|attr| {
        let Some((key, value)) = attr.split_once('=') else {
            return false;
        };
        key.trim().eq_ignore_ascii_case("max-age")
            && value.trim().parse::<i64>().is_ok_and(|age| age <= 0)
    });
    Some((name.to_string(), !value.trim().is_empty() && !expired))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn url() -> Url {
        Url::parse("http://localhost:8080/auth/login").unwrap()
    }

    fn set(cookies: &PersistentCookies, header: &'static str) {
        let value = HeaderValue::from_static(header);
        cookies.set_cookies(&mut std::iter::once(&value), &url());
    }

    #[test]
    fn test_parse_set_cookie() {
        assert_eq!(
            parse_set_cookie("sid=abc; Path=/; HttpOnly"),
            Some(("sid".to_string(), true))
        );
        assert_eq!(parse_set_cookie("sid=; Path=/"), Some(("sid".to_string(), false)));
        assert_eq!(
            parse_set_cookie("sid=abc; max-age=0"),
            Some(("sid".to_string(), false))
        );
        assert_eq!(parse_set_cookie("garbage"), None);
    }

    #[test]
    fn test_cookies_survive_reopen() {
        let storage: Arc<dyn ClientStorage> = Arc::new(MemoryStorage::new());
        let first = PersistentCookies::open(storage.clone());
        set(&first, "sid=abc; Path=/; HttpOnly");
        assert!(storage.get(keys::COOKIES).unwrap().is_some());

        let second = PersistentCookies::open(storage);
        assert_eq!(second.names(), vec!["sid".to_string()]);
        let sent = second.cookies(&url()).unwrap();
        assert_eq!(sent.to_str().unwrap(), "sid=abc");
    }

    #[test]
    fn test_cleared_cookie_is_forgotten() {
        let storage: Arc<dyn ClientStorage> = Arc::new(MemoryStorage::new());
        let cookies = PersistentCookies::open(storage.clone());
        set(&cookies, "sid=abc; Path=/");
        set(&cookies, "sid=; Path=/; Max-Age=0");
        assert!(cookies.is_empty());
        assert!(PersistentCookies::open(storage.clone()).cookies(&url()).is_none());

        set(&cookies, "sid=def; Path=/");
        cookies.clear();
        assert!(cookies.cookies(&url()).is_none());
        assert_eq!(storage.get(keys::COOKIES).unwrap(), None);
    }
}
