//! Session cookie captured from the management tier.
//!
//! The cookie is set at most once: either from a user override at
//! construction, or from the first response carrying `Set-Cookie`. Later
//! responses never replace it.

use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use cowput_protocol::constants::COOKIE_MARKER;
use reqwest::header::{HeaderMap, SET_COOKIE};
use tracing::debug;

/// A write-once session cookie.
#[derive(Debug, Default)]
pub struct SessionCookie {
    value: OnceLock<String>,
}

impl SessionCookie {
    /// Creates a cookie holder, pre-set when `initial` is non-empty.
    pub fn new(initial: Option<&str>) -> Self {
        let cookie = Self::default();
        if let Some(v) = initial.map(str::trim).filter(|v| !v.is_empty()) {
            let v = if v.ends_with(';') {
                v.to_string()
            } else {
                format!("{v};")
            };
            let _ = cookie.value.set(v);
        }
        cookie
    }

    /// Returns the stored cookie, if any.
    pub fn get(&self) -> Option<&str> {
        self.value.get().map(String::as_str)
    }

    /// Stores the `name=value` pairs of every `Set-Cookie` header.
    ///
    /// Returns `true` only for the call that actually set the value.
    /// Concurrent callers race on a single initialization; the loser's
    /// value is discarded.
    pub fn capture(&self, headers: &HeaderMap) -> bool {
        if self.value.get().is_some() {
            return false;
        }
        let Some(pairs) = cookie_pairs(headers) else {
            return false;
        };
        let stored = self.value.set(pairs).is_ok();
        if stored {
            debug!("session cookie captured");
        }
        stored
    }

    /// Value for the `Cookie` request header: the session cookie followed
    /// by the timestamp marker the service expects.
    pub fn header_value(&self) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        format!("{}{COOKIE_MARKER}={nanos};", self.get().unwrap_or(""))
    }
}

fn cookie_pairs(headers: &HeaderMap) -> Option<String> {
    let mut out = String::new();
    for value in headers.get_all(SET_COOKIE) {
        let Ok(value) = value.to_str() else {
            continue;
        };
        if let Some(pair) = value.split(';').next().map(str::trim)
            && !pair.is_empty()
        {
            out.push_str(pair);
            out.push(';');
        }
    }
    if out.is_empty() { None } else { Some(out) }
}
