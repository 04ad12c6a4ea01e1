use std::fmt;

use tracing::{debug, info, warn};

use crate::cache::ResponseCache;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectError(pub String);

impl fmt::Display for InjectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instrumentation failed: {}", self.0)
    }
}

impl std::error::Error for InjectError {}

/// Instruments script source so that it records variable observations.
pub trait Injector {
    fn inject(&self, source: &str) -> Result<String, InjectError>;
}

impl<F> Injector for F
where
    F: Fn(&str) -> Result<String, InjectError>,
{
    fn inject(&self, source: &str) -> Result<String, InjectError> {
        self(source)
    }
}

/// Proxy rule attached to an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookRule {
    /// Instrument and cache.
    Hook,
    /// Instrument, prepend the runtime prelude, and cache.
    HookJs,
    /// Instrument on every request and drop any cached copy.
    HookNoCache,
}

impl HookRule {
    /// `None` for rule values that do not ask for instrumentation at all.
    pub fn parse(rule_value: &str) -> Option<Self> {
        if !rule_value.starts_with("hook") {
            return None;
        }
        Some(match rule_value {
            "hook-js" => Self::HookJs,
            "hook-no-cache" => Self::HookNoCache,
            _ => Self::Hook,
        })
    }
}

/// Whether a response for `path` under `rule_value` goes through the rewrite.
pub fn should_rewrite(rule_value: &str, path: &str) -> bool {
    HookRule::parse(rule_value).is_some() && path.ends_with("js")
}

/// Produces the body to send back for an intercepted script.
///
/// A valid cached copy wins unless the rule disables caching. A failed
/// injection yields an empty body; cache write failures only log.
pub fn rewrite_script(
    cache: &ResponseCache,
    injector: &dyn Injector,
    prelude: &str,
    url: &str,
    body: &[u8],
    rule: HookRule,
) -> String {
    if rule != HookRule::HookNoCache {
        match cached_body(cache, url) {
            Ok(Some(cached)) => {
                info!(url, "serving cached rewrite");
                return cached;
            }
            Ok(None) => {}
            Err(error) => warn!(url, %error, "cache lookup failed, rewriting"),
        }
    }

    let source = String::from_utf8_lossy(body);
    let hooked = match injector.inject(&source) {
        Ok(hooked) => hooked,
        Err(error) => {
            warn!(url, %error, "script left unrewritten");
            return String::new();
        }
    };

    if rule == HookRule::HookNoCache {
        if let Err(error) = cache.remove_file(url) {
            warn!(url, %error, "failed to drop cached rewrite");
        }
        return hooked;
    }

    let hooked = if rule == HookRule::HookJs {
        format!("{prelude}{hooked}")
    } else {
        hooked
    };
    match cache.cache_file(url, hooked.as_bytes()) {
        Ok(()) => debug!(url, bytes = hooked.len(), "rewrite cached"),
        Err(error) => warn!(url, %error, "failed to cache rewrite"),
    }
    hooked
}

fn cached_body(cache: &ResponseCache, url: &str) -> Result<Option<String>, crate::CacheError> {
    if !cache.has_valid_cache(url)? {
        return Ok(None);
    }
    Ok(cache
        .get_cached_file(url)?
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
}
