//! Proxy-side cache for instrumented scripts.
//!
//! Intercepted script responses are rewritten by an [`Injector`] and the
//! result is kept per URL, so repeat loads skip instrumentation.

use std::error::Error;
use std::fmt;

mod cache;
mod db;
mod rewrite;

pub use cache::{DEFAULT_MAX_AGE, ResponseCache};
pub use db::{Db, init_sqlite};
pub use rewrite::{HookRule, InjectError, Injector, rewrite_script, should_rewrite};

#[derive(Debug)]
pub enum CacheError {
    Sqlite {
        context: &'static str,
        source: rusqlite::Error,
    },
}

impl CacheError {
    pub(crate) fn sqlite(context: &'static str, source: rusqlite::Error) -> Self {
        Self::Sqlite { context, source }
    }
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite { context, source } => write!(f, "{context}: {source}"),
        }
    }
}

impl Error for CacheError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite { source, .. } => Some(source),
        }
    }
}
