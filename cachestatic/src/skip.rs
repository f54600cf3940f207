//! Deciding which requests bypass the cache.

use crate::Request;

/// Decides whether a request bypasses the cache entirely.
///
/// A skipped request goes straight to the wrapped handler: nothing is
/// looked up, captured or stored. Closures of the form `Fn(&Request) -> bool`
/// are skippers too.
pub trait Skipper: Send + Sync {
    /// Returns `true` to bypass the cache for `request`.
    fn skip(&self, request: &Request) -> bool;
}

impl<F> Skipper for F
where
    F: Fn(&Request) -> bool + Send + Sync,
{
    fn skip(&self, request: &Request) -> bool {
        self(request)
    }
}

/// Never skips; every request goes through the cache.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverSkip;

impl Skipper for NeverSkip {
    fn skip(&self, _request: &Request) -> bool {
        false
    }
}
