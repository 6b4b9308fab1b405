//! External response cache bridge.
//!
//! The scheduler reads through [`ResponseCache::get`] before queuing a GET
//! and writes through [`ResponseCache::set`] after a completion whose
//! request carries a non-zero `cache_timeout`. Errors from either side are
//! swallowed by the scheduler.

mod memory;

use std::fmt;
use std::sync::Arc;

use crate::error::CacheError;
use crate::http::{Request, Response};

pub use memory::{MemoryCache, MemoryCacheConfig};

/// Caller-supplied cache capability.
pub trait ResponseCache: Send + Sync {
    /// Cached response for `request`, if any.
    fn get(&self, request: &Request) -> Result<Option<Arc<Response>>, CacheError>;

    /// Store `response` for `request`, using `request.cache_timeout()` as TTL.
    fn set(&self, request: &Request, response: &Arc<Response>) -> Result<(), CacheError>;
}

type Getter = Box<dyn Fn(&Request) -> Result<Option<Arc<Response>>, CacheError> + Send + Sync>;
type Setter = Box<dyn Fn(&Request, &Arc<Response>) -> Result<(), CacheError> + Send + Sync>;

/// [`ResponseCache`] built from a getter and a setter closure.
pub struct CacheHooks {
    getter: Getter,
    setter: Setter,
}

impl CacheHooks {
    pub fn new<G, S>(getter: G, setter: S) -> Self
    where
        G: Fn(&Request) -> Result<Option<Arc<Response>>, CacheError> + Send + Sync + 'static,
        S: Fn(&Request, &Arc<Response>) -> Result<(), CacheError> + Send + Sync + 'static,
    {
        Self { getter: Box::new(getter), setter: Box::new(setter) }
    }
}

impl fmt::Debug for CacheHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheHooks").finish_non_exhaustive()
    }
}

impl ResponseCache for CacheHooks {
    fn get(&self, request: &Request) -> Result<Option<Arc<Response>>, CacheError> {
        (self.getter)(request)
    }

    fn set(&self, request: &Request, response: &Arc<Response>) -> Result<(), CacheError> {
        (self.setter)(request, response)
    }
}
