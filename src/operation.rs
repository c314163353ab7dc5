/// Cache-consistency mode forwarded to the underlying client.
///
/// The client decides what each policy means for its own cache; this crate
/// only forwards the value, and forces [`RequestPolicy::NetworkOnly`] on
/// every `refetch`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RequestPolicy {
    /// Prefer cached data, fetch only on a cache miss.
    #[default]
    CacheFirst,
    /// Return cached data if present, then fetch in the background.
    CacheAndNetwork,
    /// Always fetch, bypassing the cache.
    NetworkOnly,
    /// Never fetch, serve from cache only.
    CacheOnly,
}

/// A single executable query, as handed to the client fetcher.
#[derive(Debug, Clone)]
pub struct Operation<K> {
    /// The query document.
    pub query: String,
    /// Variables for this execution.
    pub variables: K,
    /// The effective request policy for this execution.
    pub request_policy: RequestPolicy,
}

impl<K: Clone> Operation<K> {
    pub(crate) fn with_policy(&self, request_policy: RequestPolicy) -> Self {
        Operation {
            query: self.query.clone(),
            variables: self.variables.clone(),
            request_policy,
        }
    }
}

/// Options for a query [`use_query()`](crate::use_query()).
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// When set, the query does not execute and the classified result is
    /// `Paused`, irrespective of client state.
    pub paused: bool,
    /// Request policy for regular executions. `refetch` ignores this and
    /// always uses [`RequestPolicy::NetworkOnly`].
    pub request_policy: RequestPolicy,
}

impl QueryOptions {
    /// Set the paused flag.
    pub fn set_paused(self, paused: bool) -> Self {
        QueryOptions { paused, ..self }
    }

    /// Set the request policy.
    pub fn set_request_policy(self, request_policy: RequestPolicy) -> Self {
        QueryOptions {
            request_policy,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_execute_with_cache_first() {
        let options = QueryOptions::default();
        assert!(!options.paused, "Queries should not start paused");
        assert_eq!(
            options.request_policy,
            RequestPolicy::CacheFirst,
            "Default policy should defer to the client cache"
        );
    }

    #[test]
    fn builder_setters_override_fields() {
        let options = QueryOptions::default()
            .set_paused(true)
            .set_request_policy(RequestPolicy::CacheAndNetwork);
        assert!(options.paused);
        assert_eq!(options.request_policy, RequestPolicy::CacheAndNetwork);
    }
}
