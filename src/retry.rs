use std::{cell::Cell, future::Future, rc::Rc, time::Duration};

use crate::query::ListenerId;
use crate::use_query::{use_query, QueryHandle};
use crate::{
    BoxError, Operation, QueryError, QueryOptions, QueryResult, QueryState, Response,
};

/// Verdict of a retry predicate for one observation of the raw data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// The data is not usable yet, keep retrying.
    Retry,
    /// The data is usable, pass the classified result through.
    Accept,
    /// Stop retrying now and report failure, regardless of remaining budget.
    Bail,
}

/// Options for a retrying query [`use_retry_query()`].
#[derive(Clone)]
pub struct RetryOptions {
    /// Upper bound on automatic retries per handle instance.
    pub max_retry_count: u32,
    retry_delay: Rc<dyn Fn(u32) -> Duration>,
}

impl RetryOptions {
    /// Creates options with the given retry budget and the default delay of
    /// `attempt * 1000ms`.
    pub fn new(max_retry_count: u32) -> Self {
        Self {
            max_retry_count,
            retry_delay: Rc::new(|attempt| Duration::from_millis(u64::from(attempt) * 1000)),
        }
    }

    /// Set the delay function, mapping the upcoming attempt number (1-based)
    /// to the wait before its forced refetch.
    pub fn set_retry_delay(self, retry_delay: impl Fn(u32) -> Duration + 'static) -> Self {
        RetryOptions {
            retry_delay: Rc::new(retry_delay),
            ..self
        }
    }
}

impl std::fmt::Debug for RetryOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryOptions")
            .field("max_retry_count", &self.max_retry_count)
            .field("retry_delay", &"...")
            .finish()
    }
}

/// Classified result of a retrying query.
///
/// [`QueryResult`]'s space plus the [`RetryResult::Retrying`] tag.
#[derive(Clone, Debug)]
pub enum RetryResult<T> {
    /// The caller requested pause; nothing executes.
    Paused,
    /// A fetch is in flight and the predicate has not asked for a retry.
    Fetching,
    /// The predicate asked for a retry and budget remains.
    Retrying {
        /// Retries performed so far by this handle instance.
        attempt: u32,
    },
    /// The predicate accepted settled data and the selector produced a value.
    Success(T),
    /// The query failed; see [`QueryError`] for the cause.
    Error(QueryError),
}

impl<T> RetryResult<T> {
    /// Whether the caller requested pause.
    pub fn is_paused(&self) -> bool {
        matches!(self, RetryResult::Paused)
    }

    /// Whether a fetch is in flight.
    pub fn is_fetching(&self) -> bool {
        matches!(self, RetryResult::Fetching)
    }

    /// Whether a retry has been requested by the predicate.
    pub fn is_retrying(&self) -> bool {
        matches!(self, RetryResult::Retrying { .. })
    }

    /// Whether the query settled successfully.
    pub fn is_success(&self) -> bool {
        matches!(self, RetryResult::Success(_))
    }

    /// Whether the query settled with an error.
    pub fn is_error(&self) -> bool {
        matches!(self, RetryResult::Error(_))
    }

    /// The selected value, if the query settled successfully.
    pub fn data(&self) -> Option<&T> {
        match self {
            RetryResult::Success(data) => Some(data),
            _ => None,
        }
    }

    /// The error, if the query settled with one.
    pub fn error(&self) -> Option<&QueryError> {
        match self {
            RetryResult::Error(error) => Some(error),
            _ => None,
        }
    }
}

impl<T> From<QueryResult<T>> for RetryResult<T> {
    fn from(result: QueryResult<T>) -> Self {
        match result {
            QueryResult::Paused => RetryResult::Paused,
            QueryResult::Fetching => RetryResult::Fetching,
            QueryResult::Success(data) => RetryResult::Success(data),
            QueryResult::Error(error) => RetryResult::Error(error),
        }
    }
}

/// Creates a query handle that retries with bounded, delayed refetches while
/// a predicate over the raw data asks for it.
///
/// The predicate receives the raw pre-selector data, so it can inspect fields
/// the selector discards; during a refetch it sees the previously settled
/// data. A retry is scheduled whenever a fetch starts while the predicate is
/// unsatisfied and budget remains: after `retry_delay(attempt)` the attempt
/// counter is incremented and a forced refetch is issued. The deferred action
/// re-validates at fire time and becomes a no-op when the handle was dropped,
/// paused, the budget was spent, or the predicate was satisfied in the
/// interim.
///
/// With `max_retry_count` of zero the underlying query is immediately paused
/// and never reaches the client.
pub fn use_retry_query<K, D, T, Fu>(
    query: impl Into<String>,
    variables: K,
    fetcher: impl Fn(Operation<K>) -> Fu + 'static,
    selector: impl Fn(&D) -> Result<T, BoxError> + 'static,
    retry_if: impl Fn(Option<&D>) -> RetryDecision + 'static,
    options: QueryOptions,
    retry: RetryOptions,
) -> RetryQueryHandle<K, D, T>
where
    K: crate::QueryVariables + 'static,
    D: crate::QueryValue + 'static,
    T: 'static,
    Fu: Future<Output = Response<D>> + 'static,
{
    let caller_paused = options.paused;
    let underlying_paused = caller_paused || retry.max_retry_count == 0;

    let handle = use_query(
        query,
        variables,
        fetcher,
        selector,
        options.set_paused(underlying_paused),
    );

    let inner = Rc::new(RetryInner {
        handle,
        retry_if: Box::new(retry_if),
        retry_delay: retry.retry_delay,
        max_retry_count: retry.max_retry_count,
        attempts: Cell::new(0),
        scheduled: Cell::new(false),
        caller_paused: Cell::new(caller_paused),
    });

    let weak = Rc::downgrade(&inner);
    inner.handle.query().add_listener(move |state| {
        if let Some(inner) = weak.upgrade() {
            inner.on_transition(state);
        }
    });

    RetryQueryHandle { inner }
}

/// An owned, classified view over one mounted query with a retry policy.
///
/// The attempt counter belongs to this instance alone and resets only by
/// constructing a new handle. Dropping the handle cancels any in-flight
/// execution and voids any pending retry.
pub struct RetryQueryHandle<K, D, T> {
    inner: Rc<RetryInner<K, D, T>>,
}

struct RetryInner<K, D, T> {
    handle: QueryHandle<K, D, T>,
    retry_if: Box<dyn Fn(Option<&D>) -> RetryDecision>,
    retry_delay: Rc<dyn Fn(u32) -> Duration>,
    max_retry_count: u32,
    attempts: Cell<u32>,
    scheduled: Cell<bool>,
    caller_paused: Cell<bool>,
}

impl<K, D, T> RetryInner<K, D, T>
where
    K: crate::QueryVariables + 'static,
    D: crate::QueryValue + 'static,
    T: 'static,
{
    fn current(&self) -> RetryResult<T> {
        if self.caller_paused.get() {
            return RetryResult::Paused;
        }

        let decision = self.handle.with_raw_data(|raw| (self.retry_if)(raw));
        match decision {
            RetryDecision::Bail => RetryResult::Error(QueryError::Bailed),
            RetryDecision::Retry => {
                if self.attempts.get() >= self.max_retry_count {
                    RetryResult::Error(QueryError::MaxRetriesExceeded)
                } else {
                    RetryResult::Retrying {
                        attempt: self.attempts.get(),
                    }
                }
            }
            RetryDecision::Accept => self.handle.result().into(),
        }
    }

    // A retry is scheduled only while a fetch is in flight after an
    // unsatisfying prior observation: the predicate still asks for a retry
    // and budget remains. At most one deferred retry is pending at a time.
    fn on_transition(self: Rc<Self>, state: &QueryState<D>) {
        if self.handle.query().is_paused() {
            return;
        }
        if !state.is_fetching() {
            return;
        }

        let attempts = self.attempts.get();
        if attempts >= self.max_retry_count || self.scheduled.get() {
            return;
        }
        if (self.retry_if)(state.data()) != RetryDecision::Retry {
            return;
        }

        self.scheduled.set(true);
        let delay = (self.retry_delay)(attempts + 1);
        let weak = Rc::downgrade(&self);

        crate::util::spawn_local(async move {
            crate::util::sleep(delay).await;

            // Re-validate at fire time: the handle may be gone, paused, or
            // out of budget by now.
            let inner = match weak.upgrade() {
                Some(inner) => inner,
                None => return,
            };
            inner.scheduled.set(false);

            if inner.caller_paused.get() {
                return;
            }
            let attempts = inner.attempts.get();
            if attempts >= inner.max_retry_count {
                return;
            }
            let decision = inner.handle.with_raw_data(|raw| (inner.retry_if)(raw));
            if decision != RetryDecision::Retry {
                return;
            }

            inner.attempts.set(attempts + 1);
            log::debug!("retrying query (attempt {})", attempts + 1);
            inner.handle.refetch();
        });
    }
}

impl<K, D, T> RetryQueryHandle<K, D, T>
where
    K: crate::QueryVariables + 'static,
    D: crate::QueryValue + 'static,
    T: 'static,
{
    /// The current classified result, with the retry policy applied.
    pub fn result(&self) -> RetryResult<T> {
        self.inner.current()
    }

    /// Retries performed so far by this handle instance.
    pub fn attempts(&self) -> u32 {
        self.inner.attempts.get()
    }

    /// Forces a fresh network fetch, independent of the retry budget.
    pub fn refetch(&self) {
        self.inner.handle.refetch();
    }

    /// Pauses or resumes the query.
    pub fn set_paused(&self, paused: bool) {
        self.inner.caller_paused.set(paused);
        self.inner
            .handle
            .set_paused(paused || self.inner.max_retry_count == 0);
    }

    /// Registers a listener invoked with the freshly classified result on
    /// every state transition of the underlying query.
    pub fn subscribe(&self, listener: impl Fn(&RetryResult<T>) + 'static) -> ListenerId {
        let weak = Rc::downgrade(&self.inner);
        self.inner.handle.query().add_listener(move |_state| {
            if let Some(inner) = weak.upgrade() {
                listener(&inner.current());
            }
        })
    }

    /// Removes a previously registered listener.
    pub fn unsubscribe(&self, key: ListenerId) -> bool {
        self.inner.handle.unsubscribe(key)
    }
}
