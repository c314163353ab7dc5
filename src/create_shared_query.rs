use std::{
    cell::RefCell,
    future::Future,
    rc::{Rc, Weak},
};

use crate::client::{box_fetcher, Fetcher};
use crate::query::ListenerId;
use crate::use_query::{use_query, QueryHandle};
use crate::{BoxError, Operation, QueryOptions, QueryResult, RequestPolicy, Response};

/// Creates a [`SharedQueryScope`] for sharing one query's classified result
/// across many readers.
///
/// The query document, selector, and request policy are fixed at creation;
/// variables and the pause flag are supplied per mounted provider.
///
/// # Parameters
///
/// * `query`: the query document.
/// * `fetcher`: the execution function handing operations to the client.
/// * `selector`: transformation applied to raw response data.
/// * `request_policy`: policy for regular executions within this scope.
///
/// Returns a new [`SharedQueryScope`].
pub fn create_shared_query<K, D, T, Fu>(
    query: impl Into<String>,
    fetcher: impl Fn(Operation<K>) -> Fu + 'static,
    selector: impl Fn(&D) -> Result<T, BoxError> + 'static,
    request_policy: RequestPolicy,
) -> SharedQueryScope<K, D, T>
where
    K: crate::QueryVariables + 'static,
    D: crate::QueryValue + 'static,
    T: 'static,
    Fu: Future<Output = Response<D>> + 'static,
{
    SharedQueryScope {
        query: query.into(),
        fetcher: box_fetcher(fetcher),
        selector: Rc::new(selector),
        request_policy,
        active: Rc::new(RefCell::new(Weak::new())),
    }
}

/// A scope distributing one query's classified result to many readers.
///
/// [`provide`](Self::provide) mounts the single owning provider;
/// [`use_shared`](Self::use_shared) hands out readers observing the
/// provider's query. Readers never issue their own executions.
pub struct SharedQueryScope<K, D, T> {
    query: String,
    fetcher: Fetcher<K, D>,
    selector: Rc<dyn Fn(&D) -> Result<T, BoxError>>,
    request_policy: RequestPolicy,
    active: Rc<RefCell<Weak<QueryHandle<K, D, T>>>>,
}

impl<K, D, T> SharedQueryScope<K, D, T>
where
    K: crate::QueryVariables + 'static,
    D: crate::QueryValue + 'static,
    T: 'static,
{
    /// Mounts a provider executing the scope's query with the given
    /// variables. Exactly one underlying execution is created per mounted
    /// provider, no matter how many readers observe it.
    ///
    /// Mounting while another provider is active replaces it.
    pub fn provide(&self, variables: K, paused: bool) -> SharedQueryProvider<K, D, T> {
        let fetcher = self.fetcher.clone();
        let selector = self.selector.clone();

        let handle = Rc::new(use_query(
            self.query.clone(),
            variables,
            move |operation| fetcher(operation),
            move |data: &D| selector(data),
            QueryOptions {
                paused,
                request_policy: self.request_policy,
            },
        ));

        if self.active.borrow().upgrade().is_some() {
            log::debug!("replacing mounted shared query provider");
        }
        *self.active.borrow_mut() = Rc::downgrade(&handle);

        SharedQueryProvider {
            handle,
            slot: self.active.clone(),
        }
    }

    /// A reader observing the mounted provider's query.
    ///
    /// # Panics
    ///
    /// Panics when no provider is currently mounted; use
    /// [`try_use_shared`](Self::try_use_shared) for the fallible form.
    pub fn use_shared(&self) -> SharedQueryReader<K, D, T> {
        self.try_use_shared().expect("Shared query provider missing.")
    }

    /// A reader observing the mounted provider's query, or [`None`] when no
    /// provider is currently mounted.
    pub fn try_use_shared(&self) -> Option<SharedQueryReader<K, D, T>> {
        self.active
            .borrow()
            .upgrade()
            .map(|handle| SharedQueryReader { handle })
    }
}

/// The owner of a shared query execution.
///
/// Unmounting (dropping) the provider cancels any in-flight execution and
/// invalidates the scope's reader lookup.
pub struct SharedQueryProvider<K, D, T> {
    handle: Rc<QueryHandle<K, D, T>>,
    slot: Rc<RefCell<Weak<QueryHandle<K, D, T>>>>,
}

impl<K, D, T> SharedQueryProvider<K, D, T>
where
    K: crate::QueryVariables + 'static,
    D: crate::QueryValue + 'static,
    T: 'static,
{
    /// The current classified result.
    pub fn result(&self) -> QueryResult<T> {
        self.handle.result()
    }

    /// Forces a fresh network fetch, observed by every reader.
    pub fn refetch(&self) {
        self.handle.refetch();
    }

    /// Pauses or resumes the shared query for the provider and every reader.
    pub fn set_paused(&self, paused: bool) {
        self.handle.set_paused(paused);
    }
}

impl<K, D, T> Drop for SharedQueryProvider<K, D, T> {
    fn drop(&mut self) {
        let mut slot = self.slot.borrow_mut();
        if slot.ptr_eq(&Rc::downgrade(&self.handle)) {
            *slot = Weak::new();
        }
        drop(slot);
        self.handle.query().cancel();
    }
}

/// A read-only view on the provider's shared query.
///
/// All readers of one provider observe the same classified result and share
/// the same refetch action: a refetch from any reader affects all of them.
#[derive(Clone)]
pub struct SharedQueryReader<K, D, T> {
    handle: Rc<QueryHandle<K, D, T>>,
}

impl<K, D, T> SharedQueryReader<K, D, T>
where
    K: crate::QueryVariables + 'static,
    D: crate::QueryValue + 'static,
    T: 'static,
{
    /// The current classified result.
    pub fn result(&self) -> QueryResult<T> {
        self.handle.result()
    }

    /// Forces a fresh network fetch, observed by every reader.
    pub fn refetch(&self) {
        self.handle.refetch();
    }

    /// Registers a listener invoked with the freshly classified result on
    /// every state transition.
    pub fn subscribe(&self, listener: impl Fn(&QueryResult<T>) + 'static) -> ListenerId {
        self.handle.subscribe(listener)
    }

    /// Removes a previously registered listener.
    pub fn unsubscribe(&self, key: ListenerId) -> bool {
        self.handle.unsubscribe(key)
    }
}
