use std::{future::Future, rc::Rc};

use crate::client::box_fetcher;
use crate::query::{ListenerId, Query};
use crate::query_executor::create_executor;
use crate::query_result::classify;
use crate::{
    BoxError, Operation, QueryOptions, QueryResult, QueryState, RequestPolicy, Response,
};

/// Creates a query handle classifying a single query execution.
///
/// The fetcher is the seam to the underlying GraphQL client: it receives the
/// executable [`Operation`] and resolves to the client's [`Response`]. The
/// selector transforms raw response data into the shape consumers need and
/// may reject it by returning an error.
///
/// Unless [`QueryOptions::paused`] is set, creating the handle triggers the
/// initial fetch as a side effect. There are no other side effects.
///
/// # Example
///
/// ```rust,no_run
/// use graphql_query::{use_query, BoxError, Operation, QueryOptions, Response};
///
/// #[derive(Debug, Clone)]
/// struct UserVariables {
///     id: u32,
/// }
///
/// #[derive(Debug, Clone)]
/// struct UserData {
///     name: Option<String>,
/// }
///
/// async fn fetch_user(op: Operation<UserVariables>) -> Response<UserData> {
///     todo!()
/// }
///
/// fn watch_user_name() {
///     let user = use_query(
///         "query User($id: ID!) { user(id: $id) { name } }",
///         UserVariables { id: 1 },
///         fetch_user,
///         |user: &UserData| {
///             user.name
///                 .clone()
///                 .ok_or_else(|| BoxError::from("user without a name"))
///         },
///         QueryOptions::default(),
///     );
///     let _ = user.result();
/// }
/// ```
pub fn use_query<K, D, T, Fu>(
    query: impl Into<String>,
    variables: K,
    fetcher: impl Fn(Operation<K>) -> Fu + 'static,
    selector: impl Fn(&D) -> Result<T, BoxError> + 'static,
    options: QueryOptions,
) -> QueryHandle<K, D, T>
where
    K: crate::QueryVariables + 'static,
    D: crate::QueryValue + 'static,
    T: 'static,
    Fu: Future<Output = Response<D>> + 'static,
{
    let operation = Operation {
        query: query.into(),
        variables,
        request_policy: options.request_policy,
    };

    let query = Query::new(operation, box_fetcher(fetcher), options.paused);
    let executor = create_executor(query.clone());

    let handle = QueryHandle {
        query,
        selector: Rc::new(selector),
        executor: Rc::new(executor),
    };

    if !options.paused {
        handle.execute();
    }

    handle
}

/// An owned, classified view over one mounted query.
///
/// The handle recomputes its [`QueryResult`] from the current lifecycle state
/// on every [`result()`](Self::result) call and pushes freshly classified
/// results to registered listeners on every state transition. Dropping the
/// handle cancels any in-flight execution.
pub struct QueryHandle<K, D, T> {
    query: Query<K, D>,
    selector: Rc<dyn Fn(&D) -> Result<T, BoxError>>,
    executor: Rc<dyn Fn(Option<RequestPolicy>)>,
}

impl<K, D, T> QueryHandle<K, D, T>
where
    K: crate::QueryVariables + 'static,
    D: crate::QueryValue + 'static,
    T: 'static,
{
    /// The current classified result.
    pub fn result(&self) -> QueryResult<T> {
        let paused = self.query.is_paused();
        self.query
            .with_state(|state| classify(paused, state, &*self.selector))
    }

    /// Forces a fresh network fetch, bypassing the client cache regardless of
    /// the configured request policy.
    ///
    /// While an execution is already in flight the call is absorbed; the
    /// surviving fetch determines the observed result.
    pub fn refetch(&self) {
        (self.executor)(Some(RequestPolicy::NetworkOnly));
    }

    /// Pauses or resumes the query. Resuming a query that never settled
    /// triggers an execution.
    pub fn set_paused(&self, paused: bool) {
        self.query.set_paused(paused);
        if !paused
            && self
                .query
                .with_state(|state| matches!(state, QueryState::Created))
        {
            self.execute();
        }
    }

    /// Registers a listener invoked with the freshly classified result on
    /// every state transition.
    pub fn subscribe(&self, listener: impl Fn(&QueryResult<T>) + 'static) -> ListenerId {
        let selector = self.selector.clone();
        let paused = self.query.paused_flag();
        self.query.add_listener(move |state| {
            let result = classify(paused.get(), state, &*selector);
            listener(&result);
        })
    }

    /// Removes a previously registered listener.
    pub fn unsubscribe(&self, key: ListenerId) -> bool {
        self.query.remove_listener(key)
    }

    fn execute(&self) {
        (self.executor)(None);
    }

    pub(crate) fn with_raw_data<R>(&self, func: impl FnOnce(Option<&D>) -> R) -> R {
        self.query.with_state(|state| func(state.data()))
    }
}

// Kept free of trait bounds; Drop impls call into this.
impl<K, D, T> QueryHandle<K, D, T> {
    pub(crate) fn query(&self) -> &Query<K, D> {
        &self.query
    }
}

impl<K, D, T> Drop for QueryHandle<K, D, T> {
    fn drop(&mut self) {
        self.query.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::time::Duration;

    const DOC: &str = "query Answer { answer }";

    async fn flush() {
        for _ in 0..25 {
            tokio::task::yield_now().await;
        }
    }

    fn increment(n: &i32) -> Result<i32, BoxError> {
        Ok(n + 1)
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn initial_fetch_classifies_success() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let calls = Rc::new(Cell::new(0u32));
                let fetcher = {
                    let calls = calls.clone();
                    move |_op: Operation<()>| {
                        let calls = calls.clone();
                        async move {
                            calls.set(calls.get() + 1);
                            Response::from_data(5)
                        }
                    }
                };

                let handle = use_query(DOC, (), fetcher, increment, QueryOptions::default());
                assert!(
                    handle.result().is_fetching(),
                    "Query should report fetching before the client settles"
                );

                flush().await;
                assert_eq!(handle.result().data(), Some(&6));
                assert_eq!(calls.get(), 1, "Exactly one fetch should have run");
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn paused_query_never_fetches() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let calls = Rc::new(Cell::new(0u32));
                let fetcher = {
                    let calls = calls.clone();
                    move |_op: Operation<()>| {
                        let calls = calls.clone();
                        async move {
                            calls.set(calls.get() + 1);
                            Response::from_data(5)
                        }
                    }
                };

                let handle = use_query(
                    DOC,
                    (),
                    fetcher,
                    increment,
                    QueryOptions::default().set_paused(true),
                );

                flush().await;
                assert!(handle.result().is_paused());
                assert_eq!(calls.get(), 0, "Paused queries must not hit the client");

                handle.set_paused(false);
                flush().await;
                assert_eq!(handle.result().data(), Some(&6));
                assert_eq!(calls.get(), 1);
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn refetch_while_fetching_is_absorbed() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let calls = Rc::new(Cell::new(0u32));
                let fetcher = {
                    let calls = calls.clone();
                    move |_op: Operation<()>| {
                        let calls = calls.clone();
                        async move {
                            calls.set(calls.get() + 1);
                            crate::util::sleep(Duration::from_secs(1)).await;
                            Response::from_data(5)
                        }
                    }
                };

                let handle = use_query(DOC, (), fetcher, increment, QueryOptions::default());
                flush().await;
                assert_eq!(calls.get(), 1);

                // Both land while the first execution is still in flight.
                handle.refetch();
                handle.refetch();
                flush().await;
                assert_eq!(calls.get(), 1, "Concurrent refetches should be absorbed");

                tokio::time::sleep(Duration::from_secs(2)).await;
                assert_eq!(handle.result().data(), Some(&6));
                assert_eq!(calls.get(), 1);
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn refetch_forces_network_only() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let policies = Rc::new(RefCell::new(Vec::new()));
                let fetcher = {
                    let policies = policies.clone();
                    move |op: Operation<()>| {
                        policies.borrow_mut().push(op.request_policy);
                        async move { Response::from_data(5) }
                    }
                };

                let handle = use_query(DOC, (), fetcher, increment, QueryOptions::default());
                flush().await;
                handle.refetch();
                flush().await;

                assert_eq!(
                    *policies.borrow(),
                    vec![RequestPolicy::CacheFirst, RequestPolicy::NetworkOnly],
                    "Refetch must bypass the configured request policy"
                );
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn listeners_observe_transitions_in_order() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let fetcher =
                    |_op: Operation<()>| async move { Response::from_data(5) };
                let handle = use_query(DOC, (), fetcher, increment, QueryOptions::default());

                let seen = Rc::new(RefCell::new(Vec::new()));
                let listener = {
                    let seen = seen.clone();
                    move |result: &QueryResult<i32>| {
                        seen.borrow_mut().push(result.clone());
                    }
                };
                let key = handle.subscribe(listener);

                flush().await;
                {
                    let seen = seen.borrow();
                    assert_eq!(seen.len(), 2, "Expected loading then settled, got {seen:?}");
                    assert!(seen[0].is_fetching());
                    assert_eq!(seen[1].data(), Some(&6));
                }

                assert!(handle.unsubscribe(key));
                handle.refetch();
                flush().await;
                assert_eq!(
                    seen.borrow().len(),
                    2,
                    "Removed listeners must not be notified"
                );
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn dropping_the_handle_cancels_the_fetch() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let completed = Rc::new(Cell::new(false));
                let fetcher = {
                    let completed = completed.clone();
                    move |_op: Operation<()>| {
                        let completed = completed.clone();
                        async move {
                            crate::util::sleep(Duration::from_secs(1)).await;
                            completed.set(true);
                            Response::from_data(5)
                        }
                    }
                };

                let handle = use_query(DOC, (), fetcher, increment, QueryOptions::default());
                flush().await;
                drop(handle);

                tokio::time::sleep(Duration::from_secs(5)).await;
                assert!(
                    !completed.get(),
                    "In-flight fetch should be cancelled on teardown"
                );
            })
            .await;
    }
}
