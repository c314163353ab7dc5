use futures_channel::oneshot;

use crate::{query::Query, QueryState, RequestPolicy, Response, ResponseData};

// Create Executor function which will spawn a task driving the fetcher and
// update query state along the way. A policy override marks a forced
// execution: it bypasses the pause flag and the configured request policy.
pub(crate) fn create_executor<K, D>(query: Query<K, D>) -> impl Fn(Option<RequestPolicy>) + Clone
where
    K: crate::QueryVariables + 'static,
    D: crate::QueryValue + 'static,
{
    move |policy_override: Option<RequestPolicy>| {
        let query = query.clone();
        crate::util::spawn_local(async move {
            if query.is_paused() && policy_override.is_none() {
                return;
            }

            match query.new_execution() {
                None => {}
                Some(cancellation) => {
                    let fetcher = query.fetcher();
                    let operation = query.operation(policy_override);

                    match query.get_state() {
                        // First load.
                        QueryState::Created | QueryState::Loading => {
                            query.set_state(QueryState::Loading);
                            let fetch = fetcher(operation);
                            match execute_with_cancellation(fetch, cancellation).await {
                                Ok(response) => {
                                    let data = ResponseData::now(response);
                                    query.set_state(QueryState::Settled(data));
                                }
                                Err(_) => {
                                    log::debug!("initial fetch was cancelled");
                                    query.set_state(QueryState::Created);
                                }
                            }
                        }
                        // Subsequent loads.
                        QueryState::Fetching(data) | QueryState::Settled(data) => {
                            query.set_state(QueryState::Fetching(data));
                            let fetch = fetcher(operation);
                            match execute_with_cancellation(fetch, cancellation).await {
                                Ok(response) => {
                                    let data = ResponseData::now(response);
                                    query.set_state(QueryState::Settled(data));
                                }
                                Err(_) => {
                                    query.maybe_map_state(|state| {
                                        if let QueryState::Fetching(data) = state {
                                            Ok(QueryState::Settled(data))
                                        } else {
                                            Err(state)
                                        }
                                    });
                                }
                            }
                        }
                    }
                    query.finalize_execution()
                }
            }
        })
    }
}

async fn execute_with_cancellation<D, Fu>(
    fut: Fu,
    cancellation: oneshot::Receiver<()>,
) -> Result<Response<D>, ()>
where
    Fu: std::future::Future<Output = Response<D>> + Unpin,
{
    use futures::future::Either;

    let result = futures::future::select(fut, cancellation).await;

    match result {
        Either::Left((response, _)) => Ok(response),
        Either::Right((cancelled, _)) => {
            if cancelled.is_err() {
                log::debug!("query cancellation was incorrectly dropped");
            }

            Err(())
        }
    }
}
