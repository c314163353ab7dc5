use crate::{BoxError, ClientError, QueryError, QueryState};

/// Classified result of a query.
///
/// Exactly one variant is observable at any time; a refetch revisits
/// [`QueryResult::Fetching`] before reaching a new terminal state.
#[derive(Clone, Debug)]
pub enum QueryResult<T> {
    /// The caller requested pause; nothing executes.
    Paused,
    /// A fetch is in flight or about to start.
    Fetching,
    /// The selector produced a value from settled data.
    Success(T),
    /// The query failed; see [`QueryError`] for the cause.
    Error(QueryError),
}

impl<T> QueryResult<T> {
    /// Whether the caller requested pause.
    pub fn is_paused(&self) -> bool {
        matches!(self, QueryResult::Paused)
    }

    /// Whether a fetch is in flight.
    pub fn is_fetching(&self) -> bool {
        matches!(self, QueryResult::Fetching)
    }

    /// Whether the query settled successfully.
    pub fn is_success(&self) -> bool {
        matches!(self, QueryResult::Success(_))
    }

    /// Whether the query settled with an error.
    pub fn is_error(&self) -> bool {
        matches!(self, QueryResult::Error(_))
    }

    /// The selected value, if the query settled successfully.
    pub fn data(&self) -> Option<&T> {
        match self {
            QueryResult::Success(data) => Some(data),
            _ => None,
        }
    }

    /// The error, if the query settled with one.
    pub fn error(&self) -> Option<&QueryError> {
        match self {
            QueryResult::Error(error) => Some(error),
            _ => None,
        }
    }

    /// Maps the success value, leaving every other state untouched.
    pub fn map<R>(self, mapper: impl FnOnce(T) -> R) -> QueryResult<R> {
        match self {
            QueryResult::Paused => QueryResult::Paused,
            QueryResult::Fetching => QueryResult::Fetching,
            QueryResult::Success(data) => QueryResult::Success(mapper(data)),
            QueryResult::Error(error) => QueryResult::Error(error),
        }
    }
}

// Classification order, first match wins:
// 1. caller requested pause
// 2. a fetch is in flight (or about to start on a fresh query)
// 3. the client reported an error
// 4. the client settled without data
// 5. the selector accepts or rejects the data
pub(crate) fn classify<D, T>(
    paused: bool,
    state: &QueryState<D>,
    selector: &dyn Fn(&D) -> Result<T, BoxError>,
) -> QueryResult<T> {
    if paused {
        return QueryResult::Paused;
    }

    let data = match state {
        QueryState::Created | QueryState::Loading | QueryState::Fetching(_) => {
            return QueryResult::Fetching
        }
        QueryState::Settled(data) => data,
    };

    if let Some(error) = &data.response.error {
        return QueryResult::Error(QueryError::Client(error.clone()));
    }

    match &data.response.data {
        None => QueryResult::Error(QueryError::NoData),
        Some(raw) => match selector(raw) {
            Ok(selected) => QueryResult::Success(selected),
            Err(error) => QueryResult::Error(QueryError::Selector(ClientError::from_boxed(error))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Response, ResponseData};

    fn settled(response: Response<i32>) -> QueryState<i32> {
        QueryState::Settled(ResponseData::now(response))
    }

    fn double(value: &i32) -> Result<i32, BoxError> {
        Ok(value * 2)
    }

    #[test]
    fn paused_wins_over_any_state() {
        let states = [
            QueryState::Created,
            QueryState::Loading,
            settled(Response::from_data(1)),
            settled(Response::from_error(ClientError::msg("boom"))),
        ];
        for state in &states {
            let result = classify(true, state, &double);
            assert!(result.is_paused(), "Expected paused, got {result:?}");
        }
    }

    #[test]
    fn in_flight_states_classify_as_fetching() {
        let refetching = QueryState::Fetching(ResponseData::now(Response::from_data(1)));
        for state in [QueryState::Created, QueryState::Loading, refetching] {
            let result = classify(false, &state, &double);
            assert!(result.is_fetching(), "Expected fetching, got {result:?}");
        }
    }

    #[test]
    fn selector_output_becomes_success() {
        let result = classify(false, &settled(Response::from_data(21)), &double);
        assert_eq!(result.data(), Some(&42));
    }

    #[test]
    fn selector_failure_preserves_cause() {
        let selector = |_: &i32| -> Result<i32, BoxError> { Err("missing field".into()) };
        let result = classify(false, &settled(Response::from_data(1)), &selector);
        match result.error() {
            Some(QueryError::Selector(cause)) => {
                assert_eq!(cause.to_string(), "missing field");
            }
            other => panic!("Expected selector error, got {other:?}"),
        }
    }

    #[test]
    fn settled_without_data_is_an_error() {
        let result = classify(false, &settled(Response::empty()), &double);
        assert!(matches!(result.error(), Some(QueryError::NoData)));
    }

    #[test]
    fn client_error_wins_over_present_data() {
        let response = Response {
            data: Some(7),
            error: Some(ClientError::msg("partial failure")),
        };
        let result = classify(false, &settled(response), &double);
        assert!(matches!(result.error(), Some(QueryError::Client(_))));
    }

    #[test]
    fn map_transforms_only_success() {
        let success = QueryResult::Success(2).map(|v| v * 10);
        assert_eq!(success.data(), Some(&20));

        let error: QueryResult<i32> = QueryResult::Error(QueryError::NoData);
        assert!(error.map(|v| v * 10).is_error());
    }
}
