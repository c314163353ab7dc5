use crate::{Instant, Response};

/// The lifecycle of a query.
///
/// Each variant corresponds to a particular state of a query in its
/// lifecycle, from creation up to a settled client response.
#[derive(Clone, Default)]
pub enum QueryState<D> {
    /// The initial state of a query upon its creation.
    ///
    /// No fetching operation has been initiated yet.
    #[default]
    Created,

    /// Query is fetching for the first time.
    ///
    /// No previous response exists that could be observed in the meantime.
    Loading,

    /// A query is in the process of fetching, not being its first fetch.
    ///
    /// The associated [`ResponseData`] holds the previously settled response,
    /// so its raw data stays observable while the refetch is in flight.
    Fetching(ResponseData<D>),

    /// The client settled the most recent fetch operation.
    ///
    /// The associated [`ResponseData`] holds what the client produced, which
    /// may be data, an error, or neither.
    Settled(ResponseData<D>),
}

impl<D> QueryState<D> {
    /// Returns the [`ResponseData`] for the current state, if present.
    pub fn response_data(&self) -> Option<&ResponseData<D>> {
        match self {
            QueryState::Created | QueryState::Loading => None,
            QueryState::Fetching(data) | QueryState::Settled(data) => Some(data),
        }
    }

    /// Returns the most recent raw response data, if present.
    pub fn data(&self) -> Option<&D> {
        self.response_data().and_then(|r| r.response.data.as_ref())
    }

    /// Returns the last settled timestamp, if present.
    pub fn updated_at(&self) -> Option<Instant> {
        self.response_data().map(|r| r.updated_at)
    }

    /// Whether a fetch is currently in flight or about to start.
    pub fn is_fetching(&self) -> bool {
        matches!(
            self,
            QueryState::Created | QueryState::Loading | QueryState::Fetching(_)
        )
    }
}

impl<D> std::fmt::Debug for QueryState<D>
where
    D: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "Created"),
            Self::Loading => write!(f, "Loading"),
            Self::Fetching(arg0) => f.debug_tuple("Fetching").field(arg0).finish(),
            Self::Settled(arg0) => f.debug_tuple("Settled").field(arg0).finish(),
        }
    }
}

/// The latest settled response for a query.
#[derive(Clone)]
pub struct ResponseData<D> {
    /// The client's response.
    pub response: Response<D>,
    /// The instant this response settled.
    pub updated_at: Instant,
}

impl<D> ResponseData<D> {
    /// Creates a new ResponseData with the current time as the settled
    /// timestamp.
    pub fn now(response: Response<D>) -> Self {
        Self {
            response,
            updated_at: Instant::now(),
        }
    }
}

impl<D> std::fmt::Debug for ResponseData<D>
where
    D: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseData")
            .field("response", &self.response)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}
