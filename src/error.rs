use std::fmt;
use std::rc::Rc;

/// Boxed error type accepted at the selector boundary.
pub type BoxError = Box<dyn std::error::Error>;

/// A cheaply cloneable error, shared between every listener observing the
/// same classified result.
///
/// Wraps the original error so the cause chain stays intact.
#[derive(Clone)]
pub struct ClientError(Rc<dyn std::error::Error>);

impl ClientError {
    /// Wraps a concrete error.
    pub fn new(error: impl std::error::Error + 'static) -> Self {
        Self(Rc::new(error))
    }

    /// Creates an error from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self(Rc::new(Message(message.into())))
    }

    pub(crate) fn from_boxed(error: BoxError) -> Self {
        Self(Rc::from(error))
    }

    /// The wrapped error.
    pub fn inner(&self) -> &(dyn std::error::Error + 'static) {
        &*self.0
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

#[derive(Debug)]
struct Message(String);

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for Message {}

/// Why a query ended up in the error state.
///
/// Every failure is returned as data inside
/// [`QueryResult::Error`](crate::QueryResult::Error); nothing in this crate
/// panics across the handle boundary.
#[derive(Clone, Debug, thiserror::Error)]
pub enum QueryError {
    /// The underlying client reported an error for the operation.
    #[error("client reported an error: {0}")]
    Client(ClientError),

    /// The selector rejected otherwise valid response data.
    #[error("selector failed: {0}")]
    Selector(ClientError),

    /// The client settled without an error but produced no data.
    #[error("query completed without data")]
    NoData,

    /// The retry budget was exhausted before the predicate was satisfied.
    #[error("max retry count exceeded")]
    MaxRetriesExceeded,

    /// The retry predicate vetoed any further attempts.
    #[error("retry predicate bailed")]
    Bailed,
}

impl QueryError {
    /// Returns the wrapped cause for the `Client` and `Selector` variants.
    pub fn cause(&self) -> Option<&ClientError> {
        match self {
            QueryError::Client(cause) | QueryError::Selector(cause) => Some(cause),
            QueryError::NoData | QueryError::MaxRetriesExceeded | QueryError::Bailed => None,
        }
    }
}
