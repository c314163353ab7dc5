use std::{future::Future, pin::Pin, rc::Rc};

use crate::{ClientError, Operation};

/// A settled observation from the underlying GraphQL client.
///
/// `fetching` is not part of the response; the query tracks it itself while
/// the fetcher future is in flight.
#[derive(Debug, Clone)]
pub struct Response<D> {
    /// Raw response data, if any was produced.
    pub data: Option<D>,
    /// The client-reported error, if any.
    pub error: Option<ClientError>,
}

impl<D> Response<D> {
    /// A successful response carrying data.
    pub fn from_data(data: D) -> Self {
        Response {
            data: Some(data),
            error: None,
        }
    }

    /// A failed response carrying the client's error.
    pub fn from_error(error: ClientError) -> Self {
        Response {
            data: None,
            error: Some(error),
        }
    }

    /// A response that settled without data or error.
    pub fn empty() -> Self {
        Response {
            data: None,
            error: None,
        }
    }
}

pub(crate) type BoxFetcherFuture<D> = Pin<Box<dyn Future<Output = Response<D>>>>;

pub(crate) type Fetcher<K, D> = Rc<dyn Fn(Operation<K>) -> BoxFetcherFuture<D>>;

pub(crate) fn box_fetcher<K, D, Fu>(
    fetcher: impl Fn(Operation<K>) -> Fu + 'static,
) -> Fetcher<K, D>
where
    Fu: Future<Output = Response<D>> + 'static,
{
    Rc::new(move |operation| Box::pin(fetcher(operation)) as BoxFetcherFuture<D>)
}
