use std::future::Future;
use std::time::Duration;

pub(crate) fn spawn_local<Fut>(fut: Fut)
where
    Fut: Future<Output = ()> + 'static,
{
    cfg_if::cfg_if! {
        if #[cfg(feature = "web")] {
            wasm_bindgen_futures::spawn_local(fut);
        } else if #[cfg(feature = "native")] {
            let _ = tokio::task::spawn_local(fut);
        } else {
            let _ = fut;
            log::warn!("You are missing a Cargo feature for graphql_query. Please enable one of 'native' or 'web'.");
        }
    }
}

pub(crate) async fn sleep(duration: Duration) {
    cfg_if::cfg_if! {
        if #[cfg(feature = "web")] {
            gloo_timers::future::sleep(duration).await;
        } else if #[cfg(feature = "native")] {
            tokio::time::sleep(duration).await;
        } else {
            let _ = duration;
            log::warn!("You are missing a Cargo feature for graphql_query. Please enable one of 'native' or 'web'.");
        }
    }
}
