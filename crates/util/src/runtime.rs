//! Bridge for running async code from synchronous call sites.
//!
//! Registered API operations are plain synchronous functions, but the HTTP
//! client they wrap is async. Operations use [`block_on_future`] to drive
//! their requests to completion.

use std::future::Future;

use anyhow::anyhow;
use tokio::{
    runtime::{Builder, Handle, RuntimeFlavor},
    task,
};

/// Drives `future` to completion and returns its output.
///
/// Inside a multi-threaded Tokio runtime the current worker is handed over to
/// blocking work while the future runs on the existing runtime. Outside any
/// runtime (or inside a current-thread runtime, where re-entering would
/// deadlock) a throwaway current-thread runtime is built on a scoped thread.
pub fn block_on_future<F, T>(future: F) -> anyhow::Result<T>
where
    F: Future<Output = anyhow::Result<T>> + Send + 'static,
    T: Send + 'static,
{
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            task::block_in_place(|| handle.block_on(future))
        }
        Ok(_) => std::thread::scope(|scope| {
            scope
                .spawn(|| run_on_fresh_runtime(future))
                .join()
                .map_err(|_| anyhow!("blocking runtime thread panicked"))?
        }),
        Err(_) => run_on_fresh_runtime(future),
    }
}

fn run_on_fresh_runtime<F, T>(future: F) -> anyhow::Result<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| anyhow!(error))?
        .block_on(future)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_without_an_ambient_runtime() {
        let value = block_on_future(async { Ok(21 * 2) }).expect("future output");
        assert_eq!(value, 42);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn runs_inside_a_current_thread_runtime() {
        let value = block_on_future(async { Ok("done") }).expect("future output");
        assert_eq!(value, "done");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn runs_inside_a_multi_thread_runtime() {
        let error = block_on_future::<_, ()>(async { Err(anyhow!("boom")) }).unwrap_err();
        assert_eq!(error.to_string(), "boom");
    }
}
