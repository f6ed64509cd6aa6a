//! Runs the asynchronous AWS providers for synchronous callers.

use std::future::Future;
use std::io;

/// Drive `future` to completion on a fresh current-thread runtime.
///
/// A runtime cannot be started or dropped on a thread that is already inside
/// one, so such callers get a scoped helper thread instead.
pub(crate) fn block_on<F>(future: F) -> io::Result<F::Output>
where
    F: Future + Send,
    F::Output: Send,
{
    if tokio::runtime::Handle::try_current().is_err() {
        return run(future);
    }

    std::thread::scope(|scope| scope.spawn(|| run(future)).join())
        .map_err(|_| io::Error::other("provider thread panicked"))?
}

fn run<F: Future>(future: F) -> io::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    Ok(runtime.block_on(future))
}

#[cfg(test)]
mod tests {
    use super::*;
    use testresult::TestResult;

    #[test]
    fn it_blocks_outside_a_runtime() -> TestResult {
        assert_eq!(block_on(async { 7 })?, 7);
        Ok(())
    }

    #[test]
    fn it_blocks_inside_a_runtime() -> TestResult {
        let outer = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let value = outer.block_on(async { block_on(async { 11 }) })?;

        assert_eq!(value, 11);
        Ok(())
    }
}
