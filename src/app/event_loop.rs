use std::future::Future;
use std::io;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;

/// Single-threaded scheduler driving the server's asynchronous work.
///
/// Spawned tasks only make progress while something is blocked on the loop.
/// Must not be dropped from inside an async context.
#[derive(Debug)]
pub struct EventLoop {
    runtime: Runtime,
}

impl EventLoop {
    pub fn new() -> io::Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .thread_name("xo-server-loop")
            .build()?;
        tracing::debug!("event loop created");
        Ok(Self { runtime })
    }

    /// Run `future` to completion on this loop.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.runtime.spawn(future)
    }

    pub fn handle(&self) -> Handle {
        self.runtime.handle().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_block_on_and_spawn() {
        let event_loop = EventLoop::new().unwrap();
        let task = event_loop.spawn(async { 21 * 2 });

        let result = event_loop.block_on(async {
            tokio::time::sleep(Duration::from_millis(1)).await;
            task.await.unwrap()
        });

        assert_eq!(result, 42);
    }

    #[test]
    fn test_handle_spawns_on_same_loop() {
        let event_loop = EventLoop::new().unwrap();
        let task = event_loop.handle().spawn(async { "done" });

        assert_eq!(event_loop.block_on(task).unwrap(), "done");
    }
}
