// This is pretty much across the whole world of inq
// anyhowwwww.... it's useful!
use anyhow::Result;
use tokio::task::JoinHandle;

mod batch_worker;
pub(crate) use batch_worker::BatchWorker;

// human

// A background worker, that does work. duh.
pub(crate) trait Worker {
    fn start(self) -> JoinHandle<Result<()>>;
}
