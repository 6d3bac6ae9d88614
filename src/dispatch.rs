use tokio::sync::mpsc;
use tokio::task::AbortHandle;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Creates a connected dispatcher/loop pair.
pub fn main_context() -> (MainDispatcher, MainLoop) {
    let (tx, rx) = mpsc::unbounded_channel();
    (MainDispatcher { tx }, MainLoop { rx })
}

#[derive(Debug, Clone)]
pub struct MainDispatcher {
    tx: mpsc::UnboundedSender<Job>,
}

impl MainDispatcher {
    /// Queues `job` for the main loop. Returns `false` if the loop is gone.
    pub fn dispatch(&self, job: impl FnOnce() + Send + 'static) -> bool {
        self.tx.send(Box::new(job)).is_ok()
    }
}

#[derive(Debug)]
pub struct MainLoop {
    rx: mpsc::UnboundedReceiver<Job>,
}

impl MainLoop {
    /// Runs the next queued job, waiting for one if needed. Returns `false`
    /// once every dispatcher has been dropped and the queue is drained.
    pub async fn turn(&mut self) -> bool {
        match self.rx.recv().await {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    /// Runs jobs until every dispatcher is dropped.
    pub async fn run(mut self) {
        while self.turn().await {}
    }

    /// Runs whatever is already queued without waiting. Returns the count.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            job();
            ran += 1;
        }
        ran
    }
}

/// Handle to a spawned call.
#[derive(Debug, Clone)]
pub struct RequestHandle {
    abort: AbortHandle,
}

impl RequestHandle {
    pub(crate) fn new(abort: AbortHandle) -> Self {
        Self { abort }
    }

    /// Aborts the call. Its callback will not run unless it was already
    /// queued on the main loop.
    pub fn cancel(&self) {
        self.abort.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }
}
