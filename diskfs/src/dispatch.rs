//! Completion dispatcher
//!
//! Single-threaded executor that turns operation futures back into
//! completion callbacks. Each spawned operation runs until its future
//! resolves, then its callback is invoked exactly once with the result.
//! Callbacks may spawn follow-up operations; those run in the same
//! [`Dispatcher::run_until_stalled`] pass if they are immediately runnable.
//!
//! Tasks are polled only when woken. Wakers push the task id onto a wake
//! queue, so a device completing a read from another context (interrupt
//! handler, polling loop) only has to call `wake()`.

use alloc::boxed::Box;
use alloc::collections::{BTreeMap, VecDeque};
use alloc::rc::Rc;
use alloc::sync::Arc;
use alloc::task::Wake;
use core::cell::{Cell, RefCell};
use core::future::Future;
use core::pin::{pin, Pin};
use core::task::{Context, Poll, Waker};

use log::trace;
use spin::Mutex;

use crate::error::Result;

/// Identifier of a spawned operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

type Task = Pin<Box<dyn Future<Output = ()>>>;
type WakeQueue = Arc<Mutex<VecDeque<TaskId>>>;

struct TaskWaker {
    task_id: TaskId,
    queue: WakeQueue,
}

impl Wake for TaskWaker {
    fn wake(self: Arc<Self>) {
        self.wake_by_ref();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.queue.lock().push_back(self.task_id);
    }
}

#[derive(Default)]
struct Inner {
    tasks: RefCell<BTreeMap<TaskId, Task>>,
    wake_queue: WakeQueue,
    next_id: Cell<u64>,
}

/// Cloneable handle to one single-threaded completion queue
#[derive(Clone, Default)]
pub struct Dispatcher {
    inner: Rc<Inner>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `operation`; `callback` receives its result exactly once.
    ///
    /// Nothing runs until [`run_until_stalled`](Self::run_until_stalled).
    pub fn spawn<T, Fut, Cb>(&self, operation: Fut, callback: Cb) -> TaskId
    where
        T: 'static,
        Fut: Future<Output = Result<T>> + 'static,
        Cb: FnOnce(Result<T>) + 'static,
    {
        let id = TaskId(self.inner.next_id.get());
        self.inner.next_id.set(id.0 + 1);

        let task: Task = Box::pin(async move {
            let result = operation.await;
            callback(result);
        });
        self.inner.tasks.borrow_mut().insert(id, task);
        self.inner.wake_queue.lock().push_back(id);
        id
    }

    /// Poll woken tasks until none is runnable.
    ///
    /// Returns the number of callbacks delivered during this pass.
    pub fn run_until_stalled(&self) -> usize {
        let mut delivered = 0;

        loop {
            let next = self.inner.wake_queue.lock().pop_front();
            let Some(id) = next else { break };

            // Stale wake for a finished task, or a duplicate wake
            let task = self.inner.tasks.borrow_mut().remove(&id);
            let Some(mut task) = task else { continue };

            let waker = Waker::from(Arc::new(TaskWaker {
                task_id: id,
                queue: Arc::clone(&self.inner.wake_queue),
            }));
            let mut cx = Context::from_waker(&waker);

            match task.as_mut().poll(&mut cx) {
                Poll::Ready(()) => {
                    trace!(target: "diskfs", "task {} completed", id.0);
                    delivered += 1;
                }
                Poll::Pending => {
                    self.inner.tasks.borrow_mut().insert(id, task);
                }
            }
        }

        delivered
    }

    /// Operations spawned but not yet completed
    pub fn pending(&self) -> usize {
        self.inner.tasks.borrow().len()
    }

    /// No task is waiting to be polled
    pub fn is_stalled(&self) -> bool {
        self.inner.wake_queue.lock().is_empty()
    }
}

struct SpinWaker;

impl Wake for SpinWaker {
    fn wake(self: Arc<Self>) {}
}

/// Drive one future to completion by polling it in a spin loop.
///
/// Only suitable when the future's device completes without outside help
/// (in-memory and synchronous adapters, tests).
pub fn block_on<F: Future>(future: F) -> F::Output {
    let mut future = pin!(future);
    let waker = Waker::from(Arc::new(SpinWaker));
    let mut cx = Context::from_waker(&waker);

    loop {
        if let Poll::Ready(output) = future.as_mut().poll(&mut cx) {
            return output;
        }
        core::hint::spin_loop();
    }
}
