use futures::{future::{BoxFuture, FutureExt}, task::{waker_ref, ArcWake, Context, Poll}};
use futures_channel::oneshot;
use queues::{IsQueue, Queue};
use std::{cell::RefCell, future::Future, pin::Pin, sync::{Arc, Mutex, Weak}};

use crate::{TbError, TbResult};

thread_local! {
    static READY_QUEUE: RefCell<Queue<Arc<Task>>> = RefCell::new(Queue::new());
    // Every task forked during the current test, so teardown can cancel the ones still parked.
    static LIVE_TASKS: RefCell<Vec<Weak<Task>>> = RefCell::new(Vec::new());
}

pub(crate) fn schedule_task(task: Arc<Task>) {
    READY_QUEUE.with(|q| {
        // Queue::add only fails on a capacity limit, which an unbounded Queue doesn't have.
        let _ = q.borrow_mut().add(task);
    });
}

fn next_task() -> Option<Arc<Task>> {
    READY_QUEUE.with(|q| q.borrow_mut().remove().ok())
}

/// Polls ready tasks until none are left.
#[inline]
pub fn run_once() {
    while let Some(task) = next_task() {
        process_task(task);
    }
}

pub(crate) fn clear_ready_queue() {
    READY_QUEUE.with(|q| q.replace(Queue::new()));
}

/// Cancels every task that hasn't completed yet (clock, monitor, ...).
pub(crate) fn cancel_all() {
    let tasks = LIVE_TASKS.with(|t| std::mem::take(&mut *t.borrow_mut()));
    for task in tasks.iter().filter_map(Weak::upgrade) {
        task.cancel();
    }
}

#[inline]
fn process_task(task: Arc<Task>) {
    if *task.state.lock().unwrap() != TaskState::Pending {
        // cancelled tasks are dropped once all references disappear; done tasks can be woken late
        return;
    }

    let mut fut_slot = task.future.lock().unwrap();
    if let Some(mut fut) = fut_slot.take() {
        let waker = waker_ref(&task);
        let context = &mut Context::from_waker(&waker);
        let result = match fut.as_mut().poll(context) {
            Poll::Pending => {
                *fut_slot = Some(fut);
                None
            }
            Poll::Ready(result) => Some(result),
        };
        if let Some(result) = result {
            log::trace!("task '{}' complete", task.name);
            *task.state.lock().unwrap() = TaskState::Done;
            if let Some(tx) = task.join_tx.lock().unwrap().take() {
                // the JoinHandle may already be dropped, which is fine for forked tasks
                let _ = tx.send(result);
            }
        }
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
enum TaskState {
    Pending,
    Done,
    Cancelled,
}

pub struct Task {
    future: Mutex<Option<BoxFuture<'static, TbResult>>>,
    state: Mutex<TaskState>,
    name: String,
    join_tx: Mutex<Option<oneshot::Sender<TbResult>>>,
}

impl Task {
    /// Runs `future` concurrently with the caller; it is first polled once the caller yields.
    pub fn fork(future: impl Future<Output = TbResult> + Send + 'static) -> JoinHandle {
        Task::spawn(future, "forked")
    }

    pub fn spawn(future: impl Future<Output = TbResult> + Send + 'static, name: &str) -> JoinHandle {
        let (task, join_handle) = Task::new(future.boxed(), name);
        LIVE_TASKS.with(|t| {
            let mut tasks = t.borrow_mut();
            tasks.retain(|w| w.strong_count() > 0);
            tasks.push(Arc::downgrade(&task));
        });
        schedule_task(task);
        join_handle
    }

    fn new(fut: BoxFuture<'static, TbResult>, name: &str) -> (Arc<Self>, JoinHandle) {
        let (tx, rx) = oneshot::channel::<TbResult>();
        let task = Arc::new(Self {
            future: Mutex::new(Some(fut)),
            state: Mutex::new(TaskState::Pending),
            name: name.to_string(),
            join_tx: Mutex::new(Some(tx)),
        });
        let join_handle = JoinHandle {
            join_rx: rx,
            awaited_task: Some(task.clone()),
        };
        (task, join_handle)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cancel(&self) {
        // set state to Cancelled, the executor drops the task without polling it again
        let mut state = self.state.lock().unwrap();
        if *state == TaskState::Pending {
            *state = TaskState::Cancelled;
        }
        // dropping the sender lets a waiting JoinHandle resolve to TaskCancelled
        self.join_tx.lock().unwrap().take();
        // a task cancelling itself is mid-poll and holds its own future slot
        if let Ok(mut fut) = self.future.try_lock() {
            fut.take();
        }
    }
}

impl ArcWake for Task {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        schedule_task(arc_self.clone());
    }
}

pub struct JoinHandle {
    awaited_task: Option<Arc<Task>>,
    join_rx: oneshot::Receiver<TbResult>,
}

impl JoinHandle {
    pub fn cancel(mut self) {
        if let Some(task) = self.awaited_task.take() {
            task.cancel();
        }
    }

    /// Takes the task's result without waiting, if it has finished.
    pub fn try_result(&mut self) -> Option<TbResult> {
        match self.join_rx.try_recv() {
            Ok(result) => result,
            Err(_) => Some(Err(TbError::TaskCancelled)),
        }
    }
}

impl Future for JoinHandle {
    type Output = TbResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.join_rx.poll_unpin(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(TbError::TaskCancelled)),
            Poll::Pending => Poll::Pending,
        }
    }
}
