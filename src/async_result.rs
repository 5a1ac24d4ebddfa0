//! Single-assignment results for operations that may complete later.
//!
//! Software implementations usually settle an [`AsyncResult`] before returning it,
//! hardware backed ones settle it on a later turn. Callers chain work with
//! [`AsyncResult::add_callback`] and never assume either timing. The only
//! synchronous escape hatch is [`AsyncResult::value`], which fails with
//! [`Error::Pending`] if the result has not been settled yet.
//!
//! Everything here is single threaded: handles are `Rc` based and neither `Send` nor `Sync`.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use log::trace;

use crate::errors::{Error, Result};

type Listener<T> = Box<dyn FnOnce(Result<T>)>;

enum State<T> {
    Pending,
    Fulfilled(T),
    Rejected(Error),
}

struct Inner<T> {
    state: State<T>,
    listeners: Vec<Listener<T>>,
    wakers: Vec<Waker>,
}

/// A single-assignment future.
///
/// The result starts pending and is settled exactly once, by [`fulfil`](Self::fulfil)
/// or [`reject`](Self::reject). Later settlement attempts are ignored. Listeners
/// registered while pending run in registration order once the result settles.
///
/// Cloning the handle shares the underlying state.
pub struct AsyncResult<T> {
    inner: Rc<RefCell<Inner<T>>>,
}

impl<T> Clone for AsyncResult<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for AsyncResult<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        let state = match &inner.state {
            State::Pending => "pending",
            State::Fulfilled(_) => "fulfilled",
            State::Rejected(_) => "rejected",
        };
        f.debug_struct("AsyncResult")
            .field("state", &state)
            .field("listeners", &inner.listeners.len())
            .finish()
    }
}

impl<T: Clone + 'static> Default for AsyncResult<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> AsyncResult<T> {
    /// Creates a new, pending result.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                state: State::Pending,
                listeners: Vec::new(),
                wakers: Vec::new(),
            })),
        }
    }

    /// Creates a result that is already fulfilled with `value`.
    pub fn ok(value: T) -> Self {
        let res = Self::new();
        res.fulfil(value);
        res
    }

    /// Creates a result that is already rejected with `err`.
    pub fn err(err: Error) -> Self {
        let res = Self::new();
        res.reject(err);
        res
    }

    /// Creates a settled result from a synchronous outcome.
    pub fn from_result(outcome: Result<T>) -> Self {
        let res = Self::new();
        res.settle(outcome);
        res
    }

    /// Fulfils the result. Returns `false` if it was already settled, in which case nothing changes.
    pub fn fulfil(&self, value: T) -> bool {
        self.settle(Ok(value))
    }

    /// Rejects the result. Returns `false` if it was already settled, in which case nothing changes.
    pub fn reject(&self, err: Error) -> bool {
        self.settle(Err(err))
    }

    fn settle(&self, outcome: Result<T>) -> bool {
        let (listeners, wakers) = {
            let mut inner = self.inner.borrow_mut();
            if !matches!(inner.state, State::Pending) {
                trace!("ignoring settlement of an already settled result");
                return false;
            }
            inner.state = match &outcome {
                Ok(value) => State::Fulfilled(value.clone()),
                Err(err) => State::Rejected(err.clone()),
            };
            (
                std::mem::take(&mut inner.listeners),
                std::mem::take(&mut inner.wakers),
            )
        };

        for listener in listeners {
            listener(outcome.clone());
        }
        for waker in wakers {
            waker.wake();
        }

        true
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.inner.borrow().state, State::Pending)
    }

    pub fn is_settled(&self) -> bool {
        !self.is_pending()
    }

    /// Returns the outcome if the result is settled, `None` while pending.
    pub fn try_value(&self) -> Option<Result<T>> {
        match &self.inner.borrow().state {
            State::Pending => None,
            State::Fulfilled(value) => Some(Ok(value.clone())),
            State::Rejected(err) => Some(Err(err.clone())),
        }
    }

    /// Synchronous access to a settled result.
    ///
    /// Only valid where the whole chain is known to settle in-process, e.g. with
    /// the built in software algorithms. Fails with [`Error::Pending`] otherwise.
    pub fn value(&self) -> Result<T> {
        self.try_value().unwrap_or(Err(Error::Pending))
    }

    /// Runs `f` with the outcome, immediately if already settled.
    pub fn on_settled<F>(&self, f: F)
    where
        F: FnOnce(Result<T>) + 'static,
    {
        match self.try_value() {
            Some(outcome) => f(outcome),
            None => self.inner.borrow_mut().listeners.push(Box::new(f)),
        }
    }

    /// Chains `f` onto a successful outcome.
    ///
    /// The returned result is fulfilled with the value `f` returns, or rejected with
    /// the error `f` returns. A rejection of `self` is passed through unchanged and
    /// `f` is not called.
    pub fn add_callback<U, F>(&self, f: F) -> AsyncResult<U>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Result<U> + 'static,
    {
        let chained = AsyncResult::new();
        let target = chained.clone();
        self.on_settled(move |outcome| {
            target.settle(outcome.and_then(f));
        });
        chained
    }

    /// Chains an operation that itself returns an [`AsyncResult`], flattening one level.
    ///
    /// The returned result settles with whatever the inner result settles with.
    pub fn add_async_callback<U, F>(&self, f: F) -> AsyncResult<U>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> AsyncResult<U> + 'static,
    {
        let chained = AsyncResult::new();
        let target = chained.clone();
        self.on_settled(move |outcome| match outcome {
            Ok(value) => f(value).on_settled(move |inner| {
                target.settle(inner);
            }),
            Err(err) => {
                target.reject(err);
            }
        });
        chained
    }

    /// Chains `f` onto a rejection. Successful values are passed through unchanged.
    pub fn add_errback<F>(&self, f: F) -> AsyncResult<T>
    where
        F: FnOnce(Error) -> Result<T> + 'static,
    {
        let chained = AsyncResult::new();
        let target = chained.clone();
        self.on_settled(move |outcome| {
            target.settle(outcome.or_else(f));
        });
        chained
    }

    /// Chains `f` onto either outcome.
    pub fn add_both<U, F>(&self, f: F) -> AsyncResult<U>
    where
        U: Clone + 'static,
        F: FnOnce(Result<T>) -> Result<U> + 'static,
    {
        let chained = AsyncResult::new();
        let target = chained.clone();
        self.on_settled(move |outcome| {
            target.settle(f(outcome));
        });
        chained
    }
}

impl<T: Clone + 'static> From<Result<T>> for AsyncResult<T> {
    fn from(outcome: Result<T>) -> Self {
        Self::from_result(outcome)
    }
}

impl<T: Clone + 'static> Future for AsyncResult<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.try_value() {
            Some(outcome) => Poll::Ready(outcome),
            None => {
                self.inner.borrow_mut().wakers.push(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}
