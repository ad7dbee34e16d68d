//! Onion-style middleware execution.
//!
//! Middlewares run outer-to-inner until the chain ends (or one declines to
//! continue), then unwind inner-to-outer. The context travels by value: a
//! middleware owns it before `next`, hands it to the continuation, and gets
//! it back once everything downstream has completed. An `Err` unwinds the
//! chain immediately; the context travels only on the `Ok` path.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::error::Result;

/// A middleware: acts on the context before and/or after delegating to the
/// remainder of the chain via [`Next::run`], or short-circuits by returning
/// without running the continuation.
///
/// Closures of the shape `|ctx, next| async move { .. }` implement this
/// trait directly.
pub trait Middleware<C>: Send + Sync {
    fn handle(&self, ctx: C, next: Next<C>) -> BoxFuture<'static, Result<C>>;
}

impl<C, F, Fut> Middleware<C> for F
where
    C: Send + 'static,
    F: Fn(C, Next<C>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<C>> + Send + 'static,
{
    fn handle(&self, ctx: C, next: Next<C>) -> BoxFuture<'static, Result<C>> {
        Box::pin(self(ctx, next))
    }
}

/// The continuation handed to a middleware. `run` consumes it, so resuming
/// the chain twice is a compile error rather than undefined behavior.
pub struct Next<C> {
    chain: Arc<[Arc<dyn Middleware<C>>]>,
    depth: usize,
}

impl<C: Send + 'static> Next<C> {
    /// Resume the remainder of the chain. Resolves once every downstream
    /// middleware (and the transport dispatch, if reached) has completed.
    /// Past the end of the chain this resolves immediately.
    pub fn run(self, ctx: C) -> BoxFuture<'static, Result<C>> {
        match self.chain.get(self.depth).cloned() {
            Some(ware) => {
                let next = Next {
                    chain: self.chain,
                    depth: self.depth + 1,
                };
                ware.handle(ctx, next)
            }
            None => Box::pin(async move { Ok(ctx) }),
        }
    }
}

/// An ordered middleware list with two segments: user middlewares and a
/// framework-owned tail. The segments are concatenated at execution time, so
/// the tail always stays innermost no matter when users append.
pub struct Stack<C> {
    user: Vec<Arc<dyn Middleware<C>>>,
    tail: Vec<Arc<dyn Middleware<C>>>,
}

impl<C> Default for Stack<C> {
    fn default() -> Self {
        Self {
            user: Vec::new(),
            tail: Vec::new(),
        }
    }
}

impl<C> Clone for Stack<C> {
    fn clone(&self) -> Self {
        Self {
            user: self.user.clone(),
            tail: self.tail.clone(),
        }
    }
}

impl<C: Send + 'static> Stack<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a middleware to the user segment. Duplicates are allowed.
    pub fn use_ware(&mut self, ware: impl Middleware<C> + 'static) -> &mut Self {
        self.user.push(Arc::new(ware));
        self
    }

    /// Append a framework middleware. Tail middlewares always execute after
    /// every user middleware, in the order they were pushed.
    pub(crate) fn push_tail(&mut self, ware: impl Middleware<C> + 'static) -> &mut Self {
        self.tail.push(Arc::new(ware));
        self
    }

    /// Number of installed middlewares across both segments.
    pub fn len(&self) -> usize {
        self.user.len() + self.tail.len()
    }

    pub fn is_empty(&self) -> bool {
        self.user.is_empty() && self.tail.is_empty()
    }

    /// Execute the full chain against a context. An empty stack resolves
    /// with the context untouched.
    pub async fn execute(&self, ctx: C) -> Result<C> {
        let chain: Arc<[Arc<dyn Middleware<C>>]> = self
            .user
            .iter()
            .chain(self.tail.iter())
            .cloned()
            .collect::<Vec<_>>()
            .into();
        Next { chain, depth: 0 }.run(ctx).await
    }

    /// Attach a sub-stack behind a predicate. When the predicate holds, the
    /// sub-stack executes to completion in place of the continuation;
    /// otherwise the chain falls through. Exactly one of the two paths runs
    /// per request.
    pub fn mount<P>(&mut self, predicate: P, sub: Stack<C>) -> &mut Self
    where
        P: Fn(&C) -> bool + Send + Sync + 'static,
    {
        let sub = Arc::new(sub);
        self.use_ware(move |ctx: C, next: Next<C>| {
            let sub = sub.clone();
            let branch = predicate(&ctx);
            async move {
                if branch {
                    sub.execute(ctx).await
                } else {
                    next.run(ctx).await
                }
            }
        })
    }
}
