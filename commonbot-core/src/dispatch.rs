// ABOUTME: Listener/matcher chains for messages and the single active route for events
// ABOUTME: Handlers run sequentially; one failing or panicking handler never stops the rest

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, RwLock};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::context::ChatContextData;
use crate::error::DispatchError;

/// Boxed future returned by handlers.
pub type HandlerFuture = BoxFuture<'static, anyhow::Result<()>>;

/// Type-erased handler invoked with the shared context.
pub type HandlerFn = Arc<dyn Fn(Arc<ChatContextData>) -> HandlerFuture + Send + Sync>;

/// Type-erased matcher predicate.
pub type PredicateFn = Arc<dyn Fn(&ChatContextData) -> bool + Send + Sync>;

fn into_handler<F, Fut>(f: F) -> HandlerFn
where
    F: Fn(Arc<ChatContextData>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |ctx| -> HandlerFuture { Box::pin(f(ctx)) })
}

// =============================================================================
// Listeners and matchers
// =============================================================================

/// A predicate plus the handlers that run, in order, when it matches.
#[derive(Clone)]
pub struct Matcher {
    predicate: PredicateFn,
    handlers: Vec<HandlerFn>,
}

impl Matcher {
    pub fn new<P>(predicate: P) -> Self
    where
        P: Fn(&ChatContextData) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
            handlers: Vec::new(),
        }
    }

    /// Matches messages whose text contains `needle`.
    pub fn text_contains(needle: impl Into<String>) -> Self {
        let needle = needle.into();
        Self::new(move |ctx| ctx.message_text().is_some_and(|t| t.contains(&needle)))
    }

    /// Matches messages that address the bot, i.e. contain `@<bot name>`.
    pub fn addressed_to_bot() -> Self {
        Self::new(|ctx| {
            ctx.message_text()
                .is_some_and(|t| ctx.bot().is_mentioned_in(t))
        })
    }

    pub fn handler<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Arc<ChatContextData>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.handlers.push(into_handler(f));
        self
    }

    pub fn matches(&self, ctx: &ChatContextData) -> bool {
        (self.predicate)(ctx)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// An ordered group of matchers registered by one piece of business logic.
#[derive(Clone)]
pub struct Listener {
    name: String,
    matchers: Vec<Matcher>,
}

impl Listener {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            matchers: Vec::new(),
        }
    }

    pub fn matcher(mut self, matcher: Matcher) -> Self {
        self.matchers.push(matcher);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matchers(&self) -> &[Matcher] {
        &self.matchers
    }
}

/// Counters from one message dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub matched: usize,
    pub invoked: usize,
    pub failed: usize,
}

/// Run `ctx` through every listener.
///
/// Order is listener registration order, then matcher order, then handler
/// order within a matcher. Each handler is awaited before the next starts.
pub async fn dispatch_message(ctx: Arc<ChatContextData>, listeners: &[Listener]) -> DispatchReport {
    let mut report = DispatchReport::default();

    for listener in listeners {
        for (index, matcher) in listener.matchers.iter().enumerate() {
            if !matcher.matches(&ctx) {
                continue;
            }
            report.matched += 1;
            tracing::trace!(listener = %listener.name, matcher = index, "Matcher matched");

            for handler in &matcher.handlers {
                report.invoked += 1;
                let handler = Arc::clone(handler);
                let ctx = Arc::clone(&ctx);
                let outcome = AssertUnwindSafe(async move { handler(ctx).await })
                    .catch_unwind()
                    .await;

                match outcome {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        report.failed += 1;
                        tracing::error!(
                            listener = %listener.name,
                            matcher = index,
                            error = %e,
                            "Listener handler failed"
                        );
                    }
                    Err(_) => {
                        report.failed += 1;
                        tracing::error!(
                            listener = %listener.name,
                            matcher = index,
                            "Listener handler panicked"
                        );
                    }
                }
            }
        }
    }

    report
}

// =============================================================================
// Active route
// =============================================================================

/// A named handler for interactive events and view submissions.
pub struct Route {
    name: String,
    handler: HandlerFn,
}

impl Route {
    pub fn new<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Arc<ChatContextData>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            handler: into_handler(f),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Holds the single currently active route.
#[derive(Default)]
pub struct Router {
    active: RwLock<Option<Arc<Route>>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `route` the active one, returning the route it replaced.
    pub fn set_active(&self, route: Route) -> Option<Arc<Route>> {
        let mut active = self
            .active
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        tracing::debug!(route = %route.name, "Active route changed");
        active.replace(Arc::new(route))
    }

    pub fn clear(&self) -> Option<Arc<Route>> {
        self.active
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }

    pub fn active(&self) -> Option<Arc<Route>> {
        self.active
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

/// Invoke the active route's handler with `ctx`. Returns the route's name.
pub async fn dispatch_action(
    ctx: Arc<ChatContextData>,
    router: &Router,
) -> Result<String, DispatchError> {
    let route = router.active().ok_or(DispatchError::NoActiveRoute)?;
    let handler = Arc::clone(&route.handler);

    let outcome = AssertUnwindSafe(async move { handler(ctx).await })
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(())) => Ok(route.name.clone()),
        Ok(Err(e)) => Err(DispatchError::Handler {
            route: route.name.clone(),
            source: e.into(),
        }),
        Err(_) => Err(DispatchError::Panicked {
            route: route.name.clone(),
        }),
    }
}
