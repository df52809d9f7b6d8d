//! Request interception.

use std::sync::Arc;

use tracing::debug;

use crate::browser::{InterceptRequest, InterceptResponse};
use crate::error::Result;
use crate::protocol::{Command, FetchCommand};

use super::Driver;

// ============================================================================
// Driver - Interception
// ============================================================================

impl Driver {
    /// Intercepts requests whose URL matches any of `patterns`.
    ///
    /// Rules are tried in the order they were added; the first matching
    /// rule's handler decides. Returning `None` lets the request through.
    ///
    /// ```ignore
    /// driver
    ///     .intercept(&["*/api/users*"], |req| {
    ///         req.url_contains("/42").then(InterceptResponse::not_found)
    ///     })
    ///     .await?;
    /// ```
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`](crate::Error::InvalidArgument) for an
    /// empty pattern list, or transport errors from `Fetch.enable`.
    pub async fn intercept<F>(&self, patterns: &[&str], handler: F) -> Result<()>
    where
        F: Fn(&InterceptRequest) -> Option<InterceptResponse> + Send + Sync + 'static,
    {
        let union = self.inner.interceptor.add(patterns, Arc::new(handler))?;
        debug!(patterns = union.len(), rules = self.inner.interceptor.len(), "Enabling interception");
        self.execute(Command::Fetch(FetchCommand::Enable { patterns: union }))
            .await?;
        Ok(())
    }

    /// Drops every interception rule and disables `Fetch`.
    pub async fn stop_intercept(&self) -> Result<()> {
        self.inner.interceptor.clear();
        self.execute(Command::Fetch(FetchCommand::Disable)).await?;
        debug!("Interception stopped");
        Ok(())
    }
}
