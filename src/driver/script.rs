//! JavaScript evaluation scoped to the current frame.

use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::identifiers::{ContextId, FrameId};
use crate::locator::{DOCUMENT, Locator, js};
use crate::protocol::{Command, DomCommand, PageCommand, RuntimeCommand, get_path, get_path_str};

use super::Driver;

/// Name of the isolated world created for frames without a known context.
const WORLD_NAME: &str = "cdp_driver";

// ============================================================================
// Driver - Script Execution
// ============================================================================

impl Driver {
    /// Evaluates an expression in the current frame and returns its JSON
    /// value.
    ///
    /// Promises are awaited. `undefined` becomes `null`.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let title = driver.script("document.title").await?;
    /// ```
    ///
    /// # Errors
    ///
    /// - [`Error::Script`] if the expression throws
    /// - [`Error::Protocol`] if evaluation is rejected after retries
    pub async fn script(&self, expression: &str) -> Result<Value> {
        let result = self.evaluate(expression, true).await?;
        Ok(result.get("value").cloned().unwrap_or(Value::Null))
    }

    /// Applies a function, or `_` shorthand, to the element matched by
    /// `locator`.
    ///
    /// ```ignore
    /// let checked = driver.script_on("#agree", "_.checked").await?;
    /// ```
    ///
    /// # Errors
    ///
    /// [`Error::ElementNotFound`] if the element never appears.
    pub async fn script_on(&self, locator: &str, expression: &str) -> Result<Value> {
        let sel = self.wait_for_locator(locator).await?;
        self.script(&js::script_on(&sel, expression)).await
    }

    /// Applies a function, or `_` shorthand, to every element matched by
    /// `locator` and returns the results as an array.
    pub async fn script_all(&self, locator: &str, expression: &str) -> Result<Vec<Value>> {
        let all = Locator::parse(locator)?.selector_all(DOCUMENT);
        match self.script(&js::script_all(&all, expression)).await? {
            Value::Array(values) => Ok(values),
            Value::Null => Ok(Vec::new()),
            other => Ok(vec![other]),
        }
    }

    // ========================================================================
    // Internal
    // ========================================================================

    /// Evaluates and returns the CDP remote object.
    ///
    /// Transient context failures (a navigation replacing the frame's
    /// context) are retried up to `retry_count` times.
    pub(crate) async fn evaluate(&self, expression: &str, by_value: bool) -> Result<Value> {
        let attempts = self.inner.options.retry_count.max(1);
        let mut attempt = 1;

        loop {
            let context_id = self.evaluation_context().await?;
            let command = Command::Runtime(RuntimeCommand::Evaluate {
                expression: expression.to_string(),
                return_by_value: by_value,
                await_promise: Some(true),
                context_id,
            });

            let outcome = match self.execute(command).await {
                Ok(reply) => remote_result(reply),
                Err(e) => Err(e),
            };

            match outcome {
                Err(e) if e.is_transient_context_error() && attempt < attempts => {
                    debug!(attempt, error = %e, "Execution context not ready, retrying");
                    attempt += 1;
                    tokio::time::sleep(self.inner.options.retry_interval).await;
                }
                other => return other,
            }
        }
    }

    /// Evaluates to a remote object id; `None` for `null`/`undefined`.
    pub(crate) async fn evaluate_object(&self, expression: &str) -> Result<Option<String>> {
        let result = self.evaluate(expression, false).await?;
        if result.get("subtype").and_then(Value::as_str) == Some("null") {
            return Ok(None);
        }
        Ok(get_path_str(&result, "objectId").map(str::to_string))
    }

    /// Frame id of the document hosted by a frame element object.
    pub(crate) async fn content_frame_id(&self, object_id: String) -> Result<Option<FrameId>> {
        let described = self
            .execute(Command::Dom(DomCommand::DescribeNode {
                object_id: object_id.clone(),
            }))
            .await;
        self.post(Command::Runtime(RuntimeCommand::ReleaseObject { object_id }));

        Ok(get_path_str(&described?, "node.frameId").map(FrameId::new))
    }

    /// Context to evaluate in: the current frame's default context, an
    /// isolated world when a child frame has none yet, or the page default.
    async fn evaluation_context(&self) -> Result<Option<ContextId>> {
        let (current, context) = {
            let frames = self.inner.frames.lock();
            (frames.current_frame().cloned(), frames.current_context())
        };

        match (current, context) {
            (_, Some(context_id)) => Ok(Some(context_id)),
            (None, None) => Ok(None),
            (Some(frame_id), None) => self.create_isolated_world(frame_id).await.map(Some),
        }
    }

    /// Creates an isolated world in a frame and records it as the frame's
    /// context.
    pub(crate) async fn create_isolated_world(&self, frame_id: FrameId) -> Result<ContextId> {
        let reply = self
            .execute(Command::Page(PageCommand::CreateIsolatedWorld {
                frame_id: frame_id.clone(),
                world_name: Some(WORLD_NAME.to_string()),
            }))
            .await?;

        let context_id = get_path(&reply, "executionContextId")
            .and_then(Value::as_i64)
            .map(ContextId::new)
            .ok_or_else(|| Error::frame_not_found(format!("no context for frame {frame_id}")))?;

        trace!(%frame_id, %context_id, "Isolated world created");
        self.inner.frames.lock().set_context(frame_id, context_id);
        Ok(context_id)
    }
}

/// Unwraps a `Runtime.evaluate` reply, turning a thrown exception into
/// [`Error::Script`].
fn remote_result(reply: Value) -> Result<Value> {
    if let Some(details) = reply.get("exceptionDetails") {
        let message = get_path_str(details, "exception.description")
            .or_else(|| get_path_str(details, "text"))
            .unwrap_or("script error");
        return Err(Error::script(message));
    }
    Ok(reply.get("result").cloned().unwrap_or(Value::Null))
}

// ============================================================================
// Tests
// ============================================================================
