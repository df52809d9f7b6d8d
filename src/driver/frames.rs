//! Frame switching and page targets.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::identifiers::{FrameId, SessionId, TargetId};
use crate::locator::{DOCUMENT, Locator, js};
use crate::protocol::{Command, TargetCommand, get_path, get_path_str};

use super::Driver;

// ============================================================================
// FrameSelector
// ============================================================================

/// Which frame [`Driver::switch_frame`] should target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameSelector {
    /// Back to the top-level document.
    Main,
    /// The Nth `<iframe>`/`<frame>` of the current document, 0-based.
    Index(usize),
    /// A frame element matched by a locator.
    Locator(String),
}

impl From<usize> for FrameSelector {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<&str> for FrameSelector {
    fn from(locator: &str) -> Self {
        Self::Locator(locator.to_string())
    }
}

impl From<String> for FrameSelector {
    fn from(locator: String) -> Self {
        Self::Locator(locator)
    }
}

impl<T: Into<FrameSelector>> From<Option<T>> for FrameSelector {
    fn from(selector: Option<T>) -> Self {
        selector.map_or(Self::Main, Into::into)
    }
}

// ============================================================================
// PageInfo
// ============================================================================

/// A page target of the browser.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Target id.
    pub target_id: TargetId,
    /// Target type; always `page` in [`Driver::pages`].
    #[serde(rename = "type")]
    pub target_type: String,
    /// Page title.
    #[serde(default)]
    pub title: String,
    /// Page URL.
    #[serde(default)]
    pub url: String,
}

// ============================================================================
// Driver - Frames
// ============================================================================

impl Driver {
    /// Switches script evaluation to another frame.
    ///
    /// ```ignore
    /// driver.switch_frame(0).await?;               // first iframe
    /// driver.switch_frame("#payment").await?;      // by locator
    /// driver.switch_frame(FrameSelector::Main).await?;
    /// ```
    ///
    /// # Errors
    ///
    /// [`Error::FrameNotFound`] if the index is out of range after the
    /// existence retries, nothing matches the locator, or the match is not
    /// a frame element.
    pub async fn switch_frame(&self, selector: impl Into<FrameSelector>) -> Result<()> {
        let frame_id = match selector.into() {
            FrameSelector::Main => {
                self.inner.frames.lock().set_current(None);
                debug!("Switched to main frame");
                return Ok(());
            }
            FrameSelector::Index(index) => self.frame_by_index(index).await?,
            FrameSelector::Locator(locator) => self.frame_by_locator(&locator).await?,
        };

        if self.inner.frames.lock().context_for(&frame_id).is_none() {
            self.create_isolated_world(frame_id.clone()).await?;
        }
        self.inner.frames.lock().set_current(Some(frame_id.clone()));
        debug!(%frame_id, "Switched frame");
        Ok(())
    }

    async fn frame_by_index(&self, index: usize) -> Result<FrameId> {
        let expression = js::frame_at(index);
        self.retry_policy()
            .run("switch frame", || async {
                let object_id = self
                    .evaluate_object(&expression)
                    .await?
                    .ok_or_else(|| Error::frame_not_found(format!("no frame at index {index}")))?;
                self.content_frame_id(object_id).await?.ok_or_else(|| {
                    Error::frame_not_found(format!("frame {index} has no document yet"))
                })
            })
            .await
    }

    async fn frame_by_locator(&self, locator: &str) -> Result<FrameId> {
        let sel = match self.wait_for_locator(locator).await {
            Ok(sel) => sel,
            Err(e) if e.is_element_error() => {
                return Err(Error::frame_not_found(format!("frame not found: {locator}")));
            }
            Err(e) => return Err(e),
        };

        let tag = self
            .script(&js::script_on(&sel, "_.tagName"))
            .await?;
        if !matches!(tag.as_str(), Some("IFRAME" | "FRAME")) {
            return Err(Error::frame_not_found(format!("not a frame element: {locator}")));
        }

        let object_id = self
            .evaluate_object(&sel)
            .await?
            .ok_or_else(|| Error::frame_not_found(format!("frame not found: {locator}")))?;
        self.content_frame_id(object_id)
            .await?
            .ok_or_else(|| Error::frame_not_found(format!("frame has no document: {locator}")))
    }

    /// Number of `<iframe>`/`<frame>` elements in the current document.
    pub async fn frame_count(&self) -> Result<usize> {
        let all = Locator::parse("iframe,frame")?.selector_all(DOCUMENT);
        Ok(self.script(&js::count(&all)).await?.as_u64().unwrap_or(0) as usize)
    }
}

// ============================================================================
// Driver - Pages
// ============================================================================

impl Driver {
    /// Page targets of the browser.
    pub async fn pages(&self) -> Result<Vec<PageInfo>> {
        let reply = self
            .inner
            .connection
            .execute(None, Command::Target(TargetCommand::GetTargets))
            .await?;

        let infos = get_path(&reply, "targetInfos").cloned().unwrap_or(Value::Null);
        let targets: Vec<PageInfo> = serde_json::from_value(infos).unwrap_or_default();
        Ok(targets
            .into_iter()
            .filter(|t| t.target_type == "page")
            .collect())
    }

    /// Switches to the page at `index` in [`pages`](Driver::pages).
    ///
    /// # Errors
    ///
    /// [`Error::PageNotFound`] if out of range.
    pub async fn switch_page_index(&self, index: usize) -> Result<()> {
        let page = self
            .pages()
            .await?
            .into_iter()
            .nth(index)
            .ok_or_else(|| Error::page_not_found(index.to_string()))?;
        self.activate_page(page).await
    }

    /// Switches to the first page whose title or URL contains `query`.
    ///
    /// # Errors
    ///
    /// [`Error::PageNotFound`] if nothing matches.
    pub async fn switch_page(&self, query: &str) -> Result<()> {
        let page = self
            .pages()
            .await?
            .into_iter()
            .find(|p| p.title.contains(query) || p.url.contains(query))
            .ok_or_else(|| Error::page_not_found(query))?;
        self.activate_page(page).await
    }

    async fn activate_page(&self, page: PageInfo) -> Result<()> {
        self.inner
            .connection
            .execute(
                None,
                Command::Target(TargetCommand::ActivateTarget {
                    target_id: page.target_id.clone(),
                }),
            )
            .await?;
        self.attach(page.target_id.clone()).await?;
        self.enable_domains().await?;
        info!(target_id = %page.target_id, url = %page.url, "Switched page");
        Ok(())
    }

    /// First page target, used when connected to a browser endpoint.
    pub(crate) async fn first_page_target(&self) -> Result<TargetId> {
        self.pages()
            .await?
            .into_iter()
            .find(|p| !p.url.starts_with("chrome-extension://"))
            .map(|p| p.target_id)
            .ok_or_else(|| Error::page_not_found("first page"))
    }

    /// Attaches to a target with a flattened session and makes it active.
    pub(crate) async fn attach(&self, target_id: TargetId) -> Result<SessionId> {
        let reply = self
            .inner
            .connection
            .execute(
                None,
                Command::Target(TargetCommand::AttachToTarget {
                    target_id: target_id.clone(),
                    flatten: true,
                }),
            )
            .await?;

        let session_id = get_path_str(&reply, "sessionId")
            .map(SessionId::new)
            .ok_or_else(|| Error::page_not_found(target_id.as_str()))?;

        {
            let mut page = self.inner.page.lock();
            page.target_id = Some(target_id);
            page.session_id = Some(session_id.clone());
        }
        self.inner.frames.lock().reset();
        debug!(%session_id, "Attached to target");
        Ok(session_id)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_frame_selector_conversions() {
        assert_eq!(FrameSelector::from(2usize), FrameSelector::Index(2));
        assert_eq!(FrameSelector::from("#f"), FrameSelector::Locator("#f".into()));
        assert_eq!(FrameSelector::from(None::<&str>), FrameSelector::Main);
        assert_eq!(FrameSelector::from(Some(1usize)), FrameSelector::Index(1));
    }

    #[test]
    fn test_page_info_deserialize() {
        let info: PageInfo = serde_json::from_value(json!({
            "targetId": "T1",
            "type": "page",
            "title": "Home",
            "url": "https://x.test/",
            "attached": true
        }))
        .expect("page info");
        assert_eq!(info.target_id.as_str(), "T1");
        assert_eq!(info.title, "Home");
    }
}
