//! Cookie methods.

use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::protocol::{Command, Cookie, NetworkCommand, get_path};

use super::Driver;

// ============================================================================
// Driver - Cookies
// ============================================================================

impl Driver {
    /// A cookie visible to the current page, by name.
    pub async fn cookie(&self, name: &str) -> Result<Option<Cookie>> {
        Ok(self.cookies().await?.into_iter().find(|c| c.name == name))
    }

    /// Cookies visible to the current page.
    pub async fn cookies(&self) -> Result<Vec<Cookie>> {
        let reply = self
            .execute(Command::Network(NetworkCommand::GetCookies))
            .await?;
        let cookies = parse_cookies(&reply);
        debug!(count = cookies.len(), "Got cookies");
        Ok(cookies)
    }

    /// Sets a cookie; without a domain or URL it is bound to the current
    /// page URL.
    ///
    /// ```ignore
    /// driver.set_cookie(Cookie::new("session", "abc123")).await?;
    /// ```
    pub async fn set_cookie(&self, mut cookie: Cookie) -> Result<()> {
        if cookie.domain.is_none() && cookie.url.is_none() {
            cookie.url = Some(self.url().await?);
        }
        debug!(name = %cookie.name, "Setting cookie");
        self.execute(Command::Network(NetworkCommand::SetCookie(cookie)))
            .await?;
        Ok(())
    }

    /// Deletes a cookie by name. Missing cookies are ignored.
    pub async fn delete_cookie(&self, name: &str) -> Result<()> {
        let Some(existing) = self.cookie(name).await? else {
            debug!(name, "No cookie to delete");
            return Ok(());
        };
        self.execute(Command::Network(NetworkCommand::DeleteCookies {
            name: existing.name,
            domain: existing.domain,
            path: existing.path,
        }))
        .await?;
        debug!(name, "Deleted cookie");
        Ok(())
    }

    /// Removes every browser cookie.
    pub async fn clear_cookies(&self) -> Result<()> {
        self.execute(Command::Network(NetworkCommand::ClearBrowserCookies))
            .await?;
        debug!("Cleared cookies");
        Ok(())
    }
}

/// Cookies from a `Network.getCookies` reply; malformed entries are skipped.
fn parse_cookies(reply: &Value) -> Vec<Cookie> {
    get_path(reply, "cookies")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|v| serde_json::from_value::<Cookie>(v.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

// ============================================================================
// Tests
// ============================================================================
