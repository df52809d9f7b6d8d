//! Driver providers for test runners.
//!
//! A runner asks its [`DriverProvider`] for a driver when a scenario first
//! touches the browser, hands it back when the scenario ends, and shuts the
//! provider down with the suite.
//!
//! | Provider | Strategy |
//! |----------|----------|
//! | [`PooledDriverProvider`] | Up to `size` drivers, reset and reused |
//!
//! # Example
//!
//! ```no_run
//! use cdp_driver::{DriverOptions, DriverProvider, PooledDriverProvider};
//!
//! # async fn example() -> cdp_driver::Result<()> {
//! let provider = PooledDriverProvider::new(4)?;
//! let options = DriverOptions::headless();
//!
//! let driver = provider.acquire(&options).await?;
//! driver.goto("https://example.com").await?;
//! provider.release(driver).await;
//!
//! provider.shutdown().await;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::identifiers::DriverId;

use super::builder::DriverBuilder;
use super::core::Driver;
use super::options::DriverOptions;

// ============================================================================
// Constants
// ============================================================================

/// How long `acquire` waits for a driver when the pool is exhausted.
pub const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// DriverProvider
// ============================================================================

/// Lends drivers to scenarios.
#[async_trait]
pub trait DriverProvider: Send + Sync {
    /// A driver for a scenario.
    async fn acquire(&self, options: &DriverOptions) -> Result<Driver>;

    /// Takes a driver back after its scenario ended.
    async fn release(&self, driver: Driver);

    /// Closes every driver this provider created.
    async fn shutdown(&self);
}

/// Creates drivers for a pool.
pub type DriverFactory = Arc<dyn Fn(DriverOptions) -> BoxFuture<'static, Result<Driver>> + Send + Sync>;

// ============================================================================
// PooledDriverProvider
// ============================================================================

/// A bounded pool of drivers, sized to the runner's parallelism.
///
/// Drivers are created lazily up to `size`. A returned driver is reset to
/// `about:blank` with cookies cleared before it is lent again; terminated
/// drivers are discarded and replaced.
pub struct PooledDriverProvider {
    size: usize,
    factory: DriverFactory,
    available: Mutex<Vec<Driver>>,
    assigned: Mutex<FxHashMap<DriverId, Driver>>,
    created: AtomicUsize,
    returned: Notify,
    shutdown: AtomicBool,
    acquire_timeout: Duration,
}

// ============================================================================
// PooledDriverProvider - Constructor
// ============================================================================

impl PooledDriverProvider {
    /// Creates a pool of at most `size` drivers that launch or connect per
    /// the options passed to `acquire`.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if `size` is zero.
    pub fn new(size: usize) -> Result<Self> {
        Self::with_factory(size, Arc::new(|options: DriverOptions| {
            Box::pin(DriverBuilder::from_options(options).build()) as BoxFuture<'static, Result<Driver>>
        }))
    }

    /// Creates a pool that builds drivers with `factory`, e.g. to connect to
    /// a browser running in a container.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if `size` is zero.
    pub fn with_factory(size: usize, factory: DriverFactory) -> Result<Self> {
        if size == 0 {
            return Err(Error::config("pool size must be at least 1"));
        }
        Ok(Self {
            size,
            factory,
            available: Mutex::new(Vec::with_capacity(size)),
            assigned: Mutex::new(FxHashMap::default()),
            created: AtomicUsize::new(0),
            returned: Notify::new(),
            shutdown: AtomicBool::new(false),
            acquire_timeout: ACQUIRE_TIMEOUT,
        })
    }

    /// Overrides how long `acquire` waits on an exhausted pool.
    #[must_use]
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Maximum number of drivers.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Current pool counters.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            size: self.size,
            created: self.created.load(Ordering::Acquire),
            available: self.available.lock().len(),
            assigned: self.assigned.lock().len(),
        }
    }
}

// ============================================================================
// PooledDriverProvider - Internals
// ============================================================================

impl PooledDriverProvider {
    /// Claims a creation slot if the pool is below `size`.
    fn reserve(&self) -> bool {
        self.created
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < self.size).then_some(n + 1))
            .is_ok()
    }

    fn discard(&self) {
        self.created.fetch_sub(1, Ordering::AcqRel);
    }

    fn assign(&self, driver: &Driver) {
        self.assigned.lock().insert(driver.id(), driver.clone());
    }

    async fn reset(driver: &Driver) {
        driver.clear_observers();
        if let Err(e) = driver.goto("about:blank").await {
            warn!(driver_id = %driver.id(), error = %e, "Error resetting driver page");
        }
        if let Err(e) = driver.clear_cookies().await {
            warn!(driver_id = %driver.id(), error = %e, "Error clearing driver cookies");
        }
    }

    async fn close(driver: &Driver) {
        if let Err(e) = driver.quit().await {
            debug!(driver_id = %driver.id(), error = %e, "Error closing driver");
        }
    }
}

// ============================================================================
// PooledDriverProvider - DriverProvider
// ============================================================================

#[async_trait]
impl DriverProvider for PooledDriverProvider {
    async fn acquire(&self, options: &DriverOptions) -> Result<Driver> {
        let started = Instant::now();

        loop {
            if self.shutdown.load(Ordering::Acquire) {
                return Err(Error::config("driver provider has been shut down"));
            }

            let pooled = self.available.lock().pop();
            if let Some(driver) = pooled {
                if driver.is_terminated() {
                    debug!("Discarding terminated driver from pool");
                    self.discard();
                    continue;
                }
                Self::reset(&driver).await;
                self.assign(&driver);
                debug!(driver_id = %driver.id(), "Reusing pooled driver");
                return Ok(driver);
            }

            if self.reserve() {
                let driver = match (self.factory)(options.clone()).await {
                    Ok(driver) => driver,
                    Err(e) => {
                        self.discard();
                        return Err(e);
                    }
                };
                self.assign(&driver);
                info!(driver_id = %driver.id(), stats = %self.stats(), "Created pooled driver");
                return Ok(driver);
            }

            let remaining = self.acquire_timeout.saturating_sub(started.elapsed());
            warn!(stats = %self.stats(), "Pool exhausted, waiting for a driver");
            if remaining.is_zero()
                || tokio::time::timeout(remaining, self.returned.notified())
                    .await
                    .is_err()
            {
                return Err(Error::timeout(
                    "acquire pooled driver",
                    self.acquire_timeout.as_millis() as u64,
                    started.elapsed().as_millis() as u64,
                ));
            }
        }
    }

    async fn release(&self, driver: Driver) {
        self.assigned.lock().remove(&driver.id());

        if self.shutdown.load(Ordering::Acquire) {
            Self::close(&driver).await;
            return;
        }
        if driver.is_terminated() {
            debug!(driver_id = %driver.id(), "Not returning terminated driver to pool");
            self.discard();
            self.returned.notify_one();
            return;
        }

        self.available.lock().push(driver);
        self.returned.notify_one();
    }

    async fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }
        info!(stats = %self.stats(), "Shutting down driver pool");

        let assigned: Vec<Driver> = self.assigned.lock().drain().map(|(_, d)| d).collect();
        let available: Vec<Driver> = std::mem::take(&mut *self.available.lock());
        for driver in assigned.iter().chain(&available) {
            Self::close(driver).await;
        }
        self.created.store(0, Ordering::Release);
        self.returned.notify_waiters();
    }
}

impl fmt::Debug for PooledDriverProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledDriverProvider")
            .field("stats", &self.stats())
            .field("shutdown", &self.shutdown.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

// ============================================================================
// PoolStats
// ============================================================================

/// Pool counters, for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Maximum number of drivers.
    pub size: usize,
    /// Drivers alive.
    pub created: usize,
    /// Idle drivers.
    pub available: usize,
    /// Drivers lent out.
    pub assigned: usize,
}

impl fmt::Display for PoolStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "size={}, created={}, available={}, assigned={}",
            self.size, self.created, self.available, self.assigned
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
