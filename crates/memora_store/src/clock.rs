// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The time source used for entry timestamps and expiration checks.
//!
//! Production caches use the system clock. Tests hold a [`ClockControl`] and
//! hand its [`Clock`] to the cache, then advance time manually to cross TTL
//! boundaries without sleeping.

use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use parking_lot::Mutex;

/// A clock that yields [`SystemTime`] values.
///
/// Cloning a clock yields a handle to the same time source: clones of a
/// controlled clock all observe the controller's advances.
///
/// # Examples
///
/// ```
/// use memora_store::Clock;
///
/// let clock = Clock::system();
/// let t1 = clock.now();
/// let t2 = clock.now();
/// assert!(t2 >= t1);
/// ```
#[derive(Clone, Debug)]
pub struct Clock(Kind);

#[derive(Clone, Debug)]
enum Kind {
    System,
    Manual(Arc<Mutex<SystemTime>>),
}

impl Clock {
    /// Creates a clock backed by the operating system clock.
    #[must_use]
    pub fn system() -> Self {
        Self(Kind::System)
    }

    /// Creates a frozen clock.
    ///
    /// Equivalent to `ClockControl::new().to_clock()`. The returned clock
    /// never advances; use a [`ClockControl`] when a test needs to move time.
    ///
    /// # Examples
    ///
    /// ```
    /// use memora_store::Clock;
    ///
    /// let clock = Clock::new_frozen();
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[must_use]
    pub fn new_frozen() -> Self {
        ClockControl::new().to_clock()
    }

    /// Returns the current time according to this clock.
    #[must_use]
    pub fn now(&self) -> SystemTime {
        match &self.0 {
            Kind::System => SystemTime::now(),
            Kind::Manual(time) => *time.lock(),
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::system()
    }
}

/// Manual control over a frozen [`Clock`].
///
/// The controller owns the time; every clock created through
/// [`to_clock`](ClockControl::to_clock) observes advances made here.
///
/// # Examples
///
/// ```
/// use memora_store::ClockControl;
/// use std::time::Duration;
///
/// let control = ClockControl::new();
/// let clock = control.to_clock();
///
/// let before = clock.now();
/// control.advance(Duration::from_secs(60));
/// assert_eq!(clock.now(), before + Duration::from_secs(60));
/// ```
#[derive(Clone, Debug)]
pub struct ClockControl(Arc<Mutex<SystemTime>>);

impl ClockControl {
    /// Creates a controller frozen at the current system time.
    #[must_use]
    pub fn new() -> Self {
        Self::new_at(SystemTime::now())
    }

    /// Creates a controller frozen at the given time.
    #[must_use]
    pub fn new_at(time: impl Into<SystemTime>) -> Self {
        Self(Arc::new(Mutex::new(time.into())))
    }

    /// Returns the controller's current time.
    #[must_use]
    pub fn system_time(&self) -> SystemTime {
        *self.0.lock()
    }

    /// Moves time forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        let mut time = self.0.lock();
        *time += duration;
    }

    /// Moves time forward by `millis` milliseconds.
    pub fn advance_millis(&self, millis: u64) {
        self.advance(Duration::from_millis(millis));
    }

    /// Sets the controller to an absolute time.
    ///
    /// Setting a time earlier than the current one is allowed; caches treat
    /// a backwards clock as expiring affected entries.
    pub fn set(&self, time: impl Into<SystemTime>) {
        *self.0.lock() = time.into();
    }

    /// Creates a clock observing this controller.
    #[must_use]
    pub fn to_clock(&self) -> Clock {
        Clock(Kind::Manual(Arc::clone(&self.0)))
    }
}

impl Default for ClockControl {
    fn default() -> Self {
        Self::new()
    }
}
