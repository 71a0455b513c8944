//! Global named statistics.
//!
//! Counters are registered lazily the first time the [counter!] macro is hit
//! and reported at the end of a run with [report_counters]. Everything is a
//! no-op unless the `counter` feature is enabled.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, PoisonError,
    },
    time::Duration,
};

use itertools::Itertools;

pub enum Counter {
    CounterU64(CounterU64),
    CounterTime(CounterTime),
}

impl Counter {
    pub fn format(&self) -> String {
        match self {
            Counter::CounterU64(a) => a.format(),
            Counter::CounterTime(a) => a.format(),
        }
    }
}

#[derive(Default)]
pub struct CounterU64 {
    atomic: AtomicU64,
}

impl CounterU64 {
    pub const fn new() -> Self {
        Self {
            atomic: AtomicU64::new(0),
        }
    }
    pub fn add(&self, amount: u64) {
        // Addition is associative and commutative
        self.atomic.fetch_add(amount, Ordering::Relaxed);
    }
    pub fn value(&self) -> u64 {
        self.atomic.load(Ordering::Acquire)
    }
    fn format(&self) -> String {
        format!("{}", self.value())
    }
}

#[derive(Default)]
pub struct CounterTime {
    // Saturates after ~584 years
    nanos: AtomicU64,
}

impl CounterTime {
    pub const fn new() -> Self {
        Self {
            nanos: AtomicU64::new(0),
        }
    }
    pub fn add(&self, dur: Duration) {
        let nanos = u64::try_from(dur.as_nanos()).unwrap_or(u64::MAX);
        self.nanos.fetch_add(nanos, Ordering::Relaxed);
    }
    pub fn value(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::Acquire))
    }
    pub fn format(&self) -> String {
        super::timer::format_elapsed(self.value())
    }
}

/// Log every registered counter, sorted by name
pub fn report_counters() {
    let counters = __COUNTERS.lock().unwrap_or_else(PoisonError::into_inner);
    for (counter_name, counter) in counters.iter().sorted_by_key(|(name, _)| **name) {
        log::log!(target: "counter_report", log::Level::Info, "{}: {}", counter_name, counter.format())
    }
}

/// Value of a registered integer counter, if it has been hit at least once
pub fn counter_value(descr: &str) -> Option<u64> {
    let counters = __COUNTERS.lock().unwrap_or_else(PoisonError::into_inner);
    match &**counters.get(descr)? {
        Counter::CounterU64(c) => Some(c.value()),
        Counter::CounterTime(_) => None,
    }
}

lazy_static::lazy_static! {
    pub static ref __COUNTERS: Mutex<HashMap<&'static str, Arc<Counter>>> = Mutex::new(HashMap::new());
}

pub fn insert_counter(descr: &'static str, counter: Counter) -> Arc<Counter> {
    let mut counters = __COUNTERS.lock().unwrap_or_else(PoisonError::into_inner);
    counters.entry(descr).or_insert_with(|| Arc::new(counter)).clone()
}

#[macro_export]
macro_rules! counter {
    ($descr:literal) => {
        $crate::counter!($descr, 1)
    };
    ($descr:literal, $amount:expr) => {
        if cfg!(feature = "counter") {
            use $crate::utils::counter::{insert_counter, lazy_static, Counter, CounterU64};
            lazy_static::lazy_static! {
                static ref COUNTER_REF: std::sync::Arc<Counter> = {
                    insert_counter($descr, Counter::CounterU64(CounterU64::new()))
                };
            }

            if let Counter::CounterU64(c) = &**COUNTER_REF {
                c.add($amount as u64);
            }
        }
    };
}

pub use counter;
// Reexport for ease of use
pub use lazy_static;
