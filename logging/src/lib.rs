use core::{
    fmt::{Display, Formatter, Result as FmtResult},
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
};

use types::primitives::Slot;

pub static SLOT_LOG_CONTEXT: SlotLogContext = SlotLogContext::new();

#[derive(Debug)]
pub struct SlotLogContext {
    slot: AtomicU64,
    slot_known: AtomicBool,
}

impl SlotLogContext {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slot: AtomicU64::new(0),
            slot_known: AtomicBool::new(false),
        }
    }

    pub fn set_slot(&self, slot: Slot) {
        self.slot.store(slot, Ordering::Relaxed);
        self.slot_known.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn slot(&self) -> Option<Slot> {
        self.slot_known
            .load(Ordering::Acquire)
            .then(|| self.slot.load(Ordering::Relaxed))
    }
}

impl Display for SlotLogContext {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        match self.slot() {
            Some(slot) => write!(formatter, "slot: {slot}"),
            None => formatter.write_str("slot: -"),
        }
    }
}

impl Default for SlotLogContext {
    fn default() -> Self {
        Self::new()
    }
}

#[macro_export]
macro_rules! info_with_slot {
    ($($arg:tt)*) => {
        ::tracing::info!("[{}] {}", $crate::SLOT_LOG_CONTEXT, format_args!($($arg)*));
    };
}

#[macro_export]
macro_rules! debug_with_slot {
    ($($arg:tt)*) => {
        ::tracing::debug!("[{}] {}", $crate::SLOT_LOG_CONTEXT, format_args!($($arg)*));
    };
}

#[macro_export]
macro_rules! warn_with_slot {
    ($($arg:tt)*) => {
        ::tracing::warn!("[{}] {}", $crate::SLOT_LOG_CONTEXT, format_args!($($arg)*));
    };
}

#[macro_export]
macro_rules! error_with_slot {
    ($($arg:tt)*) => {
        ::tracing::error!("[{}] {}", $crate::SLOT_LOG_CONTEXT, format_args!($($arg)*));
    };
}

#[macro_export]
macro_rules! trace_with_slot {
    ($($arg:tt)*) => {
        ::tracing::trace!("[{}] {}", $crate::SLOT_LOG_CONTEXT, format_args!($($arg)*));
    };
}
