//! Backtraces for panics raised on the worker thread.
//!
//! `catch_unwind` hands back only the payload, so a chained panic hook records
//! a [`Backtrace`] in a thread-local slot that the worker boundary collects
//! when it logs the panic. Panics on other threads go straight to the
//! previously installed hook.

use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::panic;
use std::thread;

use once_cell::sync::OnceCell;

use super::WORKER_THREAD_NAME;

static HOOK: OnceCell<()> = OnceCell::new();

thread_local! {
    static LAST_TRACE: RefCell<Option<Backtrace>> = const { RefCell::new(None) };
}

/// Chains the capturing hook in front of the current one, once per process.
pub(super) fn install_hook() {
    HOOK.get_or_init(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if thread::current().name() == Some(WORKER_THREAD_NAME) {
                LAST_TRACE.set(Some(Backtrace::force_capture()));
            }
            previous(info);
        }));
    });
}

/// Takes the backtrace recorded for the latest panic on this thread.
#[must_use]
pub(super) fn take() -> Option<Backtrace> {
    LAST_TRACE.take()
}
