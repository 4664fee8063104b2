//! Crate-level tests exercising the worker lifecycle across modules.

mod support;
mod unit;
