use std::panic::{catch_unwind, AssertUnwindSafe};

use courier_core::{AnyResult, FatalError};

/// Runs `f`, converting a panic into a [`FatalError`] so that a faulty
/// action cannot take the whole host down.
///
/// The caller must make sure nothing `f` touches is observed in a broken
/// state afterwards; the kernel discards the controller after every request.
pub fn catch_panic<T, F>(f: F) -> AnyResult<T>
where
    F: FnOnce() -> AnyResult<T>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(r) => r,
        Err(payload) => Err(FatalError::from_panic(payload).into()),
    }
}
