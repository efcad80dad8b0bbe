//! Circular dependency detection infrastructure.

use std::cell::RefCell;

use crate::error::{DiError, DiResult};
use crate::key::Key;

const MAX_DEPTH: usize = 256;

// Thread-local resolution stack for circular dependency detection
thread_local! {
    static RESOLUTION_STACK: RefCell<Vec<Key>> = const { RefCell::new(Vec::new()) };
}

/// Guard for managing the thread-local resolution stack.
///
/// Entering a key that is already on the stack fails with the full cycle
/// path; dropping the guard pops the key again.
pub(crate) struct StackGuard {
    _private: (),
}

impl StackGuard {
    pub(crate) fn enter(key: &Key) -> DiResult<Self> {
        RESOLUTION_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();

            // Circular detection BEFORE pushing the new key
            if stack.iter().any(|k| k == key) {
                let mut path: Vec<String> = stack.iter().map(ToString::to_string).collect();
                path.push(key.to_string());
                return Err(DiError::Circular(path));
            }

            if stack.len() >= MAX_DEPTH {
                return Err(DiError::DepthExceeded(stack.len()));
            }

            stack.push(key.clone());
            Ok(Self { _private: () })
        })
    }
}

impl Drop for StackGuard {
    fn drop(&mut self) {
        RESOLUTION_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}
