//! Mount lifetime tokens

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Marks the end of a component's mount.
///
/// A request started while mounted checks the token before writing its
/// result back; once the component is unmounted the late result is dropped.
#[derive(Debug, Clone, Default)]
pub struct Lifetime(Arc<AtomicBool>);

impl Lifetime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn end(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_ended(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
