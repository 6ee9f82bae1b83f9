//! Logging context handed to a replacement run
//!
//! Holds the tracing span the run executes in and a quiet flag. While quiet,
//! expected noise (conflict retries) is demoted to debug. The flag is only
//! ever raised through [`LogScope::quiet`], whose guard puts the previous
//! value back however the guarded section exits.

use std::sync::atomic::{AtomicBool, Ordering};

use scopeguard::ScopeGuard;
use tracing::{debug, info_span, warn, Span};

use crate::store::StoreError;

pub struct LogScope {
    span: Span,
    quiet: AtomicBool,
}

impl LogScope {
    pub fn new(span: Span) -> Self {
        Self {
            span,
            quiet: AtomicBool::new(false),
        }
    }

    pub fn for_container(container_id: &str) -> Self {
        Self::new(info_span!("replace_content", container = %container_id))
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet.load(Ordering::SeqCst)
    }

    /// Raise the quiet flag until the returned guard is dropped
    pub fn quiet(&self) -> ScopeGuard<bool, impl FnOnce(bool) + '_> {
        let previous = self.quiet.swap(true, Ordering::SeqCst);
        scopeguard::guard(previous, move |previous| {
            self.quiet.store(previous, Ordering::SeqCst);
        })
    }

    /// Report a retried store call
    pub fn retry_notice(&self, block_id: &str, attempt: u32, error: &StoreError) {
        if self.is_quiet() {
            debug!(block_id, attempt, error = %error, "Retrying delete");
        } else {
            warn!(block_id, attempt, error = %error, "Retrying delete");
        }
    }
}

impl Default for LogScope {
    fn default() -> Self {
        Self::new(Span::none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_guard_restores_previous_state() {
        let scope = LogScope::default();
        assert!(!scope.is_quiet());
        {
            let _outer = scope.quiet();
            assert!(scope.is_quiet());
            {
                let _inner = scope.quiet();
                assert!(scope.is_quiet());
            }
            // Inner guard restores "quiet", not "loud"
            assert!(scope.is_quiet());
        }
        assert!(!scope.is_quiet());
    }

    #[test]
    fn test_quiet_guard_restores_on_early_return() {
        fn failing(scope: &LogScope) -> Result<(), String> {
            let _guard = scope.quiet();
            Err("boom".into())
        }

        let scope = LogScope::for_container("page-1");
        assert!(failing(&scope).is_err());
        assert!(!scope.is_quiet());
    }
}
