//! Per-form submission guard.
//!
//! A form may have at most one request in flight. [`SubmissionGuard::try_acquire`]
//! hands out a permit when the form is idle; the permit releases the guard
//! when dropped, so every exit path of a handler (success, error, early
//! return) leaves the form submittable again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct SubmissionGuard {
    busy: Arc<AtomicBool>,
}

impl SubmissionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` while another submission holds the permit.
    pub fn try_acquire(&self) -> Option<SubmissionPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SubmissionPermit {
                busy: Arc::clone(&self.busy),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
pub struct SubmissionPermit {
    busy: Arc<AtomicBool>,
}

impl Drop for SubmissionPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// One guard per form on the page.
#[derive(Debug, Clone, Default)]
pub struct FormGuards {
    pub login: SubmissionGuard,
    pub signup: SubmissionGuard,
    pub logout: SubmissionGuard,
    pub add_node: SubmissionGuard,
    pub upload: SubmissionGuard,
    pub admin_upload: SubmissionGuard,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_refused_while_held() {
        let g = SubmissionGuard::new();
        let permit = g.try_acquire();
        assert!(permit.is_some());
        assert!(g.is_busy());
        assert!(g.try_acquire().is_none());
    }

    #[test]
    fn test_drop_releases() {
        let g = SubmissionGuard::new();
        drop(g.try_acquire().unwrap());
        assert!(!g.is_busy());
        assert!(g.try_acquire().is_some());
    }

    #[test]
    fn test_clones_share_state() {
        let g = SubmissionGuard::new();
        let other = g.clone();
        let _p = g.try_acquire().unwrap();
        assert!(other.try_acquire().is_none());
    }

    #[test]
    fn test_guards_are_independent_per_form() {
        let guards = FormGuards::default();
        let _login = guards.login.try_acquire().unwrap();
        assert!(guards.add_node.try_acquire().is_some());
    }

    #[test]
    fn test_release_on_early_return() {
        fn handler(g: &SubmissionGuard, fail: bool) -> Result<(), ()> {
            let _permit = g.try_acquire().ok_or(())?;
            if fail {
                return Err(());
            }
            Ok(())
        }
        let g = SubmissionGuard::new();
        assert!(handler(&g, true).is_err());
        assert!(!g.is_busy());
        assert!(handler(&g, false).is_ok());
        assert!(!g.is_busy());
    }
}
