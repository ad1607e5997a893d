//! Audio processing context handles.
//!
//! A context is an opaque, cheaply clonable handle that is passed through to every
//! container created by the normalizer. When the caller does not specify one, a
//! single process-wide default context is created on first use and reused by every
//! later call. Passing [`ContextOption::Null`] suppresses the lookup and yields a
//! container with no context at all.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);
static DEFAULT_CONTEXT: OnceLock<AudioContext> = OnceLock::new();

#[derive(Debug)]
struct ContextInner {
    id: u64,
    label: String,
}

/// Opaque handle to an audio processing context.
///
/// Two handles are equal when they refer to the same context, regardless of label.
#[derive(Clone)]
pub struct AudioContext {
    inner: Arc<ContextInner>,
}

impl AudioContext {
    /// Creates a fresh context with a unique identity.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
                label: label.into(),
            }),
        }
    }

    /// Returns the process-wide default context, creating it on first use.
    pub fn shared_default() -> AudioContext {
        DEFAULT_CONTEXT
            .get_or_init(|| {
                tracing::debug!("creating process-wide default audio context");
                AudioContext::new("default")
            })
            .clone()
    }

    /// Human readable label given at construction.
    pub fn label(&self) -> &str {
        &self.inner.label
    }
}

impl PartialEq for AudioContext {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for AudioContext {}

impl fmt::Debug for AudioContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AudioContext(#{} {:?})", self.inner.id, self.inner.label)
    }
}

/// How the destination container should obtain its context.
///
/// `Unspecified` and `Null` are deliberately different: the first falls back to the
/// shared default, the second forces a context-less container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ContextOption {
    /// Not given; use [`AudioContext::shared_default`].
    #[default]
    Unspecified,
    /// Explicitly none.
    Null,
    /// Use this context.
    Explicit(AudioContext),
}

impl ContextOption {
    /// Resolves the option to the context the container should carry.
    pub fn resolve(&self) -> Option<AudioContext> {
        match self {
            ContextOption::Unspecified => Some(AudioContext::shared_default()),
            ContextOption::Null => None,
            ContextOption::Explicit(ctx) => Some(ctx.clone()),
        }
    }

    /// True when the caller said nothing about the context.
    pub const fn is_unspecified(&self) -> bool {
        matches!(self, ContextOption::Unspecified)
    }
}

impl From<AudioContext> for ContextOption {
    fn from(ctx: AudioContext) -> Self {
        ContextOption::Explicit(ctx)
    }
}

impl From<Option<AudioContext>> for ContextOption {
    fn from(ctx: Option<AudioContext>) -> Self {
        match ctx {
            Some(ctx) => ContextOption::Explicit(ctx),
            None => ContextOption::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_context_is_reused() {
        let a = ContextOption::Unspecified.resolve();
        let b = ContextOption::default().resolve();
        assert!(a.is_some());
        assert_eq!(a, b);
    }

    #[test]
    fn test_null_suppresses_default() {
        assert_eq!(ContextOption::Null.resolve(), None);
        assert_eq!(ContextOption::from(None), ContextOption::Null);
    }

    #[test]
    fn test_explicit_contexts_compare_by_identity() {
        let a = AudioContext::new("same");
        let b = AudioContext::new("same");
        assert_ne!(a, b);
        assert_eq!(ContextOption::from(a.clone()).resolve(), Some(a));
    }
}
