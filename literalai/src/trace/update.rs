//! Post-completion updates applied by `wrap_with`.

use futures::future::BoxFuture;
use std::fmt;

/// Fields to apply once a wrapped callback completes, given either as a
/// literal update or computed from the callback's output.
pub enum UpdateAfter<T, U> {
    /// A literal partial update.
    Fields(U),
    /// Computes the update from the output.
    With(Box<dyn FnOnce(&T) -> U + Send>),
    /// Computes the update from the output asynchronously.
    WithAsync(Box<dyn for<'a> FnOnce(&'a T) -> BoxFuture<'a, U> + Send>),
}

impl<T, U> UpdateAfter<T, U> {
    /// Literal partial update.
    pub fn fields(update: U) -> Self {
        Self::Fields(update)
    }

    /// Update computed from the output.
    pub fn with<F>(f: F) -> Self
    where
        F: FnOnce(&T) -> U + Send + 'static,
    {
        Self::With(Box::new(f))
    }

    /// Update computed from the output by a future.
    pub fn with_async<F>(f: F) -> Self
    where
        F: for<'a> FnOnce(&'a T) -> BoxFuture<'a, U> + Send + 'static,
    {
        Self::WithAsync(Box::new(f))
    }

    pub(crate) async fn resolve(self, output: &T) -> U {
        match self {
            Self::Fields(update) => update,
            Self::With(f) => f(output),
            Self::WithAsync(f) => f(output).await,
        }
    }

    /// The literal update, when there is no output to compute one from.
    pub(crate) fn into_fields(self) -> Option<U> {
        match self {
            Self::Fields(update) => Some(update),
            Self::With(_) | Self::WithAsync(_) => None,
        }
    }
}

impl<T, U: fmt::Debug> fmt::Debug for UpdateAfter<T, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fields(update) => f.debug_tuple("Fields").field(update).finish(),
            Self::With(_) => f.write_str("With(..)"),
            Self::WithAsync(_) => f.write_str("WithAsync(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    #[tokio::test]
    async fn test_resolve_variants() {
        let literal: UpdateAfter<u32, String> = UpdateAfter::fields("fixed".to_string());
        assert_eq!(literal.resolve(&1).await, "fixed");

        let sync: UpdateAfter<u32, String> = UpdateAfter::with(|out| format!("sync {out}"));
        assert_eq!(sync.resolve(&2).await, "sync 2");

        let deferred: UpdateAfter<u32, String> = UpdateAfter::with_async(|out| {
            let out = *out;
            async move { format!("async {out}") }.boxed()
        });
        assert_eq!(deferred.resolve(&3).await, "async 3");
    }

    #[test]
    fn test_only_literal_has_fields() {
        let sync: UpdateAfter<u32, u32> = UpdateAfter::with(|out| out + 1);
        assert!(sync.into_fields().is_none());
        assert_eq!(UpdateAfter::<u32, u32>::fields(7).into_fields(), Some(7));
    }
}
