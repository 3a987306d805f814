//! Who may call internal methods.

use std::collections::HashSet;

use mdinspect_core::{Method, Visibility};

/// Capability handed to the chain interpreter deciding whether an
/// [`Visibility::Internal`] method may be invoked.
///
/// Exported methods are always permitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessPolicy {
    /// Every method is callable.
    Trusted,
    /// Internal methods are callable only when their declaring class path is listed.
    AllowList(HashSet<String>),
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::AllowList(HashSet::new())
    }
}

impl AccessPolicy {
    /// Policy that only permits exported methods.
    pub fn exported_only() -> Self {
        Self::default()
    }

    /// Policy permitting internal methods declared on the given class paths.
    pub fn allow<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::AllowList(paths.into_iter().map(Into::into).collect())
    }

    /// Whether `method` may be invoked under this policy.
    pub fn permits(&self, method: &Method) -> bool {
        match (method.visibility(), self) {
            (Visibility::Exported, _) | (_, Self::Trusted) => true,
            (Visibility::Internal, Self::AllowList(paths)) => paths.contains(method.declaring_class().path()),
        }
    }

    /// True for [`AccessPolicy::Trusted`].
    pub fn is_trusted(&self) -> bool {
        matches!(self, Self::Trusted)
    }
}
