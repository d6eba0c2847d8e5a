//! Storage permission gate consulted before an export touches the filesystem.

use async_trait::async_trait;
use tracing::debug;

/// Capability check and asynchronous grant for writing the public output.
#[async_trait]
pub trait StoragePermissionGate: Send + Sync {
    /// Whether the platform needs an explicit grant at all.
    fn is_required(&self) -> bool;

    /// Ask for the grant. Resolves once the user or platform has answered.
    async fn request(&self) -> bool;
}

/// Gate for platforms that never require a grant.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotRequired;

#[async_trait]
impl StoragePermissionGate for NotRequired {
    fn is_required(&self) -> bool {
        false
    }

    async fn request(&self) -> bool {
        true
    }
}

/// Gate with a predetermined answer.
#[derive(Debug, Clone, Copy)]
pub struct FixedGate {
    required: bool,
    granted: bool,
}

impl FixedGate {
    pub fn new(required: bool, granted: bool) -> Self {
        Self { required, granted }
    }
}

#[async_trait]
impl StoragePermissionGate for FixedGate {
    fn is_required(&self) -> bool {
        self.required
    }

    async fn request(&self) -> bool {
        self.granted
    }
}

/// Pass the gate: skipped when not required, otherwise the grant decides.
pub async fn acquire(gate: &dyn StoragePermissionGate) -> bool {
    if !gate.is_required() {
        debug!("Storage permission not required");
        return true;
    }
    gate.request().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_not_required_passes() {
        assert!(acquire(&NotRequired).await);
        assert!(acquire(&FixedGate::new(false, false)).await);
    }

    #[tokio::test]
    async fn test_required_gate_uses_grant() {
        assert!(acquire(&FixedGate::new(true, true)).await);
        assert!(!acquire(&FixedGate::new(true, false)).await);
    }
}
