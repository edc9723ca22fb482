use crate::error::Result;
use crate::runtime::Runtime;
use crate::types::{ContainerDescriptor, FunctionDetails};

pub trait RuntimeFactory: Send + Sync {
    /// Human-readable name for this factory implementation (e.g. "thread").
    fn name(&self) -> &str;
    /// Assemble a container for one function instance. The container is
    /// returned unstarted.
    fn create_container(&self, descriptor: ContainerDescriptor) -> Result<Box<dyn Runtime>>;
    /// Release all factory-level resources. Safe to call more than once and
    /// from several threads.
    fn close(&self);
}

/// Manages per-function authentication data for runtimes that need it.
pub trait FunctionAuthProvider: Send + Sync {
    fn cleanup_auth_data(&self, details: &FunctionDetails) -> Result<()>;
}

/// Hook for adjusting function details before a runtime is built.
pub trait RuntimeCustomizer: Send + Sync {
    fn customize(&self, details: &mut FunctionDetails);
}
