//! Kernel session abstractions for the Export Environment toolbar button.
//!
//! This crate provides the pieces the exporter talks to:
//! - `IopubMessage` - Typed output messages published by a kernel
//! - `IopubSignal` - Ordered handler registry with scoped subscriptions
//! - `KernelConnection` - Trait for kernels accepting execute requests
//! - `SessionContext` - Holder for the kernel attached to a notebook panel
//! - `MemoryKernel` - In-process kernel (feature: memory)

pub mod iopub;
pub mod kernel;
pub mod message;
pub mod session;

#[cfg(feature = "memory")]
pub mod memory;

pub use iopub::{IopubSignal, Subscription};
pub use kernel::{ExecuteFuture, ExecuteReply, ExecuteRequest, KernelConnection, KernelError};
pub use message::{ExecutionState, IopubContent, IopubMessage, MessageHeader, MimeBundle};
pub use session::SessionContext;

#[cfg(feature = "memory")]
pub use memory::{MemoryKernel, ScriptedReply};
