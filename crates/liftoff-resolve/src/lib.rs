//! liftoff-resolve — computes the archive closure a job needs at runtime.
//!
//! Components (the job's operators, codecs, and the platform runtime) are
//! declared up front in a [`Registry`]: each one names the archive it ships
//! in, its parent component, and the interfaces it implements. Resolution is
//! a lookup over those declarations.
//!
//! ```text
//! job.components ──► lookup ──► parent chain + interfaces
//!                                   │
//!        mandatory platform list ───┤
//!                                   ▼
//!                 code-source location ──► physical archive (once)
//!                                   │
//!           library_archives CSV ───┴──► ArchiveSet
//! ```

pub mod error;
pub mod registry;
pub mod resolver;

pub use error::{ResolutionError, ResolveResult};
pub use registry::{Component, Registry, ROOT_COMPONENT};
pub use resolver::{DependencyResolver, PLATFORM_COMPONENTS, SECURITY_COMPONENTS, mandatory_components};
