//! ACS KPI Compiler
//!
//! Compiles the KPI references of affected profiles into deployable artifacts.
//!
//! # Core Concepts
//!
//! - [`KpiCompiler`]: resolves simple then complex KPIs, deduplicating on
//!   (source KPI, aggregation-element set)
//! - [`CompilationResult`]: artifacts with the [`Action`] provisioning must take
//! - [`CompileError`]: fail-fast validation and resolution errors
//!
//! # Example
//!
//! ```rust,ignore
//! use acs_compiler::KpiCompiler;
//!
//! let compiler = KpiCompiler::new(dictionary, runtime)
//!     .with_default_period(AggregationPeriod::Quarter);
//! let result = compiler.calculate_affected_kpis(&profiles)?;
//! for artifact in result.to_write() {
//!     println!("{} -> {}", artifact.source_kpi, artifact.name);
//! }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod compiler;
mod error;
mod expression;
mod result;

pub use compiler::{KpiCompiler, EXECUTION_GROUP_PREFIX};
pub use error::CompileError;
pub use result::{Action, CompilationResult, CompiledKpi};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
