//! # Architecture Abstraction Layer
//!
//! Hardware-specific glue lives here, entirely additive to the core
//! scheduler: the scheduler never depends on anything in this module
//! directly, it only consumes the [`crate::time::Clock`] trait. This module
//! just happens to provide one real implementation of it.

#[cfg(feature = "hw-cortex-m")]
pub mod cortex_m4;
