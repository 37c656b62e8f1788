//! Layered configuration resolution for verification workflows
//!
//! This crate merges configuration layers (built-in defaults, machine
//! profile, workflow-block fragments, user overrides) into one
//! validated, fully-resolved tree:
//!
//! 1. The user layer is structurally validated against the defaults
//!    template and checked for mandatory fields.
//! 2. Layers merge in ascending precedence order, with null values in a
//!    higher layer unsetting existing settings.
//! 3. Embedded `{{ name }}` references are expanded to a fixed point.
//! 4. String leaves are decoded into native scalar and list values.
//! 5. The task sub-tree gains derived jobname attributes.
//!
//! Downstream consumers (template renderer, workflow generator) receive
//! the resolved tree read-only through [`ResolvedConfig`].

pub mod codec;
pub mod dereference;
pub mod dump;
pub mod error;
pub mod layers;
pub mod merge;
pub mod resolver;
pub mod tasks;
pub mod tree;
pub mod validate;

pub use codec::DecodeMode;
pub use error::{Error, Result};
pub use layers::{Layer, LayerKind};
pub use resolver::{ResolvedConfig, WorkflowResolver};
pub use tree::{ConfigMap, ConfigValue};
