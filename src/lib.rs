// Rule-validation engine for dimensioned filing facts.
// The Python extension module `_core` is built with the `extension-module`
// feature; the Rust API below is available without it.

pub mod bindings;
pub mod config;
pub mod facts;
pub mod rules;
pub mod taxonomy;

pub use config::{ConfigError, EngineConfig};
pub use facts::{BindingPolicy, Bindings, Decimals, Fact, FactBindingEngine, FactSet, PolicyError};
pub use rules::{compile, CompileContext, CompileOutcome, RawSpec, RuleError, RuleSet, SourceMode};

#[cfg(feature = "python")]
use pyo3::prelude::*;

// --- Module Definition ---
/// Defines the `_core` Python module.
#[cfg(feature = "python")]
#[pymodule]
fn _core(_py: Python, m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<bindings::python::PyRuleSet>()?;
    m.add_function(wrap_pyfunction!(bindings::python::compile_rules, m)?)?;
    m.add_function(wrap_pyfunction!(bindings::python::abbreviated_namespace, m)?)?;
    Ok(())
}
