use crate::rules::{compile, CompileContext, RawSpec, RuleSet, SourceMode};
use crate::taxonomy::{abbreviated_namespace as abbreviate, Abbreviation};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use serde_json::Value;
use std::collections::HashSet;

/// A compiled rule set plus the errors found while compiling it.
#[pyclass(name = "_RuleSet")]
#[derive(Debug, Clone, Default)]
pub struct PyRuleSet {
    inner: RuleSet,
    errors: Vec<String>,
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[pymethods]
impl PyRuleSet {
    pub fn __len__(&self) -> usize { self.inner.len() }

    #[getter]
    pub fn errors(&self) -> Vec<String> { self.errors.clone() }

    pub fn rule_positions(&self) -> Vec<usize> {
        self.inner.iter().map(|r| r.position).collect()
    }

    #[pyo3(signature = (sub_type, form_type=None))]
    pub fn rules_for(&self, sub_type: &str, form_type: Option<&str>) -> Vec<usize> {
        self.inner.rules_for(sub_type, form_type).map(|r| r.position).collect()
    }

    pub fn sub_types(&self, position: usize) -> PyResult<Vec<String>> {
        self.inner
            .iter()
            .find(|r| r.position == position)
            .map(|r| r.sub_types.to_strings())
            .ok_or_else(|| PyValueError::new_err(format!("No compiled rule at position {}", position)))
    }

    pub fn message(&self, key: &str) -> Option<String> {
        self.inner.message(key).map(text)
    }
}

/// Compiles a JSON rule specification for one validation run.
#[pyfunction]
#[pyo3(signature = (spec_json, mode, known_concepts, exhibit_specific=false))]
pub fn compile_rules(spec_json: &str, mode: &str, known_concepts: Vec<String>, exhibit_specific: bool) -> PyResult<PyRuleSet> {
    let spec = RawSpec::from_json_str(spec_json).map_err(|e| PyValueError::new_err(format!("Invalid rule specification: {}", e)))?;
    let mode = SourceMode::parse(mode)
        .ok_or_else(|| PyValueError::new_err(format!("Invalid mode: '{}'", mode)))?;
    let concepts: HashSet<String> = known_concepts.into_iter().collect();
    let ctx = CompileContext::new(mode, &concepts).exhibit_specific(exhibit_specific);

    let outcome = compile(spec, &ctx);
    Ok(PyRuleSet {
        errors: outcome.errors.iter().map(ToString::to_string).collect(),
        inner: outcome.rule_set,
    })
}

#[pyfunction]
#[pyo3(signature = (namespace, wild=false))]
pub fn abbreviated_namespace(namespace: &str, wild: bool) -> Option<String> {
    abbreviate(namespace, if wild { Abbreviation::Wild } else { Abbreviation::WithYear })
}
