use crate::error::EvaluationError;
use crate::script::Evaluator;
use evalexpr::{ContextWithMutableVariables, DefaultNumericTypes, HashMapContext, eval_with_context_mut};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Extension of library files found in resource roots.
pub const LIBRARY_EXTENSION: &str = "expr";

const RESERVED_NAMES: &[&str] = &["true", "false"];

/// Evaluator for `evalexpr` scripts.
///
/// Every `<name>.expr` file directly inside a resource root (or a root that is itself such a
/// file) is evaluated first and its result bound as variable `name`. When two roots provide the
/// same name, the earlier root wins. Files whose stem is not a usable variable name are skipped.
/// Named parameters are bound as string variables afterwards and therefore shadow library values.
#[derive(Debug, Default, Clone)]
pub struct ExprEvaluator;

impl ExprEvaluator {
    pub fn new() -> Self {
        Self
    }

    fn load_libraries(
        &self,
        eval_ctx: &mut HashMapContext<DefaultNumericTypes>,
        parameters: &HashMap<String, String>,
        resource_roots: &[PathBuf],
    ) -> Result<(), EvaluationError> {
        let mut loaded: Vec<String> = Vec::new();

        for root in resource_roots {
            for file in library_files(root)? {
                let Some(name) = file.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                    continue;
                };
                if loaded.contains(&name) {
                    debug!(library = %name, root = %root.display(), "Library shadowed by earlier root");
                    continue;
                }
                if let Err(e) = check_name(&name) {
                    warn!(library = %file.display(), error = %e, "Skipping library that cannot be bound");
                    continue;
                }

                let source = fs::read_to_string(&file).map_err(|source| EvaluationError::ResourceRead {
                    path: file.clone(),
                    source,
                })?;
                let mut lib_ctx = parameter_context(parameters)?;
                let value = eval_with_context_mut(&source, &mut lib_ctx)
                    .map_err(|e| EvaluationError::Script(format!("{}: {}", file.display(), e)))?;
                eval_ctx
                    .set_value(name.clone(), value)
                    .map_err(|e| EvaluationError::Script(e.to_string()))?;
                loaded.push(name);
            }
        }
        Ok(())
    }
}

impl Evaluator for ExprEvaluator {
    fn evaluate(
        &self,
        script: &str,
        parameters: &HashMap<String, String>,
        resource_roots: &[PathBuf],
    ) -> Result<Value, EvaluationError> {
        let mut eval_ctx = HashMapContext::<DefaultNumericTypes>::new();
        self.load_libraries(&mut eval_ctx, parameters, resource_roots)?;
        bind_parameters(&mut eval_ctx, parameters)?;

        let result = eval_with_context_mut(script, &mut eval_ctx)
            .map_err(|e| EvaluationError::Script(e.to_string()))?;
        Ok(to_json(result))
    }
}

fn parameter_context(
    parameters: &HashMap<String, String>,
) -> Result<HashMapContext<DefaultNumericTypes>, EvaluationError> {
    let mut eval_ctx = HashMapContext::<DefaultNumericTypes>::new();
    bind_parameters(&mut eval_ctx, parameters)?;
    Ok(eval_ctx)
}

fn bind_parameters(
    eval_ctx: &mut HashMapContext<DefaultNumericTypes>,
    parameters: &HashMap<String, String>,
) -> Result<(), EvaluationError> {
    for (k, v) in parameters {
        check_name(k)?;
        eval_ctx
            .set_value(k.clone(), evalexpr::Value::String(v.clone()))
            .map_err(|e| EvaluationError::Script(e.to_string()))?;
    }
    Ok(())
}

fn check_name(name: &str) -> Result<(), EvaluationError> {
    if RESERVED_NAMES.contains(&name) {
        return Err(EvaluationError::ReservedName(name.to_string()));
    }
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => chars.all(|c| c.is_alphanumeric() || c == '_'),
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(EvaluationError::InvalidName(name.to_string()))
    }
}

/// Library files of one root, sorted by name. A missing root contributes nothing.
fn library_files(root: &Path) -> Result<Vec<PathBuf>, EvaluationError> {
    if root.is_file() {
        return Ok(if is_library(root) { vec![root.to_path_buf()] } else { Vec::new() });
    }
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(root).map_err(|source| EvaluationError::ResourceRead {
        path: root.to_path_buf(),
        source,
    })?;
    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_library(path))
        .collect();
    files.sort();
    Ok(files)
}

fn is_library(path: &Path) -> bool {
    path.extension().and_then(|s| s.to_str()) == Some(LIBRARY_EXTENSION)
}

fn to_json(value: evalexpr::Value<DefaultNumericTypes>) -> Value {
    match value {
        evalexpr::Value::String(s) => Value::String(s),
        evalexpr::Value::Int(i) => json!(i),
        evalexpr::Value::Float(f) => json!(f),
        evalexpr::Value::Boolean(b) => Value::Bool(b),
        evalexpr::Value::Tuple(items) => Value::Array(items.into_iter().map(to_json).collect()),
        evalexpr::Value::Empty => Value::Null,
        #[allow(unreachable_patterns)]
        _ => Value::Null,
    }
}
