//! Behavior models for functions the analyzer cannot see.
//!
//! Value-flow and checkers consult the library to model calls into external
//! code: whether a function returns, what it allocates, which arguments must
//! be non-null or initialized, and how large argument buffers must be. A
//! small built-in core covers the usual C functions; project models load
//! from JSON.

use indexmap::IndexMap;
use serde::Deserialize;

use crate::errors::{AnalysisError, AnalysisResult};

/// Minimum-size requirement on a buffer argument.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MinSize {
    /// Buffer must hold at least the value of argument `arg` bytes
    /// (e.g. `read(fd, buf, count)`: buf needs `count` bytes).
    ArgValue { arg: u16 },
    /// Buffer must hold the string length of argument `arg` plus the
    /// terminator (e.g. `strcpy(dst, src)`).
    Strlen { arg: u16 },
    /// Buffer must hold the product of two argument values
    /// (e.g. `fread(ptr, size, nmemb, f)`).
    Mul { arg1: u16, arg2: u16 },
    /// Fixed byte count.
    Fixed { bytes: u64 },
}

/// Per-argument rules. `nr` is 1-based.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ArgModel {
    pub nr: u16,
    pub not_null: bool,
    pub not_uninit: bool,
    pub not_bool: bool,
    /// The call writes through this argument (an out-buffer).
    pub fills_buffer: bool,
    pub min_sizes: Vec<MinSize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocKind {
    Malloc,
    New,
    NewArray,
    File,
    Fd,
}

/// Model of one external function.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FunctionModel {
    pub name: String,
    /// Expected argument count; `None` leaves it unchecked (varargs).
    pub argc: Option<u16>,
    pub noreturn: bool,
    /// The call has no side effects and its result depends only on the
    /// arguments.
    pub pure_function: bool,
    /// Ignoring the return value is a bug (`useretval`).
    pub use_retval: bool,
    pub alloc: Option<AllocKind>,
    pub dealloc: Option<AllocKind>,
    pub args: Vec<ArgModel>,
}

impl FunctionModel {
    #[must_use]
    pub fn arg(&self, nr: u16) -> Option<&ArgModel> {
        self.args.iter().find(|a| a.nr == nr)
    }
}

/// The active set of function models. Insertion order is kept so listings
/// and overrides behave deterministically.
#[derive(Debug, Clone, Default)]
pub struct Library {
    functions: IndexMap<String, FunctionModel>,
}

impl Library {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Library preloaded with the C functions the analyzer models out of
    /// the box.
    #[must_use]
    pub fn builtin() -> Self {
        let mut lib = Self::new();
        lib.insert(FunctionModel {
            name: "memset".into(),
            argc: Some(3),
            args: vec![ArgModel {
                nr: 1,
                not_null: true,
                fills_buffer: true,
                min_sizes: vec![MinSize::ArgValue { arg: 3 }],
                ..ArgModel::default()
            }],
            ..FunctionModel::default()
        });
        lib.insert(FunctionModel {
            name: "memcpy".into(),
            argc: Some(3),
            args: vec![
                ArgModel {
                    nr: 1,
                    not_null: true,
                    fills_buffer: true,
                    min_sizes: vec![MinSize::ArgValue { arg: 3 }],
                    ..ArgModel::default()
                },
                ArgModel {
                    nr: 2,
                    not_null: true,
                    not_uninit: true,
                    min_sizes: vec![MinSize::ArgValue { arg: 3 }],
                    ..ArgModel::default()
                },
            ],
            ..FunctionModel::default()
        });
        lib.insert(FunctionModel {
            name: "strcpy".into(),
            argc: Some(2),
            args: vec![
                ArgModel {
                    nr: 1,
                    not_null: true,
                    fills_buffer: true,
                    min_sizes: vec![MinSize::Strlen { arg: 2 }],
                    ..ArgModel::default()
                },
                ArgModel {
                    nr: 2,
                    not_null: true,
                    not_uninit: true,
                    ..ArgModel::default()
                },
            ],
            ..FunctionModel::default()
        });
        lib.insert(FunctionModel {
            name: "strlen".into(),
            argc: Some(1),
            pure_function: true,
            use_retval: true,
            args: vec![ArgModel {
                nr: 1,
                not_null: true,
                not_uninit: true,
                ..ArgModel::default()
            }],
            ..FunctionModel::default()
        });
        lib.insert(FunctionModel {
            name: "read".into(),
            argc: Some(3),
            args: vec![ArgModel {
                nr: 2,
                not_null: true,
                fills_buffer: true,
                min_sizes: vec![MinSize::ArgValue { arg: 3 }],
                ..ArgModel::default()
            }],
            ..FunctionModel::default()
        });
        lib.insert(FunctionModel {
            name: "write".into(),
            argc: Some(3),
            args: vec![ArgModel {
                nr: 2,
                not_null: true,
                not_uninit: true,
                min_sizes: vec![MinSize::ArgValue { arg: 3 }],
                ..ArgModel::default()
            }],
            ..FunctionModel::default()
        });
        lib.insert(FunctionModel {
            name: "fread".into(),
            argc: Some(4),
            args: vec![ArgModel {
                nr: 1,
                not_null: true,
                fills_buffer: true,
                min_sizes: vec![MinSize::Mul { arg1: 2, arg2: 3 }],
                ..ArgModel::default()
            }],
            ..FunctionModel::default()
        });
        lib.insert(FunctionModel {
            name: "malloc".into(),
            argc: Some(1),
            use_retval: true,
            alloc: Some(AllocKind::Malloc),
            ..FunctionModel::default()
        });
        lib.insert(FunctionModel {
            name: "free".into(),
            argc: Some(1),
            dealloc: Some(AllocKind::Malloc),
            ..FunctionModel::default()
        });
        lib.insert(FunctionModel {
            name: "exit".into(),
            argc: Some(1),
            noreturn: true,
            ..FunctionModel::default()
        });
        lib.insert(FunctionModel {
            name: "abort".into(),
            argc: Some(0),
            noreturn: true,
            ..FunctionModel::default()
        });
        lib
    }

    pub fn insert(&mut self, model: FunctionModel) {
        self.functions.insert(model.name.clone(), model);
    }

    /// Merges models from a JSON document: `{"functions": [ ... ]}`.
    /// Later entries override earlier ones of the same name.
    pub fn load_json(&mut self, json: &str) -> AnalysisResult<()> {
        #[derive(Deserialize)]
        struct Doc {
            functions: Vec<FunctionModel>,
        }
        let doc: Doc = serde_json::from_str(json).map_err(|e| AnalysisError::BadConfig {
            message: format!("bad library definition: {e}"),
        })?;
        for f in doc.functions {
            if f.name.is_empty() {
                return Err(AnalysisError::BadConfig {
                    message: "library function without a name".to_owned(),
                });
            }
            self.insert(f);
        }
        Ok(())
    }

    #[must_use]
    pub fn function(&self, name: &str) -> Option<&FunctionModel> {
        self.functions.get(name)
    }

    #[must_use]
    pub fn is_noreturn(&self, name: &str) -> bool {
        self.function(name).is_some_and(|f| f.noreturn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_read_model() {
        let lib = Library::builtin();
        let read = lib.function("read").unwrap();
        assert_eq!(read.argc, Some(3));
        let buf = read.arg(2).unwrap();
        assert!(buf.fills_buffer);
        assert_eq!(buf.min_sizes, vec![MinSize::ArgValue { arg: 3 }]);
    }

    #[test]
    fn json_overrides() {
        let mut lib = Library::builtin();
        lib.load_json(
            r#"{"functions":[{"name":"my_alloc","argc":1,"use_retval":true,"alloc":"malloc"}]}"#,
        )
        .unwrap();
        assert!(lib.function("my_alloc").unwrap().use_retval);
    }
}
