use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

// The final set of errors emitted while loading and analysing a schema
#[derive(Debug, Default)]
pub struct CompilerMessages {
    pub errors: Vec<CompilerError>,
}

impl CompilerMessages {
    pub fn from_error(error: CompilerError) -> Self {
        CompilerMessages {
            errors: vec![error],
        }
    }
}

#[derive(Debug, Eq, Hash, PartialEq, Clone, Copy)]
pub enum ErrorMetaDataKey {
    CompilationStage,
    VariableName,
    FunctionName,
    ClassName,

    // Optional suggestion
    PrimarySuggestion,

    ExpectedCount,
    FoundCount,
}

/// Where in the input an error came from.
/// The schema has no source text, so the best we can do is the file and the offending declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorLocation {
    pub file: Option<PathBuf>,
    pub node: Option<String>,
}

impl ErrorLocation {
    pub fn new(file: Option<PathBuf>, node: Option<String>) -> Self {
        Self { file, node }
    }

    pub fn in_file(path: &Path) -> Self {
        Self {
            file: Some(path.to_path_buf()),
            node: None,
        }
    }

    pub fn at_node(node: impl Into<String>) -> Self {
        Self {
            file: None,
            node: Some(node.into()),
        }
    }
}

impl fmt::Display for ErrorLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.file, &self.node) {
            (Some(file), Some(node)) => write!(f, "{} ({node})", file.display()),
            (Some(file), None) => write!(f, "{}", file.display()),
            (None, Some(node)) => write!(f, "{node}"),
            (None, None) => write!(f, "<unknown>"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompilerError {
    pub msg: String,
    pub location: ErrorLocation,
    pub error_type: ErrorType,

    // This is for creating more structured and detailed error messages
    pub metadata: HashMap<ErrorMetaDataKey, String>,
}

impl CompilerError {
    pub fn new(msg: impl Into<String>, location: ErrorLocation, error_type: ErrorType) -> Self {
        CompilerError {
            msg: msg.into(),
            location,
            error_type,
            metadata: HashMap::new(),
        }
    }

    pub fn with_file_path(mut self, file_path: PathBuf) -> Self {
        self.location.file = Some(file_path);
        self
    }

    pub fn new_metadata_entry(&mut self, key: ErrorMetaDataKey, value: impl Into<String>) {
        self.metadata.insert(key, value.into());
    }

    /// Create a compiler error (internal bug, not the schema author's fault)
    pub fn compiler_error(msg: impl Into<String>) -> Self {
        CompilerError::new(msg, ErrorLocation::default(), ErrorType::Compiler)
    }

    /// Create a file system error for a path
    pub fn file_error(path: &Path, msg: impl Into<String>) -> Self {
        CompilerError::new(msg, ErrorLocation::in_file(path), ErrorType::File)
    }
}

impl fmt::Display for CompilerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} [{}]",
            error_type_to_str(&self.error_type),
            self.msg,
            self.location
        )
    }
}

impl std::error::Error for CompilerError {}

// Adds more information to the CompilerError
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum ErrorType {
    File,
    Config,
    Schema,
    Compiler,
}

pub fn error_type_to_str(e_type: &ErrorType) -> &'static str {
    match e_type {
        ErrorType::File => "File Error",
        ErrorType::Config => "Malformed Config",
        ErrorType::Schema => "Malformed Schema",
        ErrorType::Compiler => "Compiler Bug",
    }
}

/// Returns a new CompilerError for a file that can't be read.
///
/// Usage: `return_file_error!(path, "message", { CompilationStage => "Loading" })`;
#[macro_export]
macro_rules! return_file_error {
    ($path:expr, $msg:expr, { $( $key:ident => $value:expr ),* $(,)? }) => {{
        let mut error = $crate::compiler_frontend::compiler_errors::CompilerError::file_error($path, $msg);
        $(
            error.new_metadata_entry($crate::compiler_frontend::compiler_errors::ErrorMetaDataKey::$key, $value);
        )*
        return Err(error);
    }};
    ($path:expr, $msg:expr) => {{
        return Err($crate::compiler_frontend::compiler_errors::CompilerError::file_error(
            $path, $msg,
        ));
    }};
}

/// Returns a new CompilerError for a config file that doesn't make sense.
///
/// Usage: `return_config_error!("message", location, { PrimarySuggestion => "..." })`;
#[macro_export]
macro_rules! return_config_error {
    ($msg:expr, $location:expr, { $( $key:ident => $value:expr ),* $(,)? }) => {
        return Err($crate::compiler_frontend::compiler_errors::CompilerError {
            msg: $msg.into(),
            location: $location,
            error_type: $crate::compiler_frontend::compiler_errors::ErrorType::Config,
            metadata: {
                let mut map = std::collections::HashMap::new();
                $( map.insert($crate::compiler_frontend::compiler_errors::ErrorMetaDataKey::$key, String::from($value)); )*
                map
            },
        })
    };
    ($msg:expr, $location:expr) => {
        return Err($crate::compiler_frontend::compiler_errors::CompilerError {
            msg: $msg.into(),
            location: $location,
            error_type: $crate::compiler_frontend::compiler_errors::ErrorType::Config,
            metadata: std::collections::HashMap::new(),
        })
    };
}

/// Returns a new CompilerError for a schema that isn't well formed.
///
/// Schema errors mean the parser handed over something the analysis can't trust,
/// such as ids that point nowhere or calls with the wrong number of arguments.
///
/// Usage: `return_schema_error!("message", location, { FunctionName => name })`;
#[macro_export]
macro_rules! return_schema_error {
    ($msg:expr, $location:expr, { $( $key:ident => $value:expr ),* $(,)? }) => {
        return Err($crate::compiler_frontend::compiler_errors::CompilerError {
            msg: $msg.into(),
            location: $location,
            error_type: $crate::compiler_frontend::compiler_errors::ErrorType::Schema,
            metadata: {
                let mut map = std::collections::HashMap::new();
                $( map.insert($crate::compiler_frontend::compiler_errors::ErrorMetaDataKey::$key, String::from($value)); )*
                map
            },
        })
    };
    ($msg:expr, $location:expr) => {
        return Err($crate::compiler_frontend::compiler_errors::CompilerError {
            msg: $msg.into(),
            location: $location,
            error_type: $crate::compiler_frontend::compiler_errors::ErrorType::Schema,
            metadata: std::collections::HashMap::new(),
        })
    };
}
