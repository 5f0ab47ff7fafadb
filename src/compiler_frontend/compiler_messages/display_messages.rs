use crate::compiler_frontend::compiler_errors::{CompilerError, CompilerMessages, ErrorType};
use saying::say;
use std::env;
use std::path::{Path, PathBuf};

fn normalize_display_path(path: &Path) -> PathBuf {
    let path_string = path.to_string_lossy();
    if let Some(stripped) = path_string.strip_prefix(r"\\?\") {
        return PathBuf::from(stripped);
    }

    path.to_path_buf()
}

fn relative_display_path(file: &Path) -> String {
    let normalized_file = normalize_display_path(file);

    match env::current_dir() {
        Ok(dir) => {
            let normalized_dir = normalize_display_path(&dir);
            normalized_file
                .strip_prefix(&normalized_dir)
                .unwrap_or(&normalized_file)
                .to_string_lossy()
                .to_string()
        }
        Err(_) => normalized_file.to_string_lossy().to_string(),
    }
}

pub fn print_compiler_messages(messages: CompilerMessages) {
    for err in messages.errors {
        print_formatted_error(err);
    }
}

pub fn print_formatted_error(e: CompilerError) {
    let relative_dir = e
        .location
        .file
        .as_deref()
        .map(relative_display_path)
        .unwrap_or_default();

    match e.error_type {
        ErrorType::File => {
            say!(Yellow "Can't find/read file or directory: ", relative_dir);
            say!(e.msg);
            return;
        }

        ErrorType::Config => {
            if !relative_dir.is_empty() {
                say!("\n", Dark Magenta relative_dir);
            }
            say!(Yellow "CONFIG FILE ISSUE - ");
            say!(Dark Yellow "Malformed analysis config, something inside it doesn't make sense");
        }

        ErrorType::Schema => {
            if !relative_dir.is_empty() {
                say!("\n", Dark Magenta relative_dir);
            }
            say!(Red "Schema");
        }

        ErrorType::Compiler => {
            if !relative_dir.is_empty() {
                say!("\n", Dark Magenta relative_dir);
            }
            say!(Yellow "COMPILER BUG - ");
            say!(Dark Yellow "analysis developer skill issue (not your fault)");
        }
    }

    say!(Red e.msg);

    if let Some(node) = e.location.node {
        say!(Dark Magenta "At ", Bright {node});
    }

    let mut metadata = e.metadata.into_iter().collect::<Vec<_>>();
    metadata.sort_by_key(|(key, _)| format!("{key:?}"));
    for (key, value) in metadata {
        say!(Dark "  ", {format!("{key:?}")}, ": ", value);
    }
}
