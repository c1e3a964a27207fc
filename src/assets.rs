use std::path::PathBuf;

pub const DEFAULT_SOURCE_EXTS: [&str; 2] = ["svm", "asm"];

pub fn default_import_root() -> PathBuf {
    PathBuf::from(".")
}

pub fn default_source_exts() -> Vec<String> {
    DEFAULT_SOURCE_EXTS.iter().map(|ext| ext.to_string()).collect()
}
