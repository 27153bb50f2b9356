// Copyright (c) The retell Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::ExpectedError;
use camino::Utf8PathBuf;
use std::path::Path;

#[cfg(windows)]
const GO_BINARY_NAME: &str = "go.exe";
#[cfg(not(windows))]
const GO_BINARY_NAME: &str = "go";

/// Locates the `go` binary on the search path.
pub(crate) fn find_go_binary() -> Result<Utf8PathBuf, ExpectedError> {
    let path = std::env::var_os("PATH").ok_or(ExpectedError::GoBinaryNotFound)?;
    for dir in std::env::split_paths(&path) {
        let candidate = dir.join(GO_BINARY_NAME);
        if is_executable(&candidate) {
            return Utf8PathBuf::from_path_buf(candidate)
                .map_err(|_| ExpectedError::GoBinaryNotFound);
        }
    }
    Err(ExpectedError::GoBinaryNotFound)
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Builds the `go test` argument list: `-json -v` is always added, and
/// redundant user-supplied copies are dropped.
pub(crate) fn go_test_args(forwarded: &[String]) -> Vec<String> {
    let mut args = vec!["test".to_owned(), "-json".to_owned(), "-v".to_owned()];
    args.extend(
        forwarded
            .iter()
            .filter(|arg| arg.as_str() != "-json" && arg.as_str() != "-v")
            .cloned(),
    );
    args
}

/// True when the forwarded arguments select specific tests or benchmarks.
pub(crate) fn is_selection(forwarded: &[String]) -> bool {
    forwarded.iter().any(|arg| {
        arg == "-run" || arg.starts_with("-run=") || arg == "-bench" || arg.starts_with("-bench=")
    })
}
