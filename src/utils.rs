use std::path::{Path, PathBuf};

use crate::error::LogsError;

/// REST path of the complete-log download for `log_name` on `instance`.
pub fn download_path(instance: &str, log_name: &str) -> String {
    format!(
        "/v13/downloadCompleteLogFile/{}/{}",
        instance,
        log_name.trim_start_matches('/')
    )
}

/// Local file name for a log: everything after the category prefix, so
/// `error/mysql-error.log` becomes `mysql-error.log`. Names without a
/// category are used as they are.
pub fn output_file_name(log_name: &str) -> Result<&str, LogsError> {
    let file_name = match log_name.split_once('/') {
        Some((_, rest)) => rest,
        None => log_name,
    };

    if file_name.is_empty()
        || Path::new(file_name).is_absolute()
        || file_name.split('/').any(|c| c == "..")
    {
        return Err(LogsError::Config(format!(
            "cannot derive an output file name from log '{}'",
            log_name
        )));
    }

    Ok(file_name)
}

/// Where a downloaded log ends up inside `output_dir`.
pub fn output_path(output_dir: &Path, log_name: &str) -> Result<PathBuf, LogsError> {
    Ok(output_dir.join(output_file_name(log_name)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_strips_category() {
        let path = output_path(Path::new("/tmp"), "error/mysql-error.log").unwrap();
        assert_eq!(path, PathBuf::from("/tmp/mysql-error.log"));
    }

    #[test]
    fn test_output_path_keeps_nested_segments() {
        let path = output_path(Path::new("out"), "audit/server/audit.log").unwrap();
        assert_eq!(path, PathBuf::from("out/server/audit.log"));
    }

    #[test]
    fn test_output_file_name_without_category() {
        assert_eq!(output_file_name("postgresql.log").unwrap(), "postgresql.log");
    }

    #[test]
    fn test_output_file_name_rejects_empty_and_traversal() {
        assert!(matches!(output_file_name("error/"), Err(LogsError::Config(_))));
        assert!(matches!(output_file_name("error/../passwd"), Err(LogsError::Config(_))));
        assert!(matches!(output_file_name("error//etc/passwd"), Err(LogsError::Config(_))));
    }

    #[test]
    fn test_download_path() {
        assert_eq!(
            download_path("mydb", "error/log1"),
            "/v13/downloadCompleteLogFile/mydb/error/log1"
        );
    }
}
