use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use filetime::FileTime;
use tracing::debug;

use crate::error::ToolError;

/// Copies descriptive metadata and dates from an input onto its
/// output, leaving the output's modification time equal to the
/// input's. Safe to repeat on an already-correct output.
pub trait MetadataSync {
    fn sync(&self, input: &Path, output: &Path) -> Result<(), ToolError>;
}

pub struct ExiftoolSync {
    binary: String,
}

impl ExiftoolSync {
    pub fn new(binary: &str) -> Self {
        ExiftoolSync { binary: String::from(binary) }
    }

    fn build_args(input: &Path, output: &Path) -> Vec<PathBuf> {
        fn pbs(s: &str) -> PathBuf { PathBuf::from(s) }

        vec![
            pbs("-q"),
            pbs("-overwrite_original"),
            pbs("-TagsFromFile"), PathBuf::from(input),
            pbs("-all:all"),
            pbs("-FileCreateDate<FileCreateDate"),
            pbs("-FileModifyDate<FileModifyDate"),
            PathBuf::from(output),
        ]
    }
}

impl MetadataSync for ExiftoolSync {
    fn sync(&self, input: &Path, output: &Path) -> Result<(), ToolError> {
        let result = Command::new(&self.binary)
            .args(ExiftoolSync::build_args(input, output))
            .stdin(Stdio::null())
            .output()
            .map_err(|e| ToolError::spawn(&self.binary, e))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(ToolError::failed(&self.binary, output, stderr.trim()));
        }

        copy_mtime(input, output)
            .map_err(|e| ToolError::failed(&self.binary, output, &format!("unable to set modification time: {}", e)))?;
        debug!(output = %output.display(), "metadata synced");
        Ok(())
    }
}

/// exiftool writes whole seconds; this carries the full precision.
pub fn copy_mtime(input: &Path, output: &Path) -> std::io::Result<()> {
    let metadata = fs::metadata(input)?;
    filetime::set_file_mtime(output, FileTime::from_last_modification_time(&metadata))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_args() {
        let args: Vec<String> = ExiftoolSync::build_args(Path::new("/in.mov"), Path::new("/out/in.hevc.mp4"))
            .iter().map(|p| p.to_string_lossy().into_owned()).collect();
        assert_eq!(args, vec![
            "-q", "-overwrite_original",
            "-TagsFromFile", "/in.mov",
            "-all:all",
            "-FileCreateDate<FileCreateDate",
            "-FileModifyDate<FileModifyDate",
            "/out/in.hevc.mp4",
        ]);
    }

    #[test]
    fn test_copy_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.mov");
        let output = dir.path().join("out.mp4");
        fs::write(&input, b"in").unwrap();
        fs::write(&output, b"out").unwrap();
        filetime::set_file_mtime(&input, FileTime::from_unix_time(1_500_000_000, 123_000_000)).unwrap();

        copy_mtime(&input, &output).unwrap();
        let a = FileTime::from_last_modification_time(&fs::metadata(&input).unwrap());
        let b = FileTime::from_last_modification_time(&fs::metadata(&output).unwrap());
        assert_eq!(a, b);
    }

    #[test]
    fn test_missing_binary() {
        let sync = ExiftoolSync::new("definitely-not-exiftool-4f2a");
        let result = sync.sync(Path::new("in.mov"), Path::new("out.mp4"));
        assert!(matches!(result, Err(ToolError::Spawn { .. })));
    }
}
