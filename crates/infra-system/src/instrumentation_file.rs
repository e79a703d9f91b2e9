// Instrumentation selection files
// Region filter files framed by the Score-P region-name markers

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use tracing::debug;

pub const HEADER: &str = "SCOREP_REGION_NAMES_BEGIN\nEXCLUDE *\nINCLUDE";
pub const FOOTER: &str = "SCOREP_REGION_NAMES_END";

/// Prepend the begin marker and the exclude-all / include directives
pub fn append_scorep_header(path: impl AsRef<Path>) -> io::Result<()> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    std::fs::write(path, format!("{HEADER}\n{content}"))?;
    debug!(path = %path.display(), "Prepended instrumentation header");
    Ok(())
}

pub fn append_scorep_footer(path: impl AsRef<Path>) -> io::Result<()> {
    let path = path.as_ref();
    let mut file = OpenOptions::new().append(true).open(path)?;
    file.write_all(FOOTER.as_bytes())?;
    debug!(path = %path.display(), "Appended instrumentation footer");
    Ok(())
}

/// Content of a framed file without its markers
pub fn strip_markers(path: impl AsRef<Path>) -> io::Result<String> {
    let content = std::fs::read_to_string(path)?;
    let body = content
        .strip_prefix(HEADER)
        .map(|rest| rest.strip_prefix('\n').unwrap_or(rest))
        .unwrap_or(&content);
    Ok(body.strip_suffix(FOOTER).unwrap_or(body).to_string())
}

/// Byte equality of two selection files; equal files mean the refinement converged
pub fn diff_inst_files(a: impl AsRef<Path>, b: impl AsRef<Path>) -> io::Result<bool> {
    Ok(std::fs::read(a)? == std::fs::read(b)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("instrumented-ct-astar.txt");
        std::fs::write(&path, "").unwrap();

        append_scorep_header(&path).unwrap();
        append_scorep_footer(&path).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "SCOREP_REGION_NAMES_BEGIN\nEXCLUDE *\nINCLUDE\nSCOREP_REGION_NAMES_END"
        );
        assert_eq!(strip_markers(&path).unwrap(), "");
    }

    #[test]
    fn test_round_trip_keeps_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        std::fs::write(&path, "main\nfoo\n").unwrap();

        append_scorep_header(&path).unwrap();
        append_scorep_footer(&path).unwrap();
        assert_eq!(strip_markers(&path).unwrap(), "main\nfoo\n");
    }

    #[test]
    fn test_diff_inst_files() {
        let dir = tempfile::tempdir().unwrap();
        let (a, b, c) = (dir.path().join("a"), dir.path().join("b"), dir.path().join("c"));
        for path in [&a, &b, &c] {
            std::fs::write(path, "main\n").unwrap();
            append_scorep_header(path).unwrap();
            append_scorep_footer(path).unwrap();
        }
        std::fs::write(&c, std::fs::read_to_string(&c).unwrap() + " ").unwrap();

        assert!(diff_inst_files(&a, &b).unwrap());
        assert!(!diff_inst_files(&a, &c).unwrap());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(append_scorep_header("/nonexistent/instr.txt").is_err());
    }
}
