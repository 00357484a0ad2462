//! The capability interface for raster transforms.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// One file-in/file-out transform invocation.
#[derive(Debug, Clone, Copy)]
pub struct TransformJob<'a> {
    /// Chart identifier.
    pub asset: &'a str,
    /// Name of the artifact being produced (the chart identifier, or a part
    /// name for a split chart).
    pub artifact: &'a str,
    /// Input file.
    pub input: &'a Path,
    /// Where the transform must write its result.
    pub output: &'a Path,
}

/// A raster transform.
///
/// Implementations must be deterministic for a given input and must write
/// only to `job.output`. The pipeline publishes that file under its final
/// name after `apply` returns `Ok`.
pub trait Transform {
    /// Short name for logging.
    fn name(&self) -> &str;

    /// Produce `job.output` from `job.input`.
    fn apply(&self, job: &TransformJob<'_>) -> Result<(), TransformError>;
}

impl<T: Transform + ?Sized> Transform for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn apply(&self, job: &TransformJob<'_>) -> Result<(), TransformError> {
        (**self).apply(job)
    }
}

/// Errors raised by a single transform invocation.
#[derive(Debug, Error)]
pub enum TransformError {
    /// The external tool could not be started.
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The external tool exited unsuccessfully.
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    /// The transform reported success without producing its output.
    #[error("transform produced no output at {}", .0.display())]
    MissingOutput(PathBuf),

    /// The finished output could not be moved into place.
    #[error("failed to publish {}: {source}", .path.display())]
    Publish {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Any other failure.
    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Touch;

    impl Transform for Touch {
        fn name(&self) -> &str {
            "touch"
        }

        fn apply(&self, job: &TransformJob<'_>) -> Result<(), TransformError> {
            std::fs::write(job.output, job.artifact)
                .map_err(|e| TransformError::Other(e.to_string()))
        }
    }

    #[test]
    fn test_boxed_transform_delegates() {
        let temp = tempfile::TempDir::new().unwrap();
        let input = temp.path().join("in.tif");
        let output = temp.path().join("out.tif");
        std::fs::write(&input, b"x").unwrap();

        let boxed: Box<dyn Transform> = Box::new(Touch);
        let job = TransformJob {
            asset: "Seattle",
            artifact: "Seattle",
            input: &input,
            output: &output,
        };
        boxed.apply(&job).unwrap();

        assert_eq!(boxed.name(), "touch");
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "Seattle");
    }

    #[test]
    fn test_failed_display() {
        let err = TransformError::Failed {
            program: "gdalwarp".to_string(),
            status: "exit status: 1".to_string(),
            stderr: "ERROR 4: missing.shp".to_string(),
        };
        assert!(err.to_string().contains("gdalwarp"));
        assert!(err.to_string().contains("missing.shp"));
    }
}
