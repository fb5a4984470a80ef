//! Scripted stand-in for the bowtie2-build subprocess

use async_trait::async_trait;
use parking_lot::Mutex;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use vireo_core::error::{VireoError, VireoResult};
use vireo_tools::{ProcessOutput, ProcessRunner, BOWTIE2_SUFFIXES};

/// One recorded invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

/// Runner that never spawns anything.
///
/// On a zero exit code it materializes the six index parts at the output
/// prefix (the last argument), the way bowtie2-build would.
#[derive(Debug)]
pub struct ScriptedRunner {
    exit_code: i32,
    delay: Option<Duration>,
    stderr: String,
    invocations: Mutex<Vec<Invocation>>,
}

impl Default for ScriptedRunner {
    fn default() -> Self {
        Self::succeeding()
    }
}

impl ScriptedRunner {
    pub fn succeeding() -> Self {
        Self {
            exit_code: 0,
            delay: None,
            stderr: String::new(),
            invocations: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(exit_code: i32, stderr: &str) -> Self {
        Self {
            exit_code,
            stderr: stderr.to_string(),
            ..Self::succeeding()
        }
    }

    /// Sleep before "exiting"; long delays trip the caller's timeout
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.invocations.lock().len()
    }

    fn write_index_parts(prefix: &Path) -> VireoResult<()> {
        for suffix in BOWTIE2_SUFFIXES {
            let mut name = OsString::from(prefix.as_os_str());
            name.push(suffix);
            let path = PathBuf::from(name);
            std::fs::write(&path, b"bt2").map_err(|e| VireoError::filesystem(&path, e))?;
        }
        Ok(())
    }
}

#[async_trait]
impl ProcessRunner for ScriptedRunner {
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        timeout: Duration,
    ) -> VireoResult<ProcessOutput> {
        self.invocations.lock().push(Invocation {
            program: program.to_path_buf(),
            args: args.to_vec(),
        });

        if let Some(delay) = self.delay {
            if tokio::time::timeout(timeout, tokio::time::sleep(delay)).await.is_err() {
                return Err(VireoError::IndexerTimeout {
                    program: program.display().to_string(),
                    seconds: timeout.as_secs(),
                });
            }
        }

        if self.exit_code == 0 {
            if let Some(prefix) = args.last() {
                Self::write_index_parts(Path::new(prefix))?;
            }
        }

        Ok(ProcessOutput {
            code: Some(self.exit_code),
            stdout: String::new(),
            stderr: self.stderr.clone(),
        })
    }
}
