//! Fake collaborators for pipeline and HTTP tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use dronevault_fsops::{ToolError, ToolInvocation, ToolOutput, ToolRunner};

/// Reply scripted for one invocation of a program.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Exit zero with the given stdout.
    Succeed(String),
    /// Exit with `code` and the given stderr.
    Fail {
        /// Exit code.
        code: i32,
        /// Captured stderr.
        stderr: String,
    },
    /// The program cannot be launched.
    Missing,
    /// The program exceeds its time budget.
    TimeOut,
}

/// Tool runner that records every invocation in order and replies from a script.
///
/// Programs without a scripted reply succeed with empty output.
#[derive(Clone, Default)]
pub struct RecordingToolRunner {
    inner: Arc<Mutex<Recording>>,
}

#[derive(Default)]
struct Recording {
    calls: Vec<ToolInvocation>,
    replies: HashMap<String, VecDeque<ScriptedReply>>,
}

impl RecordingToolRunner {
    /// Runner where every program succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `reply` for the next invocation of `program`.
    #[must_use]
    pub fn with_reply(self, program: &str, reply: ScriptedReply) -> Self {
        self.lock()
            .replies
            .entry(program.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    /// Every invocation so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<ToolInvocation> {
        self.lock().calls.clone()
    }

    /// Every invocation so far as `argv` vectors.
    #[must_use]
    pub fn argv(&self) -> Vec<Vec<String>> {
        self.lock().calls.iter().map(ToolInvocation::argv).collect()
    }

    /// Program names invoked so far, in order.
    #[must_use]
    pub fn programs(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .map(|call| call.program.clone())
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Recording> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl ToolRunner for RecordingToolRunner {
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
        let reply = {
            let mut recording = self.lock();
            recording.calls.push(invocation.clone());
            recording
                .replies
                .get_mut(&invocation.program)
                .and_then(VecDeque::pop_front)
        };
        match reply.unwrap_or_else(|| ScriptedReply::Succeed(String::new())) {
            ScriptedReply::Succeed(stdout) => Ok(ToolOutput::ok(stdout)),
            ScriptedReply::Fail { code, stderr } => Ok(ToolOutput::failed(code, stderr)),
            ScriptedReply::Missing => Err(ToolError::Spawn {
                program: invocation.program.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "No such file or directory",
                ),
            }),
            ScriptedReply::TimeOut => Err(ToolError::TimedOut {
                program: invocation.program.clone(),
                after: std::time::Duration::from_secs(1),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replies_are_consumed_per_program_in_order() -> anyhow::Result<()> {
        let runner = RecordingToolRunner::new().with_reply(
            "lasinfo",
            ScriptedReply::Fail {
                code: 1,
                stderr: "corrupt header".into(),
            },
        );
        let invocation = ToolInvocation::new("lasinfo").arg("-i");

        let first = runner.run(&invocation).await?;
        assert!(!first.success);
        assert_eq!(first.diagnostic(), "corrupt header");

        let second = runner.run(&invocation).await?;
        assert!(second.success);

        assert!(matches!(
            runner
                .clone()
                .with_reply("PotreeConverter", ScriptedReply::Missing)
                .run(&ToolInvocation::new("PotreeConverter"))
                .await,
            Err(ToolError::Spawn { .. })
        ));
        assert_eq!(
            runner.programs(),
            vec!["lasinfo", "lasinfo", "PotreeConverter"]
        );
        Ok(())
    }
}
