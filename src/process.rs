//! Child-process execution for native index queries and Office automation.

use std::io;
use std::process::Stdio;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use tokio::process::Command;
use tracing::debug;

/// A fully described child-process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeCommand {
    pub program: String,
    pub args: Vec<String>,
    pub envs: Vec<(String, String)>,
}

impl NativeCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Look up an environment variable passed to the child.
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.envs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Build a `powershell.exe` invocation that runs `script` via `-EncodedCommand`.
///
/// The script travels as base64 UTF-16LE so no shell quoting applies; dynamic
/// values are passed separately through environment variables.
pub fn powershell(script: &str) -> NativeCommand {
    let utf16: Vec<u8> = script.encode_utf16().flat_map(u16::to_le_bytes).collect();
    NativeCommand::new("powershell.exe")
        .arg("-NoProfile")
        .arg("-NonInteractive")
        .arg("-ExecutionPolicy")
        .arg("Bypass")
        .arg("-EncodedCommand")
        .arg(STANDARD.encode(utf16))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the child was terminated by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// First non-empty stderr line, or a generic description of the exit status.
    pub fn failure_message(&self) -> String {
        self.stderr
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| match self.status {
                Some(code) => format!("exited with status {code}"),
                None => "terminated by signal".to_string(),
            })
    }
}

/// Runs native commands.
/// Implemented by `ProcessRunner` for production; mock implementations used in tests.
pub trait CommandRunner {
    async fn run(&self, command: &NativeCommand) -> io::Result<CommandOutput>;
}

/// Spawns a fresh child per call. The child is killed if the caller's future
/// is dropped, so index sessions and automation instances never outlive a request.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    async fn run(&self, command: &NativeCommand) -> io::Result<CommandOutput> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .envs(command.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .kill_on_drop(true);

        #[cfg(windows)]
        {
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        let output = cmd.output().await?;
        let result = CommandOutput {
            status: output.status.code(),
            stdout: decode_output(&output.stdout),
            stderr: decode_output(&output.stderr),
        };
        debug!(
            program = %command.program,
            status = ?result.status,
            stdout_bytes = output.stdout.len(),
            "child process finished"
        );
        Ok(result)
    }
}

/// Decode child output as UTF-8, dropping a BOM and replacing invalid sequences.
pub fn decode_output(bytes: &[u8]) -> String {
    let (text, _, had_errors) = encoding_rs::UTF_8.decode(bytes);
    if had_errors {
        debug!("child output was not valid UTF-8; invalid sequences replaced");
    }
    text.into_owned()
}
