//! Completion provider that shells out to a local model runner.
//!
//! The command gets the system and user prompt on stdin, separated by a
//! blank line, and must print the completion on stdout.

use anyhow::{anyhow, bail, Context, Result};
use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};
use std::thread;
use tracing::debug;

use docai_core::traits::Completer;

#[derive(Debug, Clone)]
pub struct CommandCompleter {
    program: String,
    args: Vec<String>,
}

impl CommandCompleter {
    pub fn new(argv: &[String]) -> Result<Self> {
        let Some((program, args)) = argv.split_first() else {
            bail!("llm.command is empty; set it in config.toml or APP_LLM__COMMAND");
        };
        Ok(Self { program: program.clone(), args: args.to_vec() })
    }
}

impl Completer for CommandCompleter {
    fn name(&self) -> &str { &self.program }

    fn complete(&self, system: &str, user: &str) -> Result<String> {
        debug!(program = %self.program, prompt_chars = system.len() + user.len(), "running completion command");
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to start '{}'", self.program))?;

        // Stdin is written on its own thread while stdout is drained here.
        let mut stdin = child.stdin.take().context("completion command has no stdin")?;
        let input = format!("{system}\n\n{user}\n");
        let writer = thread::spawn(move || match stdin.write_all(input.as_bytes()) {
            // A command that exits without reading its input is judged by its exit status.
            Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
            other => other,
        });

        let output = child.wait_with_output()?;
        let written = writer.join().map_err(|_| anyhow!("stdin writer for '{}' panicked", self.program))?;
        if !output.status.success() {
            bail!(
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        written?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}
