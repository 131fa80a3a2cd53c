//! External agent invocation
//!
//! Runs `codex exec` against a prepared workspace with a bounded timeout,
//! the keep-alive feeder on stdin and stdout/stderr forwarded live to the
//! shared console.
//!
//! The agent is spawned as the leader of its own process group. Whatever it
//! leaves behind in that group is killed once the job ends, so no helper
//! process outlives the job or keeps its output pipes open.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{ChildStdin, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use command_group::{CommandGroup, GroupChild};
use indexer_core::short_commit;

use crate::feeder::NewlineFeeder;
use crate::formatting::format_duration;
use crate::output::{Console, LockedWriter};
use crate::prompt::DEFAULT_PROMPT;

/// Agent executable looked up on `PATH` by default
pub const DEFAULT_AGENT_PROGRAM: &str = "codex";

/// Interval between keep-alive newlines after the first one
pub const DEFAULT_KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(30);

pub const ENV_COLLECTION_SLUG: &str = "COLLECTION_SLUG";
pub const ENV_BASE_COMMIT: &str = "INDEX_BASE_COMMIT";
pub const ENV_DIFF_FILES: &str = "INDEX_DIFF_FILES";

/// How often a bounded run checks whether the child has exited
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long output forwarders may keep draining once the process group is gone
const DRAIN_GRACE: Duration = Duration::from_millis(500);

const SANDBOX_ARGS: [&str; 3] = [
    "--sandbox",
    "danger-full-access",
    "--dangerously-bypass-approvals-and-sandbox",
];

/// Agent settings shared by every job of a run
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub program: PathBuf,
    pub prompt: String,
    /// `None` means unbounded
    pub timeout: Option<Duration>,
    pub keep_alive: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_AGENT_PROGRAM),
            prompt: DEFAULT_PROMPT.to_string(),
            timeout: None,
            keep_alive: DEFAULT_KEEP_ALIVE_INTERVAL,
        }
    }
}

impl AgentConfig {
    /// Sets the per-job timeout; zero means unbounded
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }
}

/// One agent invocation
#[derive(Debug, Clone, Copy)]
pub struct AgentJob<'a> {
    pub workspace: &'a Path,
    pub slug: &'a str,
    /// Cached revision the change set was computed against
    pub base_commit: Option<&'a str>,
    pub changed_files: &'a [String],
    pub dry_run: bool,
}

/// What happened to the agent process
#[derive(Debug)]
pub enum AgentOutcome {
    /// Nothing was started
    DryRun,
    /// Exit status 0
    Completed { elapsed: Duration },
    /// Non-zero exit, or the child could not be waited on
    Failed { exit_code: i32, detail: String },
    /// Killed after the deadline
    TimedOut { exit_code: i32, after: Duration },
    /// The process never started
    StartFailed { detail: String },
}

impl AgentOutcome {
    /// Whether a process was started
    pub fn ran(&self) -> bool {
        matches!(
            self,
            AgentOutcome::Completed { .. } | AgentOutcome::Failed { .. } | AgentOutcome::TimedOut { .. }
        )
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            AgentOutcome::Failed { exit_code, .. } | AgentOutcome::TimedOut { exit_code, .. } => {
                Some(*exit_code)
            }
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, AgentOutcome::TimedOut { .. })
    }

    /// Error text recorded on the job result
    pub fn error_message(&self) -> Option<String> {
        match self {
            AgentOutcome::DryRun | AgentOutcome::Completed { .. } => None,
            AgentOutcome::Failed { detail, .. } => Some(format!("codex exec: {}", detail)),
            AgentOutcome::TimedOut { after, .. } => Some(format!(
                "codex exec deadline exceeded after {}: process killed",
                format_duration(*after)
            )),
            AgentOutcome::StartFailed { detail } => Some(format!("codex exec: {}", detail)),
        }
    }
}

/// Environment added on top of the inherited one
pub fn agent_env(
    slug: &str,
    base_commit: Option<&str>,
    changed_files: &[String],
) -> Vec<(&'static str, String)> {
    let mut env = vec![(ENV_COLLECTION_SLUG, slug.to_string())];
    if let Some(base) = base_commit.filter(|b| !b.is_empty()) {
        env.push((ENV_BASE_COMMIT, base.to_string()));
    }
    if !changed_files.is_empty() {
        env.push((ENV_DIFF_FILES, changed_files.join("\n")));
    }
    env
}

/// Result of waiting on the child
enum Waited {
    Exited(ExitStatus),
    TimedOut(ExitStatus),
}

/// Runs the agent process for one job
#[derive(Clone)]
pub struct AgentInvoker {
    config: AgentConfig,
}

impl AgentInvoker {
    pub fn new(config: AgentConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    fn command(&self, job: &AgentJob<'_>) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.arg("exec")
            .arg("--cd")
            .arg(job.workspace)
            .args(SANDBOX_ARGS)
            .arg(&self.config.prompt)
            .current_dir(job.workspace)
            .envs(agent_env(job.slug, job.base_commit, job.changed_files));
        cmd
    }

    fn describe(&self, job: &AgentJob<'_>) -> String {
        let mut desc = format!(
            "[dry-run] {}={:?} {} exec --cd {:?} {} '<PROMPT>'",
            ENV_COLLECTION_SLUG,
            job.slug,
            self.config.program.display(),
            job.workspace,
            SANDBOX_ARGS.join(" ")
        );
        if let Some(base) = job.base_commit {
            desc.push_str(&format!(" (incremental from {})", short_commit(base)));
        }
        desc
    }

    /// Runs the agent and reports how it ended
    ///
    /// The keep-alive feeder is closed on every path out of this function.
    pub fn run(&self, console: &Console, job: &AgentJob<'_>) -> AgentOutcome {
        if job.dry_run {
            console.info(self.describe(job));
            return AgentOutcome::DryRun;
        }

        let mut cmd = self.command(job);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        console.info("running Codex indexing");
        let started = Instant::now();

        let mut child = match cmd.group_spawn() {
            Ok(child) => child,
            Err(e) => {
                let detail = format!("start {}: {}", self.config.program.display(), e);
                console.warn(format!("Codex could not be started: {}", e));
                return AgentOutcome::StartFailed { detail };
            }
        };

        let feeder = NewlineFeeder::new(self.config.keep_alive);
        let closer = feeder.closer();
        let _close_guard = closer.close_on_drop();

        let stdio = child.inner();
        let keep_alive = stdio.stdin.take().map(|stdin| spawn_keep_alive(feeder, stdin));
        let forwarders: Vec<JoinHandle<()>> = [
            stdio.stdout.take().map(|out| spawn_forwarder(out, console.stdout())),
            stdio.stderr.take().map(|err| spawn_forwarder(err, console.stderr())),
        ]
        .into_iter()
        .flatten()
        .collect();

        let waited = wait_with_deadline(&mut child, self.config.timeout);
        kill_group(&mut child);

        closer.close();
        if let Some(handle) = keep_alive {
            join_quietly(handle, "keep-alive");
        }
        join_forwarders(forwarders, DRAIN_GRACE);

        match waited {
            Ok(Waited::Exited(status)) => {
                if status.success() {
                    let elapsed = started.elapsed();
                    console.info(format!("Codex indexing completed in {}", format_duration(elapsed)));
                    AgentOutcome::Completed { elapsed }
                } else {
                    let exit_code = status.code().unwrap_or(1);
                    console.warn(format!("Codex exited with code {}", exit_code));
                    AgentOutcome::Failed {
                        exit_code,
                        detail: status.to_string(),
                    }
                }
            }
            Ok(Waited::TimedOut(status)) => {
                let after = self.config.timeout.unwrap_or_else(|| started.elapsed());
                console.warn(format!("Codex timed out after {}", format_duration(after)));
                AgentOutcome::TimedOut {
                    exit_code: status.code().unwrap_or(1),
                    after,
                }
            }
            Err(e) => {
                console.warn(format!("waiting for Codex failed: {}", e));
                AgentOutcome::Failed {
                    exit_code: 1,
                    detail: format!("wait: {}", e),
                }
            }
        }
    }
}

/// Waits for the group leader, killing the whole group once `timeout` has elapsed
fn wait_with_deadline(child: &mut GroupChild, timeout: Option<Duration>) -> io::Result<Waited> {
    let Some(timeout) = timeout else {
        return child.wait().map(Waited::Exited);
    };

    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Waited::Exited(status));
        }

        let now = Instant::now();
        if now >= deadline {
            if let Err(e) = child.kill() {
                log::debug!("kill after deadline failed: {}", e);
            }
            return child.wait().map(Waited::TimedOut);
        }
        thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

/// Kills whatever is left of the agent's process group
fn kill_group(child: &mut GroupChild) {
    // Fails with ESRCH when the leader left nothing behind
    if let Err(e) = child.kill() {
        log::debug!("process group already gone: {}", e);
    }
}

fn spawn_keep_alive(mut feeder: NewlineFeeder, mut stdin: ChildStdin) -> JoinHandle<()> {
    thread::spawn(move || {
        // Ends on feeder EOF (closed) or a broken pipe (child gone); dropping
        // stdin then delivers EOF to the child.
        if let Err(e) = io::copy(&mut feeder, &mut stdin) {
            log::debug!("keep-alive input stopped: {}", e);
        }
    })
}

fn spawn_forwarder<R>(mut reader: R, mut sink: LockedWriter) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buf = [0u8; 8192];
        let mut sink_ok = true;
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    // Keep draining after a sink failure so the child never
                    // blocks on a full pipe.
                    if sink_ok {
                        if let Err(e) = sink.write_all(&buf[..n]) {
                            log::warn!("agent output forwarding failed: {}", e);
                            sink_ok = false;
                        }
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::debug!("agent output stream closed: {}", e);
                    break;
                }
            }
        }
    })
}

/// Joins forwarders until `grace` runs out; stragglers are left detached
fn join_forwarders(handles: Vec<JoinHandle<()>>, grace: Duration) {
    let deadline = Instant::now() + grace;
    for handle in handles {
        while !handle.is_finished() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep(POLL_INTERVAL.min(deadline - now));
        }
        if handle.is_finished() {
            join_quietly(handle, "output forwarder");
        } else {
            log::debug!("output pipe still open after {:?}; detaching forwarder", grace);
        }
    }
}

fn join_quietly(handle: JoinHandle<()>, what: &str) {
    if handle.join().is_err() {
        log::warn!("{} thread panicked", what);
    }
}
