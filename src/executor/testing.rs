// Test support: a scripted in-memory runner

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{DeploymentScript, OutputCapture, ScriptOutcome, ScriptRunner};
use crate::inventory::{ConnectionConfig, Host};
use crate::output::errors::DeployError;

/// What the scripted runner should do for one host
#[derive(Debug, Clone, Copy)]
pub(crate) enum Behavior {
    /// Exit zero after the base delay
    Succeed,
    /// Exit zero after the given delay
    SucceedAfter(Duration),
    /// Always exit with the given code
    Fail(i32),
    /// Exit with the given code after the given delay
    FailAfter(i32, Duration),
    /// Fail the first N attempts with the given code, then succeed
    FailTimes(u32, i32),
    /// Like `FailTimes`, but every attempt takes the given duration
    FailTimesAfter(u32, i32, Duration),
    /// Error out as if the host were unreachable
    ConnectError,
    /// Write partial output, then never return
    Hang(&'static str),
}

/// In-memory `ScriptRunner` driven by per-host behaviors.
///
/// Tracks attempt counts, the connection config each call saw, and a
/// high-water mark of concurrent invocations.
pub(crate) struct ScriptedRunner {
    behaviors: HashMap<String, Behavior>,
    base_delay: Duration,
    attempts: Mutex<HashMap<String, u32>>,
    users: Mutex<Vec<Option<String>>>,
    running: AtomicUsize,
    high_water: AtomicUsize,
}

/// Decrements the running gauge even when the attempt future is dropped
/// mid-flight by a timeout.
struct RunningGuard<'a>(&'a AtomicUsize);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedRunner {
    pub(crate) fn new() -> Self {
        ScriptedRunner {
            behaviors: HashMap::new(),
            base_delay: Duration::from_millis(10),
            attempts: Mutex::new(HashMap::new()),
            users: Mutex::new(Vec::new()),
            running: AtomicUsize::new(0),
            high_water: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_behavior(mut self, hostname: &str, behavior: Behavior) -> Self {
        self.behaviors.insert(hostname.to_string(), behavior);
        self
    }

    pub(crate) fn attempts_for(&self, hostname: &str) -> u32 {
        self.attempts.lock().get(hostname).copied().unwrap_or(0)
    }

    /// Highest number of concurrently running attempts observed
    pub(crate) fn max_concurrent(&self) -> usize {
        self.high_water.load(Ordering::SeqCst)
    }

    /// Connection users seen, one entry per attempt in call order
    pub(crate) fn seen_users(&self) -> Vec<Option<String>> {
        self.users.lock().clone()
    }
}

#[async_trait]
impl ScriptRunner for ScriptedRunner {
    async fn run(
        &self,
        _script: &DeploymentScript,
        host: &Host,
        conn: &ConnectionConfig,
        capture: &OutputCapture,
    ) -> Result<ScriptOutcome, DeployError> {
        let attempt = {
            let mut attempts = self.attempts.lock();
            let count = attempts.entry(host.hostname.clone()).or_insert(0);
            *count += 1;
            *count
        };
        self.users.lock().push(conn.user.clone());

        let current = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.high_water.fetch_max(current, Ordering::SeqCst);
        let _guard = RunningGuard(&self.running);

        let behavior = self
            .behaviors
            .get(&host.hostname)
            .copied()
            .unwrap_or(Behavior::Succeed);

        match behavior {
            Behavior::Succeed => {
                tokio::time::sleep(self.base_delay).await;
                capture.append_line("done");
                Ok(ScriptOutcome {
                    return_code: 0,
                    output: "done".to_string(),
                })
            }
            Behavior::SucceedAfter(delay) => {
                tokio::time::sleep(delay).await;
                capture.append_line("done");
                Ok(ScriptOutcome {
                    return_code: 0,
                    output: "done".to_string(),
                })
            }
            Behavior::Fail(code) => {
                tokio::time::sleep(self.base_delay).await;
                Ok(ScriptOutcome {
                    return_code: code,
                    output: "boom".to_string(),
                })
            }
            Behavior::FailAfter(code, delay) => {
                tokio::time::sleep(delay).await;
                Ok(ScriptOutcome {
                    return_code: code,
                    output: "boom".to_string(),
                })
            }
            Behavior::FailTimes(failures, code) => {
                tokio::time::sleep(self.base_delay).await;
                if attempt <= failures {
                    Ok(ScriptOutcome {
                        return_code: code,
                        output: "boom".to_string(),
                    })
                } else {
                    Ok(ScriptOutcome {
                        return_code: 0,
                        output: "recovered".to_string(),
                    })
                }
            }
            Behavior::FailTimesAfter(failures, code, delay) => {
                tokio::time::sleep(delay).await;
                if attempt <= failures {
                    Ok(ScriptOutcome {
                        return_code: code,
                        output: "boom".to_string(),
                    })
                } else {
                    Ok(ScriptOutcome {
                        return_code: 0,
                        output: "recovered".to_string(),
                    })
                }
            }
            Behavior::ConnectError => {
                tokio::time::sleep(self.base_delay).await;
                Err(DeployError::Connection {
                    host: host.hostname.clone(),
                    message: "connection refused".to_string(),
                    suggestion: None,
                })
            }
            Behavior::Hang(partial) => {
                if !partial.is_empty() {
                    capture.append_line(partial);
                }
                std::future::pending::<()>().await;
                unreachable!("pending future resolved")
            }
        }
    }
}
