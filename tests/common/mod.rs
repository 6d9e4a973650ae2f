//! Shared fixtures for lifecycle integration tests.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use phased_server::host::MountError;
use phased_server::{BoxError, Handler, Hook, HostServer, TestCase};
use serde_json::{json, Value};

/// Ordered record of everything the fixtures observed.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

#[allow(dead_code)]
impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.entries().iter().filter(|e| e.starts_with(prefix)).count()
    }
}

/// Handle produced by [`RecordingHost`].
#[derive(Debug)]
pub struct FakeHandle {
    pub port: u16,
}

/// Host server that records calls instead of opening sockets.
#[derive(Default)]
pub struct RecordingHost {
    pub journal: Journal,
    pub fail_bind: bool,
    /// Number of upcoming `close` calls that fail.
    pub failing_closes: usize,
    pub reject_handler: Option<String>,
}

#[allow(dead_code)]
impl RecordingHost {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            ..Default::default()
        }
    }
}

impl HostServer for RecordingHost {
    type Handle = FakeHandle;

    fn mount(&mut self, handler: Handler) -> Result<(), MountError> {
        if self.reject_handler.as_deref() == Some(handler.name()) {
            return Err(MountError::Rejected {
                name: handler.name().to_string(),
                reason: "not a valid handler".to_string(),
            });
        }
        self.journal.push(format!("mount:{}", handler.name()));
        Ok(())
    }

    fn bind(&mut self, port: u16) -> impl Future<Output = Result<FakeHandle, BoxError>> + Send {
        let journal = self.journal.clone();
        let result: Result<FakeHandle, BoxError> = if self.fail_bind {
            Err("address already in use".into())
        } else {
            Ok(FakeHandle { port })
        };
        async move {
            journal.push(format!("bind:{port}"));
            result
        }
    }

    fn close<'a>(
        &'a mut self,
        handle: &'a mut FakeHandle,
    ) -> impl Future<Output = Result<(), BoxError>> + Send + 'a {
        let journal = self.journal.clone();
        let result: Result<(), BoxError> = if self.failing_closes > 0 {
            self.failing_closes -= 1;
            Err("close failed".into())
        } else {
            Ok(())
        };
        async move {
            journal.push(format!("close:{}", handle.port));
            result
        }
    }

    fn local_addr(&self, handle: &FakeHandle) -> Option<SocketAddr> {
        Some(SocketAddr::from(([127, 0, 0, 1], handle.port)))
    }
}

/// Hook resolving to `value` after `ms` milliseconds.
#[allow(dead_code)]
pub fn resolve_in(ms: u64, value: &'static str) -> Hook {
    Hook::from_fn(move || async move {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(json!(value))
    })
}

/// Hook failing with `message` after `ms` milliseconds.
#[allow(dead_code)]
pub fn reject_in(ms: u64, message: &'static str) -> Hook {
    Hook::from_fn(move || async move {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Err::<Value, BoxError>(message.into())
    })
}

/// Hook that records `label` in the journal and resolves to it.
#[allow(dead_code)]
pub fn journaled(journal: &Journal, label: &'static str) -> Hook {
    let journal = journal.clone();
    Hook::from_fn(move || {
        let journal = journal.clone();
        async move {
            journal.push(format!("hook:{label}"));
            Ok(json!(label))
        }
    })
}

/// Test case that records `label` in the journal and passes or fails.
#[allow(dead_code)]
pub fn journaled_test(journal: &Journal, label: &'static str, pass: bool) -> TestCase {
    let journal = journal.clone();
    TestCase::new(
        format!("{label} failed"),
        format!("{label} passed"),
        move || {
            let journal = journal.clone();
            async move {
                journal.push(format!("test:{label}"));
                if pass {
                    Ok(())
                } else {
                    Err(BoxError::from(format!("{label} probe error")))
                }
            }
        },
    )
}
