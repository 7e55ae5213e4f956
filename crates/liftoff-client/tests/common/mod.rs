//! Shared fixtures: a scripted resource manager and a platform install.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use liftoff_core::{
    ApplicationId, ApplicationReport, ApplicationState, ClusterMetrics, FileStatus, FinalStatus,
    ManagerError, ManagerResult, NewApplication, QueueAcl, QueueUserAcls, Resource,
    ResourceManager, SharedStore, StoreError, StorePath, StoreResult, SubmissionDescriptor, Token,
};
use liftoff_resolve::Registry;
use liftoff_stage::LocalStore;

pub const CLUSTER_TIMESTAMP: u64 = 1_700_000_000_000;

pub const PLATFORM_JARS: &[&str] = &[
    "liftoff-api.jar",
    "liftoff-common.jar",
    "liftoff-netlet.jar",
    "liftoff-bufferserver.jar",
    "liftoff-engine.jar",
    "validation-api.jar",
    "kryo.jar",
    "minlog.jar",
    "bval-jsr303.jar",
    "bval-core.jar",
    "commons-lang3.jar",
    "commons-beanutils.jar",
    "httpclient.jar",
    "httpcore.jar",
    "mbassador.jar",
    "jackson-core-asl.jar",
    "jackson-mapper-asl.jar",
    "xbean-asm5-shaded.jar",
    "jctools-core.jar",
];

/// Write empty platform archives under `<root>/lib` and return the
/// built-in registry pointing at them.
pub fn platform_registry(root: &Path) -> Registry {
    let lib = root.join("lib");
    fs::create_dir_all(&lib).unwrap();
    for jar in PLATFORM_JARS {
        fs::write(lib.join(jar), b"PK").unwrap();
    }
    Registry::builtin(&lib)
}

pub fn local_dir(root: &Path) -> PathBuf {
    let dir = root.join("local");
    fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn report(id: ApplicationId, state: ApplicationState, final_status: FinalStatus) -> ApplicationReport {
    ApplicationReport {
        application_id: id,
        name: "wordcount".to_string(),
        queue: "default".to_string(),
        user: "etl".to_string(),
        host: Some("node-1".to_string()),
        rpc_port: Some(8032),
        tracking_url: None,
        diagnostics: String::new(),
        start_time: CLUSTER_TIMESTAMP,
        state,
        final_status,
    }
}

/// In-memory resource manager that counts every call.
pub struct FakeManager {
    pub max_memory_mb: u32,
    pub next_id: Cell<u32>,
    pub calls: Cell<usize>,
    pub report_calls: Cell<usize>,
    pub kills: RefCell<Vec<ApplicationId>>,
    pub submitted: RefCell<Vec<SubmissionDescriptor>>,
    pub reports: RefCell<VecDeque<ApplicationReport>>,
    pub reject_with: Option<String>,
    pub started: Cell<bool>,
}

impl FakeManager {
    pub fn new(max_memory_mb: u32) -> Self {
        FakeManager {
            max_memory_mb,
            next_id: Cell::new(1),
            calls: Cell::new(0),
            report_calls: Cell::new(0),
            kills: RefCell::new(Vec::new()),
            submitted: RefCell::new(Vec::new()),
            reports: RefCell::new(VecDeque::new()),
            reject_with: None,
            started: Cell::new(false),
        }
    }

    /// Queue reports to return in order; the last one repeats.
    pub fn script(&self, reports: impl IntoIterator<Item = ApplicationReport>) {
        self.reports.borrow_mut().extend(reports);
    }

    pub fn last_submission(&self) -> SubmissionDescriptor {
        self.submitted.borrow().last().cloned().expect("nothing submitted")
    }

    fn tick(&self) {
        self.calls.set(self.calls.get() + 1);
    }
}

impl ResourceManager for FakeManager {
    fn start(&mut self) -> ManagerResult<()> {
        self.tick();
        self.started.set(true);
        Ok(())
    }

    fn stop(&mut self) {
        self.tick();
        self.started.set(false);
    }

    fn create_application(&self) -> ManagerResult<NewApplication> {
        self.tick();
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        Ok(NewApplication {
            application_id: ApplicationId::new(CLUSTER_TIMESTAMP, id),
            max_capability: Resource { memory_mb: self.max_memory_mb },
        })
    }

    fn submit_application(&self, descriptor: &SubmissionDescriptor) -> ManagerResult<()> {
        self.tick();
        if let Some(reason) = &self.reject_with {
            return Err(ManagerError::Rejected(reason.clone()));
        }
        self.submitted.borrow_mut().push(descriptor.clone());
        Ok(())
    }

    fn application_report(&self, id: ApplicationId) -> ManagerResult<ApplicationReport> {
        self.tick();
        self.report_calls.set(self.report_calls.get() + 1);
        let mut reports = self.reports.borrow_mut();
        let report = if reports.len() > 1 {
            reports.pop_front()
        } else {
            reports.front().cloned()
        };
        report.ok_or(ManagerError::UnknownApplication(id))
    }

    fn kill_application(&self, id: ApplicationId) -> ManagerResult<()> {
        self.tick();
        self.kills.borrow_mut().push(id);
        Ok(())
    }

    fn queue_acls(&self) -> ManagerResult<Vec<QueueUserAcls>> {
        self.tick();
        Ok(vec![QueueUserAcls {
            queue_name: "default".to_string(),
            user_acls: vec![QueueAcl::SubmitApplications],
        }])
    }

    fn cluster_metrics(&self) -> ManagerResult<ClusterMetrics> {
        self.tick();
        Ok(ClusterMetrics { node_managers: 3 })
    }

    fn delegation_token(&self, renewer: &str) -> ManagerResult<Token> {
        self.tick();
        Ok(Token {
            kind: "RM_DELEGATION_TOKEN".to_string(),
            service: "rm:8032".to_string(),
            renewer: renewer.to_string(),
            identifier: "rm-token-1".to_string(),
        })
    }
}

/// [`LocalStore`] that issues delegation tokens, or refuses to when
/// `token_error` is set.
pub struct SecureStore {
    pub inner: LocalStore,
    pub token_error: Option<String>,
}

impl SecureStore {
    pub fn new(root: &Path) -> Self {
        SecureStore {
            inner: LocalStore::new(root).unwrap(),
            token_error: None,
        }
    }
}

impl SharedStore for SecureStore {
    fn uri(&self) -> String {
        self.inner.uri()
    }

    fn copy_local_to_store(&self, src: &Path, dst: &StorePath, overwrite: bool) -> StoreResult<()> {
        self.inner.copy_local_to_store(src, dst, overwrite)
    }

    fn copy_store_to_store(&self, src: &StorePath, dst: &StorePath, overwrite: bool) -> StoreResult<()> {
        self.inner.copy_store_to_store(src, dst, overwrite)
    }

    fn list_children(&self, dir: &StorePath) -> StoreResult<Vec<FileStatus>> {
        self.inner.list_children(dir)
    }

    fn delete(&self, path: &StorePath, recursive: bool) -> StoreResult<bool> {
        self.inner.delete(path, recursive)
    }

    fn open_for_read(&self, path: &StorePath) -> StoreResult<Box<dyn Read>> {
        self.inner.open_for_read(path)
    }

    fn create_for_write(&self, path: &StorePath, overwrite: bool) -> StoreResult<Box<dyn Write>> {
        self.inner.create_for_write(path, overwrite)
    }

    fn get_status(&self, path: &StorePath) -> StoreResult<FileStatus> {
        self.inner.get_status(path)
    }

    fn rename(&self, from: &StorePath, to: &StorePath) -> StoreResult<()> {
        self.inner.rename(from, to)
    }

    fn mkdirs(&self, path: &StorePath) -> StoreResult<()> {
        self.inner.mkdirs(path)
    }

    fn delegation_tokens(&self, renewer: &str) -> StoreResult<Vec<Token>> {
        if let Some(reason) = &self.token_error {
            return Err(StoreError::Token(reason.clone()));
        }
        Ok(vec![Token {
            kind: "STORE_DELEGATION_TOKEN".to_string(),
            service: self.uri(),
            renewer: renewer.to_string(),
            identifier: "store-token-1".to_string(),
        }])
    }
}
