#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use warden_engine::{
    ApprovalError, ApprovalHandler, ApprovedPermissions, Disposition, MethodHandler,
    PermissionEngine,
};
use warden_types::{DomainId, PermissionsRequest, RpcRequest, RpcResponse};

/// Approver double fed a queue of scripted decisions. Unscripted calls are
/// rejected so tests fail loudly instead of hanging.
pub struct Approver {
    decisions: Mutex<VecDeque<Result<ApprovedPermissions, ApprovalError>>>,
}

impl Approver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            decisions: Mutex::new(VecDeque::new()),
        })
    }

    pub fn approve_next(&self, approved: Value) {
        let approved: ApprovedPermissions =
            serde_json::from_value(approved).expect("well-formed approval map");
        self.decisions.lock().unwrap().push_back(Ok(approved));
    }

    pub fn reject_next(&self, message: &str) {
        self.decisions
            .lock()
            .unwrap()
            .push_back(Err(ApprovalError::rejected(message)));
    }
}

#[async_trait]
impl ApprovalHandler for Approver {
    async fn request_approval(
        &self,
        _request: PermissionsRequest,
    ) -> Result<ApprovedPermissions, ApprovalError> {
        self.decisions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApprovalError::rejected("no scripted decision")))
    }
}

/// Restricted-method double: counts invocations and answers `"ok"`.
pub struct CountingHandler {
    calls: AtomicUsize,
}

impl CountingHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MethodHandler for CountingHandler {
    async fn handle(&self, _req: &RpcRequest, res: &mut RpcResponse) -> Disposition {
        self.calls.fetch_add(1, Ordering::SeqCst);
        res.result = Some(json!("ok"));
        Disposition::End
    }
}

pub struct Harness {
    pub engine: PermissionEngine,
    pub approver: Arc<Approver>,
    pub write_handler: Arc<CountingHandler>,
    pub read_handler: Arc<CountingHandler>,
}

pub fn harness() -> Harness {
    harness_with(|builder| builder)
}

pub fn harness_with(
    configure: impl FnOnce(warden_engine::EngineBuilder) -> warden_engine::EngineBuilder,
) -> Harness {
    let approver = Approver::new();
    let write_handler = CountingHandler::new();
    let read_handler = CountingHandler::new();
    let builder = PermissionEngine::builder()
        .with_safe_methods(["ping"])
        .with_restricted_method("write", "Write to the store", write_handler.clone())
        .with_restricted_method("read", "Read from the store", read_handler.clone())
        .with_approval_handler(approver.clone());
    let engine = configure(builder).build().expect("engine builds");
    Harness {
        engine,
        approver,
        write_handler,
        read_handler,
    }
}

pub async fn call(engine: &PermissionEngine, domain: &str, req: RpcRequest) -> (Disposition, RpcResponse) {
    let mut res = RpcResponse::new();
    let disposition = engine.handle(&DomainId::new(domain), &req, &mut res).await;
    (disposition, res)
}

pub fn error_code(res: &RpcResponse) -> i64 {
    res.error.as_ref().expect("an error is set").code
}
