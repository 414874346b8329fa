use tracing::debug;

use crate::engine::PermissionEngine;
use crate::executor;
use warden_types::{Disposition, DomainId, RpcError, RpcRequest, RpcResponse};

/// How an incoming method name classifies against the configuration.
#[derive(Debug, PartialEq, Eq)]
enum Route<'a> {
    Safe,
    Meta(MetaMethod),
    Restricted(&'a str),
}

#[derive(Debug, PartialEq, Eq)]
enum MetaMethod {
    GetPermissions,
    RequestPermissions,
    GrantPermissions,
    RevokePermissions,
}

fn classify<'a>(engine: &PermissionEngine, method: &'a str) -> Route<'a> {
    if engine.safe_methods().contains(method) {
        return Route::Safe;
    }
    if let Some(name) = method.strip_prefix(engine.method_prefix()) {
        let meta = match name {
            "getPermissions" => Some(MetaMethod::GetPermissions),
            "requestPermissions" => Some(MetaMethod::RequestPermissions),
            "grantPermissions" => Some(MetaMethod::GrantPermissions),
            "revokePermissions" => Some(MetaMethod::RevokePermissions),
            _ => None,
        };
        if let Some(meta) = meta {
            return Route::Meta(meta);
        }
    }
    Route::Restricted(method)
}

/// Route one request. Safe methods pass through with the response untouched;
/// everything else terminates here, with either a result or an error in the
/// response.
///
/// The caller-domain check gates only the meta and restricted paths: safe
/// methods bypass permissioning entirely, whoever is asking.
pub(crate) async fn route(
    engine: &PermissionEngine,
    domain: &DomainId,
    req: &RpcRequest,
    res: &mut RpcResponse,
) -> Disposition {
    match classify(engine, &req.method) {
        Route::Safe => {
            debug!(domain = %domain, method = %req.method, "safe method passthrough");
            Disposition::Next
        }
        _ if !domain.is_valid_caller() => {
            res.error = Some(RpcError::internal(format!(
                "`{domain}` is not a valid caller domain"
            )));
            Disposition::End
        }
        Route::Meta(meta) => {
            debug!(domain = %domain, method = %req.method, "meta method");
            match meta {
                MetaMethod::GetPermissions => get_permissions(engine, domain, res),
                MetaMethod::RequestPermissions => {
                    engine
                        .approvals()
                        .handle_request_permissions(engine.grants(), domain, req, res)
                        .await
                }
                MetaMethod::GrantPermissions => {
                    engine
                        .grants()
                        .handle_grant_permissions(engine.resolver(), domain, req, res)
                }
                MetaMethod::RevokePermissions => {
                    engine
                        .grants()
                        .handle_revoke_permissions(engine.resolver(), domain, req, res)
                }
            }
        }
        Route::Restricted(method) => {
            let resolved = match engine.resolver().resolve(domain, method) {
                Ok(resolved) => resolved,
                Err(err) => {
                    res.error = Some(RpcError::internal(err.to_string()));
                    return Disposition::End;
                }
            };
            match resolved {
                None => {
                    debug!(domain = %domain, method, "no permission resolved");
                    res.error = Some(RpcError::unauthorized(req));
                    Disposition::End
                }
                Some(permission) => {
                    executor::execute(engine.registry(), &permission, req, res).await
                }
            }
        }
    }
}

/// The `getPermissions` meta method: the caller's own permission list,
/// possibly empty. Always succeeds.
fn get_permissions(
    engine: &PermissionEngine,
    domain: &DomainId,
    res: &mut RpcResponse,
) -> Disposition {
    match engine
        .store()
        .get_permissions(domain)
        .map_err(|e| RpcError::internal(e.to_string()))
        .and_then(|permissions| {
            serde_json::to_value(&permissions).map_err(|e| RpcError::internal(e.to_string()))
        }) {
        Ok(value) => res.result = Some(value),
        Err(error) => res.error = Some(error),
    }
    Disposition::End
}
