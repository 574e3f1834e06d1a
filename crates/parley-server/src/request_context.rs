use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use parley_config::IdentityConfig;
use parley_core::RequestContext;
use parley_core::identity::resolve_user;

/// Attach a `RequestContext` carrying the resolved end user
pub async fn request_context_middleware(identity: IdentityConfig, request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();

    let user = resolve_user(&parts.headers, &identity.header, &identity.default_user);
    tracing::debug!(user_id = %user.principal_id, "resolved request user");

    let context = RequestContext {
        parts: parts.clone(),
        user,
    };

    let mut request = Request::from_parts(parts, body);
    request.extensions_mut().insert(context);

    next.run(request).await
}
