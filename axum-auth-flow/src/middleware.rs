use std::{
    fmt,
    sync::Arc,
    task::{Context, Poll},
};

use futures::future::BoxFuture;
use http::{Request, Response, StatusCode};
use tower_layer::Layer;
use tower_service::Service;
use tower_sessions::Session;
use tracing::Instrument;

use crate::{
    identity::display_id, CurrentUser, Error, RequestAttributes, Segment, SessionSegment,
    SharedIdentity, UserId,
};

/// Default name of the session segment.
pub const DEFAULT_SEGMENT: &str = "axum-auth-flow";

/// Default segment field holding the user id.
pub const DEFAULT_USER_ID_FIELD: &str = "user_id";

/// Builds the identity of a request from the user id found in the session.
pub type IdentityFactory = Arc<dyn Fn(Option<UserId>) -> SharedIdentity + Send + Sync>;

/// A layer attaching a [`SharedIdentity`] to every request and writing the
/// identity's id back into the session once the response is ready.
///
/// The session itself comes from `tower_sessions`, so the session layer must
/// be installed outside of this one.
///
/// Per request the layer:
///
/// 1. restores a fresh identity from the segment's user id field,
/// 2. inserts [`RequestAttributes`] with that identity as `user`, and the
///    [`Segment`], into the request extensions,
/// 3. calls the inner service,
/// 4. reads `user` back from the attributes, which the handler may have
///    replaced, and stores its id in the session.
///
/// When `user` no longer holds an identity, step 4 only logs a warning and
/// the response goes out untouched.
#[derive(Clone)]
pub struct AuthUserLayer {
    segment_name: Arc<str>,
    user_id_field: Arc<str>,
    identity_factory: IdentityFactory,
}

impl Default for AuthUserLayer {
    fn default() -> Self {
        Self {
            segment_name: DEFAULT_SEGMENT.into(),
            user_id_field: DEFAULT_USER_ID_FIELD.into(),
            identity_factory: Arc::new(CurrentUser::shared),
        }
    }
}

impl AuthUserLayer {
    /// Creates a layer using the default segment and field names.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the user id in segment `name`.
    pub fn with_segment(mut self, name: impl AsRef<str>) -> Self {
        self.segment_name = name.as_ref().into();
        self
    }

    /// Stores the user id under `field`.
    pub fn with_user_id_field(mut self, field: impl AsRef<str>) -> Self {
        self.user_id_field = field.as_ref().into();
        self
    }

    /// Builds request identities with `factory` instead of [`CurrentUser`].
    pub fn with_identity_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(Option<UserId>) -> SharedIdentity + Send + Sync + 'static,
    {
        self.identity_factory = Arc::new(factory);
        self
    }

    /// The segment name.
    pub fn segment_name(&self) -> &str {
        &self.segment_name
    }

    /// The user id field.
    pub fn user_id_field(&self) -> &str {
        &self.user_id_field
    }

    /// Builds a fresh identity from the user id stored in `segment`.
    ///
    /// A stored value that is not a user id is logged and treated as absent.
    pub async fn restore(&self, segment: &dyn SessionSegment) -> Result<SharedIdentity, Error> {
        let user_id = match segment.get(&self.user_id_field).await? {
            Some(value) => match serde_json::from_value::<Option<UserId>>(value) {
                Ok(user_id) => user_id,
                Err(err) => {
                    tracing::warn!(
                        err = %err,
                        field = %self.user_id_field,
                        "stored user id is unreadable; treating request as anonymous"
                    );
                    None
                }
            },
            None => None,
        }
        .filter(|user_id| !user_id.is_empty());

        Ok((self.identity_factory)(user_id))
    }

    /// Attaches `identity` as the `user` attribute of `req`.
    ///
    /// Reuses the request's [`RequestAttributes`] when an outer layer already
    /// installed them.
    pub fn attach<B>(&self, req: &mut Request<B>, identity: SharedIdentity) -> RequestAttributes {
        let attributes = RequestAttributes::from_extensions(req.extensions()).unwrap_or_default();

        let user_id = identity.id();
        tracing::info!(
            user.id = display_id(user_id.as_ref()),
            "inject user into request"
        );
        attributes.set_user(identity);
        req.extensions_mut().insert(attributes.clone());

        attributes
    }

    /// Writes the id of the current `user` attribute into `segment`.
    ///
    /// Leaves the session untouched, with a warning, when `user` is not a
    /// [`SharedIdentity`].
    pub async fn reconcile(
        &self,
        attributes: &RequestAttributes,
        segment: &dyn SessionSegment,
    ) -> Result<(), Error> {
        let Some(user) = attributes.user() else {
            tracing::warn!(
                "request attribute `user` is not a `UserIdentity`; session left untouched"
            );
            return Ok(());
        };

        let user_id = user.id();
        tracing::info!(
            user.id = display_id(user_id.as_ref()),
            "store user id in session"
        );
        segment
            .set(&self.user_id_field, serde_json::to_value(&user_id)?)
            .await
    }
}

impl fmt::Debug for AuthUserLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthUserLayer")
            .field("segment_name", &self.segment_name)
            .field("user_id_field", &self.user_id_field)
            .finish_non_exhaustive()
    }
}

impl<S> Layer<S> for AuthUserLayer {
    type Service = AuthUserService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthUserService {
            inner,
            layer: self.clone(),
        }
    }
}

/// The service produced by [`AuthUserLayer`].
#[derive(Debug, Clone)]
pub struct AuthUserService<S> {
    inner: S,
    layer: AuthUserLayer,
}

fn internal_error<ResBody: Default>() -> Response<ResBody> {
    let mut res = Response::default();
    *res.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    res
}

impl<ReqBody, ResBody, S> Service<Request<ReqBody>> for AuthUserService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
    ResBody: Default + Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    #[inline]
    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let span = tracing::info_span!("auth_user", user.id = tracing::field::Empty);

        let layer = self.layer.clone();

        // The inner service may only be called once it is ready, so keep the
        // ready one and leave the clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(
            async move {
                let Some(session) = req.extensions().get::<Session>().cloned() else {
                    tracing::error!("session not found in request extensions");
                    return Ok(internal_error());
                };
                let segment = Segment::new(session, layer.segment_name());

                let identity = match layer.restore(&segment).await {
                    Ok(identity) => identity,
                    Err(err) => {
                        tracing::error!(err = %err, "could not restore user from session");
                        return Ok(internal_error());
                    }
                };

                if let Some(user_id) = identity.id() {
                    tracing::Span::current().record("user.id", user_id.as_str());
                }

                let attributes = layer.attach(&mut req, identity);
                req.extensions_mut().insert(segment.clone());

                let res = inner.call(req).await?;

                if let Err(err) = layer.reconcile(&attributes, &segment).await {
                    tracing::error!(err = %err, "could not store user id in session");
                    return Ok(internal_error());
                }

                Ok(res)
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::{
        convert::Infallible,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use axum::body::Body;
    use http::header::{COOKIE, SET_COOKIE};
    use serde_json::json;
    use tower::{ServiceBuilder, ServiceExt};
    use tower_sessions::{MemoryStore, SessionManagerLayer};

    use super::*;
    use crate::memory::MemorySegment;

    #[test]
    fn attach_installs_identity() {
        let layer = AuthUserLayer::new();
        let identity = CurrentUser::shared(Some(UserId::new("42")));
        let mut req = Request::new(());

        let attributes = layer.attach(&mut req, Arc::clone(&identity));

        let seen = RequestAttributes::from_extensions(req.extensions())
            .and_then(|attributes| attributes.user())
            .unwrap();
        assert!(Arc::ptr_eq(&seen, &identity));
        assert!(attributes.user().is_some());
    }

    #[test]
    fn attach_reuses_existing_attributes() {
        let layer = AuthUserLayer::new();
        let outer = RequestAttributes::new();
        outer.insert("theme", "dark".to_string());
        let mut req = Request::new(());
        req.extensions_mut().insert(outer.clone());

        layer.attach(&mut req, CurrentUser::shared(None));

        assert!(outer.user().is_some());
        assert_eq!(
            RequestAttributes::from_extensions(req.extensions())
                .and_then(|attributes| attributes.get::<String>("theme")),
            Some("dark".to_string())
        );
    }

    #[tokio::test]
    async fn reconcile_stores_replaced_identity() {
        let layer = AuthUserLayer::new();
        let segment = MemorySegment::new();
        let mut req = Request::new(());
        let attributes = layer.attach(&mut req, CurrentUser::shared(None));

        attributes.set_user(CurrentUser::shared(Some(UserId::new("42"))));
        layer.reconcile(&attributes, &segment).await.unwrap();

        assert_eq!(segment.get("user_id").await.unwrap(), Some(json!("42")));
    }

    #[tokio::test]
    async fn reconcile_stores_null_for_anonymous() {
        let layer = AuthUserLayer::new().with_user_id_field("uid");
        let segment = MemorySegment::new();
        let attributes = RequestAttributes::new();
        attributes.set_user(CurrentUser::shared(None));

        layer.reconcile(&attributes, &segment).await.unwrap();

        assert_eq!(segment.get("uid").await.unwrap(), Some(json!(null)));
    }

    #[tokio::test]
    async fn reconcile_skips_foreign_user_attribute() {
        let layer = AuthUserLayer::new();
        let segment = MemorySegment::new();
        segment.set("user_id", json!("7")).await.unwrap();
        let attributes = RequestAttributes::new();
        attributes.insert("user", "not an identity".to_string());

        layer.reconcile(&attributes, &segment).await.unwrap();

        assert_eq!(segment.get("user_id").await.unwrap(), Some(json!("7")));
    }

    #[tokio::test]
    async fn restore_reads_segment() {
        let layer = AuthUserLayer::new();
        let segment = MemorySegment::new();

        assert_eq!(layer.restore(&segment).await.unwrap().id(), None);

        segment.set("user_id", json!("42")).await.unwrap();
        assert_eq!(
            layer.restore(&segment).await.unwrap().id(),
            Some(UserId::new("42"))
        );

        segment.set("user_id", json!("")).await.unwrap();
        assert_eq!(layer.restore(&segment).await.unwrap().id(), None);
    }

    #[tokio::test]
    async fn restore_treats_foreign_id_as_anonymous() {
        let layer = AuthUserLayer::new();
        let segment = MemorySegment::new();

        segment.set("user_id", json!(42)).await.unwrap();
        assert_eq!(layer.restore(&segment).await.unwrap().id(), None);

        segment.set("user_id", json!({ "id": "42" })).await.unwrap();
        assert_eq!(layer.restore(&segment).await.unwrap().id(), None);
    }

    #[tokio::test]
    async fn restore_uses_identity_factory() {
        #[derive(Debug)]
        struct Fixed;

        impl crate::UserIdentity for Fixed {
            fn id(&self) -> Option<UserId> {
                Some(UserId::new("fixed"))
            }

            fn set_id(&self, _id: Option<UserId>) {}
        }

        let layer = AuthUserLayer::new().with_identity_factory(|_| Arc::new(Fixed));
        let identity = layer.restore(&MemorySegment::new()).await.unwrap();

        assert_eq!(identity.id(), Some(UserId::new("fixed")));
    }

    async fn handler(req: Request<Body>) -> Result<Response<Body>, Infallible> {
        let attributes = RequestAttributes::from_extensions(req.extensions()).unwrap();
        let user = attributes.require_user().unwrap();

        let path = req.uri().path().to_owned();
        match path.as_str() {
            "/login" => user.set_id(Some(UserId::new("42"))),
            "/swap" => attributes.set_user(CurrentUser::shared(Some(UserId::new("99")))),
            "/break" => attributes.insert("user", 0_u8),
            "/corrupt" => {
                let session = req.extensions().get::<Session>().cloned().unwrap();
                session.insert(DEFAULT_SEGMENT, "garbage").await.unwrap();
            }
            _ => {}
        }

        let body = user.id().map(|id| id.to_string()).unwrap_or_default();
        Ok(Response::new(Body::from(body)))
    }

    async fn body_string(res: Response<Body>) -> String {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn session_round_trip() {
        let session_layer = SessionManagerLayer::new(MemoryStore::default()).with_secure(false);
        let service = ServiceBuilder::new()
            .layer(session_layer)
            .layer(AuthUserLayer::new())
            .service_fn(handler);

        let req = Request::get("/login").body(Body::empty()).unwrap();
        let res = service.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let session_cookie = res.headers().get(SET_COOKIE).unwrap().clone();
        assert_eq!(body_string(res).await, "42");

        let req = Request::get("/")
            .header(COOKIE, session_cookie.clone())
            .body(Body::empty())
            .unwrap();
        let res = service.clone().oneshot(req).await.unwrap();
        assert_eq!(body_string(res).await, "42");

        let req = Request::get("/swap")
            .header(COOKIE, session_cookie.clone())
            .body(Body::empty())
            .unwrap();
        service.clone().oneshot(req).await.unwrap();

        let req = Request::get("/")
            .header(COOKIE, session_cookie.clone())
            .body(Body::empty())
            .unwrap();
        let res = service.clone().oneshot(req).await.unwrap();
        assert_eq!(body_string(res).await, "99");

        let req = Request::get("/break")
            .header(COOKIE, session_cookie.clone())
            .body(Body::empty())
            .unwrap();
        let res = service.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let req = Request::get("/")
            .header(COOKIE, session_cookie)
            .body(Body::empty())
            .unwrap();
        let res = service.oneshot(req).await.unwrap();
        assert_eq!(body_string(res).await, "99");
    }

    #[tokio::test]
    async fn missing_session_layer_is_an_internal_error() {
        let service = ServiceBuilder::new()
            .layer(AuthUserLayer::new())
            .service_fn(handler);

        let req = Request::get("/").body(Body::empty()).unwrap();
        let res = service.oneshot(req).await.unwrap();

        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    fn bare_session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn request_with(session: &Session, path: &str) -> Request<Body> {
        let mut req = Request::get(path).body(Body::empty()).unwrap();
        req.extensions_mut().insert(session.clone());
        req
    }

    #[tokio::test]
    async fn inner_errors_pass_through() {
        let session = bare_session();
        let service = AuthUserLayer::new().layer(tower::service_fn(|_req: Request<Body>| async {
            Err::<Response<Body>, &'static str>("boom")
        }));

        let err = service
            .oneshot(request_with(&session, "/"))
            .await
            .unwrap_err();

        assert_eq!(err, "boom");
        assert_eq!(
            session.get::<serde_json::Value>(DEFAULT_SEGMENT).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn unreadable_segment_is_an_internal_error() {
        let session = bare_session();
        session.insert(DEFAULT_SEGMENT, "garbage").await.unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let service = AuthUserLayer::new().layer(tower::service_fn({
            let calls = Arc::clone(&calls);
            move |req| {
                calls.fetch_add(1, Ordering::SeqCst);
                handler(req)
            }
        }));

        let res = service
            .oneshot(request_with(&session, "/"))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_session_write_is_an_internal_error() {
        let session = bare_session();
        let service = AuthUserLayer::new().layer(tower::service_fn(handler));

        let res = service
            .oneshot(request_with(&session, "/corrupt"))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            session.get::<String>(DEFAULT_SEGMENT).await.unwrap().as_deref(),
            Some("garbage")
        );
    }

    #[tokio::test]
    async fn foreign_user_id_does_not_lock_out() {
        let session = bare_session();
        let segment = Segment::new(session.clone(), DEFAULT_SEGMENT);
        segment.set("user_id", json!(42)).await.unwrap();
        let service = AuthUserLayer::new().layer(tower::service_fn(handler));

        let res = service
            .clone()
            .oneshot(request_with(&session, "/"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_string(res).await, "");

        let res = service
            .oneshot(request_with(&session, "/login"))
            .await
            .unwrap();
        assert_eq!(body_string(res).await, "42");
        assert_eq!(segment.get("user_id").await.unwrap(), Some(json!("42")));
    }
}
