use std::net::SocketAddr;

use axum::handler::Handler;
use axum::http::{header, HeaderValue, Method, Request, Uri};
use axum::routing::get;
use axum::Router;
use roster_core::{EmployeeDirectory, RosterError};
use tokio::net::{TcpListener, ToSocketAddrs};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::rest;
use crate::{RosterAxumError, RosterAxumState};

pub const SEARCH_PATH: &str = "/api/v1/employees/search";

pub struct AxumApp {
    pub state: RosterAxumState,
    pub router: Router<()>,
}

impl Clone for AxumApp {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            router: self.router.clone(),
        }
    }
}

impl AxumApp {
    pub fn new(directory: EmployeeDirectory) -> Self {
        Self {
            state: RosterAxumState::new(directory),
            router: Router::new(),
        }
    }

    /// Key rate limiting on the first `x-forwarded-for` hop. Only for
    /// deployments behind a proxy that sets it; set before [`Self::use_search`].
    pub fn trust_forwarded_for(mut self, trust: bool) -> Self {
        self.state.trust_forwarded_for = trust;
        self
    }

    pub fn use_router(mut self, path: &str, router: Router<()>) -> Self {
        self.router = self.router.nest(path, router);
        self
    }

    pub fn use_get<H, T>(self, path: &str, handler: H) -> Self
    where
        H: Handler<T, ()> + Clone + Send + 'static,
        T: 'static,
    {
        let router = Router::new().route("/", get(handler));
        self.use_router(path, router)
    }

    /// Mount the employee search (`GET` and `POST`) at `path`.
    pub fn use_search(self, path: &str) -> Self {
        let router = rest::search_router(self.state.clone());
        self.use_router(path, router)
    }

    /// JSON 404 fallback, CORS, request ids and request tracing.
    ///
    /// Call after every route is mounted.
    pub fn with_http_layers(mut self) -> Self {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE]);

        self.router = self.router.fallback(not_found).layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(cors),
        );
        self
    }

    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        axum::serve(
            listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;
        Ok(())
    }
}

pub fn axum(directory: EmployeeDirectory) -> AxumApp {
    AxumApp::new(directory)
}

async fn not_found(uri: Uri) -> RosterAxumError {
    RosterError::not_found(format!("No route for {}", uri.path())).into()
}

#[derive(Debug, Clone, Copy, Default)]
struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}
