use actix::fut::{ready, Ready};
use actix::Addr;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    error::{JsonPayloadError, PathError, QueryPayloadError},
    get, guard,
    http::{header::AUTHORIZATION, StatusCode},
    middleware::DefaultHeaders,
    web::{self, Data, JsonConfig, PathConfig, QueryConfig, ServiceConfig},
    FromRequest, HttpMessage, HttpRequest, HttpResponse,
};
use derive_more::{Display, Error};
use futures_util::future::LocalBoxFuture;
use serde::Serialize;
use std::sync::Arc;
use storefront_types::access::service::{AccessService, Authenticate};
use storefront_types::access::{SessionToken, Shopper};
use storefront_types::ServiceError;

pub mod access;
pub mod cart;
pub mod catalog;
pub mod order;

pub type Response = Result<HttpResponse, ControllerError>;

pub const MAX_BODY_SIZE: usize = 16 * 1024;

#[derive(Debug, Display, Error)]
pub enum ControllerError {
    #[display("{entity} not found")]
    NotFound { entity: &'static str },
    Unauthorized,
    #[error(ignore)]
    #[display("Invalid field {field}: {msg}")]
    InvalidInput { field: String, msg: String },
    #[error(ignore)]
    #[display("{_0}")]
    InternalServerError(anyhow::Error),
}

impl From<ServiceError> for ControllerError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound { entity } => Self::NotFound { entity },
            ServiceError::InvalidInput { field, msg } => Self::InvalidInput {
                field: field.to_string(),
                msg,
            },
            ServiceError::Store(err) => Self::InternalServerError(err),
        }
    }
}

impl From<anyhow::Error> for ControllerError {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalServerError(err)
    }
}

impl From<actix::MailboxError> for ControllerError {
    fn from(err: actix::MailboxError) -> Self {
        Self::InternalServerError(err.into())
    }
}

impl actix_web::error::ResponseError for ControllerError {
    fn status_code(&self) -> StatusCode {
        match self {
            ControllerError::Unauthorized => StatusCode::UNAUTHORIZED,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        log::warn!("{self:?}");
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.to_string()
        }))
    }
}

#[derive(Serialize)]
struct Envelope<T> {
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

pub fn reply<T: Serialize>(message: &'static str, data: T) -> HttpResponse {
    HttpResponse::Ok().json(Envelope {
        message,
        data: Some(data),
    })
}

pub fn acknowledge(message: &'static str) -> HttpResponse {
    HttpResponse::Ok().json(Envelope::<()> {
        message,
        data: None,
    })
}

pub fn success<T: Serialize>(data: T) -> Response {
    Ok(reply("success", data))
}

/// Shopper owning the bearer token of the current request.
#[derive(Clone, Debug)]
pub struct Identity {
    pub shopper: Shopper,
    pub token: SessionToken,
}

impl FromRequest for Identity {
    type Error = ControllerError;
    type Future = Ready<Result<Self, Self::Error>>;

    #[inline]
    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<Identity>()
                .cloned()
                .ok_or(ControllerError::Unauthorized),
        )
    }
}

fn bearer_token(req: &ServiceRequest) -> Option<SessionToken> {
    let value = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty())
        .then(|| SessionToken(token.to_string()))
}

/// Resolves `Authorization: Bearer` tokens into an [`Identity`].
pub struct SessionMiddlewareFactory {}

impl<S, B: 'static> Transform<S, ServiceRequest> for SessionMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Transform = SessionMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionMiddleware {
            service: Arc::new(service),
        }))
    }
}

pub struct SessionMiddleware<S> {
    service: Arc<S>,
}

impl<S, B> Service<ServiceRequest> for SessionMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        Box::pin(async move {
            let token = bearer_token(&req);
            let access = req.app_data::<Data<Addr<AccessService>>>().cloned();
            match (token, access) {
                (Some(token), Some(access)) => {
                    match access.send(Authenticate(token.clone())).await {
                        Ok(Ok(Some(shopper))) => {
                            req.extensions_mut().insert(Identity { shopper, token });
                        }
                        Ok(Ok(None)) => log::debug!("Unknown or expired session token"),
                        Ok(Err(err)) => log::error!("Unable to authenticate session:\n{err:?}"),
                        Err(err) => log::error!("Unable to send message to AccessService: {err}"),
                    }
                }
                (Some(_), None) => log::error!("AccessService is not registered"),
                _ => (),
            }
            service.call(req).await
        })
    }
}

fn json_error(err: JsonPayloadError, _: &HttpRequest) -> actix_web::Error {
    ControllerError::InvalidInput {
        field: "body".to_string(),
        msg: err.to_string(),
    }
    .into()
}

fn path_error(err: PathError, _: &HttpRequest) -> actix_web::Error {
    ControllerError::InvalidInput {
        field: "path".to_string(),
        msg: err.to_string(),
    }
    .into()
}

fn query_error(err: QueryPayloadError, _: &HttpRequest) -> actix_web::Error {
    ControllerError::InvalidInput {
        field: "query".to_string(),
        msg: err.to_string(),
    }
    .into()
}

/// Headers that let browsers on other origins call the API.
pub fn cors() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("Access-Control-Allow-Origin", "*"))
        .add(("Access-Control-Allow-Methods", "GET, POST, OPTIONS"))
        .add(("Access-Control-Allow-Headers", "Authorization, Content-Type"))
}

/// Answers CORS preflight requests for any path.
async fn preflight() -> HttpResponse {
    HttpResponse::NoContent()
        .insert_header(("Access-Control-Max-Age", "86400"))
        .finish()
}

#[get("/")]
async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body("Storefront API is running")
}

/// Registers every route together with the extractor configs that turn
/// malformed input into `400 {error}` responses.
pub fn configure(cfg: &mut ServiceConfig) {
    cfg.app_data(
        JsonConfig::default()
            .limit(MAX_BODY_SIZE)
            .error_handler(json_error),
    )
    .app_data(PathConfig::default().error_handler(path_error))
    .app_data(QueryConfig::default().error_handler(query_error))
    .service(index)
    .service(access::log_in)
    .service(access::log_out)
    .service(access::me)
    .service(catalog::categories)
    .service(catalog::search)
    .service(catalog::items)
    .service(catalog::item)
    .service(catalog::item_shops)
    .service(catalog::related_items)
    .service(cart::get_cart)
    .service(cart::add_to_cart)
    .service(cart::update_quantity)
    .service(cart::clear_cart)
    .service(order::place_order)
    .service(order::list_orders)
    .service(
        web::resource("/{tail:.*}")
            .guard(guard::Options())
            .to(preflight),
    );
}

#[cfg(test)]
mod tests;
