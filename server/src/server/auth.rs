use std::marker::PhantomData;

use axum::body::HttpBody;
use hyper::http::{header, Request, Response, StatusCode};
use log::{debug, trace};
use secrecy::{ExposeSecret, Secret};
use tower_http::validate_request::ValidateRequest;

/// Bearer auth that is only enforced when a token is configured.
pub(crate) struct MaybeBearer<ResBody> {
    token: Option<Secret<String>>,
    _ty: PhantomData<fn() -> ResBody>,
}

impl<ResBody> MaybeBearer<ResBody> {
    pub(crate) fn new(token: Option<Secret<String>>) -> Self {
        Self {
            token,
            _ty: PhantomData,
        }
    }
}

impl<ResBody> Clone for MaybeBearer<ResBody> {
    fn clone(&self) -> Self {
        Self {
            token: self.token.clone(),
            _ty: PhantomData,
        }
    }
}

impl<B, ResBody> ValidateRequest<B> for MaybeBearer<ResBody>
where
    ResBody: HttpBody + Default,
{
    type ResponseBody = ResBody;

    fn validate(&mut self, request: &mut Request<B>) -> Result<(), Response<Self::ResponseBody>> {
        let Some(token) = &self.token else {
            trace!("Bearer auth token not set. Not enforcing bearer auth.");
            return Ok(());
        };

        let presented = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));
        match presented {
            Some(presented) if presented == token.expose_secret() => Ok(()),
            Some(_) => Err(unauthorized("Bearer auth token mismatch")),
            None => Err(unauthorized("Bearer auth token missing")),
        }
    }
}

fn unauthorized<ResBody: Default>(reason: &str) -> Response<ResBody> {
    debug!("Authentication denied. {reason}.");
    let mut response = Response::new(ResBody::default());
    *response.status_mut() = StatusCode::UNAUTHORIZED;
    response
}
