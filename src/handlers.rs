//! Request routing and per-action handlers.
//!
//! Every request is authorized first; only on allow does dispatch reach the
//! store. Dispatch is on method plus the `action` query parameter:
//! `get` (GET), `mpu-create` (POST), `mpu-uploadpart` (PUT),
//! `mpu-complete` (POST), `mpu-abort` (DELETE), `delete` (DELETE).

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use http::header::{CONTENT_LENGTH, CONTENT_TYPE, ETAG, LAST_MODIFIED};
use http::{HeaderValue, Method, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Bytes};
use hyper::{Request, Response};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::authz::AuthorizationGate;
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::multipart::MultipartUploadOrchestrator;
use crate::store::{ObjectStore, StoreError};
use crate::verifier::OrderVerification;

pub struct GatewayHandler {
    gate: AuthorizationGate,
    orchestrator: MultipartUploadOrchestrator,
    store: Arc<dyn ObjectStore>,
}

impl GatewayHandler {
    pub fn new(
        config: Arc<GatewayConfig>,
        verifier: Arc<dyn OrderVerification>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            gate: AuthorizationGate::new(config, verifier),
            orchestrator: MultipartUploadOrchestrator::new(store.clone()),
            store,
        }
    }

    /// Generic over the body so tests can drive it without a live
    /// connection; the server instantiates it with `hyper::body::Incoming`.
    pub async fn handle_request<B>(&self, req: Request<B>) -> Result<Response<Full<Bytes>>, Infallible>
    where
        B: Body + Send,
        B::Data: Send,
        B::Error: std::fmt::Display,
    {
        let (parts, body) = req.into_parts();

        let method = parts.method.clone();
        let path = parts.uri.path().to_string();
        let query = parts.uri.query().unwrap_or("").to_string();
        let params = parse_query(&query);
        let action = params.get("action").map(String::as_str);

        info!(
            method = %method,
            path = %path,
            action = ?action,
            "Incoming request"
        );

        if let Err(e) = self.gate.authorize(&parts.headers).await {
            let response: Response<Full<Bytes>> = e.into();
            info!(status = %response.status().as_u16(), "Request denied");
            return Ok(response);
        }

        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                error!(error = %e, "Failed to read request body");
                return Ok(internal_error_response());
            }
        };

        let key = path.trim_start_matches('/');
        let upload_id = params.get("uploadId").map(String::as_str);
        let part_number = params.get("partNumber").map(String::as_str);

        let response = match method {
            Method::GET | Method::PUT | Method::POST | Method::DELETE => {
                match (&method, action) {
                    (&Method::GET, Some("get")) => self.handle_get(key).await,
                    (&Method::POST, Some("mpu-create")) => self.handle_mpu_create(key).await,
                    (&Method::PUT, Some("mpu-uploadpart")) => {
                        self.handle_mpu_upload_part(key, upload_id, part_number, body)
                            .await
                    }
                    (&Method::POST, Some("mpu-complete")) => {
                        self.handle_mpu_complete(key, upload_id, &body).await
                    }
                    (&Method::DELETE, Some("mpu-abort")) => {
                        self.handle_mpu_abort(key, upload_id).await
                    }
                    (&Method::DELETE, Some("delete")) => self.handle_delete(key).await,
                    (_, Some(action)) => {
                        warn!(method = %method, action = %action, "Unknown action");
                        GatewayError::UnknownAction {
                            action: action.to_string(),
                            method: method.to_string(),
                        }
                        .into()
                    }
                    (_, None) => {
                        warn!(method = %method, "No action specified");
                        GatewayError::MissingAction(method.to_string()).into()
                    }
                }
            }
            _ => {
                warn!(method = %method, "Unsupported method");
                GatewayError::MethodNotAllowed.into()
            }
        };

        info!(status = %response.status().as_u16(), "Request completed");
        Ok(response)
    }

    async fn handle_get(&self, key: &str) -> Response<Full<Bytes>> {
        match self.store.get_object(key).await {
            Ok(object) => {
                let mut res = Response::new(Full::new(object.data));
                let headers = res.headers_mut();
                if let Ok(value) = HeaderValue::from_str(&object.content_type) {
                    headers.insert(CONTENT_TYPE, value);
                }
                headers.insert(CONTENT_LENGTH, HeaderValue::from(object.size));
                if let Ok(value) = HeaderValue::from_str(&object.etag) {
                    headers.insert(ETAG, value);
                }
                let last_modified = object
                    .last_modified
                    .format("%a, %d %b %Y %H:%M:%S GMT")
                    .to_string();
                if let Ok(value) = HeaderValue::from_str(&last_modified) {
                    headers.insert(LAST_MODIFIED, value);
                }
                res
            }
            Err(StoreError::NotFound(_)) => GatewayError::ObjectNotFound(key.to_string()).into(),
            Err(e) => {
                warn!(key = %key, error = %e, "Store failed to read object");
                GatewayError::StoreFailure(e.to_string()).into()
            }
        }
    }

    async fn handle_delete(&self, key: &str) -> Response<Full<Bytes>> {
        match self.store.delete_object(key).await {
            Ok(()) => no_content_response(),
            Err(e) => {
                warn!(key = %key, error = %e, "Store failed to delete object");
                GatewayError::StoreFailure(e.to_string()).into()
            }
        }
    }

    async fn handle_mpu_create(&self, key: &str) -> Response<Full<Bytes>> {
        match self.orchestrator.create(key).await {
            Ok(handle) => json_response(&handle),
            Err(e) => e.into(),
        }
    }

    async fn handle_mpu_upload_part(
        &self,
        key: &str,
        upload_id: Option<&str>,
        part_number: Option<&str>,
        body: Bytes,
    ) -> Response<Full<Bytes>> {
        match self
            .orchestrator
            .upload_part(key, upload_id, part_number, body)
            .await
        {
            Ok(part) => json_response(&part),
            Err(e) => e.into(),
        }
    }

    async fn handle_mpu_complete(
        &self,
        key: &str,
        upload_id: Option<&str>,
        body: &Bytes,
    ) -> Response<Full<Bytes>> {
        match self.orchestrator.complete(key, upload_id, body).await {
            Ok(etag) => {
                let mut res = Response::new(Full::new(Bytes::new()));
                match HeaderValue::from_str(&etag) {
                    Ok(value) => {
                        res.headers_mut().insert(ETAG, value);
                        res
                    }
                    Err(e) => {
                        error!(etag = %etag, error = %e, "Completed upload produced an unusable etag");
                        internal_error_response()
                    }
                }
            }
            Err(e) => e.into(),
        }
    }

    async fn handle_mpu_abort(&self, key: &str, upload_id: Option<&str>) -> Response<Full<Bytes>> {
        match self.orchestrator.abort(key, upload_id).await {
            Ok(()) => no_content_response(),
            Err(e) => e.into(),
        }
    }
}

fn parse_query(query: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for pair in query.split('&') {
        if let Some((key, value)) = pair.split_once('=') {
            params.insert(key.to_string(), value.to_string());
        }
    }
    params
}

fn json_response<T: Serialize>(value: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(value) {
        Ok(body) => {
            let mut res = Response::new(Full::new(Bytes::from(body)));
            res.headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            res
        }
        Err(e) => {
            error!(error = %e, "Failed to serialize response body");
            internal_error_response()
        }
    }
}

fn no_content_response() -> Response<Full<Bytes>> {
    let mut res = Response::new(Full::new(Bytes::new()));
    *res.status_mut() = StatusCode::NO_CONTENT;
    res
}

fn internal_error_response() -> Response<Full<Bytes>> {
    let mut res = Response::new(Full::new(Bytes::from("Internal server error")));
    *res.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    res
}
