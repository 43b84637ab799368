use async_trait::async_trait;
use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::request::Parts,
};
use std::convert::Infallible;
use std::net::SocketAddr;

use crate::errors::RequestInfo;

impl RequestInfo {
    /// Method, path and, when the server was started with connect info, the peer address
    pub fn from_parts(parts: &Parts) -> Self {
        let remote_addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Self {
            method: parts.method.clone(),
            path: parts.uri.path().to_string(),
            remote_addr,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Method, Request};

    #[test]
    fn test_from_parts_without_connect_info() {
        let (parts, _) = Request::builder()
            .method(Method::DELETE)
            .uri("/users/42?force=true")
            .body(())
            .unwrap()
            .into_parts();

        let info = RequestInfo::from_parts(&parts);
        assert_eq!(info.method, Method::DELETE);
        assert_eq!(info.path, "/users/42");
        assert!(info.remote_addr.is_none());
    }

    #[test]
    fn test_from_parts_with_connect_info() {
        let addr: SocketAddr = "192.168.1.20:51000".parse().unwrap();
        let (mut parts, _) = Request::builder()
            .uri("/health")
            .body(())
            .unwrap()
            .into_parts();
        parts.extensions.insert(ConnectInfo(addr));

        let info = RequestInfo::from_parts(&parts);
        assert_eq!(info.method, Method::GET);
        assert_eq!(info.remote_addr, Some(addr));
    }
}
