pub mod handlers;
pub mod openapi;
pub mod request;
pub mod routes;
