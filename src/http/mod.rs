pub(crate) mod request;
pub(crate) mod response;

pub(crate) use request::split_path;
pub use request::{Method, Request};
pub use response::Response;
