use crate::error::RouteError;
use crate::http::{Request, Response};

/// Read-only hooks around each dispatch.
///
/// Every method has an empty default. Observers cannot change what the router
/// does; the router behaves the same with or without one.
pub trait Observer: Send + Sync + 'static {
    /// Called when a request reaches the router, before any matching.
    fn on_request(&self, _req: &Request) {}

    /// Called with the final response, just before the router returns it.
    fn before_send(&self, _res: &Response) {}

    /// Called by the transport after the response has been written.
    fn after_send(&self, _res: &Response) {}

    /// Called for every error that is not a deliberate abort, including
    /// panics caught at the router boundary.
    fn on_error(&self, _err: &RouteError) {}
}
