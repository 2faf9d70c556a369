pub mod gateway;
pub mod routes;

pub use gateway::{GatewayError, ReadGateway, SubmissionGateway};
pub use routes::{AppState, router};
