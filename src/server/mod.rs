mod error;
mod search;
pub mod server;
pub mod state;

pub use error::ApiError;
pub(self) use search::make_search_routes;
pub use server::{make_app, run_server};
pub use state::ServerState;
