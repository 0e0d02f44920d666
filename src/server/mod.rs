mod handlers;
mod label;
mod models;
mod state;
mod util;

pub use handlers::run_server;
