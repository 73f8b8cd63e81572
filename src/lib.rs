pub mod api_connection;
pub mod cli;
pub mod config;
pub mod logging;
pub mod nutrition_view;
pub mod recommendation_view;
pub mod response_merger;
pub mod session;
