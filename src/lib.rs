pub mod api_router;
pub mod auth;
pub mod channels;
pub mod commands;
pub mod config;
pub mod forwarding;
pub mod routing_admin;
pub mod shared;
pub mod store;
