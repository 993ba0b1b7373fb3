//! HTTP API handlers for kwaudit-ui

pub mod audits;
pub mod buildinfo;
pub mod csv;
pub mod directory;
pub mod error;
pub mod health;
pub mod keyword_sets;
pub mod results;
pub mod session;
pub mod suggestions;
pub mod ui;

pub use audits::audit_routes;
pub use csv::csv_routes;
pub use directory::directory_routes;
pub use health::health_routes;
pub use keyword_sets::keyword_set_routes;
pub use results::result_routes;
pub use session::session_routes;
pub use suggestions::suggestion_routes;
pub use ui::ui_routes;
