// hopz-server/src/services/mod.rs
pub mod audit;
pub mod auth_service;
pub mod mailer;
pub mod maintenance;
pub mod notification_service;
pub mod payment_gateway;
pub mod shipping_label;
