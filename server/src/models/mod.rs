// hopz-server/src/models/mod.rs

//! Data structures representing database rows.

pub mod address;
pub mod audit_log;
pub mod cart_item;
pub mod contact;
pub mod coupon;
pub mod marketing;
pub mod notification;
pub mod order;
pub mod order_item;
pub mod product;
pub mod return_request;
pub mod review;
pub mod user;

pub use address::{Address, AddressSnapshot};
pub use audit_log::AuditLog;
pub use cart_item::CartItem;
pub use contact::ContactForm;
pub use coupon::Coupon;
pub use marketing::{AbandonedCartRow, FlashSale, MarketingPopup};
pub use notification::Notification;
pub use order::Order;
pub use order_item::OrderItem;
pub use product::{Product, ProductStatus};
pub use return_request::ReturnRequest;
pub use review::Review;
pub use user::{PublicUser, Role, User};
