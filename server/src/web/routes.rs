// hopz-server/src/web/routes.rs

use actix_web::web;

use super::handlers::{
  address_handlers as addresses, admin_handlers as admin, admin_return_handlers as admin_returns, auth_handlers as auth,
  cart_handlers as cart, contact_handlers as contacts, coupon_handlers as coupons, health_handlers as health,
  marketing_handlers as marketing, notification_handlers as notifications, order_handlers as orders,
  payment_handlers as payment, product_handlers as products, return_handlers as returns, review_handlers as reviews,
  search_handlers as search, settings_handlers as settings,
};

// Literal segments are registered before `{id}` patterns in every scope.
pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg
    .app_data(super::json_config())
    .app_data(super::path_config())
    .app_data(super::query_config())
    .route("/health", web::get().to(health::health_handler))
    .service(
      web::scope("/api")
        .route("/health", web::get().to(health::health_handler))
        .route("/search", web::get().to(search::search_handler))
        .service(
          web::scope("/auth")
            .route("/signup", web::post().to(auth::signup_handler))
            .route("/login", web::post().to(auth::login_handler))
            .route("/me", web::get().to(auth::me_handler))
            .route("/profile", web::put().to(auth::update_profile_handler))
            .route("/change-password", web::post().to(auth::change_password_handler))
            .route(
              "/notification-preferences",
              web::put().to(auth::notification_preferences_handler),
            ),
        )
        .service(
          web::scope("/addresses")
            .route("", web::get().to(addresses::list_addresses_handler))
            .route("", web::post().to(addresses::create_address_handler))
            .route("/{id}", web::delete().to(addresses::delete_address_handler)),
        )
        .service(
          web::scope("/products")
            .route("", web::get().to(products::list_products_handler))
            .route("", web::post().to(products::create_product_handler))
            .route("/{id}", web::get().to(products::get_product_handler))
            .route("/{id}", web::put().to(products::update_product_handler))
            .route("/{id}", web::delete().to(products::delete_product_handler)),
        )
        .service(
          web::scope("/cart")
            .route("", web::get().to(cart::get_cart_handler))
            .route("", web::post().to(cart::add_to_cart_handler))
            .route("", web::delete().to(cart::clear_cart_handler))
            .route("/merge", web::post().to(cart::merge_cart_handler))
            .route("/{id}", web::put().to(cart::update_cart_item_handler))
            .route("/{id}", web::delete().to(cart::remove_cart_item_handler)),
        )
        .service(
          web::scope("/orders")
            .route("", web::post().to(orders::create_order_handler))
            .route("", web::get().to(orders::list_orders_handler))
            .route("/my-orders", web::get().to(orders::my_orders_handler))
            .route("/track", web::post().to(orders::track_order_handler))
            .route("/{id}", web::get().to(orders::get_order_handler))
            .service(
              web::resource("/{id}/cancel")
                .route(web::patch().to(orders::cancel_order_handler))
                .route(web::put().to(orders::cancel_order_handler)),
            )
            .service(
              web::resource("/{id}/status")
                .route(web::patch().to(orders::update_order_status_handler))
                .route(web::put().to(orders::update_order_status_handler)),
            )
            .route(
              "/{id}/resend-notification",
              web::post().to(orders::resend_notification_handler),
            ),
        )
        .service(
          web::scope("/payment")
            .route("/intent", web::post().to(payment::create_intent_handler))
            .route("/verify", web::post().to(payment::verify_payment_handler))
            .route("/webhook", web::post().to(payment::webhook_handler)),
        )
        .service(
          web::scope("/returns")
            .route("/create", web::post().to(returns::create_return_handler))
            .route("/my-requests", web::get().to(returns::my_returns_handler))
            .route("/{id}", web::get().to(returns::get_return_handler))
            .route("/{id}/cancel", web::patch().to(returns::cancel_return_handler)),
        )
        .service(
          web::scope("/coupons")
            .route("", web::get().to(coupons::list_coupons_handler))
            .route("", web::post().to(coupons::create_coupon_handler))
            .route("/validate", web::post().to(coupons::validate_coupon_handler))
            .route("/{id}", web::put().to(coupons::update_coupon_handler))
            .route("/{id}", web::delete().to(coupons::delete_coupon_handler)),
        )
        .service(
          web::scope("/reviews")
            .route("", web::post().to(reviews::submit_review_handler))
            .route("/admin/all", web::get().to(reviews::list_all_reviews_handler))
            .route("/{id}", web::get().to(reviews::product_reviews_handler))
            .route("/{id}", web::delete().to(reviews::delete_review_handler))
            .route("/{id}/approve", web::put().to(reviews::approve_review_handler))
            .route("/{id}/feature", web::put().to(reviews::feature_review_handler)),
        )
        .service(
          web::scope("/notifications")
            .route("", web::get().to(notifications::my_notifications_handler))
            .route("/read-all", web::put().to(notifications::mark_all_read_handler))
            .route("/admin", web::get().to(notifications::admin_notifications_handler))
            .route("/{id}/read", web::put().to(notifications::mark_read_handler)),
        )
        .service(
          web::scope("/contacts")
            .route("", web::post().to(contacts::submit_contact_handler))
            .route("", web::get().to(contacts::list_contacts_handler))
            .route("/{id}", web::put().to(contacts::update_contact_handler)),
        )
        .service(
          web::scope("/marketing")
            .route("/flash-sales", web::post().to(marketing::create_flash_sale_handler))
            .route("/flash-sales", web::get().to(marketing::list_flash_sales_handler))
            .route("/flash-sales/active", web::get().to(marketing::active_flash_sale_handler))
            .route("/popups", web::post().to(marketing::create_popup_handler))
            .route("/popups/active", web::get().to(marketing::active_popup_handler))
            .route("/abandoned-carts", web::get().to(marketing::abandoned_carts_handler)),
        )
        .service(
          web::resource("/settings")
            .route(web::get().to(settings::get_settings_handler))
            .route(web::patch().to(settings::update_settings_handler)),
        )
        .service(
          web::resource("/content/{key}")
            .route(web::get().to(settings::get_content_handler))
            .route(web::put().to(settings::put_content_handler)),
        )
        .service(
          web::scope("/admin")
            .service(
              web::scope("/returns")
                .route("", web::get().to(admin_returns::list_returns_handler))
                .route("/stats/summary", web::get().to(admin_returns::return_stats_handler))
                .route("/{id}", web::get().to(admin_returns::get_return_handler))
                .route("/{id}/approve", web::patch().to(admin_returns::approve_return_handler))
                .route("/{id}/reject", web::patch().to(admin_returns::reject_return_handler))
                .route("/{id}/complete", web::patch().to(admin_returns::complete_return_handler)),
            )
            .route("/stats", web::get().to(admin::stats_handler))
            .route("/audit-logs", web::get().to(admin::audit_logs_handler))
            .route("/users", web::get().to(admin::list_users_handler))
            .route("/users/{id}/role", web::put().to(admin::update_role_handler))
            .route("/inventory/bulk-stock", web::put().to(admin::bulk_stock_handler))
            .route("/orders/{id}", web::delete().to(admin::delete_order_handler))
            .route("/orders/{id}/shipping-label", web::get().to(admin::shipping_label_handler)),
        ),
    );
}
