pub mod cart_service;
pub mod email_service;
pub mod order_service;
pub mod pricing_service;
pub mod review_service;
