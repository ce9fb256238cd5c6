pub mod razorpay_client;
pub mod razorpay_signature;
