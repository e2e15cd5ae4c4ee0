pub mod braintree_service;
pub mod checkout_service;
