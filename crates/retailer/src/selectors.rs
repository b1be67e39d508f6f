//! Site-specific selector set for the Woolworths web flow. Brittle by
//! nature; every page-structure assumption lives here.

pub const LOGIN_USERNAME: &str = "input[name='username']";
pub const LOGIN_PASSWORD: &str = "input[name='password']";
pub const SUBMIT_BUTTON: &str = "button[type='submit']";

/// Interstitial shown before the one-time-code field on some logins.
pub const CONTINUE_LABEL: &str = "Continue";
pub const CODE_FIELD: &str = "input[type='text']";

pub const ADD_TO_CART: &str = "button.add-to-cart-btn";
pub const CART_BUTTON: &str = "#header-view-cart-button";

pub const UPSELL_TEXT: &str = "Have You Forgotten?";
pub const UPSELL_CONTINUE: &str = ".continue-button";
pub const TIME_SLOT: &str = ".time-slot";

pub const CVV_FIELD: &str = "input[name='txt-cvv_csv']";

pub fn product_details_url(store_url: &str, stock_code: &str) -> String {
    format!("{store_url}/shop/productdetails/{stock_code}")
}
