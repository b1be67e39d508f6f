pub mod checkout;
pub mod config;
pub mod domain;
pub mod resolver;
pub mod twofa;

pub use chrono;

pub use checkout::{
    CheckoutAction, CheckoutDefinition, CheckoutEngine, CheckoutEvent, CheckoutState,
    CheckoutTransitionError, StandardCheckout, TransitionOutcome,
};
pub use domain::order::{Order, OrderLine, StoredOrder, StoredOrderItem};
pub use domain::placement::{Placement, PlacementId, PlacementStatus};
pub use domain::product::{Product, StockCode};
pub use domain::sms::SmsMessage;
pub use resolver::{
    CapabilityError, MatchStrategy, OrderHistory, ProductCatalog, ProductRecommender,
    ProductResolver,
};
pub use twofa::{extract_code, CodeLookupError, CodeSource, ManualCodePrompt};
