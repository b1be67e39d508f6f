pub mod engine;
pub mod states;

pub use engine::{CheckoutDefinition, CheckoutEngine, CheckoutTransitionError, StandardCheckout};
pub use states::{CheckoutAction, CheckoutEvent, CheckoutState, TransitionOutcome};
