use thiserror::Error;

use crate::checkout::states::{CheckoutAction, CheckoutEvent, CheckoutState, TransitionOutcome};

/// A checkout flow definition: which state the run starts in, and which
/// transitions are legal. The orchestrator driving the browser session
/// advances one of these at every step, so an out-of-order step surfaces
/// as a transition error instead of silent page drift.
pub trait CheckoutDefinition {
    fn initial_state(&self) -> CheckoutState;
    fn transition(
        &self,
        current: &CheckoutState,
        event: &CheckoutEvent,
    ) -> Result<TransitionOutcome, CheckoutTransitionError>;
}

/// The single-session retailer checkout: authentication, second factor,
/// cart population, conditional cart/checkout controls, delivery slot or
/// upsell branch, payment confirmation.
#[derive(Clone, Debug, Default)]
pub struct StandardCheckout;

impl CheckoutDefinition for StandardCheckout {
    fn initial_state(&self) -> CheckoutState {
        CheckoutState::Start
    }

    fn transition(
        &self,
        current: &CheckoutState,
        event: &CheckoutEvent,
    ) -> Result<TransitionOutcome, CheckoutTransitionError> {
        transition_standard(current, event)
    }
}

pub struct CheckoutEngine<F> {
    flow: F,
}

impl<F> CheckoutEngine<F>
where
    F: CheckoutDefinition,
{
    pub fn new(flow: F) -> Self {
        Self { flow }
    }

    pub fn initial_state(&self) -> CheckoutState {
        self.flow.initial_state()
    }

    pub fn apply(
        &self,
        current: &CheckoutState,
        event: &CheckoutEvent,
    ) -> Result<TransitionOutcome, CheckoutTransitionError> {
        self.flow.transition(current, event)
    }
}

impl Default for CheckoutEngine<StandardCheckout> {
    fn default() -> Self {
        Self::new(StandardCheckout)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CheckoutTransitionError {
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: CheckoutState, event: CheckoutEvent },
    #[error("checkout already finished in terminal state {state:?}")]
    Terminal { state: CheckoutState },
}

fn transition_standard(
    current: &CheckoutState,
    event: &CheckoutEvent,
) -> Result<TransitionOutcome, CheckoutTransitionError> {
    use CheckoutAction::{PersistOrder, ReleaseSession};
    use CheckoutEvent::{
        CartPopulated, CartPopulationStarted, CheckoutOpened, CodeSubmitted,
        CredentialsSubmitted, DeliveryStepReached, PaymentSubmitted, SecondFactorPrompted,
        SlotSelected, StepFailed, UpsellDismissed,
    };
    use CheckoutState::{
        Authenticating, AwaitingSecondFactor, CartReview, Checkout, DeliverySlotSelection,
        Failed, PaymentConfirmation, Placed, PopulatingCart, SecondFactorSubmitted, Start,
    };

    if current.is_terminal() {
        return Err(CheckoutTransitionError::Terminal { state: *current });
    }

    let (to, actions) = match (current, event) {
        (Start, CredentialsSubmitted) => (Authenticating, Vec::new()),
        (Authenticating, SecondFactorPrompted) => (AwaitingSecondFactor, Vec::new()),
        (AwaitingSecondFactor, CodeSubmitted) => (SecondFactorSubmitted, Vec::new()),
        (SecondFactorSubmitted, CartPopulationStarted) => (PopulatingCart, Vec::new()),
        (PopulatingCart, CartPopulated) => (CartReview, Vec::new()),
        (CartReview, CheckoutOpened) => (Checkout, Vec::new()),
        (Checkout, DeliveryStepReached) => (DeliverySlotSelection, Vec::new()),
        // The site nondeterministically shows either the slot picker or the
        // upsell page; both lead to payment.
        (DeliverySlotSelection, UpsellDismissed | SlotSelected) => {
            (PaymentConfirmation, Vec::new())
        }
        (PaymentConfirmation, PaymentSubmitted) => (Placed, vec![PersistOrder, ReleaseSession]),
        (_, StepFailed { .. }) => (Failed, vec![ReleaseSession]),
        _ => {
            return Err(CheckoutTransitionError::InvalidTransition {
                state: *current,
                event: event.clone(),
            });
        }
    };

    Ok(TransitionOutcome { from: *current, to, event: event.clone(), actions })
}
