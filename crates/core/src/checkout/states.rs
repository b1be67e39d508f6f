use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckoutState {
    Start,
    Authenticating,
    AwaitingSecondFactor,
    SecondFactorSubmitted,
    PopulatingCart,
    CartReview,
    Checkout,
    DeliverySlotSelection,
    PaymentConfirmation,
    Placed,
    Failed,
}

impl CheckoutState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Placed | Self::Failed)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckoutEvent {
    CredentialsSubmitted,
    SecondFactorPrompted,
    CodeSubmitted,
    CartPopulationStarted,
    CartPopulated,
    CheckoutOpened,
    DeliveryStepReached,
    /// The "Have You Forgotten?" page appeared instead of the slot picker
    /// and was dismissed via its continue control.
    UpsellDismissed,
    SlotSelected,
    PaymentSubmitted,
    StepFailed { reason: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckoutAction {
    PersistOrder,
    ReleaseSession,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: CheckoutState,
    pub to: CheckoutState,
    pub event: CheckoutEvent,
    pub actions: Vec<CheckoutAction>,
}
