use std::time::Duration;

use secrecy::ExposeSecret;
use tracing::{debug, error, info, warn};

use aisle_core::checkout::{
    CheckoutEngine, CheckoutEvent, CheckoutState, CheckoutTransitionError, StandardCheckout,
};
use aisle_core::config::CheckoutConfig;
use aisle_core::domain::order::{Order, OrderLine};
use aisle_core::twofa::{CodeSource, ManualCodePrompt};

use crate::browser::BrowserPage;
use crate::selectors;
use crate::{AccountCredentials, RetailerError};

/// Tracks the checkout state machine as the browser is driven; every page
/// step advances it, so a step landing out of order is caught as a
/// transition error rather than silently clicking into the wrong page.
pub struct CheckoutRun {
    engine: CheckoutEngine<StandardCheckout>,
    state: CheckoutState,
}

impl Default for CheckoutRun {
    fn default() -> Self {
        let engine = CheckoutEngine::default();
        let state = engine.initial_state();
        Self { engine, state }
    }
}

impl CheckoutRun {
    pub fn advance(&mut self, event: CheckoutEvent) -> Result<(), CheckoutTransitionError> {
        let outcome = self.engine.apply(&self.state, &event)?;
        debug!(
            event_name = "checkout.transition",
            from = ?outcome.from,
            to = ?outcome.to,
            actions = ?outcome.actions,
            "checkout state advanced"
        );
        self.state = outcome.to;
        Ok(())
    }

    pub fn fail(&mut self, reason: String) {
        if let Ok(outcome) = self.engine.apply(&self.state, &CheckoutEvent::StepFailed { reason })
        {
            self.state = outcome.to;
        }
    }

    pub fn state(&self) -> CheckoutState {
        self.state
    }
}

/// Drives one browser session through authentication, 2FA, cart
/// population, slot selection and payment. The caller owns session
/// teardown.
pub(crate) struct CheckoutOrchestrator<'a> {
    pub(crate) auth: &'a AccountCredentials,
    pub(crate) config: &'a CheckoutConfig,
    pub(crate) store_url: &'a str,
    pub(crate) auth_url: &'a str,
    pub(crate) codes: &'a dyn CodeSource,
    pub(crate) prompt: &'a dyn ManualCodePrompt,
}

impl CheckoutOrchestrator<'_> {
    pub(crate) async fn run(
        &self,
        page: &mut dyn BrowserPage,
        order: &Order,
    ) -> Result<(), RetailerError> {
        let mut run = CheckoutRun::default();
        let outcome = self.drive(page, &mut run, order).await;

        if let Err(step_error) = &outcome {
            error!(
                event_name = "checkout.failed",
                state = ?run.state(),
                error = %step_error,
                "order placement failed"
            );
            run.fail(step_error.to_string());
        }

        outcome
    }

    async fn drive(
        &self,
        page: &mut dyn BrowserPage,
        run: &mut CheckoutRun,
        order: &Order,
    ) -> Result<(), RetailerError> {
        let settle = Duration::from_secs(self.config.settle_secs);
        let page_settle = Duration::from_secs(self.config.page_settle_secs);

        page.goto(self.auth_url).await?;
        page.fill(selectors::LOGIN_USERNAME, &self.auth.email).await?;
        page.fill(selectors::LOGIN_PASSWORD, self.auth.password.expose_secret()).await?;
        page.click(selectors::SUBMIT_BUTTON).await?;
        run.advance(CheckoutEvent::CredentialsSubmitted)?;
        page.settle(page_settle).await;

        // Some logins show a "Continue" interstitial before the code field.
        if page.click_text(selectors::CONTINUE_LABEL).await? {
            debug!(event_name = "checkout.interstitial_dismissed", "clicked continue interstitial");
        }
        page.wait_for(
            selectors::CODE_FIELD,
            Duration::from_secs(self.config.code_field_wait_secs),
        )
        .await?;
        run.advance(CheckoutEvent::SecondFactorPrompted)?;

        // SMS delivery lags the prompt; wait before checking the inbox.
        page.settle(settle).await;
        let code = self.obtain_code().await?;
        page.fill(selectors::CODE_FIELD, &code).await?;
        page.click(selectors::SUBMIT_BUTTON).await?;
        run.advance(CheckoutEvent::CodeSubmitted)?;
        page.settle(settle).await;

        run.advance(CheckoutEvent::CartPopulationStarted)?;
        for line in order.lines() {
            if let Err(line_error) = self.add_to_cart(page, line).await {
                warn!(
                    event_name = "checkout.add_to_cart_failed",
                    item = %line.item,
                    stock_code = %line.product.stock_code,
                    error = %line_error,
                    "failed to add product, continuing with the rest"
                );
            }
        }
        run.advance(CheckoutEvent::CartPopulated)?;

        // Cart drawer and checkout control are both conditional; the site
        // sometimes goes straight through.
        if page.is_visible(selectors::CART_BUTTON).await? {
            page.click(selectors::CART_BUTTON).await?;
            page.settle(page_settle).await;
        }
        if page.is_visible(selectors::SUBMIT_BUTTON).await? {
            page.click(selectors::SUBMIT_BUTTON).await?;
        }
        run.advance(CheckoutEvent::CheckoutOpened)?;
        page.settle(page_settle).await;
        run.advance(CheckoutEvent::DeliveryStepReached)?;

        // Checkout lands on either the upsell page or the slot picker.
        if page.is_text_visible(selectors::UPSELL_TEXT).await? {
            page.click(selectors::UPSELL_CONTINUE).await?;
            run.advance(CheckoutEvent::UpsellDismissed)?;
        } else if page.click_first(selectors::TIME_SLOT).await? {
            page.settle(page_settle).await;
            page.click(selectors::SUBMIT_BUTTON).await?;
            run.advance(CheckoutEvent::SlotSelected)?;
        } else {
            return Err(RetailerError::NoDeliverySlot);
        }
        page.settle(page_settle).await;

        // The upsell page can reappear between slot selection and payment.
        if page.is_text_visible(selectors::UPSELL_TEXT).await? {
            page.click(selectors::UPSELL_CONTINUE).await?;
            page.settle(page_settle).await;
        }

        page.fill(selectors::CVV_FIELD, self.auth.card_cvv.expose_secret()).await?;
        page.click(selectors::SUBMIT_BUTTON).await?;
        run.advance(CheckoutEvent::PaymentSubmitted)?;

        // Submission is the commit signal; there is no confirmation page
        // worth parsing.
        info!(
            event_name = "checkout.placed",
            items = order.len(),
            "payment submitted, order placed"
        );
        Ok(())
    }

    async fn obtain_code(&self) -> Result<String, RetailerError> {
        match self.codes.consume_latest_code().await {
            Ok(Some(code)) => return Ok(code),
            Ok(None) => {}
            Err(lookup_error) => {
                warn!(
                    event_name = "checkout.code_lookup_failed",
                    error = %lookup_error,
                    "stored code lookup failed, falling back to manual entry"
                );
            }
        }

        // Human-in-the-loop escape hatch: without it the flow would
        // deadlock whenever SMS interception misses a message.
        match self.prompt.prompt_code().await {
            Some(code) if !code.trim().is_empty() => Ok(code.trim().to_owned()),
            _ => Err(RetailerError::SecondFactorUnavailable),
        }
    }

    async fn add_to_cart(
        &self,
        page: &mut dyn BrowserPage,
        line: &OrderLine,
    ) -> Result<(), RetailerError> {
        let url = selectors::product_details_url(self.store_url, &line.product.stock_code.0);
        page.goto(&url).await?;
        page.settle(Duration::from_secs(self.config.page_settle_secs)).await;

        if page.is_disabled(selectors::ADD_TO_CART).await? {
            info!(
                event_name = "checkout.out_of_stock",
                item = %line.item,
                product = %line.product.name,
                "product is out of stock, skipping"
            );
            return Ok(());
        }

        info!(
            event_name = "checkout.adding_to_cart",
            product = %line.product.name,
            "adding product to cart"
        );
        if !page.click_first(selectors::ADD_TO_CART).await? {
            return Err(RetailerError::MissingControl(selectors::ADD_TO_CART.to_owned()));
        }
        Ok(())
    }
}
