use async_trait::async_trait;
use tracing::debug;

use aisle_core::domain::product::{Product, StockCode};
use aisle_core::resolver::{CapabilityError, ProductRecommender};

use crate::llm::LlmClient;

const ADDITIONAL_INSTRUCTIONS: &str = "Avoid plant-based products if a meat-option is available.";

/// Knowledge-based product selection backed by an LLM. The model is asked
/// for exactly one stock code; any reply that is not a bare integer naming
/// a candidate counts as a non-match.
pub struct LlmProductRecommender<L> {
    llm: L,
}

impl<L> LlmProductRecommender<L>
where
    L: LlmClient,
{
    pub fn new(llm: L) -> Self {
        Self { llm }
    }
}

fn build_prompt(item: &str, candidates: &[Product]) -> String {
    let listed = candidates
        .iter()
        .map(|candidate| format!("{}: {}", candidate.stock_code, candidate.name))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Given the following products:\n\n{listed}\n\nAnd the shopping list item '{item}'\n\n\
         Which product would you recommend based on your own knowledge? Please return only the \
         product's integer code in your response. In other words, your response should only \
         contain an integer matching one of the codes. Your response must contain a code. Do not \
         return anything else. {ADDITIONAL_INSTRUCTIONS}"
    )
}

/// Accepts only a reply that is one bare integer-like token matching a
/// candidate's stock code.
fn parse_stock_code(reply: &str, candidates: &[Product]) -> Option<StockCode> {
    let trimmed = reply.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }

    candidates
        .iter()
        .find(|candidate| candidate.stock_code.0 == trimmed)
        .map(|candidate| candidate.stock_code.clone())
}

#[async_trait]
impl<L> ProductRecommender for LlmProductRecommender<L>
where
    L: LlmClient,
{
    async fn recommend(
        &self,
        item: &str,
        candidates: &[Product],
    ) -> Result<Option<StockCode>, CapabilityError> {
        let prompt = build_prompt(item, candidates);
        let reply = self
            .llm
            .complete(&prompt)
            .await
            .map_err(|error| CapabilityError::Recommendation(error.to_string()))?;

        let selected = parse_stock_code(&reply, candidates);
        if selected.is_none() {
            debug!(
                event_name = "agent.recommendation_rejected",
                item = %item,
                reply_len = reply.len(),
                "llm reply did not name a candidate stock code"
            );
        }
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use aisle_core::domain::product::{Product, StockCode};
    use aisle_core::resolver::{CapabilityError, ProductRecommender};

    use crate::llm::LlmClient;
    use crate::recommend::{build_prompt, parse_stock_code, LlmProductRecommender};

    fn product(stock_code: &str, name: &str) -> Product {
        Product {
            name: name.to_owned(),
            stock_code: StockCode(stock_code.to_owned()),
            price_total: Decimal::new(899, 2),
            price_unit_measure: "$1.80 / 100G".to_owned(),
            is_available: true,
            is_purchasable: true,
        }
    }

    struct CannedLlm {
        reply: Result<&'static str, ()>,
    }

    #[async_trait]
    impl LlmClient for CannedLlm {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            match self.reply {
                Ok(reply) => Ok(reply.to_owned()),
                Err(()) => bail!("model unavailable"),
            }
        }
    }

    #[test]
    fn prompt_lists_candidates_and_meat_instruction() {
        let prompt = build_prompt(
            "mince",
            &[product("11", "Plant Based Mince 500g"), product("22", "Beef Mince 500g")],
        );

        assert!(prompt.contains("11: Plant Based Mince 500g, 22: Beef Mince 500g"));
        assert!(prompt.contains("'mince'"));
        assert!(prompt.contains("Avoid plant-based products if a meat-option is available."));
    }

    #[test]
    fn bare_matching_code_is_accepted() {
        let candidates = [product("11", "A"), product("22", "B")];
        assert_eq!(parse_stock_code("22", &candidates), Some(StockCode("22".to_owned())));
        assert_eq!(parse_stock_code("  22\n", &candidates), Some(StockCode("22".to_owned())));
    }

    #[test]
    fn chatty_or_non_matching_replies_are_rejected() {
        let candidates = [product("11", "A"), product("22", "B")];
        assert_eq!(parse_stock_code("I recommend 22", &candidates), None);
        assert_eq!(parse_stock_code("33", &candidates), None);
        assert_eq!(parse_stock_code("", &candidates), None);
        assert_eq!(parse_stock_code("22.", &candidates), None);
    }

    #[tokio::test]
    async fn recommender_returns_matching_candidate() {
        let recommender = LlmProductRecommender::new(CannedLlm { reply: Ok("22") });
        let candidates = [product("11", "Plant Based Mince 500g"), product("22", "Beef Mince 500g")];

        let selected =
            recommender.recommend("mince", &candidates).await.expect("recommendation call");
        assert_eq!(selected, Some(StockCode("22".to_owned())));
    }

    #[tokio::test]
    async fn malformed_reply_is_a_non_match_not_an_error() {
        let recommender =
            LlmProductRecommender::new(CannedLlm { reply: Ok("definitely the beef one") });
        let candidates = [product("11", "A"), product("22", "B")];

        let selected =
            recommender.recommend("mince", &candidates).await.expect("recommendation call");
        assert_eq!(selected, None);
    }

    #[tokio::test]
    async fn transport_failure_surfaces_as_capability_error() {
        let recommender = LlmProductRecommender::new(CannedLlm { reply: Err(()) });
        let candidates = [product("11", "A")];

        let error = recommender
            .recommend("mince", &candidates)
            .await
            .expect_err("llm failure should propagate");
        assert!(matches!(error, CapabilityError::Recommendation(_)));
    }
}
