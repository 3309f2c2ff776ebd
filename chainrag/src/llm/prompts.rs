//! Prompt templates for intent extraction and answer synthesis
//!
//! These templates use basic `format!()` interpolation for type safety.
//! Missing variables will cause compile-time errors.

/// Generate a prompt that turns a question into a retrieval intent
///
/// The model is asked for a JSON object with exactly the keys `filters`,
/// `sort` and `limit`. Amounts mentioned in the question ("100 USDT") are
/// called out as not being a result limit.
///
/// # Example
/// ```
/// use chainrag::llm::prompts::intent_extraction_prompt;
///
/// let prompt = intent_extraction_prompt("What was my latest incoming USDT transfer?");
/// assert!(prompt.contains("latest incoming USDT"));
/// ```
pub fn intent_extraction_prompt(question: &str) -> String {
    format!(
        r#"You convert questions about an Ethereum account's transaction history into search parameters.

Return a JSON object with exactly these keys:
- "filters": object with any of
    "token": token symbol in upper case, e.g. "ETH", "USDT"
    "type": "normal_tx" for plain ETH transfers or "erc20_transfer" for token transfers
    "direction": "Incoming" or "Outgoing"
  Omit a key when the question does not clearly ask for it.
- "sort": "desc" when the question asks for the latest, newest, most recent or last transactions,
  "asc" when it asks for the first, oldest or earliest ones, otherwise null.
- "limit": how many transactions the question asks for, between 1 and 20. Use 5 when unspecified.

Amounts are never limits. "100 USDT transfer" or "more than 2 ETH" say nothing about how many
results are wanted.

Examples:
Question: What was my last incoming transaction?
{{"filters": {{"direction": "Incoming"}}, "sort": "desc", "limit": 1}}

Question: Show the 3 oldest USDT transfers I sent
{{"filters": {{"token": "USDT", "type": "erc20_transfer", "direction": "Outgoing"}}, "sort": "asc", "limit": 3}}

Question: Did I receive a 100 USDT transfer?
{{"filters": {{"token": "USDT", "direction": "Incoming"}}, "sort": null, "limit": 5}}

Question: Who do I interact with most?
{{"filters": {{}}, "sort": null, "limit": 5}}

Question: {question}

Respond with the JSON object only."#
    )
}

/// Generate the answer prompt from retrieved transaction texts
///
/// `context` is the retrieved documents joined in their final order; the
/// model must answer from it alone.
///
/// # Example
/// ```
/// use chainrag::llm::prompts::answer_synthesis_prompt;
///
/// let prompt = answer_synthesis_prompt("[NORMAL TRANSACTION]\nAmount: 1.000000 ETH", "How much ETH?");
/// assert!(prompt.contains("Amount: 1.000000 ETH"));
/// assert!(prompt.contains("How much ETH?"));
/// ```
pub fn answer_synthesis_prompt(context: &str, question: &str) -> String {
    format!(
        r#"You are a senior blockchain forensic analyst reviewing Etherscan data.
Examine the transaction history below and give the most accurate, evidence-based answer to the question.

Rules:
1. Use ONLY the transactions listed under Context. Do not bring in outside information.
2. Pay close attention to dates, amounts and the Incoming/Outgoing direction of each transfer.
3. If the answer is not in the context, say: "This information was not found in the provided transaction history."
4. Use professional language and **bold** key data points such as amounts, token symbols and dates.
5. Organize the answer as bullet points.

Context (transactions, in the order retrieved):
{context}

Question:
{question}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_prompt_names_all_keys() {
        let prompt = intent_extraction_prompt("oldest transfer");
        for key in ["\"filters\"", "\"sort\"", "\"limit\""] {
            assert!(prompt.contains(key), "missing {key}");
        }
        assert!(prompt.ends_with("Respond with the JSON object only."));
    }

    #[test]
    fn test_intent_prompt_warns_about_amounts() {
        let prompt = intent_extraction_prompt("100 USDT transfer");
        assert!(prompt.contains("Amounts are never limits"));
    }

    #[test]
    fn test_answer_prompt_preserves_context_verbatim() {
        let context = "first\n\nsecond\n\nthird";
        let prompt = answer_synthesis_prompt(context, "q");
        assert!(prompt.contains(context));
    }
}
