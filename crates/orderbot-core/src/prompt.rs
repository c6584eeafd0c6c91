//! System prompt construction.
//!
//! The prompt is rebuilt and sent on every call because providers keep no
//! state between requests. It carries the only hand-off contract between
//! free-form generation and extraction: the reply must end with
//! [`ORDER_COMPLETE_MARKER`] and one JSON object once the order is complete.

use orderbot_types::order::{BusinessContext, ORDER_COMPLETE_MARKER};

/// Fields the assistant must collect, in the JSON key order it should emit.
pub const REQUIRED_ORDER_FIELDS: [&str; 6] =
    ["name", "phone", "items", "total", "address", "notes"];

/// Build the system instruction for a business.
///
/// Deterministic: the same context always yields the same text.
pub fn build_system_prompt(business: &BusinessContext) -> String {
    let name = business.name();
    let kind = business.kind();
    let fields = REQUIRED_ORDER_FIELDS.join(", ");
    let marker = ORDER_COMPLETE_MARKER;

    format!(
        r#"You are a helpful customer service assistant for {name}, a {kind}.

Your job is to:
1. Greet customers warmly and professionally
2. Help them understand our products/services
3. Take their complete orders with all necessary details
4. Collect required information: customer name, phone number, order details, delivery address (if needed)
5. Calculate totals when possible
6. Confirm orders before finalizing

IMPORTANT RULES:
- Always be polite, helpful, and professional
- Ask for missing information one piece at a time
- When you have a complete order, end your response with: "{marker}" followed by a JSON object
- Only include "{marker}" when the order is complete, never before
- The JSON should include: {fields}

Example of complete order response:
"Perfect! I have your order ready. Total is $25.50. We'll prepare this right away!

{marker} {{
  "name": "John Smith",
  "phone": "555-0123",
  "items": "2x Large Pizza, 1x Coke",
  "total": "$25.50",
  "address": "123 Main St",
  "notes": "Extra cheese"
}}"

Keep responses conversational and under 200 words."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_business() {
        let prompt = build_system_prompt(&BusinessContext::new("Demo Restaurant", "pizzeria"));
        assert!(prompt.contains("assistant for Demo Restaurant, a pizzeria."));
    }

    #[test]
    fn test_prompt_applies_defaults() {
        let prompt = build_system_prompt(&BusinessContext::default());
        assert!(prompt.contains("Our Business, a restaurant."));
    }

    #[test]
    fn test_prompt_states_marker_and_fields() {
        let prompt = build_system_prompt(&BusinessContext::default());
        assert!(prompt.contains("\"ORDER_COMPLETE_JSON:\" followed by a JSON object"));
        assert!(prompt.contains("name, phone, items, total, address, notes"));
        assert!(prompt.contains("one piece at a time"));
        // The example payload must be valid JSON so the model copies a parseable shape.
        let marker = "ORDER_COMPLETE_JSON: ";
        let example_start = prompt.rfind("ORDER_COMPLETE_JSON: {").unwrap() + marker.len();
        let example_end = prompt.rfind('}').unwrap() + 1;
        let example: serde_json::Value =
            serde_json::from_str(&prompt[example_start..example_end]).unwrap();
        assert_eq!(example["total"], "$25.50");
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let ctx = BusinessContext::new("A", "b");
        assert_eq!(build_system_prompt(&ctx), build_system_prompt(&ctx));
    }
}
