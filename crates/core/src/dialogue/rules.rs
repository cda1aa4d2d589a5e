use crate::session::FlowCategory;

/// Topics answered with a fixed reply, no session required or consulted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatelessTopic {
    Services,
    LearnMore,
    Faq,
    ServicesInfo,
    Cost,
    Shipping,
    SupportMenu,
    Contact,
    SalesMenu,
    Products,
    Offers,
    InventoryMenu,
}

/// A matched token rule. Variant order mirrors resolution precedence:
/// global commands beat stateless topics beat flow entries; continuation
/// and fallback apply only when no rule matches at all.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenRule {
    /// Unconditionally resets any session and shows the main menu. Must
    /// win over everything else so a user mid-flow can always escape.
    Global,
    Stateless(StatelessTopic),
    /// Starts (or restarts) a multi-turn flow.
    FlowEntry(FlowCategory),
    /// One-shot inventory lookup; never touches session state.
    InventoryCheck { product_id: String },
}

const GLOBAL_TOKENS: &[&str] =
    &["start", "hi", "hello", "get_started", "welcome_message", "back to main menu"];

/// Alias table for stateless topics, in precedence order. `services`
/// appears both here and among the `services_info` aliases; listing the
/// services menu first makes that overlap resolve the same way every
/// time.
const STATELESS_TOKENS: &[(StatelessTopic, &[&str])] = &[
    (StatelessTopic::Services, &["services", "service"]),
    (StatelessTopic::LearnMore, &["learn_more", "learn more"]),
    (StatelessTopic::Faq, &["faq", "faqs"]),
    (StatelessTopic::ServicesInfo, &["services_info", "what services do you offer"]),
    (StatelessTopic::Cost, &["cost", "how much does it cost"]),
    (StatelessTopic::Shipping, &["shipping", "ship", "shipping info"]),
    (StatelessTopic::SupportMenu, &["support", "help"]),
    (StatelessTopic::Contact, &["contact", "contact us"]),
    (StatelessTopic::SalesMenu, &["sales"]),
    (StatelessTopic::Products, &["products"]),
    (StatelessTopic::Offers, &["offers"]),
    (StatelessTopic::InventoryMenu, &["inventory"]),
];

const FLOW_ENTRY_TOKENS: &[(FlowCategory, &[&str])] = &[
    (FlowCategory::OrderIssue, &["order_issue", "order issue"]),
    (FlowCategory::TechnicalIssue, &["tech_issue", "technical_issue", "technical issues"]),
    (FlowCategory::LeadCapture, &["lead"]),
    (FlowCategory::Scheduling, &["schedule"]),
];

/// Resolves a normalized token against the static rule table. Returns
/// `None` when the token is not a command, leaving stateful continuation
/// and fallback to the engine.
pub fn match_token(token: &str) -> Option<TokenRule> {
    if GLOBAL_TOKENS.contains(&token) {
        return Some(TokenRule::Global);
    }

    for (topic, aliases) in STATELESS_TOKENS {
        if aliases.contains(&token) {
            return Some(TokenRule::Stateless(*topic));
        }
    }

    for (category, aliases) in FLOW_ENTRY_TOKENS {
        if aliases.contains(&token) {
            return Some(TokenRule::FlowEntry(*category));
        }
    }

    if let Some(product_id) = token.strip_prefix("check_") {
        if !product_id.is_empty() {
            return Some(TokenRule::InventoryCheck { product_id: product_id.to_owned() });
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::{match_token, StatelessTopic, TokenRule};
    use crate::session::FlowCategory;

    #[test]
    fn global_tokens_always_match_first() {
        for token in ["start", "hi", "hello", "get_started", "back to main menu"] {
            assert_eq!(match_token(token), Some(TokenRule::Global), "token `{token}`");
        }
    }

    #[test]
    fn services_alias_overlap_resolves_to_the_menu() {
        // `services` is also listed under services_info; the earlier menu
        // entry must win.
        assert_eq!(match_token("services"), Some(TokenRule::Stateless(StatelessTopic::Services)));
        assert_eq!(
            match_token("services_info"),
            Some(TokenRule::Stateless(StatelessTopic::ServicesInfo))
        );
    }

    #[test]
    fn flow_entries_map_to_their_category() {
        assert_eq!(
            match_token("order_issue"),
            Some(TokenRule::FlowEntry(FlowCategory::OrderIssue))
        );
        assert_eq!(
            match_token("technical_issue"),
            Some(TokenRule::FlowEntry(FlowCategory::TechnicalIssue))
        );
        assert_eq!(match_token("lead"), Some(TokenRule::FlowEntry(FlowCategory::LeadCapture)));
        assert_eq!(match_token("schedule"), Some(TokenRule::FlowEntry(FlowCategory::Scheduling)));
    }

    #[test]
    fn check_prefix_extracts_product_id() {
        assert_eq!(
            match_token("check_basic"),
            Some(TokenRule::InventoryCheck { product_id: "basic".to_owned() })
        );
        assert_eq!(
            match_token("check_enterprise"),
            Some(TokenRule::InventoryCheck { product_id: "enterprise".to_owned() })
        );
        assert_eq!(match_token("check_"), None);
    }

    #[test]
    fn unknown_tokens_do_not_match() {
        assert_eq!(match_token("2024-01-15"), None);
        assert_eq!(match_token("ada@example.com"), None);
        assert_eq!(match_token(""), None);
    }
}
