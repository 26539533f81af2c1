//! Post-hoc content safety filter.
//!
//! An ordered list of pattern rules scanned against every generated reply,
//! independent of the prompt-level prohibitions. A match replaces the entire
//! reply with the fixed redirect-to-operator message; a partially redacted
//! reply could still leak the forbidden content.

use regex::Regex;

/// The fixed replacement used when any rule matches.
pub const OPERATOR_REDIRECT: &str = "По этому вопросу вас лучше проконсультирует наш оператор. \
     Сейчас я переведу вас на него, оставайтесь на линии. \
     Могу ли я помочь вам с чем-нибудь ещё?";

/// One content-policy rule: a name for logs and a matcher.
#[derive(Debug, Clone)]
pub struct ContentRule {
    pub name: &'static str,
    pub pattern: Regex,
}

impl ContentRule {
    /// # Panics
    ///
    /// Panics on an invalid pattern; rule patterns are compile-time constants
    /// exercised by tests.
    fn new(name: &'static str, pattern: &str) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("content rule pattern must compile"),
        }
    }
}

/// The default rule set: price mentions with numbers, and medical
/// terminology.
pub fn default_rules() -> Vec<ContentRule> {
    vec![
        // A number adjacent to a currency or price word, in either order.
        ContentRule::new(
            "price_quote",
            r"(?i)(\d[\d\s.,]*\s*(руб\w*|сум\w*|uzs|usd|eur|\$|€)|(цена|стоимост\w*|стоит|тариф\w*)\W{0,20}\d)",
        ),
        // Medical advice vocabulary in Russian and English.
        ContentRule::new(
            "medical_terminology",
            r"(?i)(диагноз\w*|лечени\w*|назнача\w*|препарат\w*|дозировк\w*|антибиотик\w*|рецепт\w*|противопоказан\w*|diagnos\w*|treatment\w*|prescri\w*|dosage\w*)",
        ),
    ]
}

/// Result of scanning one reply.
#[derive(Debug, Clone)]
pub struct FilterVerdict {
    /// The reply to use: the original text, or the operator redirect when a
    /// rule matched.
    pub text: String,
    /// The name of the first rule that matched, if any.
    pub matched_rule: Option<String>,
}

/// An ordered list of content rules applied to every reply.
#[derive(Debug, Clone)]
pub struct SafetyFilter {
    rules: Vec<ContentRule>,
    refusal: String,
}

impl SafetyFilter {
    /// Builds a filter with the default price and medical rules.
    pub fn with_default_rules() -> Self {
        Self::new(default_rules(), OPERATOR_REDIRECT)
    }

    pub fn new(rules: Vec<ContentRule>, refusal: impl Into<String>) -> Self {
        Self {
            rules,
            refusal: refusal.into(),
        }
    }

    /// Scans `text` against the rules in order. The first match wins and
    /// replaces the entire reply.
    pub fn apply(&self, text: &str) -> FilterVerdict {
        for rule in &self.rules {
            if rule.pattern.is_match(text) {
                return FilterVerdict {
                    text: self.refusal.clone(),
                    matched_rule: Some(rule.name.to_string()),
                };
            }
        }
        FilterVerdict {
            text: text.to_string(),
            matched_rule: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_reply_passes_through() {
        let filter = SafetyFilter::with_default_rules();
        let reply = "Мы работаем ежедневно с девяти до шести. Могу помочь с чем-нибудь ещё?";

        let verdict = filter.apply(reply);
        assert!(verdict.matched_rule.is_none());
        assert_eq!(verdict.text, reply);
    }

    #[test]
    fn price_with_number_is_replaced() {
        let filter = SafetyFilter::with_default_rules();

        for reply in [
            "Приём стоит 150 000 сум.",
            "Консультация — 1200 руб.",
            "Цена: 25 долларов, то есть 25 USD.",
        ] {
            let verdict = filter.apply(reply);
            assert_eq!(verdict.matched_rule.as_deref(), Some("price_quote"), "{reply}");
            assert_eq!(verdict.text, OPERATOR_REDIRECT);
        }
    }

    #[test]
    fn medical_terms_are_replaced() {
        let filter = SafetyFilter::with_default_rules();

        for reply in [
            "Похоже на гастрит, ваш диагноз несложный.",
            "Рекомендую лечение антибиотиками.",
            "The treatment usually takes two weeks.",
        ] {
            let verdict = filter.apply(reply);
            assert_eq!(
                verdict.matched_rule.as_deref(),
                Some("medical_terminology"),
                "{reply}"
            );
            assert_eq!(verdict.text, OPERATOR_REDIRECT);
        }
    }

    #[test]
    fn rules_apply_in_order() {
        // A reply that matches both rules reports the first one.
        let filter = SafetyFilter::with_default_rules();
        let verdict = filter.apply("Лечение стоит 5000 руб.");
        assert_eq!(verdict.matched_rule.as_deref(), Some("price_quote"));
    }

    #[test]
    fn custom_rule_set_is_honored() {
        let rules = vec![ContentRule {
            name: "forbidden_word",
            pattern: Regex::new("(?i)гарантируем").unwrap(),
        }];
        let filter = SafetyFilter::new(rules, "заглушка");

        let verdict = filter.apply("Мы гарантируем результат!");
        assert_eq!(verdict.matched_rule.as_deref(), Some("forbidden_word"));
        assert_eq!(verdict.text, "заглушка");
    }
}
