use std::sync::LazyLock;

use digest_domain::Priority;
use regex::Regex;

const HIGH_KEYWORDS: &[&str] = &[
    "urgent",
    "asap",
    "immediately",
    "action required",
    "respond now",
    "payment due",
    "invoice",
    "suspicious login",
    "security alert",
    "account locked",
    "unauthorized access",
    "billing problem",
    "update payment",
    "breach",
    "deadline",
    "password reset",
    "deactivation",
    "critical issue",
    "declined",
];

const MEDIUM_KEYWORDS: &[&str] = &[
    "reminder",
    "follow-up",
    "check-in",
    "don't miss",
    "closing soon",
    "time-sensitive",
    "review",
    "notification",
    "expires",
    "event",
    "invitation",
    "meeting",
    "webinar",
    "schedule",
    "upcoming",
    "application",
    "survey",
    "feedback",
    "policy update",
];

const LOW_KEYWORDS: &[&str] = &[
    "discount",
    "offer",
    "deal",
    "sale",
    "new product",
    "announcement",
    "launch",
    "thank you",
    "welcome",
    "update",
    "promo",
    "gift",
    "reward",
    "bonus",
    "referral",
    "points",
    "subscribe",
    "unsubscribe",
    "weekly",
    "monthly",
    "newsletter",
];

/// One whole-word, case-insensitive alternation per tier, in priority order.
static TIERS: LazyLock<Vec<(Priority, Option<Regex>)>> = LazyLock::new(|| {
    vec![
        (Priority::High, tier_regex(HIGH_KEYWORDS)),
        (Priority::Medium, tier_regex(MEDIUM_KEYWORDS)),
        (Priority::Low, tier_regex(LOW_KEYWORDS)),
    ]
});

fn tier_regex(keywords: &[&str]) -> Option<Regex> {
    let alternation = keywords
        .iter()
        .map(|kw| regex::escape(kw))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).ok()
}

pub fn classify(text: &str) -> Priority {
    TIERS
        .iter()
        .find(|(_, re)| re.as_ref().map(|re| re.is_match(text)).unwrap_or(false))
        .map(|(priority, _)| *priority)
        .unwrap_or(Priority::Low)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urgent_is_high() {
        assert_eq!(classify("URGENT action required on your account"), Priority::High);
    }

    #[test]
    fn weekly_newsletter_is_low() {
        assert_eq!(classify("Your weekly newsletter"), Priority::Low);
    }

    #[test]
    fn meeting_reminder_is_medium() {
        assert_eq!(classify("meeting reminder for 3pm"), Priority::Medium);
    }

    #[test]
    fn high_tier_beats_lower_tiers() {
        assert_eq!(
            classify("Weekly meeting reminder: invoice overdue"),
            Priority::High
        );
    }

    #[test]
    fn matches_whole_words_only() {
        assert_eq!(classify("the saleswoman reviewed it"), Priority::Low);
        assert_eq!(classify("reviewed the presale"), Priority::Low);
        assert_eq!(classify("please review"), Priority::Medium);
    }

    #[test]
    fn hyphenated_and_apostrophe_keywords_match() {
        assert_eq!(classify("Quick check-in tomorrow"), Priority::Medium);
        assert_eq!(classify("Don't miss out"), Priority::Medium);
    }

    #[test]
    fn no_keyword_defaults_to_low() {
        assert_eq!(classify("lorem ipsum dolor sit amet"), Priority::Low);
        assert_eq!(classify(""), Priority::Low);
    }
}
