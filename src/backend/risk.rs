//! Rule-based risk scoring behind the dev backend's analysis endpoints.
//!
//! Transcripts are scored on phishing vocabulary and known scam scripts;
//! transaction batches on Jamtara-style patterns (many small transfers,
//! scattered locations, rapid bursts). Both scores are clamped to [0, 1].

use crate::service::protocol::{Sentiment, TransactionRecord};
use std::collections::{BTreeMap, BTreeSet};

pub const KEYWORD_WEIGHT: f64 = 0.2;
pub const PATTERN_WEIGHT: f64 = 0.3;
pub const NEGATIVE_SENTIMENT_WEIGHT: f64 = 0.2;
pub const POSITIVE_SENTIMENT_CREDIT: f64 = 0.1;

/// Amounts below this count towards a user's small-transfer total.
pub const SMALL_TRANSACTION_LIMIT: f64 = 10_000.0;
/// A user whose small transfers sum above this is flagged.
pub const SMALL_TOTAL_LIMIT: f64 = 50_000.0;
pub const RAPID_GAP_SECS: i64 = 60;

pub const SMALL_TOTAL_WEIGHT: f64 = 0.4;
pub const SCATTERED_LOCATIONS_WEIGHT: f64 = 0.3;
pub const RAPID_BURST_WEIGHT: f64 = 0.3;

pub const PHISHING_KEYWORDS: &[&str] = &[
    // English
    "OTP", "KYC", "block", "suspend", "password", "account",
    "verify", "urgent", "winner", "bank", "security", "aadhaar",
    "lottery", "congratulations", "claim", "limited time", "offer",
    "click here", "update", "confirm", "login", "alert", "dear customer",
    "refund", "invoice", "transaction", "unauthorized", "immediate action",
    "act fast", "kindly", "request", "assistance", "help", "attention",
    "important", "notice", "payment", "due", "overdue", "access", "secure",
    "unusual activity", "suspicious", "locked", "unlock", "reactivate",
    "validate", "credentials", "personal information", "identity",
    "breach", "compromise", "security alert", "security update",
    "security notification", "security warning", "security message",
    "security advisory", "security notice",
    // Hindi
    "ओटीपी", "केवाईसी", "ब्लॉक", "निलंबित", "पासवर्ड", "खाता",
    "सत्यापित", "तत्काल", "विजेता", "बैंक", "सुरक्षा", "आधार",
    "लॉटरी", "बधाई", "दावा", "सीमित समय", "प्रस्ताव",
    "यहां क्लिक करें", "अपडेट", "पुष्टि", "लॉगिन", "चेतावनी", "प्रिय ग्राहक",
    "रिफंड", "चालान", "लेनदेन", "अनधिकृत", "तत्काल कार्रवाई",
    "शीघ्र करें", "कृपया", "अनुरोध", "सहायता", "मदद", "ध्यान",
    "महत्वपूर्ण", "सूचना", "भुगतान", "देय", "अतिदेय", "प्रवेश", "सुरक्षित",
    "असामान्य गतिविधि", "संदिग्ध", "लॉक", "अनलॉक", "पुनः सक्रिय करें",
    "मान्य करें", "क्रेडेंशियल्स", "व्यक्तिगत जानकारी", "पहचान",
    "उल्लंघन", "समझौता", "सुरक्षा चेतावनी", "सुरक्षा अपडेट",
    "सुरक्षा अधिसूचना", "सुरक्षा संदेश", "सुरक्षा सलाह", "सुरक्षा सूचना",
    // Hinglish
    "account band", "ATM card", "kyc update", "pan card",
    "password reset", "bank account", "kaun se bank ka account hai jisme paisa lena chahte ho",
];

/// Scam scripts, keyed by family.
pub const FRAUD_PATTERNS: &[(&str, &[&str])] = &[
    ("jamtara_scam", &[
        "chhota amount", "multiple transfer", "jaldi karo",
        "aapka account block ho gaya hai",
    ]),
    ("vkyc_bypass", &["left dekh", "blink karo", "head ghuma"]),
    ("lottery_scam", &[
        "aap 25 lakh ka lottery jeete hain", "bank account mein paisa milega",
        "aapka number winner bana hai", "account number aur aadhaar card bhejein",
    ]),
    ("urgent_action", &["turant sampark karein", "abhi call karein", "fori tor par"]),
    ("bank_verification", &[
        "bank account verify karna hai", "aapka account suspend ho jayega",
        "kyc update karna hai",
    ]),
];

#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptRisk {
    pub risk_score: f64,
    pub flagged_keywords: Vec<String>,
    /// Families of the scam scripts that matched.
    pub matched_patterns: Vec<String>,
}

/// Scores a call transcript. Matching is case-insensitive substring search,
/// so each keyword and phrase counts at most once.
pub fn score_transcript(transcript: &str, sentiment: Sentiment) -> TranscriptRisk {
    let text = transcript.to_lowercase();
    let mut score = 0.0;

    let flagged_keywords: Vec<String> = PHISHING_KEYWORDS
        .iter()
        .filter(|k| text.contains(&k.to_lowercase()))
        .map(|k| k.to_string())
        .collect();
    score += KEYWORD_WEIGHT * flagged_keywords.len() as f64;

    let mut matched_patterns = Vec::new();
    for (family, phrases) in FRAUD_PATTERNS {
        let hits = phrases.iter().filter(|p| text.contains(&p.to_lowercase())).count();
        if hits > 0 {
            matched_patterns.push(family.to_string());
            score += PATTERN_WEIGHT * hits as f64;
        }
    }

    match sentiment {
        Sentiment::Negative => score += NEGATIVE_SENTIMENT_WEIGHT,
        Sentiment::Positive => score -= POSITIVE_SENTIMENT_CREDIT,
        Sentiment::Neutral | Sentiment::Mixed => {}
    }

    TranscriptRisk {
        risk_score: score.clamp(0.0, 1.0),
        flagged_keywords,
        matched_patterns,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRisk {
    pub risk_score: f64,
    /// Users whose small transfers add up past the limit.
    pub flagged_users: Vec<String>,
    pub distinct_locations: usize,
    pub rapid_burst: bool,
}

pub fn score_transactions(transactions: &[TransactionRecord]) -> TransactionRisk {
    let mut small_totals: BTreeMap<&str, f64> = BTreeMap::new();
    let mut locations: BTreeSet<&str> = BTreeSet::new();

    for tx in transactions {
        if tx.amount < SMALL_TRANSACTION_LIMIT {
            *small_totals.entry(tx.user_id.as_str()).or_default() += tx.amount;
        }
        locations.insert(tx.location.as_str());
    }

    let flagged_users: Vec<String> = small_totals
        .into_iter()
        .filter(|(_, total)| *total > SMALL_TOTAL_LIMIT)
        .map(|(user, _)| user.to_string())
        .collect();
    let rapid_burst = has_rapid_burst(transactions);

    let mut score = SMALL_TOTAL_WEIGHT * flagged_users.len() as f64;
    if locations.len() > 2 {
        score += SCATTERED_LOCATIONS_WEIGHT;
    }
    if rapid_burst {
        score += RAPID_BURST_WEIGHT;
    }

    TransactionRisk {
        risk_score: score.min(1.0),
        flagged_users,
        distinct_locations: locations.len(),
        rapid_burst,
    }
}

// Needs at least three transfers; any two consecutive ones under a minute apart.
fn has_rapid_burst(transactions: &[TransactionRecord]) -> bool {
    if transactions.len() < 3 {
        return false;
    }
    let mut times: Vec<_> = transactions.iter().map(|tx| tx.timestamp).collect();
    times.sort();
    times.windows(2).any(|w| (w[1] - w[0]).num_seconds() < RAPID_GAP_SECS)
}
