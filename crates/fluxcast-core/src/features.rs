//! Transaction feature extraction
//!
//! Pure text + amount featurization: category-hint flags evaluated against
//! the normalized description/merchant text, plus amount magnitude features
//! and fixed-breakpoint size buckets. No side effects.

use regex::Regex;

use crate::error::Result;

/// Size bucket breakpoints in domain currency units
const SMALL_AMOUNT_LIMIT: f64 = 1_000.0;
const LARGE_AMOUNT_LIMIT: f64 = 10_000.0;

/// Category-hint flags evaluated over transaction text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hint {
    Coffee,
    Dining,
    Shopping,
    Tech,
    Transport,
    Health,
    Housing,
    Travel,
    Income,
    Utilities,
    Food,
    EatingOut,
    Education,
    Communication,
    Clothing,
    Entertainment,
    PersonalCare,
    Savings,
    Gifts,
    Insurance,
    Debt,
}

impl Hint {
    /// Stable key used in the knowledge bundle's hint-weight tables
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Coffee => "coffee",
            Self::Dining => "dining",
            Self::Shopping => "shopping",
            Self::Tech => "tech",
            Self::Transport => "transport",
            Self::Health => "health",
            Self::Housing => "housing",
            Self::Travel => "travel",
            Self::Income => "income",
            Self::Utilities => "utilities",
            Self::Food => "food",
            Self::EatingOut => "eating_out",
            Self::Education => "education",
            Self::Communication => "communication",
            Self::Clothing => "clothing",
            Self::Entertainment => "entertainment",
            Self::PersonalCare => "personal_care",
            Self::Savings => "savings",
            Self::Gifts => "gifts",
            Self::Insurance => "insurance",
            Self::Debt => "debt",
        }
    }
}

/// (hint, alternation pattern) table the extractor compiles once
const HINT_PATTERNS: &[(Hint, &str)] = &[
    (Hint::Coffee, r"coffee|cafe|espresso|latte|cappuccino|starbucks|nero|barista|brew"),
    (Hint::Dining, r"restaurant|dining|lunch|dinner|pizza|burger|mcdonald|kfc"),
    (Hint::Shopping, r"amazon|shopping|store|retail|mall|order|ebay|jumia"),
    (Hint::Tech, r"netflix|software|app|laptop|tech|subscription|saas|cloud|hosting"),
    (Hint::Transport, r"uber|taxi|ride|fuel|petrol|transport|bus|train|metro|boda|matatu|parking"),
    (Hint::Health, r"gym|pharmacy|doctor|health|medical|fitness|clinic|hospital"),
    (Hint::Housing, r"rent|mortgage|housing|accommodation|apartment|landlord|lease"),
    (Hint::Travel, r"flight|airline|hotel|airbnb|booking|travel|trip|vacation"),
    (
        Hint::Income,
        r"salary|deposit|payroll|bonus|interest|dividend|refund|reversal|income|received|earned|wage|stipend",
    ),
    (Hint::Utilities, r"utility|electric|electricity|power|water|internet|cable|umeme|yaka|meter"),
    (Hint::Food, r"food|groceries|supermarket|market|rice|beans|maize|kitchen|sugar"),
    (Hint::EatingOut, r"restaurant|cafe|kfc|mcdonald|takeaway|takeout|snacks|fast\s?food|canteen"),
    (Hint::Education, r"school|fees|tuition|textbook|exam|course|stationery|semester"),
    (Hint::Communication, r"airtime|data|bundle|mobile|sim|telecom|mtn|airtel|topup"),
    (Hint::Clothing, r"clothing|clothes|shoe|shoes|jacket|uniform|fashion"),
    (
        Hint::Entertainment,
        r"movie|cinema|concert|games|gaming|streaming|ticket|leisure|netflix|showmax|spotify|disney|prime\s?video|youtube",
    ),
    (Hint::PersonalCare, r"salon|barber|haircut|toiletries|cosmetics|skincare|groom"),
    (Hint::Savings, r"savings|saved|emergency\sfund"),
    (Hint::Gifts, r"gift|donation|donated|charity|church|tithe|family\ssupport"),
    (Hint::Insurance, r"insurance|premium"),
    (Hint::Debt, r"debt|loan|credit\scard|repayment|installment|emi"),
];

/// Amount size bucket with fixed breakpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeBucket {
    /// < 1,000
    Small,
    /// 1,000 - 10,000
    Medium,
    /// > 10,000
    Large,
}

impl SizeBucket {
    pub fn from_amount(amount: f64) -> Self {
        if amount < SMALL_AMOUNT_LIMIT {
            Self::Small
        } else if amount <= LARGE_AMOUNT_LIMIT {
            Self::Medium
        } else {
            Self::Large
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Small => "is_small",
            Self::Medium => "is_medium",
            Self::Large => "is_large",
        }
    }
}

/// Extracted features for one transaction
#[derive(Debug, Clone)]
pub struct FeatureVector {
    /// Hint flags that fired against the text
    pub hints: Vec<Hint>,
    pub amount: f64,
    pub amount_log: f64,
    pub bucket: SizeBucket,
}

impl FeatureVector {
    pub fn has(&self, hint: Hint) -> bool {
        self.hints.contains(&hint)
    }
}

/// Compiles the hint pattern table once and evaluates it per transaction
#[derive(Debug)]
pub struct FeatureExtractor {
    patterns: Vec<(Hint, Regex)>,
}

impl FeatureExtractor {
    pub fn new() -> Result<Self> {
        let mut patterns = Vec::with_capacity(HINT_PATTERNS.len());
        for (hint, pattern) in HINT_PATTERNS {
            patterns.push((*hint, Regex::new(pattern)?));
        }
        Ok(Self { patterns })
    }

    /// Extract features from normalized (lowercased) text and an amount
    /// magnitude. `text` should already include the merchant name when one
    /// is known.
    pub fn extract(&self, text: &str, amount: f64) -> FeatureVector {
        let amount = amount.abs();
        let hints = self
            .patterns
            .iter()
            .filter(|(_, re)| re.is_match(text))
            .map(|(hint, _)| *hint)
            .collect();

        FeatureVector {
            hints,
            amount,
            amount_log: (amount + 1.0).log10(),
            bucket: SizeBucket::from_amount(amount),
        }
    }
}

/// Normalize description + optional merchant into the text the hint
/// patterns and lexicons match against.
pub fn normalize_text(description: &str, merchant: Option<&str>) -> String {
    let mut text = description.to_lowercase();
    if let Some(m) = merchant {
        text.push(' ');
        text.push_str(&m.to_lowercase());
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
