//! Input validation for free-text search and lead-capture payloads.
//!
//! The natural-language search box feeds user text to an LLM-backed provider,
//! so the prompt guard screens input against a blocklist of injection
//! phrasings before anything leaves this service. The blocklist is
//! best-effort defense-in-depth, not a security boundary: it catches the
//! common instruction-override and role-hijack shapes, nothing more.
//!
//! `sanitize_nlp_summary` is the matching output encoder: model-generated
//! summary text is untrusted and is stripped, truncated, and entity-escaped
//! before it can reach any display surface.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{AppError, AppResult};

// =============================================================================
// Validation Constants
// =============================================================================

/// Minimum prompt length in characters after normalization.
pub const MIN_PROMPT_LENGTH: usize = 3;

/// Maximum prompt length in characters after normalization.
///
/// Long enough for any realistic listing query, short enough to bound what
/// gets forwarded to the NLP provider.
pub const MAX_PROMPT_LENGTH: usize = 500;

/// Maximum length of a sanitized NLP summary, in characters.
pub const MAX_SUMMARY_LENGTH: usize = 500;

/// Maximum length for short lead-form fields (name, phone, form type).
pub const MAX_LEAD_FIELD_LENGTH: usize = 200;

/// Maximum length for the free-text lead message.
pub const MAX_LEAD_MESSAGE_LENGTH: usize = 2000;

/// Fixed user-facing message for rejected prompts.
///
/// Never echoes the matched pattern back; it only redirects the user toward
/// a valid query shape.
const INJECTION_REDIRECT: &str =
    "That doesn't look like a property search. Try something like \
     \"3 bed house in Austin under $500k\".";

// =============================================================================
// Prompt Guard
// =============================================================================

/// Machine-readable reason a prompt was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptErrorCode {
    /// Empty after trimming and whitespace collapsing.
    Empty,
    /// Shorter than [`MIN_PROMPT_LENGTH`] characters.
    TooShort,
    /// Longer than [`MAX_PROMPT_LENGTH`] characters.
    TooLong,
    /// Matched an entry in the injection blocklist.
    Injection,
}

impl PromptErrorCode {
    /// Stable snake_case code for API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptErrorCode::Empty => "empty",
            PromptErrorCode::TooShort => "too_short",
            PromptErrorCode::TooLong => "too_long",
            PromptErrorCode::Injection => "injection",
        }
    }
}

/// A rejected prompt: machine-readable code plus a user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRejection {
    pub code: PromptErrorCode,
    pub message: &'static str,
}

impl PromptRejection {
    fn new(code: PromptErrorCode, message: &'static str) -> Self {
        Self { code, message }
    }
}

/// Case-insensitive blocklist of prompt-injection phrasings.
///
/// Families covered: instruction override, role hijack, system-token
/// markers, prompt/config exfiltration, and code-execution markers.
/// Compiled once; the patterns are literals so compilation cannot fail.
static INJECTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // Instruction-override phrasing
        r"(?i)\bignore\s+(?:all\s+|any\s+)?(?:previous|prior|above|earlier)\s+(?:instructions?|prompts?|rules?|context)",
        r"(?i)\bdisregard\s+(?:all\s+|any\s+)?(?:previous|prior|above|earlier)",
        r"(?i)\bforget\s+(?:all\s+)?(?:your|previous|prior)\s+(?:instructions?|rules?|training)",
        // Role-hijack phrasing
        r"(?i)\byou\s+are\s+now\s+an?\b",
        r"(?i)\bact\s+as\s+an?\b",
        r"(?i)\bpretend\s+to\s+be\b",
        // System-token markers
        r"(?i)\[\s*system\s*\]",
        r"(?i)\[/?INST\]",
        r"(?i)<\|im_start\|>",
        r"(?i)<<\s*SYS\s*>>",
        // Prompt/config exfiltration
        r"(?i)\bwhat\s+are\s+your\s+instructions\b",
        r"(?i)\b(?:reveal|show|print|repeat)\s+(?:me\s+)?your\s+(?:system\s+)?prompt\b",
        // Code-execution markers
        r"```",
        r"(?i)\beval\s*\(",
        r"(?i)\bexec\s*\(",
        r"(?i)\bimport\s+os\b",
        r"(?i)\brequire\s*\(",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

/// Regex matching HTML tags for the summary sanitizer.
static HTML_TAG: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"<[^>]*>").ok());

/// Validate a free-text natural-language search prompt.
///
/// Checks run in order and short-circuit on the first failure:
///
/// 1. Normalize: trim and collapse internal whitespace runs to single spaces
/// 2. Reject empty input
/// 3. Reject input shorter than [`MIN_PROMPT_LENGTH`] characters
/// 4. Reject input longer than [`MAX_PROMPT_LENGTH`] characters
/// 5. Reject input matching the injection blocklist
///
/// On success, returns the normalized string to be forwarded upstream.
/// Rejections carry a fixed redirect message; the matched pattern is never
/// echoed back to the caller.
pub fn validate_nlp_prompt(input: &str) -> Result<String, PromptRejection> {
    // Trim and collapse internal whitespace in one pass.
    let normalized = input.split_whitespace().collect::<Vec<_>>().join(" ");

    if normalized.is_empty() {
        return Err(PromptRejection::new(
            PromptErrorCode::Empty,
            "Search query cannot be empty.",
        ));
    }

    let length = normalized.chars().count();

    if length < MIN_PROMPT_LENGTH {
        return Err(PromptRejection::new(
            PromptErrorCode::TooShort,
            "Search query must be at least 3 characters.",
        ));
    }

    if length > MAX_PROMPT_LENGTH {
        return Err(PromptRejection::new(
            PromptErrorCode::TooLong,
            "Search query cannot exceed 500 characters.",
        ));
    }

    if INJECTION_PATTERNS
        .iter()
        .any(|pattern| pattern.is_match(&normalized))
    {
        return Err(PromptRejection::new(
            PromptErrorCode::Injection,
            INJECTION_REDIRECT,
        ));
    }

    Ok(normalized)
}

/// Sanitize model-generated summary text for display.
///
/// The NLP provider's summary is untrusted output. In order: strip HTML tags,
/// truncate to [`MAX_SUMMARY_LENGTH`] characters, then entity-escape
/// `& < > " '`. Regex tag stripping is not an HTML parser; combined with the
/// escaping pass it is adequate for plain-text summaries.
pub fn sanitize_nlp_summary(input: &str) -> String {
    let stripped = match HTML_TAG.as_ref() {
        Some(re) => re.replace_all(input, ""),
        None => std::borrow::Cow::Borrowed(input),
    };

    let truncated: String = stripped.chars().take(MAX_SUMMARY_LENGTH).collect();

    let mut escaped = String::with_capacity(truncated.len());
    for c in truncated.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

// =============================================================================
// Lead-Form Validation
// =============================================================================

/// Validate a required short text field on the lead form.
pub fn validate_lead_field(value: &str, field: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }

    if value.chars().count() > MAX_LEAD_FIELD_LENGTH {
        return Err(AppError::BadRequest(format!(
            "{field} cannot exceed {MAX_LEAD_FIELD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Regex for a minimally well-formed email address.
///
/// Intentionally loose: one `@`, no whitespace, a dot in the domain. The CRM
/// performs its own verification downstream.
static EMAIL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());

/// Validate the lead email address format.
pub fn validate_email(email: &str) -> AppResult<()> {
    let well_formed = EMAIL
        .as_ref()
        .is_some_and(|re| re.is_match(email.trim()));

    if !well_formed {
        return Err(AppError::BadRequest(
            "A valid email address is required".to_string(),
        ));
    }

    Ok(())
}

/// Validate the optional free-text lead message.
pub fn validate_lead_message(message: &str) -> AppResult<()> {
    if message.chars().count() > MAX_LEAD_MESSAGE_LENGTH {
        return Err(AppError::BadRequest(format!(
            "Message cannot exceed {MAX_LEAD_MESSAGE_LENGTH} characters"
        )));
    }

    Ok(())
}
