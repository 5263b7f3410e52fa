//! Request validation rules.
//!
//! Every check is pure and deterministic. A check yields
//! [`ValidationResult::Invalid`] with the first failing reason; callers
//! must not reach the lifecycle engine or auth flow in that case.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{ChitFundError, ChitFundResult};
use crate::models::Paisa;
use crate::models::user::normalize_mobile;
use crate::month::YearMonth;

/// One lakh in minor currency units, as fixed by the fund policy.
pub const ONE_LAKH: Paisa = 10_000_000_000;
pub const MIN_FUND_AMOUNT: Paisa = ONE_LAKH;
pub const MAX_FUND_AMOUNT: Paisa = 50 * ONE_LAKH;
pub const MIN_TENURE: u32 = 12;
pub const MAX_TENURE: u32 = 24;
pub const MIN_MEMBERS: u32 = 10;
pub const MAX_MEMBERS: u32 = 25;
pub const MEMBER_COUNT_STEP: u32 = 5;
pub const MAX_CHIT_NAME_LEN: usize = 100;
pub const MAX_USER_NAME_LEN: usize = 255;
pub const MAX_EMAIL_LEN: usize = 255;
pub const MAX_CHIT_ID_LEN: usize = 50;
pub const OTP_LENGTH: usize = 6;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9+_.-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("email pattern compiles")
});

static MOBILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[6-9][0-9]{9}$").expect("mobile pattern compiles"));

const SQL_MARKERS: &[&str] = &[
    "'", "\"", ";", "--", "/*", "*/", "XP_", "SP_", "DROP", "SELECT", "INSERT", "UPDATE",
    "DELETE", "UNION", "OR 1=1", "AND 1=1", "EXEC", "EXECUTE", "SCRIPT",
];

const SCRIPT_MARKERS: &[&str] = &[
    "<script",
    "</script>",
    "<iframe",
    "javascript:",
    "onload=",
    "onerror=",
    "onclick=",
    "onmouseover=",
    "<img",
    "src=javascript:",
    "vbscript:",
    "expression(",
    "eval(",
    "alert(",
    "document.cookie",
];

/// Outcome of a validation check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid(String),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn into_result(self) -> ChitFundResult<()> {
        match self {
            Self::Valid => Ok(()),
            Self::Invalid(message) => Err(ChitFundError::Validation { message }),
        }
    }
}

impl From<Result<(), String>> for ValidationResult {
    fn from(value: Result<(), String>) -> Self {
        match value {
            Ok(()) => Self::Valid,
            Err(reason) => Self::Invalid(reason),
        }
    }
}

fn ensure(condition: bool, reason: &str) -> Result<(), String> {
    if condition {
        Ok(())
    } else {
        Err(reason.to_string())
    }
}

pub fn contains_sql_injection(input: &str) -> bool {
    let upper = input.to_uppercase();
    SQL_MARKERS.iter().any(|marker| upper.contains(marker))
}

pub fn contains_script(input: &str) -> bool {
    let lower = input.to_lowercase();
    SCRIPT_MARKERS.iter().any(|marker| lower.contains(marker))
}

pub fn is_valid_email(email: &str) -> bool {
    email.len() <= MAX_EMAIL_LEN && EMAIL_RE.is_match(email)
}

/// Ten-digit Indian mobile number, optionally written with `+91`,
/// spaces or dashes.
pub fn is_valid_mobile(mobile: &str) -> bool {
    MOBILE_RE.is_match(&normalize_mobile(mobile))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn check_identity(email: Option<&str>, mobile: Option<&str>) -> Result<(), String> {
    let email = non_blank(email);
    let mobile = non_blank(mobile);
    ensure(
        email.is_some() || mobile.is_some(),
        "Either email or mobile is required",
    )?;
    if let Some(email) = email {
        ensure(email.len() <= MAX_EMAIL_LEN, "Email too long")?;
        ensure(EMAIL_RE.is_match(email.trim()), "Invalid email format")?;
    }
    if let Some(mobile) = mobile {
        ensure(is_valid_mobile(mobile), "Invalid mobile format")?;
    }
    Ok(())
}

fn check_chit_id(chit_id: &str) -> Result<(), String> {
    ensure(!chit_id.trim().is_empty(), "Chit ID is required")?;
    ensure(chit_id.chars().count() <= MAX_CHIT_ID_LEN, "Invalid chit ID")?;
    ensure(
        !contains_script(chit_id) && !contains_sql_injection(chit_id),
        "Invalid characters in chit ID",
    )
}

/// Field-level and cross-field checks on a chit creation request.
pub fn validate_chit_creation(
    name: &str,
    fund_amount: Paisa,
    tenure: u32,
    member_count: u32,
    start_month: &str,
) -> ValidationResult {
    let check = || -> Result<(), String> {
        ensure(!name.trim().is_empty(), "Chit name is required")?;
        ensure(
            name.chars().count() <= MAX_CHIT_NAME_LEN,
            "Name too long (max 100 characters)",
        )?;
        ensure(
            !contains_script(name) && !contains_sql_injection(name),
            "Invalid characters in name",
        )?;
        ensure(fund_amount > 0, "Fund amount must be positive")?;
        ensure(
            fund_amount >= MIN_FUND_AMOUNT,
            "Minimum fund amount is 1 lakh",
        )?;
        ensure(
            fund_amount <= MAX_FUND_AMOUNT,
            "Maximum fund amount is 50 lakh",
        )?;
        ensure(
            fund_amount % ONE_LAKH == 0,
            "Fund amount must be a multiple of 1 lakh",
        )?;
        ensure(
            (MIN_TENURE..=MAX_TENURE).contains(&tenure),
            "Tenure must be between 12-24 months",
        )?;
        ensure(
            (MIN_MEMBERS..=MAX_MEMBERS).contains(&member_count),
            "Member count must be between 10-25",
        )?;
        ensure(
            member_count % MEMBER_COUNT_STEP == 0,
            "Member count must be in multiples of 5",
        )?;
        ensure(
            start_month.parse::<YearMonth>().is_ok(),
            "Invalid start month format (use YYYY-MM)",
        )
    };
    check().into()
}

pub fn validate_login(email: Option<&str>, mobile: Option<&str>) -> ValidationResult {
    check_identity(email, mobile).into()
}

pub fn validate_otp_verification(
    email: Option<&str>,
    mobile: Option<&str>,
    otp: &str,
) -> ValidationResult {
    let check = || -> Result<(), String> {
        check_identity(email, mobile)?;
        ensure(!otp.is_empty(), "OTP is required")?;
        ensure(otp.len() == OTP_LENGTH, "OTP must be 6 digits")?;
        ensure(
            otp.bytes().all(|b| b.is_ascii_digit()),
            "OTP must contain only numbers",
        )
    };
    check().into()
}

pub fn validate_member_invite(
    chit_id: &str,
    email: Option<&str>,
    mobile: Option<&str>,
) -> ValidationResult {
    let check = || -> Result<(), String> {
        check_identity(email, mobile)?;
        check_chit_id(chit_id)
    };
    check().into()
}

pub fn validate_join(chit_id: &str) -> ValidationResult {
    check_chit_id(chit_id).into()
}

pub fn validate_profile_update(
    name: Option<&str>,
    email: Option<&str>,
    mobile: Option<&str>,
) -> ValidationResult {
    let check = || -> Result<(), String> {
        if let Some(name) = name {
            ensure(!name.trim().is_empty(), "Name must not be blank")?;
            ensure(
                name.chars().count() <= MAX_USER_NAME_LEN,
                "Name too long (max 255 characters)",
            )?;
            ensure(!contains_script(name), "Invalid characters in name")?;
        }
        if let Some(email) = email {
            ensure(is_valid_email(email.trim()), "Invalid email format")?;
        }
        if let Some(mobile) = mobile {
            ensure(is_valid_mobile(mobile), "Invalid mobile format")?;
        }
        Ok(())
    };
    check().into()
}
