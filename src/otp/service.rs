use rand::Rng;
use tracing::{info, warn};

use super::{repo, OtpPurpose};
use crate::state::AppState;

/// Issuances allowed per email+purpose inside one validity window.
const MAX_ISSUE_PER_WINDOW: i64 = 5;

#[derive(Debug, thiserror::Error)]
pub enum OtpIssueError {
    #[error("Too many codes requested, try again later")]
    RateLimited,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Uniform draw over the full 6-digit space, leading zeros included.
pub fn generate_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000))
}

fn subject(purpose: OtpPurpose) -> &'static str {
    match purpose {
        OtpPurpose::Registration => "Your PLANTIDEN Registration OTP",
        OtpPurpose::PasswordReset => "PLANTIDEN Password Reset",
    }
}

fn bodies(purpose: OtpPurpose, code: &str) -> (String, String) {
    let action = match purpose {
        OtpPurpose::Registration => "registration",
        OtpPurpose::PasswordReset => "password reset",
    };
    let text = format!(
        "Your OTP for PLANTIDEN {action} is: {code}. This code will expire in 15 minutes."
    );
    let html = format!(
        "<p>Your OTP for PLANTIDEN {action} is: <strong>{code}</strong></p>\
<p>This code will expire in 15 minutes.</p>"
    );
    (text, html)
}

/// Generate, persist and dispatch a code. A failed dispatch rolls the code
/// back so an undeliverable code is never considered issued.
pub async fn issue(state: &AppState, email: &str, purpose: OtpPurpose) -> Result<(), OtpIssueError> {
    let recent = repo::issued_in_window(&state.db, email, purpose).await?;
    if recent >= MAX_ISSUE_PER_WINDOW {
        warn!(email = %email, purpose = purpose.as_str(), "otp rate limit hit");
        return Err(OtpIssueError::RateLimited);
    }

    let code = generate_code();
    let id = repo::insert(&state.db, email, &code, purpose).await?;

    let (text, html) = bodies(purpose, &code);
    if let Err(e) = state
        .mailer
        .send(email, subject(purpose), &text, &html)
        .await
    {
        warn!(email = %email, error = %e, "otp dispatch failed, rolling back code");
        repo::delete_by_id(&state.db, id).await?;
        return Err(OtpIssueError::Other(e));
    }

    info!(email = %email, purpose = purpose.as_str(), "otp issued");
    Ok(())
}

/// Drop every outstanding code for an address once its flow completed.
pub async fn discard_all(
    state: &AppState,
    email: &str,
    purpose: OtpPurpose,
) -> anyhow::Result<()> {
    repo::delete_all(&state.db, email, purpose).await
}

/// True when a matching unexpired `(email, code, purpose)` row existed; a
/// matched row is deleted, so a code verifies at most once.
pub async fn verify(
    state: &AppState,
    email: &str,
    code: &str,
    purpose: OtpPurpose,
) -> anyhow::Result<bool> {
    repo::consume(&state.db, email, code, purpose).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_six_ascii_digits() {
        for _ in 0..1000 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.bytes().all(|b| b.is_ascii_digit()));
        }
    }

    #[test]
    fn codes_keep_leading_zeros() {
        // formatting, not sampling: a small draw must pad to six digits
        assert_eq!(format!("{:06}", 7), "000007");
        assert_eq!(format!("{:06}", 0), "000000");
    }

    #[test]
    fn bodies_mention_code_and_expiry() {
        let (text, html) = bodies(OtpPurpose::Registration, "042137");
        assert!(text.contains("042137"));
        assert!(text.contains("15 minutes"));
        assert!(html.contains("<strong>042137</strong>"));

        let (reset_text, _) = bodies(OtpPurpose::PasswordReset, "042137");
        assert!(reset_text.contains("password reset"));
    }
}
