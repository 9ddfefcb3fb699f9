/// Deliver an email verification code. No mail transport is configured, so the
/// code is written to the log.
pub fn send_verify_code(email: &str, code: &str) {
    rocket::info!("Verification code for {}: {}", email, code);
}
