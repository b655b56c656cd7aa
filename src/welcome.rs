//! Welcome text for members joining a server

use chrono::Duration;

use crate::channels::{MemberJoined, VerificationLevel};
use crate::dispatcher::line_ids;
use crate::lines::{FormatError, LineRenderer, Placeholders};
use crate::text::human_duration;

/// Account age required on medium-verification servers
const MEDIUM_ACCOUNT_AGE_SECS: i64 = 5 * 60;
/// Membership age required on high-verification servers
const HIGH_MEMBERSHIP_AGE_SECS: i64 = 10 * 60;

/// Compose the welcome for `event`, where `now` is the event time.
///
/// On servers that hold new members back, the remaining wait is appended.
pub fn compose_welcome(
    renderer: &LineRenderer,
    agent_name: &str,
    event: &MemberJoined,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<String, FormatError> {
    let mut text = renderer.format_line(
        line_ids::WELCOME,
        &Placeholders::new()
            .with("user_mention", event.member.mention())
            .with("server", event.server.name.as_str()),
    )?;
    text.push('\n');
    text.push_str(&renderer.format_line(
        line_ids::ABOUT_SELF,
        &Placeholders::new().with("client", agent_name),
    )?);
    text.push('\n');
    text.push_str(&renderer.get_line(line_ids::ABOUT_WELCOME));

    let pending = match event.server.verification_level {
        VerificationLevel::Medium => Some((
            line_ids::WELCOME_VERIFICATION_MEDIUM,
            Duration::seconds(MEDIUM_ACCOUNT_AGE_SECS) - (now - event.created_at),
        )),
        VerificationLevel::High => Some((
            line_ids::WELCOME_VERIFICATION_HIGH,
            Duration::seconds(HIGH_MEMBERSHIP_AGE_SECS) - (now - event.joined_at),
        )),
        VerificationLevel::None | VerificationLevel::Low => None,
    };

    if let Some((key, wait)) = pending.filter(|(_, wait)| *wait > Duration::zero()) {
        let seconds = wait.num_milliseconds() as f64 / 1000.0;
        text.push(' ');
        text.push_str(&renderer.format_line(
            key,
            &Placeholders::new().with("time", human_duration(seconds)),
        )?);
        text.push(' ');
        text.push_str(&renderer.get_line(line_ids::WELCOME_VERIFICATION_ACCOUNT));
    }

    Ok(text)
}
