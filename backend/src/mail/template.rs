//! Verification email rendering

use super::Email;
use crate::config::MailConfig;

/// Render the verification email for a freshly issued code
///
/// The HTML body carries the code and a link to the verification page for
/// the username; the text body carries the code alone for clients that
/// strip markup.
pub fn verification_email(
    mail: &MailConfig,
    username: &str,
    to_email: &str,
    code: &str,
) -> Email {
    let verify_url = format!("{}/verify/{}", mail.base_url.trim_end_matches('/'), username);

    let html_body = format!(
        r#"<html lang="en">
  <head>
    <title>Verification Code</title>
    <style>
      body {{ font-family: Roboto, Verdana, sans-serif; }}
      .code {{ font-size: 24px; color: #333; }}
      .button {{ background: #4a90d9; padding: 10px; text-decoration: none; }}
    </style>
  </head>
  <body>
    <h2>Hello {username},</h2>
    <p>Thank you for registering. Please use the following verification code to complete your registration:</p>
    <p class="code">{code}</p>
    <p>If you did not request this code, please ignore this email.</p>
    <a class="button" href="{verify_url}">Verify here</a>
  </body>
</html>
"#,
    );

    let text_body = format!(
        "Hello {username},\n\nYour verification code is: {code}\n\nVerify at {verify_url}\n\nIf you did not request this code, please ignore this email.\n",
    );

    Email {
        to_email: to_email.to_string(),
        to_name: username.to_string(),
        subject: format!("{} | Verification Code", mail.sender_name),
        html_body,
        text_body,
    }
}
