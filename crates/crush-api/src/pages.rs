use std::fmt::Write;

use crush_types::models::User;

/// Escape text for use in HTML element content and quoted attributes.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <title>{title}</title>
    <link rel="stylesheet" href="/style.css">
  </head>
  <body>
    <div class="container">
{body}
    </div>
  </body>
</html>
"#
    )
}

pub fn otp_page(email: &str, reg: &str) -> String {
    let email = escape(email);
    let reg = escape(reg);
    layout(
        "OTP Verification",
        &format!(
            r#"      <h1>OTP Verification</h1>
      <p>An OTP has been sent to {email}. Please enter it below:</p>
      <form action="/verify-otp" method="POST">
        <input type="hidden" name="email" value="{email}" />
        <input type="hidden" name="reg" value="{reg}" />
        <label for="otp">OTP:</label>
        <input type="text" id="otp" name="otp" inputmode="numeric" required />
        <button type="submit">Verify OTP</button>
      </form>"#
        ),
    )
}

pub fn choices_page(user: &User) -> String {
    let name = escape(&user.name);
    let reg = escape(&user.reg);
    let current = escape(&user.crushes.join(","));
    layout(
        "Choose Your Crushes",
        &format!(
            r#"      <h1>Hello, {name}!</h1>
      <p>Enter the registration numbers (comma separated) of up to 5 people you have a crush on:</p>
      <form action="/submit-choices" method="POST">
        <input type="hidden" name="reg" value="{reg}" />
        <input type="text" name="crushes" value="{current}" placeholder="e.g., 20123456,20123457,20123458" required/>
        <button type="submit">Submit Choices</button>
      </form>"#
        ),
    )
}

pub fn results_page(user: &User, matches: &[User]) -> String {
    let mut body = format!("      <h1>Hi {}!</h1>\n", escape(&user.name));
    if matches.is_empty() {
        body.push_str("      <h2>No mutual matches found yet.</h2>\n");
    } else {
        body.push_str("      <h2>Mutual Matches Found!</h2>\n      <ul>\n");
        for m in matches {
            // Writing into a String cannot fail.
            let _ = writeln!(
                body,
                r#"        <li>{name} (Reg: {reg}) - <a href="/chat?user1={me}&amp;user2={reg}">Chat Now</a></li>"#,
                name = escape(&m.name),
                reg = escape(&m.reg),
                me = escape(&user.reg),
            );
        }
        body.push_str("      </ul>\n");
    }
    body.push_str(r#"      <a href="/">Back to Home</a>"#);
    layout("Your Matches", &body)
}
