//! TwiML document for a spoken message.

/// Build `<Response><Say>…</Say></Response>` for `message`.
///
/// The message is XML-escaped so caller text cannot inject extra verbs.
pub fn say(message: &str) -> String {
    format!("<Response><Say>{}</Say></Response>", escape_xml(message))
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
