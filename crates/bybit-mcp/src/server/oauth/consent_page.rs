//! HTML consent page for OAuth authorization.

/// Capabilities granted by the `all` scope, as shown to the user.
const PERMISSIONS: [&str; 5] = [
    "View market data and prices",
    "Execute trades and manage orders",
    "View account balances and positions",
    "Manage positions (leverage, TP/SL)",
    "Transfer assets between accounts",
];

/// Render the consent page for a pending authorization request.
///
/// All parameters are HTML-escaped to prevent XSS.
pub fn render_consent_page(
    consent_id: &str,
    client_name: Option<&str>,
    pin_required: bool,
    error_message: Option<&str>,
) -> String {
    let requester = client_name.map_or_else(
        || "An application".to_string(),
        |name| format!("<strong>{}</strong>", html_escape(name)),
    );

    let permissions: String = PERMISSIONS
        .iter()
        .map(|p| format!("    <li>{p}</li>\n"))
        .collect();

    let pin_field = if pin_required {
        r#"<div class="pin-group">
      <label for="pin">Consent PIN</label>
      <input type="password" id="pin" name="pin" class="pin-input" placeholder="Enter PIN" autocomplete="off" autofocus>
    </div>"#
    } else {
        ""
    };

    let error_html = error_message
        .map(|msg| format!(r#"<div class="error-msg">{}</div>"#, html_escape(msg)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width,initial-scale=1">
<title>Bybit Trading MCP - Authorization</title>
<style>
* {{ margin: 0; padding: 0; box-sizing: border-box; }}
body {{ font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif; background: #0a0a0f; color: #e0e0e0; min-height: 100vh; display: flex; align-items: center; justify-content: center; }}
.card {{ background: #16161e; border: 1px solid #2a2a3a; border-radius: 16px; padding: 40px; max-width: 480px; width: 90%; box-shadow: 0 8px 32px rgba(0,0,0,0.4); }}
.logo {{ font-size: 28px; font-weight: 700; color: #f7a600; margin-bottom: 8px; }}
.subtitle {{ color: #888; font-size: 14px; margin-bottom: 28px; }}
.section-title {{ font-size: 13px; color: #666; text-transform: uppercase; letter-spacing: 1px; margin-bottom: 12px; }}
.permissions {{ list-style: none; margin-bottom: 32px; }}
.permissions li {{ padding: 10px 0; border-bottom: 1px solid #1e1e2e; font-size: 14px; }}
.permissions li::before {{ content: "\2713"; color: #f7a600; font-weight: bold; margin-right: 10px; }}
.pin-group {{ margin-bottom: 24px; }}
.pin-group label {{ display: block; font-size: 13px; color: #888; margin-bottom: 8px; text-transform: uppercase; letter-spacing: 1px; }}
.pin-input {{ width: 100%; padding: 12px 16px; border: 1px solid #2a2a3a; border-radius: 10px; background: #0a0a0f; color: #e0e0e0; font-size: 16px; letter-spacing: 4px; text-align: center; outline: none; }}
.pin-input:focus {{ border-color: #f7a600; }}
.error-msg {{ color: #ef4444; font-size: 13px; margin-bottom: 16px; }}
.buttons {{ display: flex; gap: 12px; }}
.btn {{ flex: 1; padding: 14px 24px; border: none; border-radius: 10px; font-size: 15px; font-weight: 600; cursor: pointer; }}
.btn:hover {{ opacity: 0.85; }}
.btn-approve {{ background: #22c55e; color: #fff; }}
.btn-deny {{ background: #2a2a3a; color: #e0e0e0; }}
</style>
</head>
<body>
<div class="card">
  <div class="logo">Bybit Trading MCP</div>
  <div class="subtitle">{requester} is requesting access to your trading server</div>
  <div class="section-title">Permissions requested</div>
  <ul class="permissions">
{permissions}  </ul>
  <form method="POST" action="/consent">
    <input type="hidden" name="consent_id" value="{consent_id}">
    {pin_field}
    {error_html}
    <div class="buttons">
      <button type="submit" name="action" value="deny" class="btn btn-deny">Deny</button>
      <button type="submit" name="action" value="approve" class="btn btn-approve">Approve</button>
    </div>
  </form>
</div>
</body>
</html>"#,
        consent_id = html_escape(consent_id),
    )
}

/// Escape HTML special characters.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
