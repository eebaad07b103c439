//! In-page response capture
//!
//! The hook wraps `fetch` and `XMLHttpRequest` so that responses from the
//! allow-listed endpoints are copied into a page-side queue. The engine
//! drains that queue after each operation.

use crate::browser::engine::CapturedResponse;
use crate::url::Endpoint;
use serde_json::Value;

/// Page-side queue of captured responses
const QUEUE: &str = "window.__harvestQueue";

/// Upper bound on queued responses between drains
const QUEUE_LIMIT: usize = 500;

/// Builds the capture hook script
///
/// Safe to run more than once per document; later runs are no-ops.
pub fn hook_script() -> String {
    let fragments = Endpoint::ALL
        .iter()
        .map(|e| format!("\"{}\"", e.fragment()))
        .collect::<Vec<_>>()
        .join(",");

    format!(
        r#"(() => {{
  if (window.__harvestHooked) {{ return; }}
  window.__harvestHooked = true;
  {queue} = {queue} || [];
  const fragments = [{fragments}];
  const wanted = (url) => typeof url === "string" && fragments.some((f) => url.includes(f));
  const push = (entry) => {{
    if ({queue}.length < {limit}) {{ {queue}.push(entry); }}
  }};

  const originalFetch = window.fetch;
  if (originalFetch) {{
    window.fetch = async function (...args) {{
      const response = await originalFetch.apply(this, args);
      try {{
        const url = response.url || (args[0] && args[0].url) || String(args[0]);
        if (wanted(url)) {{
          response.clone().text().then((body) => push({{
            url,
            status: response.status,
            contentType: response.headers.get("content-type") || "",
            resourceType: "fetch",
            body,
          }})).catch(() => {{}});
        }}
      }} catch (e) {{}}
      return response;
    }};
  }}

  const originalOpen = XMLHttpRequest.prototype.open;
  const originalSend = XMLHttpRequest.prototype.send;
  XMLHttpRequest.prototype.open = function (method, url) {{
    this.__harvestUrl = url;
    return originalOpen.apply(this, arguments);
  }};
  XMLHttpRequest.prototype.send = function () {{
    this.addEventListener("load", function () {{
      try {{
        const url = this.responseURL || this.__harvestUrl;
        const textual = this.responseType === "" || this.responseType === "text";
        if (wanted(url) && textual) {{
          push({{
            url,
            status: this.status,
            contentType: this.getResponseHeader("content-type") || "",
            resourceType: "xhr",
            body: this.responseText,
          }});
        }}
      }} catch (e) {{}}
    }});
    return originalSend.apply(this, arguments);
  }};
}})();"#,
        queue = QUEUE,
        fragments = fragments,
        limit = QUEUE_LIMIT,
    )
}

/// Script that returns the queued responses and empties the queue
pub fn drain_script() -> String {
    format!(
        "const captured = {queue} || []; {queue} = []; return captured;",
        queue = QUEUE
    )
}

/// Decodes the value returned by [`drain_script`]
///
/// Entries that do not decode are dropped with a debug log.
pub fn parse_drained(value: Value) -> Vec<CapturedResponse> {
    let entries = match value {
        Value::Array(entries) => entries,
        Value::Null => return Vec::new(),
        other => {
            tracing::debug!("Unexpected capture queue value: {}", other);
            return Vec::new();
        }
    };

    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry) {
            Ok(response) => Some(response),
            Err(e) => {
                tracing::debug!("Dropping malformed captured response: {}", e);
                None
            }
        })
        .collect()
}
