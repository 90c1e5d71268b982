//! Page-side scripts
//!
//! Everything that has to run inside the page. Arguments are embedded as
//! JSON string literals, never spliced raw.

/// Id of the hidden element that receives captured images
pub const IMAGE_HOLDER_ID: &str = "base64imagedownload";

/// Per-element render facts in `getElementsByTagName('*')` order, which is
/// the same document order the arena walks.
pub const RENDER_FACTS: &str = r#"(() => {
  const elements = [];
  for (const el of document.getElementsByTagName('*')) {
    const rect = el.getBoundingClientRect();
    const style = window.getComputedStyle(el);
    const text = typeof el.innerText === 'string' ? el.innerText : el.textContent;
    elements.push([
      style.display, style.color, style.backgroundColor, style.font,
      rect.left, rect.top, rect.width, rect.height,
      text, el.outerHTML,
    ]);
  }
  return { scrollX: window.scrollX, scrollY: window.scrollY, elements };
})()"#;

pub const READY_STATE: &str = "document.readyState === 'complete'";

pub const USER_AGENT: &str = "navigator.userAgent";

pub const DOCUMENT_COOKIE: &str = "document.cookie";

pub const RENDERED_HTML: &str = "document.documentElement.outerHTML";

/// Called with a node as `this`
pub const IS_CONNECTED: &str = "function() { return this.isConnected; }";

/// Array of every node matching `expression`, drained from an ordered
/// iterator until it reports no more nodes.
pub fn resolve_path(expression: &str) -> String {
    format!(
        r#"(() => {{
  const it = document.evaluate({expr}, document, null, XPathResult.ORDERED_NODE_ITERATOR_TYPE, null);
  const nodes = [];
  for (let node = it.iterateNext(); node; node = it.iterateNext()) nodes.push(node);
  return nodes;
}})()"#,
        expr = js_string(expression)
    )
}

/// Fetch `src` from the page, encode it as a data URL and store it in the
/// hidden holder element. Relative sources resolve against the document's
/// base URI. Resolves once, after the holder is written. A failed fetch
/// never resolves.
pub fn capture_image(src: &str) -> String {
    format!(
        r#"new Promise((resolve) => {{
  const xhr = new XMLHttpRequest();
  xhr.open('GET', new URL({src}, document.baseURI).href, true);
  xhr.responseType = 'blob';
  xhr.onload = () => {{
    if (xhr.status < 200 || xhr.status >= 300) return;
    const reader = new FileReader();
    reader.onloadend = () => {{
      let holder = document.getElementById({holder});
      if (!holder) {{
        holder = document.createElement('span');
        holder.id = {holder};
        holder.style.display = 'none';
        document.body.appendChild(holder);
      }}
      holder.textContent = reader.result;
      resolve(reader.result.length);
    }};
    reader.readAsDataURL(xhr.response);
  }};
  xhr.send();
}})"#,
        src = js_string(src),
        holder = js_string(IMAGE_HOLDER_ID)
    )
}

/// Current content of the image holder, or null
pub fn read_image_holder() -> String {
    format!(
        "(() => {{ const el = document.getElementById({}); return el ? el.textContent : null; }})()",
        js_string(IMAGE_HOLDER_ID)
    )
}

/// JSON string literal, which is also a valid JS string literal
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expression_is_quoted() {
        let script = resolve_path(r#"/html/body/div[@id="x"]'); alert(1); ('"#);
        assert!(script.contains(r#"document.evaluate("/html/body/div[@id=\"x\"]'); alert(1); ('", document"#));
        assert!(script.contains("ORDERED_NODE_ITERATOR_TYPE"));
    }

    #[test]
    fn test_capture_image_embeds_url_and_holder() {
        let script = capture_image("img/a.png");
        assert!(script.contains(r#"xhr.open('GET', new URL("img/a.png", document.baseURI).href, true)"#));
        assert!(script.contains(r#"holder.id = "base64imagedownload""#));
        assert!(script.starts_with("new Promise"));
    }

    #[test]
    fn test_read_image_holder() {
        assert_eq!(
            read_image_holder(),
            r#"(() => { const el = document.getElementById("base64imagedownload"); return el ? el.textContent : null; })()"#
        );
    }
}
