use crate::request::Request;
use crate::supervisor::{Page, PageContext};
use std::collections::HashMap;
use std::io::Write;

/// Built-in page that echoes the request back as HTML
///
/// Served by the `gosp-server` binary so a deployment can be checked end to
/// end before any real page is installed.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoPage;

impl Page for EchoPage {
    fn render(&self, ctx: &mut PageContext) -> anyhow::Result<()> {
        ctx.set_mime_type("text/html");
        let Some(request) = ctx.request().cloned() else {
            write!(
                ctx,
                "<!DOCTYPE html>\n<html><head><title>Gosp</title></head>\
                 <body><p>No request was provided.</p></body></html>\n"
            )?;
            return Ok(());
        };

        write!(
            ctx,
            "<!DOCTYPE html>\n<html><head><title>{}</title></head><body>\n",
            escape(&request.uri)
        )?;
        write_fields(ctx, &request)?;
        write_map(ctx, "Headers", &request.header_data)?;
        write_map(ctx, "Post data", &request.post_data)?;
        write_map(ctx, "Environment", &request.environment)?;
        writeln!(ctx, "</body></html>")?;
        Ok(())
    }
}

fn write_fields(ctx: &mut PageContext, request: &Request) -> std::io::Result<()> {
    let port = request.port.to_string();
    let request_time = request.request_time.to_string();
    let rows = [
        ("Scheme", request.scheme.as_str()),
        ("Local hostname", request.local_hostname.as_str()),
        ("Port", port.as_str()),
        ("URI", request.uri.as_str()),
        ("Path info", request.path_info.as_str()),
        ("Query arguments", request.query_args.as_str()),
        ("URL", request.url.as_str()),
        ("Method", request.method.as_str()),
        ("Request line", request.request_line.as_str()),
        ("Request time", request_time.as_str()),
        ("Remote hostname", request.remote_hostname.as_str()),
        ("Remote IP", request.remote_ip.as_str()),
        ("Filename", request.filename.as_str()),
        ("Admin email", request.admin_email.as_str()),
    ];
    writeln!(ctx, "<h1>Request</h1>\n<table>")?;
    for (label, value) in rows {
        writeln!(ctx, "<tr><th>{label}</th><td>{}</td></tr>", escape(value))?;
    }
    writeln!(ctx, "</table>")
}

fn write_map(
    ctx: &mut PageContext,
    title: &str,
    map: &HashMap<String, String>,
) -> std::io::Result<()> {
    if map.is_empty() {
        return Ok(());
    }
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort();
    writeln!(ctx, "<h2>{title}</h2>\n<table>")?;
    for (name, value) in entries {
        writeln!(
            ctx,
            "<tr><th>{}</th><td>{}</td></tr>",
            escape(name),
            escape(value)
        )?;
    }
    writeln!(ctx, "</table>")
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::RenderedResponse;
    use crate::supervisor::Supervisor;
    use std::sync::Arc;

    #[test]
    fn test_escape() {
        assert_eq!(escape("<a href=\"x\">&</a>"), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
    }

    #[test]
    fn test_echo_without_request() {
        let mut out = Vec::new();
        Supervisor::new(EchoPage).render(None, &mut out).unwrap();
        let resp = RenderedResponse::parse(&out).unwrap();
        assert_eq!(resp.mime_type.as_deref(), Some("text/html"));
        assert!(resp.body_text().contains("No request was provided."));
    }

    #[test]
    fn test_echo_escapes_request_values() {
        let mut req = Request {
            uri: "/<script>".into(),
            method: "GET".into(),
            ..Request::default()
        };
        req.header_data.insert("X-Test".into(), "a&b".into());
        let mut out = Vec::new();
        Supervisor::new(EchoPage)
            .render(Some(Arc::new(req)), &mut out)
            .unwrap();
        let body = RenderedResponse::parse(&out).unwrap().body_text();
        assert!(body.contains("/&lt;script&gt;"));
        assert!(body.contains("<th>X-Test</th><td>a&amp;b</td>"));
        assert!(!body.contains("<h2>Post data</h2>"));
    }
}
