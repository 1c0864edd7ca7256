use deskbridge_core::records::{Attachment, Thread};

pub const TRANSCRIPT_FILE_NAME: &str = "transcript.html";

/// Render a conversation as a small standalone HTML document.
pub fn render_html(thread: &Thread) -> String {
    let title = thread.subject.as_deref().unwrap_or("Conversation");
    let mut html = format!(
        "<html><head><meta charset=\"utf-8\"><title>{}</title></head><body>\n<h1>{}</h1>\n",
        escape(title),
        escape(title)
    );
    for message in &thread.messages {
        let sent = message
            .sent_at
            .map(|at| format!(" <small>{}</small>", at.format("%Y-%m-%d %H:%M UTC")))
            .unwrap_or_default();
        html.push_str(&format!(
            "<div class=\"message\"><p><strong>{}</strong>{}</p><p>{}</p></div>\n",
            escape(&message.author),
            sent,
            escape(&message.body).replace('\n', "<br>")
        ));
    }
    html.push_str("</body></html>\n");
    html
}

pub fn as_attachment(thread: &Thread) -> Attachment {
    Attachment {
        file_name: TRANSCRIPT_FILE_NAME.to_string(),
        content_type: "text/html".to_string(),
        bytes: render_html(thread).into_bytes(),
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
