use digest_domain::EmailSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Compact,
    Expanded,
    Full,
}

impl Format {
    pub fn parse(s: Option<&str>) -> Self {
        match s {
            Some("full") | Some("json") => Self::Full,
            Some("expanded") => Self::Expanded,
            _ => Self::Compact,
        }
    }
}

pub fn format_summaries(summaries: &[EmailSummary], fmt: Format) -> String {
    match fmt {
        Format::Compact | Format::Expanded => {
            let max_text = if fmt == Format::Expanded { 0 } else { 200 };
            let mut lines: Vec<String> = Vec::with_capacity(summaries.len() + 1);
            lines.push(format!("{} emails:", summaries.len()));
            for s in summaries {
                lines.push(format_summary_line(s, max_text));
            }
            lines.join("\n")
        }
        Format::Full => to_json(summaries),
    }
}

pub fn format_summary(summary: &EmailSummary, fmt: Format) -> String {
    match fmt {
        Format::Compact => format_summary_line(summary, 200),
        Format::Expanded => format_summary_line(summary, 0),
        Format::Full => to_json(summary),
    }
}

fn format_summary_line(s: &EmailSummary, max_text: usize) -> String {
    let text = if max_text > 0 {
        truncate(&s.summary, max_text)
    } else {
        clean_text(&s.summary)
    };
    let subject = if max_text > 0 {
        truncate(&s.subject, 60)
    } else {
        clean_text(&s.subject)
    };
    format!(
        "  [{priority}] {sender} | {subject}: {text}",
        priority = s.priority,
        sender = s.sender,
    )
}

fn clean_text(s: &str) -> String {
    let clean: String = s.chars().filter(|c| *c != '\r').collect();
    clean.replace('\n', " ")
}

fn truncate(s: &str, max: usize) -> String {
    let oneline = clean_text(s);
    if oneline.chars().count() > max {
        let truncated: String = oneline.chars().take(max).collect();
        format!("{truncated}...")
    } else {
        oneline
    }
}

fn to_json<T: serde::Serialize + ?Sized>(val: &T) -> String {
    serde_json::to_string(val).unwrap_or_else(|e| format!("serialization error: {e}"))
}
