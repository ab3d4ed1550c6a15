//! Rendering call records into message attachments.

use super::Attachment;
use crate::state::{CallRecord, Direction};

/// Render the attachment for one transition.
///
/// The transition supplies text and color; title and footer derive from the
/// record. A type tag, when set, prefixes the text.
pub fn render(record: &CallRecord, text: &str, color: &str) -> Attachment {
    let mut title = match record.direction {
        Direction::Outbound => "➡️ ",
        Direction::Inbound => "⬅️ ",
    }
    .to_string();
    title.push_str("Call from ");
    title.push_str(record.from_num.as_deref().unwrap_or("Unknown"));
    if let Some(name) = &record.from_name
        && name != "anonymous"
    {
        title.push_str(&format!(" ({name})"));
    }

    let mut footer = format!("Time: {}", record.started_at.format("%A %d.%m.%Y %H:%M:%S"));
    if let Some(secs) = record.dialed_secs {
        footer.push_str(&format!(" - Dialed for {}", format_duration(secs)));
    }
    if let Some(secs) = record.answered_secs {
        footer.push_str(&format!(" - Answered for {}", format_duration(secs)));
    }

    let text = match &record.type_tag {
        Some(tag) => format!("{tag}: {text}"),
        None => text.to_string(),
    };

    Attachment {
        color: color.to_string(),
        title,
        text,
        footer,
    }
}

/// Format seconds as `H:MM:SS`.
fn format_duration(secs: u64) -> String {
    format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}
