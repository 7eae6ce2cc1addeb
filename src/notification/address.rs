//! Recipient and reply-to resolution from submission answers.

use crate::submission::{FieldId, NotificationRule, Submission};

use super::store::NotificationConfigRecord;

/// Field ids a rule resolves its addresses from, after applying the
/// inline-reference-over-persisted-record precedence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EffectiveFieldIds {
    pub to_field_id: Option<FieldId>,
    pub from_field_id: Option<FieldId>,
}

impl EffectiveFieldIds {
    /// Inline field references win; the persisted record fills the gaps.
    pub fn resolve(rule: &NotificationRule, record: &NotificationConfigRecord) -> Self {
        Self {
            to_field_id: pick(rule.to_field.map(|f| f.id), record.to_field_id),
            from_field_id: pick(rule.from_field.map(|f| f.id), record.from_field_id),
        }
    }
}

fn pick(inline: Option<FieldId>, persisted: Option<FieldId>) -> Option<FieldId> {
    present(inline).or_else(|| present(persisted))
}

// id 0 means "no field"
fn present(id: Option<FieldId>) -> Option<FieldId> {
    id.filter(|id| *id != 0)
}

/// Resolve an address from the answer to `field_id`, or return `fallback`.
///
/// Only non-empty string answers are used. Anything else (missing field,
/// absent content, numbers, objects) yields the fallback unchanged. No email
/// syntax validation happens here.
pub fn resolve_address(
    submission: &Submission,
    field_id: Option<FieldId>,
    fallback: Option<&str>,
) -> Option<String> {
    let fallback = || fallback.map(str::to_string);

    let Some(field_id) = present(field_id) else {
        return fallback();
    };

    let content = submission
        .field(field_id)
        .and_then(|field| field.content.as_ref());

    match content.and_then(|content| content.as_text()) {
        Some(text) if !text.is_empty() => Some(text.to_string()),
        _ => fallback(),
    }
}
