//! Human-readable summary renderer for change sets.

use crate::delta::model::{Change, ChangeSet, ListItem, SetValue};
use crate::identity::StableId;
use std::collections::BTreeMap;

/// Render a Markdown summary of a [`ChangeSet`], grouped by element.
///
/// Informational only; intended for review before a delta is persisted or
/// applied.
pub fn render_change_summary(change_set: &ChangeSet) -> String {
    let mut out = String::new();

    out.push_str("## Change Summary\n\n");
    out.push_str(&format!(
        "**Session**: `{}`  \n**Entries**: {}\n\n",
        change_set.session_id.short(),
        change_set.len()
    ));

    if change_set.is_empty() {
        out.push_str("_No changes recorded._\n");
        return out;
    }

    // first-seen order keeps the summary in recording order
    let mut order: Vec<&StableId> = Vec::new();
    let mut grouped: BTreeMap<&StableId, Vec<&Change>> = BTreeMap::new();
    for change in change_set.iter() {
        let entry = grouped.entry(change.element()).or_default();
        if entry.is_empty() {
            order.push(change.element());
        }
        entry.push(change);
    }

    for element in order {
        let changes = &grouped[element];
        out.push_str(&format!("### `{}` ({})\n\n", element, changes[0].kind()));
        for change in changes {
            out.push_str(&format!("- {}\n", describe(change)));
        }
        out.push('\n');
    }

    if !change_set.origins.is_empty() {
        out.push_str(&format!(
            "_{} positional id(s) carried for anonymous elements._\n",
            change_set.origins.len()
        ));
    }

    out
}

fn describe(change: &Change) -> String {
    match change {
        Change::Set { feature, value, .. } => match value {
            SetValue::Attribute(Some(v)) => format!("set `{}` = {}", feature, v),
            SetValue::Attribute(None) => format!("reset `{}` to default", feature),
            SetValue::Reference(Some(id)) => format!("point `{}` at `{}`", feature, id),
            SetValue::Reference(None) => format!("clear `{}`", feature),
        },
        Change::Add {
            feature,
            anchor,
            item,
            ..
        } => {
            let position = match anchor {
                Some(a) => format!("after `{}`", a),
                None => "at head".to_string(),
            };
            let what = match item {
                ListItem::Existing(id) => format!("`{}`", id),
                ListItem::New(def) => {
                    let nested = def.walk().len() - 1;
                    if nested > 0 {
                        format!("new {} `{}` (+{} nested)", def.kind, def.id, nested)
                    } else {
                        format!("new {} `{}`", def.kind, def.id)
                    }
                }
            };
            format!("add {} to `{}` {}", what, feature, position)
        }
        Change::Remove { feature, item, .. } => {
            format!("remove `{}` from `{}`", item, feature)
        }
    }
}
