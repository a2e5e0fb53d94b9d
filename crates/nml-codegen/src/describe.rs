//! Human-readable summaries of a property shared by the Markdown and
//! template emitters.

use nml_core::ScalarValue;
use nml_schema::{DefaultOrder, DefaultSpec, ExampleValue, Padding, Property};

/// `a, b, c` in namelist syntax.
pub(crate) fn literal_list<'a>(values: impl IntoIterator<Item = &'a ScalarValue>) -> String {
    values
        .into_iter()
        .map(ScalarValue::namelist_literal)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Rendered default plus qualifiers such as padding and order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DefaultSummary {
    pub value: String,
    pub notes: Vec<String>,
}

impl DefaultSummary {
    /// `value (note; note)`, with `quote` wrapped around the value.
    pub fn render(&self, quote: &str) -> String {
        let mut out = format!("{quote}{}{quote}", self.value);
        if !self.notes.is_empty() {
            out.push_str(&format!(" ({})", self.notes.join("; ")));
        }
        out
    }
}

pub(crate) fn default_summary(prop: &Property) -> Option<DefaultSummary> {
    match &prop.default {
        DefaultSpec::None => None,
        DefaultSpec::Scalar(v) | DefaultSpec::Broadcast(v) => Some(DefaultSummary {
            value: v.namelist_literal(),
            notes: Vec::new(),
        }),
        DefaultSpec::Array(a) => {
            let mut notes = Vec::new();
            match &a.padding {
                Padding::None => {}
                Padding::Repeat => notes.push("repeated".to_string()),
                Padding::Scalar(v) => notes.push(format!("padded with {}", v.namelist_literal())),
                Padding::List(vs) => notes.push(format!("padded with [{}]", literal_list(vs))),
            }
            if a.order == DefaultOrder::C && prop.ty.rank() > 1 {
                notes.push("row-major order".to_string());
            }
            Some(DefaultSummary {
                value: format!("[{}]", literal_list(&a.values)),
                notes,
            })
        }
    }
}

pub(crate) fn example_text(example: &ExampleValue) -> String {
    match example {
        ExampleValue::Scalar(v) => v.namelist_literal(),
        ExampleValue::List(vs) => format!("[{}]", literal_list(vs)),
    }
}

/// `(2, max_layers)`, empty for scalars.
pub(crate) fn shape_text(prop: &Property) -> Option<String> {
    prop.is_array()
        .then(|| format!("({})", prop.ty.dimensions().join(", ")))
}
