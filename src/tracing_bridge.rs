//! Bridge from `tracing` spans to Micromegas thread-local spans.
//!
//! Bevy (with the `trace` feature) emits a `tracing` span for every schedule
//! run, and the agent plugin opens an `agent_tick` span around each engine
//! decision.  This layer forwards both kinds as Micromegas named-scope
//! events so the trace timeline shows schedules and per-tier decision cost
//! side by side.

use micromegas_tracing::dispatch::{on_begin_named_scope, on_end_named_scope};
use micromegas_tracing::intern_string::intern_string;
use tracing::Subscriber;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

// All bridged spans share a single static source location.
micromegas_tracing::static_span_location!(BRIDGE_LOCATION);

/// Span name and the field that labels it in the timeline.
const BRIDGED: [(&str, &str); 2] = [("schedule", "name"), ("agent_tick", "tier")];

/// Data stored in each bridged span's extensions.
struct BridgedSpan {
    label: &'static str,
}

/// Field visitor that extracts one named field from a tracing span.
struct LabelVisitor {
    field: &'static str,
    value: Option<String>,
}

impl Visit for LabelVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == self.field {
            self.value = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == self.field {
            self.value = Some(format!("{:?}", value));
        }
    }
}

/// Timeline label for a bridged span, e.g. `agent_tick/elite`.
fn label_for(span_name: &str, value: Option<String>) -> String {
    match (span_name, value) {
        ("schedule", Some(name)) => name,
        (span, Some(value)) => format!("{}/{}", span, value),
        (span, None) => span.to_string(),
    }
}

/// A `tracing_subscriber::Layer` that bridges schedule and agent tick spans
/// into Micromegas thread-local named-scope events.
pub struct MicromegasBridgeLayer;

impl<S> Layer<S> for MicromegasBridgeLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let span_name = attrs.metadata().name();
        let Some(&(_, field)) = BRIDGED.iter().find(|(name, _)| *name == span_name) else {
            return;
        };

        let mut visitor = LabelVisitor {
            field,
            value: None,
        };
        attrs.record(&mut visitor);

        let interned = intern_string(&label_for(span_name, visitor.value));
        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(BridgedSpan { label: interned });
        }
    }

    fn on_enter(&self, id: &Id, ctx: Context<'_, S>) {
        if let Some(span) = ctx.span(id) {
            let extensions = span.extensions();
            if let Some(data) = extensions.get::<BridgedSpan>() {
                on_begin_named_scope(&BRIDGE_LOCATION, data.label);
            }
        }
    }

    fn on_exit(&self, id: &Id, ctx: Context<'_, S>) {
        if let Some(span) = ctx.span(id) {
            let extensions = span.extensions();
            if let Some(data) = extensions.get::<BridgedSpan>() {
                on_end_named_scope(&BRIDGE_LOCATION, data.label);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_name_the_tier() {
        assert_eq!(label_for("agent_tick", Some("elite".into())), "agent_tick/elite");
        assert_eq!(label_for("schedule", Some("Update".into())), "Update");
        assert_eq!(label_for("agent_tick", None), "agent_tick");
    }
}
