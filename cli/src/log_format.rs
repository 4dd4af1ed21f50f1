//! Plain-text event format that tags each line with the research session it belongs to.
//!
//! `TIMESTAMP LEVEL [session id=<id>] target: fields`; the tag is omitted outside a
//! `session` span, so concurrent sessions from `bats run` can be told apart.

use std::fmt;

use tracing_core::Subscriber;
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::time::{FormatTime, SystemTime};
use tracing_subscriber::fmt::{FmtContext, FormattedFields};
use tracing_subscriber::registry::LookupSpan;

/// Name of the span the runner opens per research session.
const SESSION_SPAN: &str = "session";

#[derive(Default)]
pub struct SessionLines {
    timer: SystemTime,
}

impl SessionLines {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S, N> FormatEvent<S, N> for SessionLines
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing_core::Event<'_>,
    ) -> fmt::Result {
        self.timer.format_time(&mut writer)?;
        write!(writer, " {}", event.metadata().level())?;

        let session = ctx
            .event_scope()
            .and_then(|mut scope| scope.find(|span| span.name() == SESSION_SPAN));
        if let Some(span) = session {
            let ext = span.extensions();
            match ext.get::<FormattedFields<N>>().filter(|f| !f.is_empty()) {
                Some(fields) => write!(writer, " [session {}]", fields)?,
                None => write!(writer, " [session]")?,
            }
        }

        write!(writer, " {}: ", event.metadata().target())?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
