//! Counters for relayed items and cancelled tasks.
//!
//! With the `metrics` feature enabled these are reported through the
//! `metrics` facade; otherwise they compile to nothing.

/// Which primitive a task belonged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Primitive {
    Merge,
    Split,
    Tee,
    Stage,
    Source,
}

impl Primitive {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Primitive::Merge => "merge",
            Primitive::Split => "split",
            Primitive::Tee => "tee",
            Primitive::Stage => "stage",
            Primitive::Source => "source",
        }
    }
}

/// Record a task exit: how many items it forwarded and whether it was cut short.
pub(crate) fn task_finished(primitive: Primitive, forwarded: u64, cancelled: bool) {
    if cancelled {
        tracing::debug!(primitive = primitive.as_str(), forwarded, "task cancelled");
    } else {
        tracing::debug!(primitive = primitive.as_str(), forwarded, "task finished");
    }

    #[cfg(feature = "metrics")]
    {
        ::metrics::counter!("fanweld_items_forwarded_total", "primitive" => primitive.as_str())
            .increment(forwarded);
        if cancelled {
            ::metrics::counter!("fanweld_tasks_cancelled_total", "primitive" => primitive.as_str())
                .increment(1);
        }
    }
}
