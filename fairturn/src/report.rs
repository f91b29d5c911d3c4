//! Plain-text summary of a drained pool.

use std::fmt::Write;

use fairturn_api::TurnSnapshot;

use crate::pool::DrainReport;

/// Render the counters as an indexed two-column table:
///
/// ```text
///    UUID       Turns
/// 0  worker-0       3
/// 1  worker-1       3
/// ```
pub fn render_table(snapshot: &TurnSnapshot) -> String {
    let index_width = snapshot.len().saturating_sub(1).to_string().len();
    let id_width = snapshot
        .ids()
        .map(|id| id.as_str().len())
        .max()
        .unwrap_or(0)
        .max("UUID".len());
    let count_width = snapshot
        .iter()
        .map(|(_, count)| count.to_string().len())
        .max()
        .unwrap_or(0)
        .max("Turns".len());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:index_width$}  {:<id_width$}  {:>count_width$}",
        "", "UUID", "Turns"
    );
    for (index, (id, count)) in snapshot.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:<index_width$}  {:<id_width$}  {:>count_width$}",
            index,
            id.as_str(),
            count
        );
    }
    out
}

/// One-line outcome summary: turns granted, spread and faults.
pub fn summarize(report: &DrainReport) -> String {
    let faults = report.faults().count();
    format!(
        "{} actors, {} turns, spread {}, {} faulted",
        report.counts.len(),
        report.counts.total(),
        report.counts.spread(),
        faults
    )
}
