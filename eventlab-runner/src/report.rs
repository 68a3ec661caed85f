//! Plain-text reports printed by the CLI.

use crate::grouping::GroupingSummary;
use crate::stats::{day_labels, price_labels, GroupStats, StudyStats};
use eventlab_core::{BatchReport, Group, StockRecord, Warning};
use std::fmt::Write;

/// Per-stock detail: prices, cumulative returns, classification, earnings.
pub fn stock_report(record: &StockRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=========== STOCK SUMMARY: {} ===========", record.ticker);
    if let Some(name) = &record.company_name {
        let _ = writeln!(out, "Company:        {name}");
    }
    if let Some(sector) = &record.sector {
        let _ = writeln!(out, "Sector:         {sector}");
    }

    out.push_str("\n[1] Adjusted Prices\n");
    match record.event.as_ref().filter(|e| !e.prices.is_empty()) {
        None => out.push_str("(no price records available)\n"),
        Some(event) => {
            let _ = writeln!(out, "{:<6}{:<14}{:<10}", "t", "Date", "Price");
            let half_width = event.prices.len() / 2;
            for (t, p) in price_labels(half_width).iter().zip(&event.prices) {
                let _ = writeln!(out, "{:<6}{:<14}{:<10.4}", t, p.date.to_string(), p.adj_close);
            }
        }
    }

    out.push_str("\n[2] Cumulative Returns\n");
    let cumulative = record
        .event
        .as_ref()
        .map(|e| e.cumulative_returns.as_slice())
        .unwrap_or(&[]);
    if cumulative.is_empty() {
        out.push_str("(no cumulative return data)\n");
    } else {
        let half_width = cumulative.len() / 2;
        for (t, cum) in day_labels(half_width).iter().zip(cumulative) {
            let _ = writeln!(out, "Day {t:>4}: {cum:.5}");
        }
    }

    out.push_str("\n[3] Classification\n");
    let group = record.group.map(|g| g.as_str()).unwrap_or("Unassigned");
    let _ = writeln!(out, "Group:          {group}");
    let _ = writeln!(out, "Surprise (%):   {:.2}%", record.earnings.surprise_pct);

    let e = &record.earnings;
    out.push_str("\n[4] Earnings Information\n");
    let _ = writeln!(out, "Announcement:   {}", e.announcement);
    if let Some(event) = &record.event {
        let _ = writeln!(out, "Event Day:      {}", event.window.event_day);
        if let Some(note) = &event.adjustment_note {
            let _ = writeln!(out, "Note:           {note}");
        }
    }
    let _ = writeln!(out, "Period Ending:  {}", e.period_ending);
    let _ = writeln!(out, "Estimate:       {:.3}", e.estimate);
    let _ = writeln!(out, "Reported:       {:.3}", e.reported);
    let _ = writeln!(out, "Surprise:       {:.3}", e.surprise);
    out
}

/// Four-line summary for one group.
pub fn group_summary(group: Group, stats: &GroupStats) -> String {
    let row = stats.summary();
    let mut out = String::new();
    let _ = writeln!(out, "========== Group Summary: {group} ==========");
    let _ = writeln!(out, "Samples        : {}", stats.samples);
    let _ = writeln!(out, "Expected AAR   : {:.6}", row.avg_aar_mean);
    let _ = writeln!(out, "AAR STD        : {:.6}", row.avg_aar_std);
    let _ = writeln!(out, "Expected CAAR  : {:.6}", row.final_caar_mean);
    let _ = writeln!(out, "CAAR STD       : {:.6}", row.final_caar_std);
    out
}

/// Day-by-day table of AAR and CAAR moments.
pub fn time_series_table(group: Group, stats: &StudyStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "===== Time Series for {group} =====");
    let _ = writeln!(
        out,
        "{:<6}{:<14}{:<14}{:<14}{:<14}",
        "t", "AAR_mean", "AAR_std", "CAAR_mean", "CAAR_std"
    );
    let Some(g) = stats.group(group) else {
        return out;
    };
    for (i, t) in stats.day_labels().iter().enumerate() {
        let at = |v: &[f64]| v.get(i).copied().unwrap_or(0.0);
        let _ = writeln!(
            out,
            "{:<6}{:<14.6}{:<14.6}{:<14.6}{:<14.6}",
            t,
            at(&g.aar_mean),
            at(&g.aar_std),
            at(&g.caar_mean),
            at(&g.caar_std)
        );
    }
    out
}

pub fn grouping_report(summary: &GroupingSummary) -> String {
    format!(
        "Grouped {} stocks across {} sectors (Miss {}, Meet {}, Beat {}); {} dropped\n",
        summary.total(),
        summary.sectors,
        summary.miss,
        summary.meet,
        summary.beat,
        summary.removed
    )
}

pub fn batch_report(report: &BatchReport) -> String {
    format!(
        "Fetched {}/{} stocks in {:.1}s ({} failed, {} warnings, {} event days adjusted)\n",
        report.succeeded,
        report.total,
        report.elapsed.as_secs_f64(),
        report.failed,
        report.warnings.len(),
        report.adjustments.len()
    )
}

/// Announcements moved to the previous trading day, one line each.
pub fn adjustments_report(adjustments: &[Warning]) -> String {
    if adjustments.is_empty() {
        return "No trading day adjustments.\n".to_string();
    }
    adjustments
        .iter()
        .map(|a| format!("{}: {}\n", a.ticker, a.message))
        .collect()
}

/// Numbered warning list, or a single "No warnings." line.
pub fn warnings_report(warnings: &[Warning]) -> String {
    if warnings.is_empty() {
        return "No warnings.\n".to_string();
    }
    let mut out = String::new();
    for (i, w) in warnings.iter().enumerate() {
        let _ = writeln!(out, "[{}] {w}", i + 1);
    }
    out
}
