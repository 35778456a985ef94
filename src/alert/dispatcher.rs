//! Alert dispatcher: formatting and per-recipient fan-out
//!
//! Formats breakout findings and cycle summaries as Telegram-flavored HTML
//! and delivers them to every configured recipient independently. A failed
//! recipient is logged and skipped; the remaining recipients still receive
//! the alert.

use super::{DeliveryStatus, Messenger, Recipient};
use crate::catalog::RelatedSymbol;
use crate::detect::BreakoutEvent;
use crate::error::ChannelError;
use crate::sched::CycleSummary;

/// Dispatcher fanning alerts out to all configured recipients
pub struct AlertDispatcher {
    channel: Box<dyn Messenger>,
    recipients: Vec<Recipient>,
}

impl AlertDispatcher {
    /// Create a dispatcher; the recipient list must be non-empty
    pub fn new(
        channel: Box<dyn Messenger>,
        recipients: Vec<Recipient>,
    ) -> Result<Self, ChannelError> {
        if recipients.is_empty() {
            return Err(ChannelError::InvalidConfig(
                "dispatcher needs at least one recipient".into(),
            ));
        }

        Ok(Self {
            channel,
            recipients,
        })
    }

    /// Recipients this dispatcher delivers to
    pub fn recipients(&self) -> &[Recipient] {
        &self.recipients
    }

    /// Deliver a text to every recipient, isolating failures
    pub async fn broadcast(&self, text: &str) -> Vec<DeliveryStatus> {
        let mut statuses = Vec::with_capacity(self.recipients.len());

        for recipient in &self.recipients {
            match self.channel.send(recipient, text).await {
                Ok(status) => {
                    if !status.success {
                        tracing::warn!(recipient = %recipient, "Delivery failed: {status}");
                    }
                    statuses.push(status);
                }
                Err(e) => {
                    tracing::warn!(recipient = %recipient, error = %e, "Delivery errored");
                    statuses.push(DeliveryStatus::failure(
                        self.channel.name(),
                        recipient.normalized_id(),
                        e.to_string(),
                    ));
                }
            }
        }

        statuses
    }

    /// Format and deliver one breakout, annotated with related symbols
    pub async fn dispatch_breakout(
        &self,
        event: &BreakoutEvent,
        symbols: &[RelatedSymbol],
    ) -> Vec<DeliveryStatus> {
        let text = format_breakout(event, symbols);
        tracing::info!(
            term = %event.term,
            category = %event.category,
            peak = event.peak,
            "Dispatching breakout alert"
        );
        self.broadcast(&text).await
    }

    /// Format and deliver the end-of-cycle summary
    ///
    /// A cycle with no breakouts still produces a summary; silence would be
    /// indistinguishable from a dead process.
    pub async fn dispatch_cycle_summary(&self, summary: &CycleSummary) -> Vec<DeliveryStatus> {
        let text = format_cycle_summary(summary);
        tracing::info!(
            breakouts = summary.events.len(),
            categories = summary.categories_scanned,
            "Dispatching cycle summary"
        );
        self.broadcast(&text).await
    }
}

/// Format a breakout as Telegram HTML
pub fn format_breakout(event: &BreakoutEvent, symbols: &[RelatedSymbol]) -> String {
    let mut text = String::new();

    text.push_str(&format!(
        "\u{1F680} <b>Breakout: {}</b>\n",
        escape(&event.term)
    ));
    text.push_str(&format!("Category: {}\n", escape(&event.category)));

    let peak_date = event.peak_time.format("%Y-%m-%d");
    if event.stale_latest {
        text.push_str(&format!(
            "Peak interest: {:.0} on {peak_date} (latest reported day)\n",
            event.peak
        ));
    } else {
        text.push_str(&format!(
            "Peak interest: {:.0} on {peak_date}\n",
            event.peak
        ));
    }

    text.push_str(&format!("Baseline average: {:.1}\n", event.baseline_avg));

    match event.percent_increase() {
        Some(pct) => text.push_str(&format!(
            "Increase: +{pct:.0}% | z-score: {:.2}\n",
            event.z_score
        )),
        None => text.push_str(&format!("z-score: {:.2}\n", event.z_score)),
    }

    if !symbols.is_empty() {
        text.push_str("\nRelated symbols:\n");
        for symbol in symbols {
            text.push_str(&format!(
                "\u{2022} <b>{}</b>: {}\n",
                escape(&symbol.ticker),
                escape(&symbol.description)
            ));
        }
    }

    text
}

/// Format the end-of-cycle summary as Telegram HTML
pub fn format_cycle_summary(summary: &CycleSummary) -> String {
    let mut text = String::new();

    text.push_str("\u{1F4CA} <b>Scan cycle complete</b>\n");
    text.push_str(&format!(
        "Categories: {} scanned, {} failed\n",
        summary.categories_scanned, summary.categories_failed
    ));
    text.push_str(&format!(
        "Terms: {} scanned, {} no data, {} failed\n",
        summary.terms_scanned, summary.terms_no_data, summary.terms_failed
    ));
    text.push_str(&format!(
        "Batches: {} | Duration: {}m\n",
        summary.batches(),
        summary.duration.as_secs() / 60
    ));

    if summary.events.is_empty() {
        text.push_str("\nNo breakouts detected this cycle.\n");
    } else {
        text.push_str(&format!("\nBreakouts: {}\n", summary.events.len()));
        for event in &summary.events {
            text.push_str(&format!(
                "\u{2022} {} ({}) peaked at {:.0} on {}\n",
                escape(&event.term),
                escape(&event.category),
                event.peak,
                event.peak_time.format("%Y-%m-%d")
            ));
        }
    }

    text
}

/// Escape text for Telegram HTML parse mode
fn escape(text: &str) -> String {
    html_escape::encode_text(text).into_owned()
}
