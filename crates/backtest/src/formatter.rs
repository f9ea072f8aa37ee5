#![allow(clippy::format_push_string)]

use crate::metrics::BacktestSummary;

pub struct ReportFormatter;

impl ReportFormatter {
    #[must_use]
    pub fn format(summary: &BacktestSummary) -> String {
        let mut output = String::new();

        output.push('\n');
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push_str("                 THRESHOLD BACKTEST RESULTS                    \n");
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push('\n');

        output.push_str("Time Period\n");
        output.push_str("───────────────────────────────────────────────────────────────\n");
        match (summary.start_time, summary.end_time) {
            (Some(start), Some(end)) => {
                output.push_str(&format!(
                    "Start:                 {}\n",
                    start.format("%Y-%m-%d %H:%M:%S UTC")
                ));
                output.push_str(&format!(
                    "End:                   {}\n",
                    end.format("%Y-%m-%d %H:%M:%S UTC")
                ));
            }
            _ => output.push_str("Start/End:             N/A\n"),
        }
        output.push_str(&format!("Bars:                  {}\n", summary.bars));
        output.push('\n');

        output.push_str("Performance\n");
        output.push_str("───────────────────────────────────────────────────────────────\n");
        output.push_str(&format!("Total P&L:             {:.5}\n", summary.total_pnl));
        output.push_str(&format!("Total Pips:            {:.1}\n", summary.total_pips));
        output.push_str(&format!(
            "Max Drawdown:          {:.5} ({:.1} pips)\n",
            summary.max_drawdown, summary.max_drawdown_pips
        ));
        output.push_str(&format!("Exposure:              {:.2}%\n", summary.exposure * 100.0));
        output.push('\n');

        output.push_str("Trade Statistics\n");
        output.push_str("───────────────────────────────────────────────────────────────\n");
        output.push_str(&format!("Total Trades:          {}\n", summary.num_trades));
        if summary.num_trades > 0 {
            output.push_str(&format!(
                "Wins / Losses:         {} / {}\n",
                summary.wins, summary.losses
            ));
            output.push_str(&format!(
                "Win Rate:              {:.2}%\n",
                summary.win_rate * 100.0
            ));
            match summary.profit_factor {
                Some(pf) => output.push_str(&format!("Profit Factor:         {pf:.2}\n")),
                None => output.push_str("Profit Factor:         N/A (no losing trades)\n"),
            }
        } else {
            output.push_str("Win Rate:              N/A (no trades)\n");
        }

        output.push('\n');
        output.push_str("═══════════════════════════════════════════════════════════════\n");

        if summary.num_trades == 0 {
            output.push_str("\n⚠️  No bar crossed either probability threshold.\n");
            output.push_str("    Consider adjusting the thresholds or the data range.\n\n");
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsCalculator;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_format_with_trades() {
        let mut calc = MetricsCalculator::new(0.0001);
        calc.add_step(Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap(), 1, 0.0012);
        calc.add_step(Utc.with_ymd_and_hms(2024, 1, 2, 10, 5, 0).unwrap(), -1, -0.0004);
        let text = ReportFormatter::format(&calc.calculate());

        assert!(text.contains("2024-01-02 10:00:00 UTC"));
        assert!(text.contains("Total Pips:            8.0"));
        assert!(text.contains("Win Rate:              50.00%"));
        assert!(text.contains("Profit Factor:         3.00"));
    }

    #[test]
    fn test_format_without_trades() {
        let text = ReportFormatter::format(&MetricsCalculator::new(0.0001).calculate());
        assert!(text.contains("N/A (no trades)"));
        assert!(text.contains("No bar crossed"));
    }
}
