//! Plain-text rendering of a cycle. Insufficient data, a blocked day and a
//! measured "no edge" each get their own wording.

use crate::execution::types::PositionMark;
use crate::strategies::types::{ModelOutcome, Recommendation};
use crate::strategies::weather_edge::{CityReport, MarketReport};
use std::fmt::Write;

pub fn render_city(report: &CityReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "══ {} ({}) ══", report.city_name, report.city_key);
    let _ = writeln!(
        out,
        "Local {:02}:{:02} | entry window: {}",
        report.local_hour.floor() as u32,
        ((report.local_hour.fract()) * 60.0).round().min(59.0) as u32,
        report.entry_window
    );

    match (&report.station, &report.current) {
        (Some(station), Some(current)) => {
            let _ = write!(out, "Now at {}: {:.1}°F", station, current.temperature);
            if let Some(dew) = current.dew_point {
                let _ = write!(out, ", dew point {:.1}°F", dew);
            }
            if let Some(wind) = current.wind_speed {
                let _ = write!(out, ", wind {:.0} mph", wind);
            }
            if let Some(desc) = &current.description {
                let _ = write!(out, ", {}", desc);
            }
            let _ = writeln!(out);
        }
        _ => {
            let _ = writeln!(out, "No current observation");
        }
    }

    for status in report.unavailable_feeds() {
        let _ = writeln!(out, "⚠ {}", status);
    }

    for market in report.markets() {
        out.push_str(&render_market(market));
    }
    out
}

pub fn render_market(market: &MarketReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "── {} ({}) ──", market.target, market.series);

    match &market.market {
        Some(m) => {
            let _ = writeln!(
                out,
                "Market implied: {:.1}° [{}] ({} brackets)",
                m.value,
                m.confidence,
                market.brackets.len()
            );
        }
        None if market.brackets.is_empty() => {
            let _ = writeln!(out, "Market implied: no market data");
        }
        None => {
            let _ = writeln!(out, "Market implied: no priced brackets");
        }
    }

    let favourite = market.favourite.as_ref().map(|p| p.bracket.ticker.as_str());
    let forecast = market.forecast_bracket.as_ref().map(|b| b.ticker.as_str());
    for bracket in &market.brackets {
        let ticker = Some(bracket.ticker.as_str());
        let mut marks = String::new();
        if ticker == favourite {
            marks.push_str(" ★ favourite");
        }
        if ticker == forecast {
            marks.push_str(" ◆ model");
        }
        let _ = writeln!(out, "  {:<14} {:>3.0}¢{}", bracket.range_text(), bracket.yes_price, marks);
    }

    if let Some(r) = &market.reference {
        let _ = writeln!(out, "Official forecast: {:.0}°", r.value);
    }

    match &market.model {
        ModelOutcome::Estimate(e) => {
            let _ = write!(out, "Model: {:.1}° [{}] via {:?}", e.value, e.confidence, e.method);
            if let Some(band) = e.band {
                let _ = write!(out, " (range {:.1}°-{:.1}°)", band.low, band.high);
            }
            let _ = writeln!(out);
            for factor in &e.supporting_factors {
                let _ = writeln!(out, "  · {}", factor);
            }
        }
        ModelOutcome::InsufficientData { reason } => {
            let _ = writeln!(out, "Model: INSUFFICIENT DATA, no signal yet ({})", reason);
        }
        ModelOutcome::Blocked { reason, diagnostics } => {
            let _ = writeln!(out, "Model: BLOCKED, no trade today ({})", reason);
            let _ = writeln!(
                out,
                "  · {} readings, net move {:+.1}°, {} reversals, max reversal {:.2}°, zigzag {:.2}",
                diagnostics.sample_count,
                diagnostics.net_move,
                diagnostics.reversal_count,
                diagnostics.max_reversal,
                diagnostics.zigzag_ratio
            );
        }
    }

    match &market.edge {
        Some(edge) if edge.recommendation == Recommendation::NoEdge => {
            let _ = writeln!(out, "Edge: NO EDGE (gap {:+.1}° vs {:?})", edge.gap, edge.comparator);
        }
        Some(edge) => {
            let _ = writeln!(
                out,
                "Edge: {} [{}] gap {:+.1}° vs {:?} {:.1}°",
                edge.recommendation, edge.confidence_tier, edge.gap, edge.comparator, edge.comparator_value
            );
        }
        None if !market.is_blocked() => {
            let _ = writeln!(out, "Edge: not evaluated");
        }
        None => {}
    }

    if let Some(score) = &market.score {
        let _ = writeln!(
            out,
            "Score: {} → {} (cushion {:+}, pace {:+}, time {:+}, weather {:+})",
            score.total, score.tier, score.cushion, score.pace, score.time_of_day, score.weather
        );
    }

    if let Some(bracket) = &market.forecast_bracket {
        let _ = writeln!(out, "Forecast bracket: {} @ {:.0}¢", bracket.range_text(), bracket.yes_price);
    }
    if let Some(pick) = &market.favourite {
        let note = if pick.affordable { "" } else { " (too expensive)" };
        let _ = writeln!(
            out,
            "Favourite: {} @ {:.0}¢{} {}",
            pick.bracket.range_text(),
            pick.bracket.yes_price,
            note,
            pick.bracket.url
        );
    }
    out
}

pub fn render_positions(marks: &[PositionMark]) -> String {
    let mut out = String::new();
    if marks.is_empty() {
        return out;
    }
    let _ = writeln!(out, "══ Tracked positions ══");
    for mark in marks {
        let p = &mark.position;
        match (mark.current_price, mark.unrealized_pnl) {
            (Some(price), Some(pnl)) => {
                let _ = writeln!(
                    out,
                    "#{} {} x{} @ {:.0}¢ → {:.0}¢ ({:+.0}¢)",
                    p.id, p.ticker, p.contracts, p.entry_price, price, pnl
                );
            }
            _ => {
                let _ = writeln!(
                    out,
                    "#{} {} x{} @ {:.0}¢ → no current price",
                    p.id, p.ticker, p.contracts, p.entry_price
                );
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::types::{Bracket, ForecastTarget, OpenEnded};
    use crate::strategies::market_implied::BracketPick;
    use crate::strategies::types::{BlockReason, GateDiagnostics};

    fn market(model: ModelOutcome) -> MarketReport {
        MarketReport {
            target: ForecastTarget::DailyHigh,
            series: "KXHIGHNY".to_string(),
            brackets: Vec::new(),
            market: None,
            reference: None,
            model,
            edge: None,
            score: None,
            favourite: None,
            forecast_bracket: None,
        }
    }

    #[test]
    fn test_states_render_distinctly() {
        let insufficient = render_market(&market(ModelOutcome::insufficient("1 readings in trusted window, need 3")));
        let blocked = render_market(&market(ModelOutcome::Blocked {
            reason: BlockReason::LargeReversal,
            diagnostics: GateDiagnostics {
                sample_count: 4,
                net_move: 3.0,
                reversal_count: 2,
                max_reversal: 2.5,
                zigzag_ratio: 1.33,
            },
        }));

        assert!(insufficient.contains("INSUFFICIENT DATA"));
        assert!(insufficient.contains("not evaluated"));
        assert!(!insufficient.contains("NO EDGE"));

        assert!(blocked.contains("BLOCKED"));
        assert!(blocked.contains("max reversal 2.50°"));
        assert!(blocked.contains("zigzag 1.33"));
        assert!(!blocked.contains("not evaluated"));
        assert!(blocked.contains("no market data"));
    }

    fn bracket(ticker: &str, low: f64, price: f64) -> Bracket {
        Bracket {
            ticker: ticker.to_string(),
            raw_label: format!("{}° to {}°", low, low + 1.0),
            lower_bound: Some(low),
            upper_bound: Some(low + 1.0),
            midpoint: Some(low + 0.5),
            open_ended: OpenEnded::None,
            yes_price: price,
            url: String::new(),
        }
    }

    #[test]
    fn test_every_bracket_is_listed() {
        let mut report = market(ModelOutcome::insufficient("no readings"));
        report.brackets = vec![bracket("B40", 40.0, 40.0), bracket("B42", 42.0, 55.0), bracket("B44", 44.0, 20.0)];
        report.favourite = Some(BracketPick {
            bracket: report.brackets[1].clone(),
            affordable: true,
        });
        report.forecast_bracket = Some(report.brackets[2].clone());

        let text = render_market(&report);
        let rows: Vec<&str> = text.lines().filter(|l| l.ends_with('¢') || l.contains("¢ ")).collect();
        assert!(rows.iter().any(|l| l.contains("40¢") && !l.contains('★')));
        assert!(rows.iter().any(|l| l.contains("55¢ ★ favourite")));
        assert!(rows.iter().any(|l| l.contains("20¢ ◆ model")));
        assert_eq!(text.matches('★').count(), 1);
    }
}
