use crate::data::types::Bracket;
use crate::strategies::types::{Confidence, ForecastEstimate, ForecastMethod};

/// Probability-weighted expected value of a market snapshot.
///
/// Prices are divided by the probability mass actually observed, not by an
/// assumed 100¢: real books sum to anywhere around 50¢-150¢. Returns `None`
/// when no bracket has both a midpoint and a positive price.
pub fn market_implied_forecast(brackets: &[Bracket]) -> Option<f64> {
    let (weighted_sum, total_mass) = probability_mass(brackets);
    if total_mass <= 0.0 {
        return None;
    }
    let value = weighted_sum / total_mass;
    value.is_finite().then_some(value)
}

/// (Σ midpoint·p, Σ p) over usable brackets, with p in [0, 1].
fn probability_mass(brackets: &[Bracket]) -> (f64, f64) {
    brackets
        .iter()
        .filter(|b| b.yes_price > 0.0)
        .filter_map(|b| b.midpoint.map(|mid| (mid, b.yes_price / 100.0)))
        .fold((0.0, 0.0), |(sum, mass), (mid, p)| (sum + mid * p, mass + p))
}

/// The implied forecast as an estimate. A book whose prices sum close to
/// 100¢ is trusted more than a thin or stale one.
pub fn market_implied_estimate(brackets: &[Bracket]) -> Option<ForecastEstimate> {
    let value = market_implied_forecast(brackets)?;
    let (_, mass) = probability_mass(brackets);
    let priced = brackets.iter().filter(|b| b.yes_price > 0.0).count();

    let confidence = if (0.9..=1.1).contains(&mass) {
        Confidence::High
    } else if (0.7..=1.3).contains(&mass) {
        Confidence::Medium
    } else {
        Confidence::Low
    };

    Some(
        ForecastEstimate::new(value, confidence, ForecastMethod::MarketImplied)
            .with_factor(format!("probability mass {:.2}", mass))
            .with_factor(format!("{} of {} brackets priced", priced, brackets.len())),
    )
}

/// Highest-priced bracket, i.e. the crowd favourite. Ties keep the first.
pub fn top_bracket(brackets: &[Bracket]) -> Option<&Bracket> {
    brackets
        .iter()
        .filter(|b| b.yes_price > 0.0)
        .reduce(|best, b| if b.yes_price > best.yes_price { b } else { best })
}

#[derive(Debug, Clone, PartialEq)]
pub struct BracketPick {
    pub bracket: Bracket,
    /// False when the YES price is above the entry cap and there is too
    /// little left to win.
    pub affordable: bool,
}

pub fn favourite_pick(brackets: &[Bracket], max_entry_price: f64) -> Option<BracketPick> {
    top_bracket(brackets).map(|b| BracketPick {
        bracket: b.clone(),
        affordable: b.yes_price <= max_entry_price,
    })
}

/// Bracket that a forecast value would settle in.
pub fn bracket_for_value(brackets: &[Bracket], value: f64) -> Option<&Bracket> {
    brackets.iter().find(|b| b.contains(value))
}
