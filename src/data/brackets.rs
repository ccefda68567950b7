//! Turns free-text market labels ("47° to 48°", "40° or below", ">55°")
//! into numeric brackets with a representative midpoint and a resolved YES
//! price.

use crate::config::NormalizerConfig;
use crate::data::types::{Bracket, OpenEnded, RawMarket};
use regex::Regex;
use tracing::{debug, warn};

const NUM: &str = r"(-?\d+(?:\.\d+)?)";

/// Pattern kinds a label can fall into. Classification tests them in
/// declaration order, so a label is only ever parsed as one kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LabelPattern {
    Range { low: f64, high: f64 },
    /// `threshold` is the inclusive upper bound, or `None` when the label
    /// says "below" without a readable number.
    Below { threshold: Option<f64> },
    Above { threshold: Option<f64> },
    Point { value: f64 },
    Unparseable,
}

pub struct LabelParser {
    range: Regex,
    below_inclusive: Regex,
    below_strict: Regex,
    above_inclusive: Regex,
    above_strict: Regex,
    point: Regex,
}

impl LabelParser {
    pub fn new() -> Result<Self, regex::Error> {
        let unit = r"\s*°?\s*[FC]?\s*";
        Ok(Self {
            // whole label only, so dates in a market title never read as a range
            range: Regex::new(&format!(r"(?i)^\s*{NUM}{unit}(?:to|-|–)\s*{NUM}{unit}$"))?,
            below_inclusive: Regex::new(&format!(
                r"(?i){NUM}{unit}or\s+(?:below|less|lower|under)|(?:<=|≤)\s*{NUM}"
            ))?,
            below_strict: Regex::new(&format!(r"(?i)(?:<|\bunder\b|\bbelow\b|\bless than\b)\s*{NUM}"))?,
            above_inclusive: Regex::new(&format!(
                r"(?i){NUM}{unit}or\s+(?:above|more|higher|over)|(?:>=|≥)\s*{NUM}"
            ))?,
            above_strict: Regex::new(&format!(r"(?i)(?:>|\bover\b|\babove\b|\bmore than\b|\bgreater than\b)\s*{NUM}"))?,
            point: Regex::new(&format!(r"(?i)^\s*{NUM}{unit}$"))?,
        })
    }

    pub fn classify(&self, label: &str) -> LabelPattern {
        if let Some((low, high)) = self.parse_range(label) {
            return LabelPattern::Range { low, high };
        }
        if let Some(threshold) = self.parse_below(label) {
            return LabelPattern::Below { threshold };
        }
        if let Some(threshold) = self.parse_above(label) {
            return LabelPattern::Above { threshold };
        }
        if let Some(value) = self.parse_point(label) {
            return LabelPattern::Point { value };
        }
        LabelPattern::Unparseable
    }

    pub fn parse_range(&self, label: &str) -> Option<(f64, f64)> {
        let caps = self.range.captures(label)?;
        let a = caps.get(1)?.as_str().parse::<f64>().ok()?;
        let b = caps.get(2)?.as_str().parse::<f64>().ok()?;
        Some(if a <= b { (a, b) } else { (b, a) })
    }

    /// Outer `None`: not a below-style label. Inner `None`: below-style but
    /// no number could be read.
    pub fn parse_below(&self, label: &str) -> Option<Option<f64>> {
        if let Some(n) = first_number(&self.below_inclusive, label) {
            return Some(Some(n));
        }
        // Outcomes settle on whole degrees, so "<N" means "N-1 or below".
        if let Some(n) = first_number(&self.below_strict, label) {
            return Some(Some(n - 1.0));
        }
        let lower = label.to_lowercase();
        let marked = lower.contains("or below")
            || lower.contains("or less")
            || lower.contains("or lower")
            || lower.contains("under")
            || lower.contains("below")
            || lower.contains('<')
            || lower.contains('≤');
        marked.then_some(None)
    }

    pub fn parse_above(&self, label: &str) -> Option<Option<f64>> {
        if let Some(n) = first_number(&self.above_inclusive, label) {
            return Some(Some(n));
        }
        if let Some(n) = first_number(&self.above_strict, label) {
            return Some(Some(n + 1.0));
        }
        let lower = label.to_lowercase();
        let marked = lower.contains("or above")
            || lower.contains("or more")
            || lower.contains("or higher")
            || lower.contains("above")
            || lower.contains("over")
            || lower.contains('>')
            || lower.contains('≥');
        marked.then_some(None)
    }

    pub fn parse_point(&self, label: &str) -> Option<f64> {
        first_number(&self.point, label)
    }
}

fn first_number(re: &Regex, label: &str) -> Option<f64> {
    let caps = re.captures(label)?;
    caps.iter()
        .skip(1)
        .flatten()
        .find_map(|m| m.as_str().parse::<f64>().ok())
}

/// YES price in cents: the ask (true cost to enter) when quoted, else the
/// bid, else the complement of the NO side, else 0.
///
/// A quote of 0 counts as absent, so once the ask is checked there is no
/// case left where both sides are quoted and a bid/ask midpoint would apply.
pub fn resolve_yes_price(market: &RawMarket) -> f64 {
    let quoted = |p: Option<f64>| p.filter(|v| v.is_finite() && *v > 0.0);

    let price = quoted(market.yes_ask)
        .or_else(|| quoted(market.yes_bid))
        .or_else(|| quoted(market.no_bid).map(|b| 100.0 - b))
        .or_else(|| quoted(market.no_ask).map(|a| 100.0 - a))
        .unwrap_or(0.0);

    price.clamp(0.0, 100.0)
}

pub struct BracketNormalizer {
    config: NormalizerConfig,
    parser: LabelParser,
}

impl BracketNormalizer {
    pub fn new(config: NormalizerConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            config,
            parser: LabelParser::new()?,
        })
    }

    /// Normalize one market snapshot. Output is sorted by midpoint with
    /// unresolved midpoints first; duplicate labels are kept.
    pub fn normalize(&self, markets: &[RawMarket]) -> Vec<Bracket> {
        let mut brackets: Vec<Bracket> = markets.iter().map(|m| self.to_bracket(m)).collect();
        brackets.sort_by(|a, b| {
            a.midpoint
                .unwrap_or(f64::NEG_INFINITY)
                .total_cmp(&b.midpoint.unwrap_or(f64::NEG_INFINITY))
        });
        brackets
    }

    fn fallback(&self, value: f64) -> Option<f64> {
        self.config.use_fallback_midpoints.then_some(value)
    }

    pub fn to_bracket(&self, market: &RawMarket) -> Bracket {
        let margin = self.config.open_ended_margin;
        let pattern = self.parser.classify(&market.label);

        let (lower_bound, upper_bound, midpoint, open_ended) = match pattern {
            LabelPattern::Range { low, high } => {
                (Some(low), Some(high), Some((low + high) / 2.0), OpenEnded::None)
            }
            LabelPattern::Below { threshold: Some(t) } => {
                (None, Some(t), Some(t - margin), OpenEnded::Below)
            }
            LabelPattern::Below { threshold: None } => {
                warn!("No threshold in below-bracket label {:?}, using fallback", market.label);
                (None, None, self.fallback(self.config.fallback_below_midpoint), OpenEnded::Below)
            }
            LabelPattern::Above { threshold: Some(t) } => {
                (Some(t), None, Some(t + margin), OpenEnded::Above)
            }
            LabelPattern::Above { threshold: None } => {
                warn!("No threshold in above-bracket label {:?}, using fallback", market.label);
                (None, None, self.fallback(self.config.fallback_above_midpoint), OpenEnded::Above)
            }
            LabelPattern::Point { value } => (Some(value), Some(value), Some(value), OpenEnded::None),
            LabelPattern::Unparseable => {
                warn!(
                    "Unparseable bracket label {:?} ({}), using fallback midpoint",
                    market.label, market.ticker
                );
                (None, None, self.fallback(self.config.fallback_unparsed_midpoint), OpenEnded::None)
            }
        };

        let yes_price = resolve_yes_price(market);
        debug!(
            "Bracket {:?} → {:?} mid={:?} yes={}¢",
            market.label, pattern, midpoint, yes_price
        );

        Bracket {
            ticker: market.ticker.clone(),
            raw_label: market.label.clone(),
            lower_bound,
            upper_bound,
            midpoint,
            open_ended,
            yes_price,
            url: market.url.clone(),
        }
    }
}
